//! Double-buffered LED display: runs transition animations frame by frame
//! and pushes the committed state to the device.
//!
//! Every [`Display::flush`] resets both buffers to the default color, lets
//! the selected shader compute each LED for every animation frame, rotates
//! the result by the offset counter into the front buffer, and writes the
//! front buffer to the sink exactly once. Intermediate frames are never
//! sent, so an interrupted animation is never observed on the strip.
//!
//! A display is not safe for concurrent flushes; callers serialize them.

use crate::color::{Color, ColorError};
use crate::leds::{LedSet, Protocol, parse_led_range};
use crate::shader::{Effect, Shader, ShaderError, ShaderStep};
use std::io::{self, Write};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);
pub const DEFAULT_TRANSITION_DURATION: Duration = Duration::from_millis(3000);

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error(transparent)]
    Color(#[from] ColorError),
    #[error(transparent)]
    Effect(#[from] ShaderError),
    #[error("failed to write frame: {0}")]
    Io(#[from] io::Error),
}

// ── Options ────────────────────────────────────────────────────────

/// Display settings, passed explicitly instead of living in globals.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayOptions {
    /// Time between animation frames.
    pub frame_interval: Duration,
    /// Seconds the device keeps realtime data before reverting (255 = never).
    pub autoclear_timeout: u8,
    pub transition_duration: Duration,
    pub default_color: Color,
    /// Carried for the device; not applied to colors.
    pub brightness: u8,
    /// When false, black shader output is sent as "untouched" instead of off.
    pub clear_first: bool,
    pub offset: usize,
    pub protocol: Protocol,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            frame_interval: DEFAULT_FRAME_INTERVAL,
            autoclear_timeout: 255,
            transition_duration: DEFAULT_TRANSITION_DURATION,
            default_color: Color::ZERO,
            brightness: 255,
            clear_first: true,
            offset: 0,
            protocol: Protocol::Warls,
        }
    }
}

// ── Display ────────────────────────────────────────────────────────

pub struct Display<W> {
    /// Last committed, externally visible state.
    pub front_buffer: LedSet,
    /// Work-in-progress state.
    pub back_buffer: LedSet,
    pub frame_interval: Duration,
    pub autoclear_timeout: u8,
    pub transition_shader: Option<Effect>,
    pub transition_duration: Duration,
    pub transition_args: Vec<String>,
    pub default_color: Color,
    pub brightness: u8,
    pub clear_first: bool,
    pub offset_counter: usize,
    led_count: usize,
    sink: W,
    protocol: Protocol,
}

impl<W: Write> Display<W> {
    pub fn new(sink: W, led_count: usize) -> Self {
        Self::with_options(sink, led_count, DisplayOptions::default())
    }

    pub fn with_options(sink: W, led_count: usize, options: DisplayOptions) -> Self {
        let mut display = Self {
            front_buffer: LedSet::new(),
            back_buffer: LedSet::new(),
            frame_interval: options.frame_interval,
            autoclear_timeout: options.autoclear_timeout,
            transition_shader: None,
            transition_duration: options.transition_duration,
            transition_args: Vec::new(),
            default_color: options.default_color,
            brightness: options.brightness,
            clear_first: options.clear_first,
            offset_counter: options.offset,
            led_count,
            sink,
            protocol: options.protocol,
        };

        display.reset_buffers();
        display
    }

    pub fn led_count(&self) -> usize {
        self.led_count
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn sink(&self) -> &W {
        &self.sink
    }

    pub fn into_sink(self) -> W {
        self.sink
    }

    /// Select the transition effect by name and give it its range-spec
    /// arguments, one color stage per argument.
    ///
    /// The arguments are parsed up front; on any error the display keeps
    /// its previous effect, arguments, and duration. Selecting `fill`
    /// zeroes the transition duration.
    pub fn set_transition_effect(&mut self, name: &str, args: &[String]) -> Result<(), DisplayError> {
        let effect = Effect::from_name(name)?;
        let duration = if effect.is_instant() {
            Duration::ZERO
        } else {
            self.transition_duration
        };
        let frames = frame_count(self.frame_interval, duration);

        for arg in args {
            parse_led_range(arg, frames)?;
        }

        tracing::debug!(%effect, ?duration, args = args.len(), "transition effect set");

        self.transition_shader = Some(effect);
        self.transition_duration = duration;
        self.transition_args = args.to_vec();
        Ok(())
    }

    /// Number of frames the next animated flush renders.
    pub fn frame_count(&self) -> usize {
        frame_count(self.frame_interval, self.transition_duration)
    }

    /// Run the configured transition and write the result to the sink.
    ///
    /// # Rust concept: static dispatch
    /// `Effect` implements [`Shader`], so `flush_with(&effect)` and a test's
    /// custom shader go through the same generic `impl Shader` path, each
    /// monomorphized with no trait objects involved.
    pub fn flush(&mut self) -> Result<(), DisplayError> {
        match self.transition_shader {
            Some(effect) => self.flush_with(&effect),
            None => {
                tracing::debug!("flush requested without a transition shader");
                self.reset_buffers();
                self.commit()
            }
        }
    }

    /// Like [`flush`](Self::flush), animating with an arbitrary shader.
    pub fn flush_with(&mut self, shader: &impl Shader) -> Result<(), DisplayError> {
        let frames = self.frame_count();
        let ranges = self
            .transition_args
            .iter()
            .map(|arg| parse_led_range(arg, frames))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            duration = ?self.transition_duration,
            interval = ?self.frame_interval,
            frames,
            "flush requested"
        );

        self.reset_buffers();
        self.animate(shader, &ranges, frames);
        self.commit()
    }

    fn reset_buffers(&mut self) {
        for i in 0..self.led_count {
            self.front_buffer.set(i, self.default_color);
            self.back_buffer.set(i, self.default_color);
        }
    }

    fn animate(&mut self, shader: &impl Shader, ranges: &[LedSet], frames: usize) {
        if self.led_count == 0 {
            return;
        }

        let start = Instant::now();
        let mut rendered = 0;

        for frame in 1..=frames {
            let progress = self.frame_progress(frame);
            let mut previous: Option<Color> = None;
            let mut keep_going = true;

            for i in 0..self.led_count {
                let back = self.back_color(i);
                let source = self.rotated(i);
                let current = self
                    .front_buffer
                    .color_at(source)
                    .unwrap_or(self.default_color);
                let target = ranges
                    .last()
                    .map_or(back, |range| range.get(i).unwrap_or(Color::BLACK));

                let step = ShaderStep {
                    index: i,
                    frame,
                    current_color: current,
                    target_color: target,
                    last_step_color: previous.unwrap_or(back),
                    animation_progress: progress,
                    args: &self.transition_args,
                    ranges,
                };

                let (mut color, more) = shader.compute(&step);
                keep_going = more;

                if !self.clear_first && color == Color::BLACK {
                    color = Color::ZERO;
                }

                self.back_buffer.set(i, color);
                previous = Some(color);
            }

            rendered = frame;

            if !keep_going {
                break;
            }

            if frame < frames && !self.frame_interval.is_zero() {
                thread::sleep(self.frame_interval);
            }
        }

        tracing::debug!(frames = rendered, took = ?start.elapsed(), "animation done");
    }

    /// Progress of a 1-based frame. A zero duration renders one frame at
    /// 0.0; a zero interval with a real duration renders one at 1.0.
    fn frame_progress(&self, frame: usize) -> f64 {
        if self.transition_duration.is_zero() {
            0.0
        } else if self.frame_interval.is_zero() {
            1.0
        } else {
            let step =
                self.frame_interval.as_nanos() as f64 / self.transition_duration.as_nanos() as f64;
            ((frame - 1) as f64 * step).min(1.0)
        }
    }

    /// Position of LED `i` after rotating by the offset counter.
    fn rotated(&self, i: usize) -> usize {
        (i + self.offset_counter % self.led_count) % self.led_count
    }

    fn back_color(&self, i: usize) -> Color {
        self.back_buffer.color_at(i).unwrap_or(self.default_color)
    }

    /// Rotate the back buffer into the front buffer and send it.
    fn commit(&mut self) -> Result<(), DisplayError> {
        if self.led_count > 0 {
            for i in 0..self.led_count {
                let target = self.rotated(i);
                let color = self.back_color(i);
                self.front_buffer.set(target, color);
            }
        }

        let buf = self
            .front_buffer
            .bytes(self.protocol, self.autoclear_timeout, !self.clear_first);

        tracing::trace!(bytes = buf.len(), "writing frame");
        self.sink.write_all(&buf)?;
        self.sink.flush()?;
        Ok(())
    }
}

fn frame_count(interval: Duration, duration: Duration) -> usize {
    if duration.is_zero() || interval.is_zero() {
        return 1;
    }

    (duration.as_nanos() / interval.as_nanos()) as usize + 1
}

// ── UDP sink ───────────────────────────────────────────────────────

/// Sends every write as one UDP datagram to a WLED device.
pub struct UdpSink {
    socket: UdpSocket,
}

impl UdpSink {
    pub fn connect(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let remote = addr.to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "address resolved to nothing")
        })?;
        let local: SocketAddr = if remote.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(local)?;
        socket.connect(remote)?;
        Ok(Self { socket })
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.socket.peer_addr()
    }
}

impl Write for UdpSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.socket.send(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
