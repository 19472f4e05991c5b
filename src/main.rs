//! wledctl: command line controller for WLED LED strips over UDP.
//!
//! ## Usage
//! ```sh
//! # paint LEDs 0-29 orange and the rest of the strip blue
//! wledctl -n 60 '0:30@orange,*@blue'
//!
//! # fade through three stages over five seconds
//! wledctl -x fade -d 5s red '0:60/2@green' blue
//!
//! # show schemes from the config file, or run a named loop
//! wledctl -s sunset
//! wledctl -l evening
//!
//! # relay raw RGB triples from stdin
//! some-visualizer | wledctl -
//! ```

use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use wledctl::config::default_config_path;
use wledctl::loops::run_loop;
use wledctl::stream::{RelayOptions, relay};
use wledctl::{Config, Display, DisplayOptions, Protocol, UdpSink, setup_signal_handler};

/// Command line utility for controlling LED strips running WLED over UDP
#[derive(Parser)]
#[command(name = "wledctl")]
#[command(version)]
struct Args {
    /// Level of log output verbosity
    #[arg(short = 'L', long, env = "LOGLEVEL", default_value = "info")]
    log_level: String,

    /// The WLED IP[:PORT] to communicate with
    #[arg(short, long, env = "WLEDCTL_HOST", default_value = "127.0.0.1:21324")]
    address: String,

    /// The number of LEDs being addressed
    #[arg(short = 'n', long, env = "WLEDCTL_LED_COUNT", default_value_t = 60)]
    led_count: usize,

    /// WLED protocol: warls (1), drgb (2), drgbw (3), dnrgb (4), notify (0)
    #[arg(short, long, env = "WLEDCTL_PROTOCOL", default_value = "warls")]
    protocol: Protocol,

    /// Seconds to wait before the device resumes normal light mode (255 = never)
    #[arg(short, long, default_value_t = 255)]
    timeout: u8,

    /// Interval between animation frames
    #[arg(short, long, default_value = "100ms", value_parser = humantime::parse_duration)]
    interval: Duration,

    /// Length of animated transitions
    #[arg(short, long, default_value = "3s", value_parser = humantime::parse_duration)]
    duration: Duration,

    /// Transition effect: fill, fade, colortrain
    #[arg(short = 'x', long)]
    effect: Option<String>,

    /// Turn off LEDs the effect leaves black instead of leaving them untouched
    #[arg(short = 'C', long)]
    clear_first: bool,

    /// Rotate the strip by this many LEDs
    #[arg(short, long, default_value_t = 0)]
    offset: usize,

    /// Path to the YAML config file holding schemes and loops
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Named scheme from the config file to show (repeatable)
    #[arg(short, long = "scheme")]
    schemes: Vec<String>,

    /// Named loop from the config file to run
    #[arg(short, long = "loop")]
    loop_name: Option<String>,

    /// Range specs, one transition stage each; `-` relays RGB from stdin
    specs: Vec<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args.log_level);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut sink = UdpSink::connect(args.address.as_str())?;
    let running = setup_signal_handler();

    tracing::info!(
        address = %sink.peer_addr()?,
        leds = args.led_count,
        protocol = %args.protocol,
        "wledctl v{}",
        env!("CARGO_PKG_VERSION")
    );

    if args.specs.first().map(String::as_str) == Some("-") {
        let options = RelayOptions {
            protocol: args.protocol,
            timeout: args.timeout,
            led_count: args.led_count,
            interval: args.interval,
        };
        let sent = relay(io::stdin().lock(), &mut sink, &options, &running)?;
        tracing::info!(packets = sent, "stdin closed");
        return Ok(());
    }

    let options = DisplayOptions {
        frame_interval: args.interval,
        autoclear_timeout: args.timeout,
        transition_duration: args.duration,
        clear_first: args.clear_first,
        offset: args.offset,
        protocol: args.protocol,
        ..DisplayOptions::default()
    };
    let mut display = Display::with_options(sink, args.led_count, options);
    let effect = args.effect.as_deref().unwrap_or("");

    if args.loop_name.is_none() && args.schemes.is_empty() {
        display.set_transition_effect(effect, &args.specs)?;
        display.flush()?;
        return Ok(());
    }

    let path = args.config.unwrap_or_else(default_config_path);
    let config = Config::load(&path)?;
    tracing::debug!(path = %path.display(), schemes = config.schemes.len(), "config loaded");

    match &args.loop_name {
        Some(name) => {
            run_loop(&config, &mut display, name, effect, &running)?;
        }
        None => config.apply_schemes(&mut display, &args.schemes, effect)?,
    }

    Ok(())
}
