//! Raw color relay: feed `r g b` byte triples (for example from a pipe on
//! stdin) straight to the strip, one LED per packet.

use crate::is_running;
use crate::leds::Protocol;
use std::io::{self, Read, Write};
use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RelayOptions {
    pub protocol: Protocol,
    pub timeout: u8,
    pub led_count: usize,
    /// Pause after each packet.
    pub interval: Duration,
}

/// Relay triples from `reader` to `sink` until end of input or until
/// `running` is cleared. Packets are `[protocol, timeout, index, r, g, b]`;
/// the index starts at 1 and wraps around the strip, and is truncated to
/// `u8` on the wire. Returns the number of packets sent.
pub fn relay<R: Read, W: Write>(
    mut reader: R,
    sink: &mut W,
    options: &RelayOptions,
    running: &AtomicBool,
) -> io::Result<usize> {
    if options.led_count == 0 {
        return Ok(0);
    }

    let mut index = 1 % options.led_count;
    let mut rgb = [0u8; 3];
    let mut sent = 0;

    while is_running(running) {
        match reader.read_exact(&mut rgb) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        }

        let [r, g, b] = rgb;
        sink.write_all(&[
            options.protocol.into(),
            options.timeout,
            index as u8,
            r,
            g,
            b,
        ])?;
        sent += 1;

        if !options.interval.is_zero() {
            thread::sleep(options.interval);
        }

        index = (index + 1) % options.led_count;
    }

    tracing::debug!(packets = sent, "relay finished");
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn options(led_count: usize) -> RelayOptions {
        RelayOptions {
            protocol: Protocol::Warls,
            timeout: 9,
            led_count,
            interval: Duration::ZERO,
        }
    }

    #[test]
    fn relays_each_triple_to_the_next_led() {
        let input = Cursor::new(vec![1u8, 2, 3, 4, 5, 6, 7, 8, 9]);
        let mut sink = Vec::<u8>::new();
        let running = AtomicBool::new(true);

        let sent = relay(input, &mut sink, &options(2), &running).unwrap();

        assert_eq!(sent, 3);
        assert_eq!(
            sink,
            vec![
                1, 9, 1, 1, 2, 3, //
                1, 9, 0, 4, 5, 6, //
                1, 9, 1, 7, 8, 9,
            ]
        );
    }

    #[test]
    fn trailing_partial_triple_is_dropped() {
        let input = Cursor::new(vec![1u8, 2, 3, 4]);
        let mut sink = Vec::<u8>::new();
        let running = AtomicBool::new(true);

        assert_eq!(relay(input, &mut sink, &options(5), &running).unwrap(), 1);
        assert_eq!(sink.len(), 6);
    }

    #[test]
    fn stops_when_not_running() {
        let input = Cursor::new(vec![1u8, 2, 3]);
        let mut sink = Vec::<u8>::new();
        let running = AtomicBool::new(false);

        assert_eq!(relay(input, &mut sink, &options(5), &running).unwrap(), 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn empty_strip_sends_nothing() {
        let input = Cursor::new(vec![1u8, 2, 3]);
        let mut sink = Vec::<u8>::new();
        let running = AtomicBool::new(true);

        assert_eq!(relay(input, &mut sink, &options(0), &running).unwrap(), 0);
    }
}
