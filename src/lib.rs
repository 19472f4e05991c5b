//! Control WLED LED strips over UDP.
//!
//! The crate is built around a small display engine:
//! - [`leds`]: sparse LED color sets and the range-spec mini-language
//! - [`shader`]: per-LED transition shaders (fill, fade, color train)
//! - [`display`]: double-buffered frame composition and the flush loop
//!
//! Around it sit the pieces the `wledctl` binary uses: YAML scheme
//! configuration, scheduled loops, a raw stdin relay, and signal handling
//! for clean shutdown.

pub mod color;
pub mod config;
pub mod display;
pub mod leds;
pub mod loops;
pub mod shader;
pub mod stream;

pub use color::{Color, ColorError};
pub use config::{Config, ConfigError};
pub use display::{Display, DisplayError, DisplayOptions, UdpSink};
pub use leds::{LedIndex, LedSet, Protocol, parse_led_range};
pub use shader::{Effect, Shader, ShaderError, ShaderStep};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// ── Signal handling ────────────────────────────────────────────────

/// Set up a Ctrl+C handler that sets `running` to false.
///
/// Long-running modes (loops, the stdin relay) poll the flag between
/// steps, so an interrupted loop still finishes its current flush.
///
/// # Rust concept: Arc and AtomicBool
/// The handler runs on its own thread, so the flag is shared through an
/// `Arc` and read with atomic loads; a lone bool needs no mutex.
pub fn setup_signal_handler() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl-C handler");

    running
}

/// Check if the main loop should keep running.
pub fn is_running(running: &AtomicBool) -> bool {
    running.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_running_reflects_flag() {
        let running = AtomicBool::new(true);
        assert!(is_running(&running));

        running.store(false, Ordering::SeqCst);
        assert!(!is_running(&running));
    }
}
