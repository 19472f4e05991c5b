//! Display loops: cycle through schemes on a schedule.
//!
//! Each loop step is either a control word or `scheme[,scheme...]@duration`:
//!
//! - `sunset,stars@10m` shows `sunset` and `stars` for ten minutes;
//! - `advance` skips the step after it;
//! - `retreat` goes back to the scheme shown before the current one;
//! - `break` ends the loop.
//!
//! Without a `break` a loop repeats until interrupted.

use crate::config::{Config, ConfigError};
use crate::display::Display;
use crate::is_running;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Longest single sleep while holding a step, so Ctrl-C stays responsive.
const HOLD_SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum LoopError {
    #[error("unknown loop {0:?}")]
    UnknownLoop(String),
    #[error("bad duration in loop step {step:?}: {source}")]
    Duration {
        step: String,
        source: humantime::DurationError,
    },
    #[error(transparent)]
    Apply(#[from] ConfigError),
}

/// One raw step of a loop, as written in the config file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoopStep(pub String);

impl From<&str> for LoopStep {
    fn from(s: &str) -> Self {
        LoopStep(s.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoopAction {
    Break,
    Advance,
    Retreat,
    Show { schemes: Vec<String>, hold: Duration },
}

impl LoopStep {
    pub fn parse(&self) -> Result<LoopAction, LoopError> {
        let step = self.0.trim();

        match step {
            "break" => Ok(LoopAction::Break),
            "advance" => Ok(LoopAction::Advance),
            "retreat" => Ok(LoopAction::Retreat),
            _ => {
                let (schemes, timespec) = step.split_once('@').unwrap_or((step, ""));
                let hold = humantime::parse_duration(timespec.trim()).map_err(|source| {
                    LoopError::Duration {
                        step: step.to_string(),
                        source,
                    }
                })?;

                let schemes = schemes
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect();

                Ok(LoopAction::Show { schemes, hold })
            }
        }
    }
}

// ── Cursor ─────────────────────────────────────────────────────────

/// Walks a loop's steps, yielding each set of schemes to show and how
/// long to hold it. Ends at `break`, or when no step shows anything.
pub struct LoopCursor {
    actions: Vec<LoopAction>,
    position: usize,
    last_shown: Option<usize>,
}

impl LoopCursor {
    pub fn new(steps: &[LoopStep]) -> Result<Self, LoopError> {
        let actions = steps
            .iter()
            .map(LoopStep::parse)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            actions,
            position: 0,
            last_shown: None,
        })
    }

    /// The show step before the one most recently shown.
    fn previous_show(&self) -> Option<usize> {
        let last = self.last_shown?;
        let len = self.actions.len();

        (1..len)
            .map(|back| (last + len - back) % len)
            .find(|&i| matches!(self.actions[i], LoopAction::Show { .. }))
            .or(Some(last))
    }
}

impl Iterator for LoopCursor {
    type Item = (Vec<String>, Duration);

    fn next(&mut self) -> Option<Self::Item> {
        let len = self.actions.len();
        if len == 0 {
            return None;
        }

        // a full lap of control steps without a show means nothing to do
        for _ in 0..=2 * len {
            let at = self.position % len;

            match &self.actions[at] {
                LoopAction::Break => return None,
                LoopAction::Advance => self.position = at + 2,
                LoopAction::Retreat => {
                    self.position = self.previous_show().unwrap_or(at + 1);
                }
                LoopAction::Show { schemes, hold } => {
                    self.last_shown = Some(at);
                    self.position = at + 1;
                    return Some((schemes.clone(), *hold));
                }
            }
        }

        None
    }
}

// ── Runner ─────────────────────────────────────────────────────────

/// Run the named loop against `display`, applying every shown scheme set
/// with `effect`. Returns how many steps were shown before the loop hit
/// `break` or `running` was cleared.
pub fn run_loop<W: Write>(
    config: &Config,
    display: &mut Display<W>,
    name: &str,
    effect: &str,
    running: &AtomicBool,
) -> Result<usize, LoopError> {
    let steps = config
        .loops
        .get(name)
        .ok_or_else(|| LoopError::UnknownLoop(name.to_string()))?;

    let mut shown = 0;

    for (schemes, hold) in LoopCursor::new(steps)? {
        if !is_running(running) {
            break;
        }

        tracing::info!(
            name,
            schemes = %schemes.join(","),
            hold = %humantime::format_duration(hold),
            "loop step"
        );

        config.apply_schemes(display, &schemes, effect)?;
        shown += 1;
        hold_while_running(hold, running);
    }

    tracing::info!(name, shown, "loop finished");
    Ok(shown)
}

fn hold_while_running(hold: Duration, running: &AtomicBool) {
    let until = Instant::now() + hold;

    while is_running(running) {
        let left = until.saturating_duration_since(Instant::now());
        if left.is_zero() {
            break;
        }
        thread::sleep(left.min(HOLD_SLICE));
    }
}
