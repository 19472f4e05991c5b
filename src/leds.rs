//! Sparse LED color sets, the range-spec mini-language, and the WLED
//! realtime wire encoding.
//!
//! A range spec is a comma-separated list of `index@color` subranges:
//!
//! | Index part | Meaning                                          |
//! |------------|--------------------------------------------------|
//! | `*`        | every LED not otherwise set (wildcard)           |
//! | `N`        | the single LED `N`                               |
//! | `N:M`      | LEDs `N` up to but excluding `M`                 |
//! | `N:M/R`    | the same range, every `R`th LED                  |
//! | `N:M/*`    | the same range, stepped by the animation frames  |
//!
//! A subrange without `@` is a bare color applied to the wildcard, and
//! the color `-` means "unset" (transparent black).

use crate::color::{Color, ColorError};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ── Index ──────────────────────────────────────────────────────────

/// Key of an [`LedSet`] entry.
///
/// `Wildcard` sorts after every specific index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LedIndex {
    Specific(usize),
    Wildcard,
}

// ── LED set ────────────────────────────────────────────────────────

/// Mapping from LED position to color, with an optional wildcard color
/// for every position that is not explicitly present.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedSet {
    leds: BTreeMap<LedIndex, Color>,
}

impl LedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set containing only the wildcard color.
    pub fn wildcard_only(color: Color) -> Self {
        let mut set = Self::new();
        set.set_wildcard(color);
        set
    }

    /// A set with `color` at every index in `0..count`.
    pub fn filled(count: usize, color: Color) -> Self {
        let mut set = Self::new();
        for i in 0..count {
            set.set(i, color);
        }
        set
    }

    pub fn set(&mut self, index: usize, color: Color) {
        self.leds.insert(LedIndex::Specific(index), color);
    }

    pub fn set_wildcard(&mut self, color: Color) {
        self.leds.insert(LedIndex::Wildcard, color);
    }

    /// Whether `key` is constrained by this set.
    ///
    /// An empty set matches everything, and the wildcard key is always a
    /// member; a specific index matches only when it is present.
    pub fn contains(&self, key: LedIndex) -> bool {
        match key {
            _ if self.leds.is_empty() => true,
            LedIndex::Wildcard => true,
            specific => self.leds.contains_key(&specific),
        }
    }

    pub fn has(&self, index: usize) -> bool {
        self.contains(LedIndex::Specific(index))
    }

    /// The effective color at `index`: the explicit color when present and
    /// non-zero, else the non-zero wildcard color.
    pub fn get(&self, index: usize) -> Option<Color> {
        self.color_at(index)
            .filter(|c| !c.is_zero())
            .or_else(|| self.wildcard().filter(|c| !c.is_zero()))
    }

    /// The raw entry stored at `index`, zero colors included.
    pub fn color_at(&self, index: usize) -> Option<Color> {
        self.leds.get(&LedIndex::Specific(index)).copied()
    }

    pub fn wildcard(&self) -> Option<Color> {
        self.leds.get(&LedIndex::Wildcard).copied()
    }

    /// Number of specific (non-wildcard) entries.
    pub fn led_count(&self) -> usize {
        self.leds.len() - usize::from(self.leds.contains_key(&LedIndex::Wildcard))
    }

    pub fn is_empty(&self) -> bool {
        self.leds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LedIndex, Color)> + '_ {
        self.leds.iter().map(|(i, c)| (*i, *c))
    }

    /// Encode as a realtime packet: protocol byte, timeout byte, then
    /// `index, r, g, b` for every position in `0..led_count()`.
    ///
    /// Positions that are missing, or zero when `skip_zero` is set, are
    /// left as four zero bytes. The index byte is truncated to `u8`, so
    /// strips longer than 256 LEDs wrap.
    pub fn bytes(&self, proto: Protocol, timeout: u8, skip_zero: bool) -> Vec<u8> {
        let count = self.led_count();
        let mut buf = Vec::with_capacity(2 + count * 4);

        buf.push(proto.into());
        buf.push(timeout);

        for i in 0..count {
            match self.color_at(i) {
                Some(c) if !(skip_zero && c.is_zero()) => {
                    let (r, g, b, _) = c.rgba255();
                    buf.extend_from_slice(&[i as u8, r, g, b]);
                }
                _ => buf.extend_from_slice(&[0; 4]),
            }
        }

        buf
    }
}

// ── Range-spec parsing ─────────────────────────────────────────────

/// Parse a range spec into an [`LedSet`].
///
/// `frames` is the step used by `/*`. Numeric tokens that fail to parse
/// count as zero; a malformed color aborts the whole parse. A wildcard
/// subrange discards everything parsed so far and ends the parse.
pub fn parse_led_range(rangespec: &str, frames: usize) -> Result<LedSet, ColorError> {
    let mut leds = LedSet::new();

    for subrange in rangespec.trim().split(',') {
        let subrange = subrange.trim();
        let (idxspec, mut colorspec) = split_pair(subrange, '@');
        let (mut index, rpt) = split_pair(idxspec, '/');

        if colorspec.is_empty() {
            colorspec = subrange;
            index = "*";
        }

        let color = match colorspec {
            "" => continue,
            "-" => Color::ZERO,
            literal => Color::parse(literal)?,
        };

        if index == "*" {
            return Ok(LedSet::wildcard_only(color));
        }

        let (start, end) = split_pair(index, ':');

        if start.is_empty() {
            continue;
        }

        let start = coerce_index(start);

        if end.is_empty() {
            leds.set(start, color);
            continue;
        }

        let step = match rpt {
            "*" => frames,
            n => coerce_index(n),
        }
        .max(1);

        for i in (start..coerce_index(end)).step_by(step) {
            leds.set(i, color);
        }
    }

    Ok(leds)
}

/// Split on the first `sep`, trimming both halves. The second half is
/// empty when `sep` is absent.
fn split_pair(s: &str, sep: char) -> (&str, &str) {
    match s.split_once(sep) {
        Some((a, b)) => (a.trim(), b.trim()),
        None => (s.trim(), ""),
    }
}

/// Lenient integer coercion: fractional values truncate, anything
/// unparseable or negative is zero.
fn coerce_index(token: &str) -> usize {
    token.parse::<usize>().unwrap_or_else(|_| {
        token
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v > 0.0)
            .map_or(0, |v| v as usize)
    })
}

// ── Protocol ───────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("unknown protocol {0:?}")]
    Unknown(String),
}

/// WLED realtime protocol tag, sent as the first byte of every packet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum Protocol {
    Notify = 0x0,
    #[default]
    Warls = 0x1,
    Drgb = 0x2,
    Drgbw = 0x3,
    Dnrgb = 0x4,
}

impl From<Protocol> for u8 {
    fn from(p: Protocol) -> u8 {
        p as u8
    }
}

impl FromStr for Protocol {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warls" | "1" => Ok(Protocol::Warls),
            "drgb" | "2" => Ok(Protocol::Drgb),
            "drgbw" | "3" => Ok(Protocol::Drgbw),
            "dnrgb" | "4" => Ok(Protocol::Dnrgb),
            "notify" | "0" | "5" => Ok(Protocol::Notify),
            _ => Err(ProtocolError::Unknown(s.to_string())),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Protocol::Notify => "notify",
            Protocol::Warls => "warls",
            Protocol::Drgb => "drgb",
            Protocol::Drgbw => "drgbw",
            Protocol::Dnrgb => "dnrgb",
        };
        f.write_str(name)
    }
}
