//! RGBA color values used by LED sets, shaders, and the display.
//!
//! Parsing, named colors, mixing, and hue rotation lean on `palette`;
//! the [`Color`] type itself stays a plain four-byte value so it can be
//! compared, copied, and serialized to the wire without conversions.

use palette::encoding::Srgb as SrgbEncoding;
use palette::{FromColor, Hsl, Hsv, LinSrgba, Mix, ShiftHue, Srgb, Srgba};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColorError {
    #[error("invalid color literal {0:?}")]
    Invalid(String),
}

/// An 8-bit RGBA color.
///
/// `Color::ZERO` (all channels zero) means "unset": LED sets skip it on
/// lookup and the wire serializer can leave it untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Transparent black, the "unset" color.
    pub const ZERO: Color = Color::rgba(0, 0, 0, 0);
    /// Opaque black.
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn rgba255(&self) -> (u8, u8, u8, u8) {
        (self.r, self.g, self.b, self.a)
    }

    /// Parse a color literal: hex (`#f00`, `#ff0000`, `#ff000080`), a CSS
    /// color name, or `rgb()`, `rgba()`, `hsl()`, `hsla()` notation.
    pub fn parse(literal: &str) -> Result<Self, ColorError> {
        let spec = literal.trim().to_ascii_lowercase();
        let invalid = || ColorError::Invalid(literal.to_string());

        if spec.is_empty() {
            return Err(invalid());
        }

        if spec == "transparent" {
            return Ok(Self::ZERO);
        }

        if let Some((name, args)) = split_function(&spec) {
            return parse_function(name, &args).ok_or_else(invalid);
        }

        if let Some(named) = palette::named::from_str(&spec) {
            return Ok(named.into());
        }

        parse_hex(&spec).ok_or_else(invalid)
    }

    /// Linearly interpolate towards `other`; `factor` 0.0 is `self`,
    /// 1.0 is `other`. Returns `None` for a non-finite factor.
    pub fn mix(self, other: Color, factor: f64) -> Option<Color> {
        if !factor.is_finite() {
            return None;
        }

        let factor = factor.clamp(0.0, 1.0) as f32;
        let from: LinSrgba = Srgba::<u8>::from(self).into_linear();
        let to: LinSrgba = Srgba::<u8>::from(other).into_linear();

        Some(Srgba::<u8>::from_linear(from.mix(to, factor)).into())
    }

    /// Rotate the hue by `degrees`, keeping alpha.
    pub fn shift_hue(self, degrees: f32) -> Color {
        let rgb: Srgb<f32> = Srgb::new(self.r, self.g, self.b).into_format();
        let hsv: Hsv<SrgbEncoding, f32> = Hsv::from_color(rgb);
        let shifted: Srgb<f32> = Srgb::from_color(hsv.shift_hue(degrees));
        let shifted: Srgb<u8> = shifted.into_format();

        Color::rgba(shifted.red, shifted.green, shifted.blue, self.a)
    }
}

impl FromStr for Color {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::parse(s)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}

impl From<Srgb<u8>> for Color {
    fn from(c: Srgb<u8>) -> Self {
        Color::rgb(c.red, c.green, c.blue)
    }
}

impl From<Srgba<u8>> for Color {
    fn from(c: Srgba<u8>) -> Self {
        Color::rgba(c.red, c.green, c.blue, c.alpha)
    }
}

impl From<Color> for Srgba<u8> {
    fn from(c: Color) -> Self {
        Srgba::new(c.r, c.g, c.b, c.a)
    }
}

// ── Literal parsing ────────────────────────────────────────────────

fn parse_hex(spec: &str) -> Option<Color> {
    let hex = spec.strip_prefix('#').unwrap_or(spec);

    if !hex.is_ascii() {
        return None;
    }

    match hex.len() {
        3 | 6 => hex.parse::<Srgb<u8>>().ok().map(Color::from),
        8 => {
            let rgb = hex[..6].parse::<Srgb<u8>>().ok()?;
            let alpha = u8::from_str_radix(&hex[6..], 16).ok()?;
            Some(Color::rgba(rgb.red, rgb.green, rgb.blue, alpha))
        }
        _ => None,
    }
}

/// Split `name(a, b, c)` into its name and trimmed arguments.
fn split_function(spec: &str) -> Option<(&str, Vec<&str>)> {
    let open = spec.find('(')?;
    let inner = spec[open + 1..].strip_suffix(')')?;
    let args = inner.split(',').map(str::trim).collect();

    Some((spec[..open].trim(), args))
}

fn parse_function(name: &str, args: &[&str]) -> Option<Color> {
    match (name, args.len()) {
        ("rgb", 3) | ("rgba", 4) => {
            let r = parse_channel(args[0])?;
            let g = parse_channel(args[1])?;
            let b = parse_channel(args[2])?;
            let a = args.get(3).map_or(Some(255), |a| parse_alpha(a))?;
            Some(Color::rgba(r, g, b, a))
        }
        ("hsl", 3) | ("hsla", 4) => {
            let h = args[0].trim_end_matches("deg").parse::<f32>().ok()?;
            let s = parse_percent(args[1])?;
            let l = parse_percent(args[2])?;
            let a = args.get(3).map_or(Some(255), |a| parse_alpha(a))?;
            let hsl: Hsl<SrgbEncoding, f32> = Hsl::new(h, s, l);
            let rgb: Srgb<f32> = Srgb::from_color(hsl);
            let rgb: Srgb<u8> = rgb.into_format();
            Some(Color::rgba(rgb.red, rgb.green, rgb.blue, a))
        }
        _ => None,
    }
}

fn parse_channel(arg: &str) -> Option<u8> {
    if let Some(pct) = arg.strip_suffix('%') {
        let pct = pct.trim().parse::<f32>().ok()?;
        return Some((pct.clamp(0.0, 100.0) * 2.55).round() as u8);
    }

    let value = arg.parse::<f32>().ok()?;
    Some(value.clamp(0.0, 255.0).round() as u8)
}

fn parse_alpha(arg: &str) -> Option<u8> {
    let alpha = match arg.strip_suffix('%') {
        Some(pct) => pct.trim().parse::<f32>().ok()? / 100.0,
        None => arg.parse::<f32>().ok()?,
    };

    Some((alpha.clamp(0.0, 1.0) * 255.0).round() as u8)
}

fn parse_percent(arg: &str) -> Option<f32> {
    let value = arg.trim_end_matches('%').trim().parse::<f32>().ok()?;
    Some((value / 100.0).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("#ff0000", Color::rgb(255, 0, 0))]
    #[case("#F00", Color::rgb(255, 0, 0))]
    #[case("00ff00", Color::rgb(0, 255, 0))]
    #[case("#00000000", Color::ZERO)]
    #[case("#000000ff", Color::BLACK)]
    #[case("#11223380", Color::rgba(0x11, 0x22, 0x33, 0x80))]
    #[case("red", Color::rgb(255, 0, 0))]
    #[case("  Blue ", Color::rgb(0, 0, 255))]
    #[case("black", Color::BLACK)]
    #[case("transparent", Color::ZERO)]
    #[case("rgb(1, 2, 3)", Color::rgb(1, 2, 3))]
    #[case("rgba(0,0,0,1)", Color::BLACK)]
    #[case("rgba(0,0,0,0)", Color::ZERO)]
    #[case("rgb(100%, 0%, 0%)", Color::rgb(255, 0, 0))]
    #[case("hsl(120, 100%, 50%)", Color::rgb(0, 255, 0))]
    #[case("hsla(240, 100%, 50%, 1)", Color::rgb(0, 0, 255))]
    fn parses_literals(#[case] literal: &str, #[case] expected: Color) {
        assert_eq!(Color::parse(literal), Ok(expected));
    }

    #[rstest]
    #[case("")]
    #[case("notacolor")]
    #[case("#12345")]
    #[case("#gggggg")]
    #[case("rgb(1, 2)")]
    #[case("rgb(a, b, c)")]
    #[case("cmyk(0, 0, 0, 0)")]
    fn rejects_malformed_literals(#[case] literal: &str) {
        assert_eq!(
            Color::parse(literal),
            Err(ColorError::Invalid(literal.to_string()))
        );
    }

    #[test]
    fn zero_is_only_all_channels_zero() {
        assert!(Color::ZERO.is_zero());
        assert!(Color::default().is_zero());
        assert!(!Color::BLACK.is_zero());
        assert!(!Color::rgba(1, 0, 0, 0).is_zero());
    }

    #[test]
    fn mix_endpoints_match_inputs() {
        let red = Color::rgb(255, 0, 0);
        let blue = Color::rgb(0, 0, 255);

        assert_eq!(red.mix(blue, 0.0), Some(red));
        assert_eq!(red.mix(blue, 1.0), Some(blue));
    }

    #[test]
    fn mix_midpoint_is_between() {
        let mid = Color::BLACK.mix(Color::rgb(255, 255, 255), 0.5).unwrap();
        assert!(mid.r > 0 && mid.r < 255);
        assert_eq!(mid.r, mid.g);
        assert_eq!(mid.a, 255);
    }

    #[test]
    fn mix_rejects_non_finite_factor() {
        assert_eq!(Color::BLACK.mix(Color::ZERO, f64::NAN), None);
        assert_eq!(Color::BLACK.mix(Color::ZERO, f64::INFINITY), None);
    }

    #[test]
    fn shift_hue_rotates_primaries() {
        let red = Color::rgb(255, 0, 0);
        assert_eq!(red.shift_hue(120.0), Color::rgb(0, 255, 0));
        assert_eq!(red.shift_hue(240.0), Color::rgb(0, 0, 255));
    }

    #[test]
    fn shift_hue_keeps_alpha() {
        let c = Color::rgba(255, 0, 0, 7).shift_hue(240.0);
        assert_eq!(c, Color::rgba(0, 0, 255, 7));
    }

    #[test]
    fn display_is_hex_with_alpha() {
        assert_eq!(Color::rgb(1, 2, 255).to_string(), "#0102ffff");
    }
}
