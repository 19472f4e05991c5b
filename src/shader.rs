//! Per-LED, per-frame transition shaders.
//!
//! A flush builds one [`ShaderStep`] for every LED in every frame and asks
//! the selected [`Effect`] for that LED's color. The step's argument
//! ranges form an ordered list of color stages; animation progress picks
//! the stage a shader moves from and the one it moves to.

use crate::color::Color;
use crate::leds::LedSet;
use std::fmt;
use thiserror::Error;

/// Hue rotation between neighbouring LEDs of a color train, in degrees.
const TRAIN_HUE_STEP: f32 = 12.0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShaderError {
    #[error("unknown effect {0:?}")]
    UnknownEffect(String),
}

// ── Step ───────────────────────────────────────────────────────────

/// Everything a shader knows about the LED it is coloring.
#[derive(Clone, Copy, Debug)]
pub struct ShaderStep<'a> {
    pub index: usize,
    /// 1-based frame number within the current animation.
    pub frame: usize,
    /// Color shown before the transition.
    pub current_color: Color,
    /// Color the transition settles on once the stages run out.
    pub target_color: Color,
    /// Color just computed for the previous LED in this frame.
    pub last_step_color: Color,
    /// Progress through the animation, 0.0 to 1.0.
    pub animation_progress: f64,
    pub args: &'a [String],
    /// One parsed range per entry of `args`.
    pub ranges: &'a [LedSet],
}

impl<'a> ShaderStep<'a> {
    pub fn ranges(&self) -> &'a [LedSet] {
        self.ranges
    }

    /// The first range, or an empty (match-all) set.
    pub fn range(&self) -> LedSet {
        self.ranges.first().cloned().unwrap_or_default()
    }

    pub fn range_pair(&self) -> Option<(&'a LedSet, &'a LedSet)> {
        match self.ranges {
            [first, second, ..] => Some((first, second)),
            _ => None,
        }
    }

    /// Color of the stage the animation is leaving.
    pub fn from_color(&self) -> Color {
        self.stage_color(self.stage() - 1)
            .unwrap_or(self.current_color)
    }

    /// Color of the stage the animation is entering.
    pub fn to_color(&self) -> Color {
        self.stage_color(self.stage()).unwrap_or(self.target_color)
    }

    fn stage(&self) -> i64 {
        (self.ranges.len() as f64 * self.animation_progress).floor() as i64
    }

    /// LEDs a stage does not cover resolve to opaque black.
    fn stage_color(&self, stage: i64) -> Option<Color> {
        let range = self.ranges.get(usize::try_from(stage).ok()?)?;
        Some(range.get(self.index).unwrap_or(Color::BLACK))
    }
}

// ── Shaders ────────────────────────────────────────────────────────

/// A transition shader: computes one LED's color for one frame and says
/// whether the animation should keep going.
pub trait Shader {
    fn compute(&self, step: &ShaderStep<'_>) -> (Color, bool);
}

/// The built-in transition effects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Jump straight to the target stage.
    Fill,
    /// Cross-fade from one stage to the next.
    Fade,
    /// Rainbow that travels down the strip, each LED a hue step away from
    /// its left neighbour.
    ColorTrain,
}

impl Effect {
    /// Look up an effect by name; the empty name is `fill`.
    pub fn from_name(name: &str) -> Result<Self, ShaderError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "" | "fill" => Ok(Effect::Fill),
            "fade" => Ok(Effect::Fade),
            "colortrain" => Ok(Effect::ColorTrain),
            _ => Err(ShaderError::UnknownEffect(name.to_string())),
        }
    }

    /// Instant effects render a single frame and ignore the configured
    /// transition duration.
    pub fn is_instant(&self) -> bool {
        matches!(self, Effect::Fill)
    }
}

impl Shader for Effect {
    fn compute(&self, step: &ShaderStep<'_>) -> (Color, bool) {
        match self {
            Effect::Fill => (step.to_color(), true),
            Effect::Fade => {
                let from = step.from_color();
                let color = from
                    .mix(step.to_color(), step.animation_progress)
                    .unwrap_or(from);
                (color, true)
            }
            Effect::ColorTrain => {
                let last = step.last_step_color;
                let color = if step.index == 0 || last.is_zero() || last == Color::BLACK {
                    step.to_color()
                        .shift_hue(step.frame as f32 * TRAIN_HUE_STEP)
                } else {
                    last.shift_hue(TRAIN_HUE_STEP)
                };
                (color, true)
            }
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Effect::Fill => "fill",
            Effect::Fade => "fade",
            Effect::ColorTrain => "colortrain",
        };
        f.write_str(name)
    }
}
