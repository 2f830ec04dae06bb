//! Coloring policies
//!
//! Coloring runs after escape times are known and is a pure function of one
//! [`PixelSample`]. The core never depends on a particular palette: anything
//! implementing [`ColorPolicy`] (including a plain closure) can be plugged in.

use super::PixelSample;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One output pixel: `[r, g, b]`
pub type Rgb = [u8; 3];

/// Maps an escape-time sample to a color
pub trait ColorPolicy: Send + Sync {
    fn color(&self, sample: &PixelSample) -> Rgb;
}

impl<F> ColorPolicy for F
where
    F: Fn(&PixelSample) -> Rgb + Send + Sync,
{
    fn color(&self, sample: &PixelSample) -> Rgb {
        self(sample)
    }
}

/// Channel that carries the gradient in [`SmoothGradient`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradientChannel {
    Red,
    Green,
    Blue,
}

impl GradientChannel {
    #[inline]
    fn index(self) -> usize {
        match self {
            Self::Red => 0,
            Self::Green => 1,
            Self::Blue => 2,
        }
    }
}

impl Default for GradientChannel {
    fn default() -> Self {
        Self::Red
    }
}

impl fmt::Display for GradientChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Red => write!(f, "red"),
            Self::Green => write!(f, "green"),
            Self::Blue => write!(f, "blue"),
        }
    }
}

/// Normalized smooth escape estimate `(i - log2(log2(|Z|))) / N`
///
/// The raw value is not range-checked: for samples that escape within the
/// first couple of iterations it can fall outside `[0, 1]`, and it is NaN when
/// `|Z| < 1`. Callers must clamp.
#[inline]
pub fn smooth_intensity(sample: &PixelSample, max_iteration: u32) -> f64 {
    let modulus = sample.magnitude_squared.sqrt();
    (sample.iterations as f64 - modulus.log2().log2()) / max_iteration as f64
}

/// Clamp a raw channel value into `[0, max]`, mapping NaN to 0
#[inline]
pub fn clamp_channel(value: f64, max: u8) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, max as f64) as u8
}

/// Single-channel smooth gradient; interior points are black
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothGradient {
    pub channel: GradientChannel,
    pub max_iteration: u32,
    /// Maximum channel value (also written to the image header)
    pub color_depth: u8,
}

impl SmoothGradient {
    pub fn new(channel: GradientChannel, max_iteration: u32, color_depth: u8) -> Self {
        Self {
            channel,
            max_iteration,
            color_depth,
        }
    }
}

impl ColorPolicy for SmoothGradient {
    fn color(&self, sample: &PixelSample) -> Rgb {
        let mut rgb = [0u8; 3];
        if sample.is_interior(self.max_iteration) {
            return rgb;
        }

        let value = smooth_intensity(sample, self.max_iteration) * self.color_depth as f64;
        rgb[self.channel.index()] = clamp_channel(value, self.color_depth);
        rgb
    }
}
