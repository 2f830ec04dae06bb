//! Escape-time evaluation of a single point
//!
//! Iterates `Z <- Z^2 + C` from `Z = 0`, keeping the running squares of both
//! components so each step costs three multiplications and no square root.

use super::EscapeParams;
use serde::{Deserialize, Serialize};

/// Result of evaluating one pixel
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PixelSample {
    /// Iterations performed before escape, or `max_iteration` for interior points
    pub iterations: u32,
    /// `|Z|^2` after the last iteration, used for smooth coloring
    pub magnitude_squared: f64,
}

impl PixelSample {
    /// True if the point did not escape within `max_iteration`
    #[inline]
    pub fn is_interior(&self, max_iteration: u32) -> bool {
        self.iterations >= max_iteration
    }
}

/// Evaluate the escape time of `C = (cx, cy)`
///
/// Returns the smallest `i <= max_iteration` with `|Z_i|^2 >= bailout^2`, or
/// `max_iteration` if the orbit stays bounded that long.
#[inline]
pub fn evaluate(cx: f64, cy: f64, params: &EscapeParams) -> PixelSample {
    let radius_squared = params.radius_squared();

    let mut zx = 0.0_f64;
    let mut zy = 0.0_f64;
    let mut zx2 = 0.0_f64;
    let mut zy2 = 0.0_f64;

    let mut i = 0;
    while i < params.max_iteration && zx2 + zy2 < radius_squared {
        zy = 2.0 * zx * zy + cy;
        zx = zx2 - zy2 + cx;
        zx2 = zx * zx;
        zy2 = zy * zy;
        i += 1;
    }

    PixelSample {
        iterations: i,
        magnitude_squared: zx2 + zy2,
    }
}
