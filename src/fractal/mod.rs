//! Image geometry and complex-plane mapping
//!
//! An [`ImageGrid`] fixes the output dimensions and a [`ComplexPlaneWindow`]
//! fixes the region of the complex plane it covers. Both are immutable for the
//! duration of a run; together they define the linear pixel → complex mapping
//! every worker unit uses.

pub mod color;
pub mod evaluator;

use crate::error::RenderError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use evaluator::{evaluate, PixelSample};

/// Output image dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageGrid {
    pub width: usize,
    pub height: usize,
}

impl ImageGrid {
    /// Create a grid, rejecting zero dimensions
    pub fn new(width: usize, height: usize) -> Result<Self, RenderError> {
        let grid = Self { width, height };
        grid.validate()?;
        Ok(grid)
    }

    pub fn validate(&self) -> Result<(), RenderError> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::Configuration(format!(
                "image dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }

    /// Total number of pixels
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Row-major index of `(row, col)` in a full-image buffer
    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.width + col
    }
}

impl fmt::Display for ImageGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Rectangular region of the complex plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplexPlaneWindow {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl ComplexPlaneWindow {
    /// Create a window, rejecting non-finite or inverted bounds
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Result<Self, RenderError> {
        let window = Self { x_min, x_max, y_min, y_max };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> Result<(), RenderError> {
        let bounds = [self.x_min, self.x_max, self.y_min, self.y_max];
        if bounds.iter().any(|b| !b.is_finite()) {
            return Err(RenderError::Configuration(format!(
                "window bounds must be finite, got {}",
                self
            )));
        }
        if self.x_max <= self.x_min {
            return Err(RenderError::Configuration(format!(
                "x_max ({}) must be greater than x_min ({})",
                self.x_max, self.x_min
            )));
        }
        if self.y_max <= self.y_min {
            return Err(RenderError::Configuration(format!(
                "y_max ({}) must be greater than y_min ({})",
                self.y_max, self.y_min
            )));
        }
        Ok(())
    }

    /// Width of one pixel in complex-plane units
    #[inline]
    pub fn pixel_width(&self, grid: &ImageGrid) -> f64 {
        (self.x_max - self.x_min) / grid.width as f64
    }

    /// Height of one pixel in complex-plane units
    #[inline]
    pub fn pixel_height(&self, grid: &ImageGrid) -> f64 {
        (self.y_max - self.y_min) / grid.height as f64
    }

    /// Imaginary coordinate of an image row
    ///
    /// Row 0 maps to `y_min`. A row whose coordinate lies within half a pixel of
    /// the real axis is snapped onto it, so the axis is sampled exactly.
    #[inline]
    pub fn row_to_imag(&self, grid: &ImageGrid, row: usize) -> f64 {
        let pixel_height = self.pixel_height(grid);
        let cy = self.y_min + row as f64 * pixel_height;
        if cy.abs() < pixel_height / 2.0 {
            0.0
        } else {
            cy
        }
    }

    /// Real coordinate of an image column
    #[inline]
    pub fn col_to_real(&self, grid: &ImageGrid, col: usize) -> f64 {
        self.x_min + col as f64 * self.pixel_width(grid)
    }

    /// Complex coordinate `(Cx, Cy)` of pixel `(row, col)`
    #[inline]
    pub fn to_complex(&self, grid: &ImageGrid, row: usize, col: usize) -> (f64, f64) {
        (self.col_to_real(grid, col), self.row_to_imag(grid, row))
    }
}

impl Default for ComplexPlaneWindow {
    fn default() -> Self {
        Self {
            x_min: -2.0,
            x_max: 0.47,
            y_min: -1.12,
            y_max: 1.12,
        }
    }
}

impl fmt::Display for ComplexPlaneWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "re [{}, {}] x im [{}, {}]",
            self.x_min, self.x_max, self.y_min, self.y_max
        )
    }
}

/// Escape-time iteration parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EscapeParams {
    /// Iteration cap; points that have not escaped by then are interior
    pub max_iteration: u32,
    /// Bailout radius (compared squared)
    pub bailout: f64,
}

impl EscapeParams {
    /// Reject a zero iteration cap and a non-positive or non-finite bailout
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.max_iteration == 0 {
            return Err(RenderError::Configuration(
                "max_iteration must be positive".to_string(),
            ));
        }
        if !self.bailout.is_finite() || self.bailout <= 0.0 {
            return Err(RenderError::Configuration(format!(
                "bailout must be a positive finite number, got {}",
                self.bailout
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn radius_squared(&self) -> f64 {
        self.bailout * self.bailout
    }
}

impl Default for EscapeParams {
    fn default() -> Self {
        Self {
            max_iteration: 1000,
            bailout: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_rejects_zero_dimensions() {
        assert!(ImageGrid::new(0, 10).is_err());
        assert!(ImageGrid::new(10, 0).is_err());
        let grid = ImageGrid::new(800, 600).unwrap();
        assert_eq!(grid.pixel_count(), 480_000);
        assert_eq!(grid.index(1, 2), 802);
    }

    #[test]
    fn test_window_rejects_degenerate_bounds() {
        assert!(ComplexPlaneWindow::new(1.0, 1.0, -1.0, 1.0).is_err());
        assert!(ComplexPlaneWindow::new(-1.0, 1.0, 2.0, -2.0).is_err());
        assert!(ComplexPlaneWindow::new(f64::NAN, 1.0, -1.0, 1.0).is_err());
        assert!(ComplexPlaneWindow::new(-1.0, f64::INFINITY, -1.0, 1.0).is_err());
        assert!(ComplexPlaneWindow::new(-2.0, 0.47, -1.12, 1.12).is_ok());
    }

    #[test]
    fn test_escape_params_validation() {
        assert!(EscapeParams::default().validate().is_ok());
        assert!(EscapeParams { max_iteration: 0, bailout: 2.0 }.validate().is_err());
        assert!(EscapeParams { max_iteration: 10, bailout: 0.0 }.validate().is_err());
        assert!(EscapeParams { max_iteration: 10, bailout: f64::NAN }.validate().is_err());
    }

    #[test]
    fn test_pixel_mapping_corners() {
        let grid = ImageGrid::new(800, 800).unwrap();
        let window = ComplexPlaneWindow::default();

        let (cx, cy) = window.to_complex(&grid, 0, 0);
        assert_eq!(cx, -2.0);
        assert_eq!(cy, -1.12);

        let (cx, _) = window.to_complex(&grid, 0, 799);
        assert!((cx - (-2.0 + 799.0 * 2.47 / 800.0)).abs() < 1e-12);
    }

    #[test]
    fn test_real_axis_snaps_to_zero() {
        let grid = ImageGrid::new(800, 800).unwrap();
        let window = ComplexPlaneWindow::default();
        // Row 400 sits on the real axis up to rounding error
        assert_eq!(window.row_to_imag(&grid, 400), 0.0);
        assert_ne!(window.row_to_imag(&grid, 401), 0.0);
    }
}
