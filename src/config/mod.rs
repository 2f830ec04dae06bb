//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.
//! Every field has a default, and the defaults render the classic 800x800
//! view of the set with 1000 iterations on 4 worker units.

pub mod cli;
pub mod cli_convert;
pub mod toml;
pub mod validator;

use crate::fractal::color::GradientChannel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Complete render configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub workers: WorkerConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// Output image dimensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default = "default_dimension")]
    pub width: usize,
    #[serde(default = "default_dimension")]
    pub height: usize,
}

fn default_dimension() -> usize {
    800
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            width: default_dimension(),
            height: default_dimension(),
        }
    }
}

/// Complex-plane window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_x_min")]
    pub x_min: f64,
    #[serde(default = "default_x_max")]
    pub x_max: f64,
    #[serde(default = "default_y_min")]
    pub y_min: f64,
    #[serde(default = "default_y_max")]
    pub y_max: f64,
}

fn default_x_min() -> f64 {
    -2.0
}

fn default_x_max() -> f64 {
    0.47
}

fn default_y_min() -> f64 {
    -1.12
}

fn default_y_max() -> f64 {
    1.12
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            x_min: default_x_min(),
            x_max: default_x_max(),
            y_min: default_y_min(),
            y_max: default_y_max(),
        }
    }
}

/// Escape-time and coloring parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Iteration cap (N)
    #[serde(default = "default_max_iteration")]
    pub max_iteration: u32,
    /// Bailout radius (R)
    #[serde(default = "default_bailout")]
    pub bailout: f64,
    /// Maximum channel value written to the image
    #[serde(default = "default_color_depth")]
    pub color_depth: u16,
    /// Channel that carries the smooth gradient
    #[serde(default)]
    pub gradient: GradientChannel,
}

fn default_max_iteration() -> u32 {
    1000
}

fn default_bailout() -> f64 {
    2.0
}

fn default_color_depth() -> u16 {
    255
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_iteration: default_max_iteration(),
            bailout: default_bailout(),
            color_depth: default_color_depth(),
            gradient: GradientChannel::default(),
        }
    }
}

/// Worker unit configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Number of worker units (standalone mode)
    #[serde(default = "default_worker_count")]
    pub count: usize,
    /// Rayon threads per unit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
}

fn default_worker_count() -> usize {
    4
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: default_worker_count(),
            threads: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// PPM image path
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
    /// JSON run report path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_output: Option<PathBuf>,
}

fn default_output_path() -> PathBuf {
    PathBuf::from("mandelbrot.ppm")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            json_output: None,
        }
    }
}

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Validate and print the configuration, then exit
    #[serde(default)]
    pub dry_run: bool,
    /// Enable debug logging
    #[serde(default)]
    pub debug: bool,
}

// Display trait implementations

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Configuration:")?;
        writeln!(f, "  Image: {}", self.image)?;
        writeln!(f, "  Window: {}", self.window)?;
        writeln!(f, "  Render: {}", self.render)?;
        writeln!(f, "  Workers: {}", self.workers)?;
        writeln!(f, "  Output: {}", self.output)?;
        Ok(())
    }
}

impl fmt::Display for ImageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl fmt::Display for WindowConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "re [{}, {}] x im [{}, {}]",
            self.x_min, self.x_max, self.y_min, self.y_max
        )
    }
}

impl fmt::Display for RenderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "max_iteration={}, bailout={}, color_depth={}, gradient={}",
            self.max_iteration, self.bailout, self.color_depth, self.gradient
        )
    }
}

impl fmt::Display for WorkerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} unit(s)", self.count)?;
        match self.threads {
            Some(threads) => write!(f, ", {} thread(s) each", threads),
            None => write!(f, ", threads=auto"),
        }
    }
}

impl fmt::Display for OutputConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())?;
        if let Some(ref json) = self.json_output {
            write!(f, ", json={}", json.display())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.image.width, 800);
        assert_eq!(config.image.height, 800);
        assert_eq!(config.window.x_min, -2.0);
        assert_eq!(config.window.x_max, 0.47);
        assert_eq!(config.render.max_iteration, 1000);
        assert_eq!(config.render.color_depth, 255);
        assert_eq!(config.render.gradient, GradientChannel::Red);
        assert_eq!(config.workers.count, 4);
        assert_eq!(config.workers.threads, None);
        assert_eq!(config.output.path, PathBuf::from("mandelbrot.ppm"));
        assert!(!config.runtime.dry_run);
    }

    #[test]
    fn test_display() {
        let text = Config::default().to_string();
        assert!(text.contains("Image: 800x800"));
        assert!(text.contains("Workers: 4 unit(s), threads=auto"));
        assert!(text.contains("gradient=red"));
    }
}
