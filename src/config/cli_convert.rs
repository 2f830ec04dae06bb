//! CLI to Config conversion utilities

use crate::config::cli::{Cli, Gradient};
use crate::config::{Config, WindowConfig};
use crate::fractal::color::GradientChannel;
use anyhow::{Context, Result};

/// Parse an image size string (e.g., "800x600") to `(width, height)`
pub fn parse_size(s: &str) -> Result<(usize, usize)> {
    let s = s.trim().to_lowercase();
    let (w, h) = s
        .split_once('x')
        .with_context(|| format!("Invalid size format: {} (expected WIDTHxHEIGHT)", s))?;

    let width = w
        .trim()
        .parse()
        .with_context(|| format!("Invalid width in size: {}", s))?;
    let height = h
        .trim()
        .parse()
        .with_context(|| format!("Invalid height in size: {}", s))?;

    Ok((width, height))
}

/// Parse a window string "x_min,x_max,y_min,y_max"
pub fn parse_window(s: &str) -> Result<WindowConfig> {
    let values = s
        .split(',')
        .map(|v| {
            v.trim()
                .parse::<f64>()
                .with_context(|| format!("Invalid window bound: {}", v.trim()))
        })
        .collect::<Result<Vec<_>>>()?;

    if values.len() != 4 {
        anyhow::bail!(
            "Invalid window format: {} (expected X_MIN,X_MAX,Y_MIN,Y_MAX)",
            s
        );
    }

    Ok(WindowConfig {
        x_min: values[0],
        x_max: values[1],
        y_min: values[2],
        y_max: values[3],
    })
}

/// Convert the CLI gradient choice
pub fn convert_gradient(gradient: Gradient) -> GradientChannel {
    match gradient {
        Gradient::Red => GradientChannel::Red,
        Gradient::Green => GradientChannel::Green,
        Gradient::Blue => GradientChannel::Blue,
    }
}

/// Build the effective configuration: TOML file (if any), then CLI overrides
pub fn build_config(cli: &Cli) -> Result<Config> {
    let config = match cli.config {
        Some(ref path) => super::toml::parse_toml_file(path)?,
        None => Config::default(),
    };
    super::toml::merge_cli_with_config(cli, config)
}
