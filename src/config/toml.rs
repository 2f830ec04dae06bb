//! TOML configuration file parsing

use super::cli_convert::{convert_gradient, parse_size, parse_window};
use super::*;
use crate::config::cli::Cli;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Result<Config> {
    if let Some(ref size) = cli.size {
        let (width, height) = parse_size(size)?;
        config.image.width = width;
        config.image.height = height;
    }

    if let Some(ref window) = cli.window {
        config.window = parse_window(window)?;
    }

    if let Some(max_iteration) = cli.max_iteration {
        config.render.max_iteration = max_iteration;
    }
    if let Some(bailout) = cli.bailout {
        config.render.bailout = bailout;
    }
    if let Some(color_depth) = cli.color_depth {
        config.render.color_depth = color_depth;
    }
    if let Some(gradient) = cli.gradient {
        config.render.gradient = convert_gradient(gradient);
    }

    if let Some(workers) = cli.workers {
        config.workers.count = workers;
    }
    if let Some(threads) = cli.threads {
        config.workers.threads = Some(threads);
    }

    if let Some(ref output) = cli.output {
        config.output.path = output.clone();
    }
    if let Some(ref json_output) = cli.json_output {
        config.output.json_output = Some(json_output.clone());
    }

    config.runtime.dry_run |= cli.dry_run;
    config.runtime.debug |= cli.debug;

    Ok(config)
}
