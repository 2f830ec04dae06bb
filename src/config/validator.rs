//! Configuration validation
//!
//! Runs before any worker unit starts. Every violation is a
//! [`RenderError::Configuration`].

use super::*;
use crate::coordinator::RenderJob;
use crate::error::RenderError;
use anyhow::Result;

/// Validate complete configuration
///
/// Geometry, escape parameters and worker settings go through
/// [`RenderJob::validate`], the same check every run performs before its
/// units start.
pub fn validate_config(config: &Config) -> Result<()> {
    RenderJob::from_config(config).validate()?;
    validate_color_depth(&config.render)?;
    validate_output(&config.output)?;
    Ok(())
}

/// PPM output stores one byte per channel
pub fn validate_color_depth(render: &RenderConfig) -> Result<()> {
    if render.color_depth == 0 || render.color_depth > 255 {
        return Err(RenderError::config(format!(
            "color_depth must be between 1 and 255, got {}",
            render.color_depth
        )));
    }
    Ok(())
}

/// Validate output settings
pub fn validate_output(output: &OutputConfig) -> Result<()> {
    if output.path.as_os_str().is_empty() {
        return Err(RenderError::config("output path must not be empty"));
    }
    if let Some(ref json) = output.json_output {
        if json.as_os_str().is_empty() {
            return Err(RenderError::config("json_output path must not be empty"));
        }
    }
    Ok(())
}
