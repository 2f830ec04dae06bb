//! Output formatting
//!
//! - `ppm`: the rendered image (binary PPM)
//! - `text`: console configuration banner and run summary
//! - `json`: machine-readable run report

pub mod json;
pub mod ppm;
pub mod text;
