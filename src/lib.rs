//! mandelband - distributed Mandelbrot renderer
//!
//! Renders the Mandelbrot set by splitting the image into contiguous row
//! bands, evaluating each band in a separate worker unit, and reassembling the
//! bands into one image at a coordinator.
//!
//! # Architecture
//!
//! - **Two concurrency tiers**: worker units (in-process or over TCP) each
//!   evaluate their band on a rayon pool
//! - **Exact transfers**: every band payload is checked against the size the
//!   coordinator expects before it is copied into place
//! - **Barrier**: no unit exits and no output is written until every band is in
//! - **Swappable coloring**: any `ColorPolicy` maps samples to RGB

pub mod config;
pub mod coordinator;
pub mod distributed;
pub mod error;
pub mod fractal;
pub mod output;
pub mod partition;
pub mod stats;
pub mod util;
pub mod worker;

// Re-export commonly used types
pub use config::Config;
pub use coordinator::{assemble, Assembled, RenderJob};
pub use error::RenderError;

/// Result type used throughout mandelband
pub type Result<T, E = anyhow::Error> = std::result::Result<T, E>;
