//! Shared utilities

pub mod buffer;
pub mod runtime;
pub mod time;
