//! Error taxonomy
//!
//! Every failure in a render is fatal: there are no retries anywhere in the
//! pipeline. These typed errors name the categories callers may want to tell
//! apart; they travel inside `anyhow::Error` and can be recovered with
//! `downcast_ref::<RenderError>()`.

use crate::partition::RowBand;
use thiserror::Error;

/// Fatal render errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    /// Invalid dimensions, window, iteration bound, worker count, or band.
    /// Always detected before any worker unit starts.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A transferred band payload does not have the size the coordinator allocated for it
    #[error("transfer size mismatch from worker {worker_id}: expected {expected} bytes, received {received}")]
    TransferSizeMismatch {
        worker_id: usize,
        expected: usize,
        received: usize,
    },

    /// A worker returned rows other than the ones it was assigned
    #[error("worker {worker_id} returned band {received} but was assigned {expected}")]
    BandMismatch {
        worker_id: usize,
        expected: RowBand,
        received: RowBand,
    },

    /// Assembly finished without a band from this worker
    #[error("worker {0} did not deliver its band")]
    MissingBand(usize),

    /// A worker delivered its band more than once
    #[error("worker {0} delivered its band twice")]
    DuplicateBand(usize),

    /// Coordinator and worker speak different protocol versions
    #[error("protocol version mismatch: expected {expected}, received {received}")]
    ProtocolVersion { expected: u32, received: u32 },
}

impl RenderError {
    /// Shorthand for a configuration error wrapped in `anyhow::Error`
    pub fn config(msg: impl Into<String>) -> anyhow::Error {
        RenderError::Configuration(msg.into()).into()
    }
}
