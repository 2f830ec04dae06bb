//! Distributed mode implementation
//!
//! Spreads the worker units of one render across machines.
//!
//! # Architecture
//!
//! - **Coordinator**: partitions the image, connects to every worker service,
//!   reassembles the bands and runs the closing barrier
//! - **Worker service**: runs on each node; every coordinator connection is
//!   one worker unit rendering one band
//!
//! # Modules
//!
//! - `protocol`: message definitions and framing
//! - `node_service`: worker service
//! - `coordinator`: distributed coordinator

pub mod coordinator;
pub mod node_service;
pub mod protocol;

pub use coordinator::DistributedCoordinator;
pub use node_service::NodeService;
pub use protocol::{
    AssignMessage, BandReadyMessage, BarrierAckMessage, ErrorMessage, Message, PROTOCOL_VERSION,
};

use anyhow::{Context, Result};
use std::path::Path;

/// Append `default_port` to an address that has none
pub fn with_default_port(addr: &str, default_port: u16) -> String {
    let addr = addr.trim();
    if addr.contains(':') {
        addr.to_string()
    } else {
        format!("{}:{}", addr, default_port)
    }
}

/// Parse a comma-separated worker list; list order is worker order
pub fn parse_host_list(host_list: &str, default_port: u16) -> Vec<String> {
    host_list
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| with_default_port(s, default_port))
        .collect()
}

/// Read worker addresses from a file, one per line, `#` starts a comment line
pub fn read_clients_file(path: &Path, default_port: u16) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read clients file {}", path.display()))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| with_default_port(line, default_port))
        .collect())
}
