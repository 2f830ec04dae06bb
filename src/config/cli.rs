//! CLI argument parsing using clap

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExecutionMode {
    /// Standalone mode (default) - coordinator and worker units in one process
    Standalone,
    /// Coordinator mode - drive worker services on other nodes
    Coordinator,
    /// Service mode - run a worker service (accepts coordinator connections)
    Service,
}

/// Gradient channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Gradient {
    Red,
    Green,
    Blue,
}

/// mandelband - distributed Mandelbrot renderer
#[derive(Parser, Debug, Default)]
#[command(name = "mandelband")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Execution mode: standalone, coordinator, or service
    #[arg(long, value_enum, default_value = "standalone")]
    pub mode: ExecutionMode,

    /// Address the worker service listens on (service mode only)
    #[arg(long, default_value = "0.0.0.0:7878")]
    pub listen: String,

    /// Comma-separated worker addresses for coordinator mode (e.g., "10.0.1.10:7878,10.0.1.11")
    #[arg(long)]
    pub host_list: Option<String>,

    /// File containing worker addresses (one per line, for coordinator mode)
    #[arg(long)]
    pub clients_file: Option<PathBuf>,

    /// Port used for worker addresses that do not name one (coordinator mode only)
    #[arg(long, default_value = "7878")]
    pub worker_port: u16,

    /// TOML configuration file; command-line options override its values
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    // === Image ===
    /// Image size as WIDTHxHEIGHT (e.g., 800x800)
    #[arg(short = 's', long)]
    pub size: Option<String>,

    /// Complex-plane window as X_MIN,X_MAX,Y_MIN,Y_MAX (e.g., -2.0,0.47,-1.12,1.12)
    #[arg(short = 'w', long, allow_hyphen_values = true)]
    pub window: Option<String>,

    // === Render ===
    /// Maximum iteration count
    #[arg(short = 'n', long)]
    pub max_iteration: Option<u32>,

    /// Bailout radius
    #[arg(long)]
    pub bailout: Option<f64>,

    /// Maximum channel value (1-255)
    #[arg(long)]
    pub color_depth: Option<u16>,

    /// Channel that carries the smooth gradient
    #[arg(long, value_enum)]
    pub gradient: Option<Gradient>,

    // === Workers ===
    /// Number of worker units (standalone mode)
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Threads per worker unit (default: all CPUs, shared between local units)
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    // === Output ===
    /// Output image path (binary PPM)
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Write a JSON run report to this path
    #[arg(long)]
    pub json_output: Option<PathBuf>,

    // === Runtime ===
    /// Validate and print the configuration, then exit
    #[arg(long)]
    pub dry_run: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Default for ExecutionMode {
    fn default() -> Self {
        Self::Standalone
    }
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate CLI arguments
    ///
    /// Only checks flag combinations; values are validated on the merged
    /// configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.mode == ExecutionMode::Service {
            return Ok(());
        }

        if self.host_list.is_some() && self.clients_file.is_some() {
            anyhow::bail!("--host-list and --clients-file are mutually exclusive");
        }

        match self.mode {
            ExecutionMode::Coordinator => {
                if self.host_list.is_none() && self.clients_file.is_none() {
                    anyhow::bail!("Coordinator mode requires --host-list or --clients-file");
                }
                if self.workers.is_some() {
                    anyhow::bail!("--workers is set by the worker list in coordinator mode");
                }
            }
            ExecutionMode::Standalone => {
                if self.host_list.is_some() || self.clients_file.is_some() {
                    anyhow::bail!("--host-list and --clients-file require --mode coordinator");
                }
            }
            ExecutionMode::Service => {}
        }

        Ok(())
    }
}
