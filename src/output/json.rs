//! JSON run report
//!
//! One file per run: when it finished, what was rendered, and how the work
//! was spread across the worker units.

use crate::config::Config;
use crate::stats::{BandStats, RenderSummary};
use crate::util::time::{format_duration, format_pixel_rate, rate_per_sec};
use crate::Result;
use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

/// Duration with both nanoseconds and human-readable format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonDuration {
    pub nanos: u64,
    pub human: String,
}

impl JsonDuration {
    pub fn from_nanos(nanos: u64) -> Self {
        Self {
            nanos,
            human: format_duration(Duration::from_nanos(nanos)),
        }
    }
}

/// One band in the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonBand {
    pub worker_id: usize,
    pub start_row: usize,
    pub row_count: usize,
    pub elapsed: JsonDuration,
    pub interior_pixels: u64,
    pub total_iterations: u64,
}

impl From<&BandStats> for JsonBand {
    fn from(stats: &BandStats) -> Self {
        Self {
            worker_id: stats.worker_id,
            start_row: stats.start_row,
            row_count: stats.row_count,
            elapsed: JsonDuration::from_nanos(stats.elapsed_ns),
            interior_pixels: stats.interior_pixels,
            total_iterations: stats.total_iterations,
        }
    }
}

/// Run-level totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonSummary {
    pub wall_time: JsonDuration,
    pub total_pixels: u64,
    pub interior_pixels: u64,
    pub total_iterations: u64,
    pub pixel_rate: String,
    /// Slowest band time over mean band time
    pub imbalance: f64,
}

/// Complete run report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderReport {
    /// RFC 3339 UTC time the report was built
    pub timestamp: String,
    pub version: String,
    pub mode: String,
    pub config: Config,
    pub summary: JsonSummary,
    pub bands: Vec<JsonBand>,
}

impl RenderReport {
    pub fn new(config: &Config, mode: &str, summary: &RenderSummary) -> Self {
        let rate = rate_per_sec(summary.total_pixels, summary.wall_time());
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            version: env!("CARGO_PKG_VERSION").to_string(),
            mode: mode.to_string(),
            config: config.clone(),
            summary: JsonSummary {
                wall_time: JsonDuration::from_nanos(summary.wall_time_ns),
                total_pixels: summary.total_pixels,
                interior_pixels: summary.interior_pixels,
                total_iterations: summary.total_iterations,
                pixel_rate: format_pixel_rate(rate),
                imbalance: summary.imbalance(),
            },
            bands: summary.bands.iter().map(JsonBand::from).collect(),
        }
    }
}

/// Write the report to `output_path`
pub fn write_json_output(output_path: &Path, report: &RenderReport) -> Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("Failed to create JSON report: {}", output_path.display()))?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)
        .with_context(|| format!("Failed to write JSON report: {}", output_path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to flush JSON report: {}", output_path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::aggregator::StatisticsAggregator;

    fn summary() -> RenderSummary {
        let mut aggregator = StatisticsAggregator::new();
        for (worker_id, elapsed_ns) in [(0usize, 2_000_000u64), (1, 6_000_000)] {
            aggregator.add_band(BandStats {
                worker_id,
                start_row: worker_id * 4,
                row_count: 4,
                elapsed_ns,
                interior_pixels: 10,
                total_iterations: 500,
            });
        }
        aggregator.summarize(8, 10_000_000)
    }

    #[test]
    fn test_report_contents() {
        let report = RenderReport::new(&Config::default(), "standalone", &summary());
        assert_eq!(report.mode, "standalone");
        assert_eq!(report.bands.len(), 2);
        assert_eq!(report.bands[1].elapsed.human, "6.00ms");
        assert_eq!(report.summary.total_pixels, 64);
        assert!((report.summary.imbalance - 1.5).abs() < 1e-12);
        assert!(report.timestamp.ends_with('Z'));
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let report = RenderReport::new(&Config::default(), "coordinator", &summary());
        write_json_output(&path, &report).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["mode"], "coordinator");
        assert_eq!(value["config"]["image"]["width"], 800);
        assert_eq!(value["bands"][0]["worker_id"], 0);

        let parsed: RenderReport = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.bands, report.bands);
        assert_eq!(parsed.timestamp, report.timestamp);
    }
}
