//! Statistics aggregation
//!
//! Collects per-band statistics keyed by worker id and merges them into a
//! single [`RenderSummary`]. Bands are always reported in worker order,
//! whatever order they arrived in.

use super::BandStats;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Aggregate view of one render
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSummary {
    /// Per-band statistics in worker order
    pub bands: Vec<BandStats>,
    pub total_pixels: u64,
    pub interior_pixels: u64,
    pub total_iterations: u64,
    /// Coordinator wall time from assignment to final barrier (nanoseconds)
    pub wall_time_ns: u64,
}

impl RenderSummary {
    pub fn wall_time(&self) -> Duration {
        Duration::from_nanos(self.wall_time_ns)
    }

    /// Band with the longest evaluation time
    pub fn slowest_band(&self) -> Option<&BandStats> {
        self.bands.iter().max_by_key(|b| b.elapsed_ns)
    }

    /// Mean band evaluation time
    pub fn mean_band_time(&self) -> Duration {
        if self.bands.is_empty() {
            return Duration::ZERO;
        }
        let total: u64 = self.bands.iter().map(|b| b.elapsed_ns).sum();
        Duration::from_nanos(total / self.bands.len() as u64)
    }

    /// Slowest band time divided by mean band time (1.0 = perfectly balanced)
    pub fn imbalance(&self) -> f64 {
        let mean = self.mean_band_time().as_nanos() as f64;
        match self.slowest_band() {
            Some(slowest) if mean > 0.0 => slowest.elapsed_ns as f64 / mean,
            _ => 1.0,
        }
    }

    /// Fraction of pixels inside the set
    pub fn interior_fraction(&self) -> f64 {
        if self.total_pixels == 0 {
            0.0
        } else {
            self.interior_pixels as f64 / self.total_pixels as f64
        }
    }
}

/// Collects band statistics from workers
#[derive(Debug, Default)]
pub struct StatisticsAggregator {
    bands: BTreeMap<usize, BandStats>,
}

impl StatisticsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a band's statistics, replacing any earlier entry for the same worker
    pub fn add_band(&mut self, stats: BandStats) {
        self.bands.insert(stats.worker_id, stats);
    }

    pub fn num_bands(&self) -> usize {
        self.bands.len()
    }

    pub fn band(&self, worker_id: usize) -> Option<&BandStats> {
        self.bands.get(&worker_id)
    }

    /// Merge everything collected so far
    ///
    /// `image_width` converts band rows to pixels; `wall_time_ns` is the
    /// coordinator's own measurement of the run.
    pub fn summarize(&self, image_width: usize, wall_time_ns: u64) -> RenderSummary {
        let bands: Vec<BandStats> = self.bands.values().cloned().collect();
        let total_pixels = bands
            .iter()
            .map(|b| (b.row_count * image_width) as u64)
            .sum();

        RenderSummary {
            total_pixels,
            interior_pixels: bands.iter().map(|b| b.interior_pixels).sum(),
            total_iterations: bands.iter().map(|b| b.total_iterations).sum(),
            wall_time_ns,
            bands,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band(worker_id: usize, start_row: usize, elapsed_ns: u64) -> BandStats {
        BandStats {
            worker_id,
            start_row,
            row_count: 10,
            elapsed_ns,
            interior_pixels: 5,
            total_iterations: 100,
        }
    }

    #[test]
    fn test_summary_is_in_worker_order() {
        let mut aggregator = StatisticsAggregator::new();
        aggregator.add_band(band(2, 20, 300));
        aggregator.add_band(band(0, 0, 100));
        aggregator.add_band(band(1, 10, 200));

        let summary = aggregator.summarize(4, 1_000);
        let ids: Vec<usize> = summary.bands.iter().map(|b| b.worker_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(summary.total_pixels, 120);
        assert_eq!(summary.interior_pixels, 15);
        assert_eq!(summary.total_iterations, 300);
        assert_eq!(summary.wall_time(), Duration::from_nanos(1_000));
    }

    #[test]
    fn test_imbalance() {
        let mut aggregator = StatisticsAggregator::new();
        aggregator.add_band(band(0, 0, 100));
        aggregator.add_band(band(1, 10, 300));

        let summary = aggregator.summarize(4, 0);
        assert_eq!(summary.slowest_band().unwrap().worker_id, 1);
        assert_eq!(summary.mean_band_time(), Duration::from_nanos(200));
        assert!((summary.imbalance() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_empty_summary() {
        let summary = StatisticsAggregator::new().summarize(4, 0);
        assert!(summary.slowest_band().is_none());
        assert_eq!(summary.imbalance(), 1.0);
        assert_eq!(summary.interior_fraction(), 0.0);
    }

    #[test]
    fn test_replacing_band() {
        let mut aggregator = StatisticsAggregator::new();
        aggregator.add_band(band(0, 0, 100));
        aggregator.add_band(band(0, 0, 500));
        assert_eq!(aggregator.num_bands(), 1);
        assert_eq!(aggregator.band(0).unwrap().elapsed_ns, 500);
    }
}
