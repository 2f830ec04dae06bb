//! Render statistics
//!
//! Each worker unit measures its own band: wall time, interior pixel count and
//! total iterations spent. The numbers travel with the band to the coordinator,
//! which merges them into a [`RenderSummary`] via the [`aggregator`].
//!
//! # Example
//!
//! ```
//! use mandelband::stats::{BandStats, aggregator::StatisticsAggregator};
//!
//! let mut aggregator = StatisticsAggregator::new();
//! aggregator.add_band(BandStats {
//!     worker_id: 0,
//!     start_row: 0,
//!     row_count: 2,
//!     elapsed_ns: 1_000,
//!     interior_pixels: 3,
//!     total_iterations: 40,
//! });
//!
//! let summary = aggregator.summarize(8, 1);
//! assert_eq!(summary.interior_pixels, 3);
//! ```

pub mod aggregator;

use crate::fractal::PixelSample;
use crate::partition::RowBand;
use crate::util::buffer::PixelBuffer;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use aggregator::RenderSummary;

/// Statistics for one rendered band
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandStats {
    pub worker_id: usize,
    pub start_row: usize,
    pub row_count: usize,
    /// Time spent evaluating the band (nanoseconds)
    pub elapsed_ns: u64,
    /// Pixels that reached the iteration cap
    pub interior_pixels: u64,
    /// Sum of iteration counts over the band
    pub total_iterations: u64,
}

impl BandStats {
    /// Measure a finished band buffer
    pub fn measure(
        worker_id: usize,
        band: RowBand,
        buffer: &PixelBuffer<PixelSample>,
        elapsed: Duration,
        max_iteration: u32,
    ) -> Self {
        let mut interior_pixels = 0u64;
        let mut total_iterations = 0u64;
        for sample in buffer.as_slice() {
            if sample.is_interior(max_iteration) {
                interior_pixels += 1;
            }
            total_iterations += sample.iterations as u64;
        }

        Self {
            worker_id,
            start_row: band.start_row,
            row_count: band.row_count,
            elapsed_ns: elapsed.as_nanos() as u64,
            interior_pixels,
            total_iterations,
        }
    }

    #[inline]
    pub fn band(&self) -> RowBand {
        RowBand::new(self.start_row, self.row_count)
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_ns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_counts_interior_and_iterations() {
        let samples = vec![
            PixelSample { iterations: 10, magnitude_squared: 0.5 },
            PixelSample { iterations: 3, magnitude_squared: 5.0 },
            PixelSample { iterations: 10, magnitude_squared: 1.0 },
            PixelSample { iterations: 1, magnitude_squared: 9.0 },
        ];
        let buffer = PixelBuffer::from_vec(2, 2, samples).unwrap();

        let stats = BandStats::measure(3, RowBand::new(4, 2), &buffer, Duration::from_millis(2), 10);
        assert_eq!(stats.worker_id, 3);
        assert_eq!(stats.band(), RowBand::new(4, 2));
        assert_eq!(stats.interior_pixels, 2);
        assert_eq!(stats.total_iterations, 24);
        assert_eq!(stats.elapsed(), Duration::from_millis(2));
    }
}
