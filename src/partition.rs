//! Row-band partitioning
//!
//! Splits the image rows `[0, height)` into one contiguous band per worker.
//! Every band gets `floor(height / workers)` rows except the last, which also
//! absorbs the remainder, so coverage is exact with no overlap and no gap.

use crate::error::RenderError;
use crate::fractal::ImageGrid;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Contiguous half-open range of image rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowBand {
    pub start_row: usize,
    pub row_count: usize,
}

impl RowBand {
    pub fn new(start_row: usize, row_count: usize) -> Self {
        Self { start_row, row_count }
    }

    /// One past the last row of the band
    #[inline]
    pub fn end_row(&self) -> usize {
        self.start_row + self.row_count
    }

    #[inline]
    pub fn rows(&self) -> Range<usize> {
        self.start_row..self.end_row()
    }

    /// Number of samples a buffer for this band holds
    #[inline]
    pub fn sample_count(&self, grid: &ImageGrid) -> usize {
        grid.width * self.row_count
    }

    /// Offset of the band's first sample in the full-image buffer
    #[inline]
    pub fn offset(&self, grid: &ImageGrid) -> usize {
        self.start_row * grid.width
    }

    /// Reject empty bands and bands that run past the bottom of the image
    pub fn validate(&self, grid: &ImageGrid) -> Result<(), RenderError> {
        if self.row_count == 0 {
            return Err(RenderError::Configuration(format!("band {} has no rows", self)));
        }
        if self.end_row() > grid.height {
            return Err(RenderError::Configuration(format!(
                "band {} exceeds image height {}",
                self, grid.height
            )));
        }
        Ok(())
    }
}

impl fmt::Display for RowBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rows {}..{}", self.start_row, self.end_row())
    }
}

/// Binds one worker identity to its band for the duration of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkAssignment {
    pub worker_id: usize,
    pub band: RowBand,
}

/// Partition `height` rows across `workers` bands
///
/// Bands are returned in worker order, which is also row order. When
/// `height < workers` the leading bands are empty; callers that hand bands to
/// worker units must reject that configuration up front.
pub fn partition_rows(height: usize, workers: usize) -> Result<Vec<WorkAssignment>, RenderError> {
    if workers == 0 {
        return Err(RenderError::Configuration(
            "worker count must be at least 1".to_string(),
        ));
    }

    let rows_per_band = height / workers;
    let assignments = (0..workers)
        .map(|worker_id| {
            let start_row = worker_id * rows_per_band;
            let row_count = if worker_id == workers - 1 {
                height - start_row
            } else {
                rows_per_band
            };
            WorkAssignment {
                worker_id,
                band: RowBand::new(start_row, row_count),
            }
        })
        .collect();

    Ok(assignments)
}
