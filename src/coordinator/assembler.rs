//! Full-image reassembly
//!
//! The [`Assembler`] owns the full `width * height` sample buffer and the
//! table of assignments for a run. Every band is checked against its worker's
//! assignment before it is copied to `band.start_row * width`, and a band can
//! only be integrated once. Arrival order does not matter to the result.

use super::Assembled;
use crate::error::RenderError;
use crate::fractal::{ImageGrid, PixelSample};
use crate::partition::{RowBand, WorkAssignment};
use crate::stats::aggregator::StatisticsAggregator;
use crate::stats::BandStats;
use crate::util::buffer::{PixelBuffer, SAMPLE_SIZE};
use crate::worker::BandOutput;
use log::debug;
use std::time::Duration;

/// Collects worker bands into one full-image buffer
#[derive(Debug)]
pub struct Assembler {
    grid: ImageGrid,
    assignments: Vec<WorkAssignment>,
    received: Vec<bool>,
    buffer: PixelBuffer<PixelSample>,
    stats: StatisticsAggregator,
}

impl Assembler {
    /// Allocate the full buffer for `assignments`
    ///
    /// Assignments must be in worker order and their bands must cover
    /// `[0, height)` exactly, each with at least one row.
    pub fn new(grid: ImageGrid, assignments: Vec<WorkAssignment>) -> Result<Self, RenderError> {
        grid.validate()?;
        if assignments.is_empty() {
            return Err(RenderError::Configuration("no worker assignments".to_string()));
        }

        let mut next_row = 0;
        for (i, assignment) in assignments.iter().enumerate() {
            if assignment.worker_id != i {
                return Err(RenderError::Configuration(format!(
                    "assignment {} has worker id {}",
                    i, assignment.worker_id
                )));
            }
            assignment.band.validate(&grid)?;
            if assignment.band.start_row != next_row {
                return Err(RenderError::Configuration(format!(
                    "worker {} band {} does not start at row {}",
                    i, assignment.band, next_row
                )));
            }
            next_row = assignment.band.end_row();
        }
        if next_row != grid.height {
            return Err(RenderError::Configuration(format!(
                "bands cover {} of {} rows",
                next_row, grid.height
            )));
        }

        Ok(Self {
            grid,
            received: vec![false; assignments.len()],
            assignments,
            buffer: PixelBuffer::new(grid.width, grid.height),
            stats: StatisticsAggregator::new(),
        })
    }

    pub fn assignments(&self) -> &[WorkAssignment] {
        &self.assignments
    }

    /// The band assigned to `worker_id`
    pub fn band(&self, worker_id: usize) -> Result<RowBand, RenderError> {
        self.assignments
            .get(worker_id)
            .map(|a| a.band)
            .ok_or_else(|| RenderError::Configuration(format!("unknown worker id {}", worker_id)))
    }

    /// Exact payload size expected from `worker_id`
    pub fn expected_bytes(&self, worker_id: usize) -> Result<usize, RenderError> {
        Ok(self.band(worker_id)?.sample_count(&self.grid) * SAMPLE_SIZE)
    }

    /// Copy a worker's band into place
    pub fn integrate(&mut self, output: BandOutput) -> Result<(), RenderError> {
        let worker_id = output.worker_id;
        let expected = self.band(worker_id)?;
        if output.band != expected {
            return Err(RenderError::BandMismatch {
                worker_id,
                expected,
                received: output.band,
            });
        }
        if self.received[worker_id] {
            return Err(RenderError::DuplicateBand(worker_id));
        }
        if output.buffer.width() != self.grid.width || output.buffer.rows() != expected.row_count {
            return Err(RenderError::TransferSizeMismatch {
                worker_id,
                expected: expected.sample_count(&self.grid) * SAMPLE_SIZE,
                received: output.buffer.encoded_len(),
            });
        }

        self.buffer.copy_band_at(expected.offset(&self.grid), &output.buffer)?;
        self.received[worker_id] = true;
        self.stats.add_band(output.stats);
        debug!("Integrated worker {} ({})", worker_id, expected);
        Ok(())
    }

    /// Decode a transferred payload and integrate it
    ///
    /// The payload length is checked against [`expected_bytes`](Self::expected_bytes)
    /// before decoding.
    pub fn integrate_bytes(
        &mut self,
        worker_id: usize,
        band: RowBand,
        payload: &[u8],
        stats: BandStats,
    ) -> Result<(), RenderError> {
        let expected = self.band(worker_id)?;
        if band != expected {
            return Err(RenderError::BandMismatch {
                worker_id,
                expected,
                received: band,
            });
        }

        let buffer = PixelBuffer::from_bytes(worker_id, self.grid.width, expected.row_count, payload)?;
        self.integrate(BandOutput {
            worker_id,
            band,
            buffer,
            stats,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.received.iter().all(|r| *r)
    }

    /// Worker ids whose bands have not arrived yet
    pub fn pending(&self) -> Vec<usize> {
        self.received
            .iter()
            .enumerate()
            .filter(|(_, r)| !**r)
            .map(|(id, _)| id)
            .collect()
    }

    /// Hand over the full buffer once every band is in
    pub fn finish(self, wall_time: Duration) -> Result<Assembled, RenderError> {
        if let Some(&missing) = self.pending().first() {
            return Err(RenderError::MissingBand(missing));
        }

        let summary = self.stats.summarize(self.grid.width, wall_time.as_nanos() as u64);
        Ok(Assembled {
            samples: self.buffer,
            summary,
        })
    }
}
