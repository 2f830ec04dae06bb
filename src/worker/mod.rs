//! Worker unit implementation
//!
//! A [`WorkerUnit`] owns exactly one [`RowBand`] and produces one dense
//! [`PixelBuffer`] for it. Rows are handed out across a rayon pool and every
//! row is split again across its columns. Each pixel writes its own
//! pre-computed slot, so the buffer needs no locking.
//!
//! # Lifecycle
//!
//! 1. **Creation**: `WorkerUnit::new()` validates the band against the grid
//!    before any iteration work happens
//! 2. **Execution**: `render()` evaluates every pixel of the band
//! 3. **Completion**: returns a [`BandOutput`] that the unit hands to its
//!    transport (channel or socket)
//!
//! # Example
//!
//! ```
//! use mandelband::fractal::{ComplexPlaneWindow, EscapeParams, ImageGrid};
//! use mandelband::partition::{RowBand, WorkAssignment};
//! use mandelband::worker::WorkerUnit;
//!
//! let grid = ImageGrid::new(64, 48)?;
//! let assignment = WorkAssignment { worker_id: 1, band: RowBand::new(16, 16) };
//! let unit = WorkerUnit::new(assignment, grid, ComplexPlaneWindow::default(), EscapeParams::default())?;
//!
//! let output = unit.render(Some(2))?;
//! assert_eq!(output.buffer.len(), 64 * 16);
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::error::RenderError;
use crate::fractal::{evaluate, ComplexPlaneWindow, EscapeParams, ImageGrid, PixelSample};
use crate::partition::{RowBand, WorkAssignment};
use crate::stats::BandStats;
use crate::util::buffer::PixelBuffer;
use crate::Result;
use anyhow::Context;
use log::debug;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::time::Instant;

/// Everything a worker unit hands back to the coordinator
#[derive(Debug, Clone)]
pub struct BandOutput {
    pub worker_id: usize,
    pub band: RowBand,
    /// `width * band.row_count` samples, row-major, band-local rows
    pub buffer: PixelBuffer<PixelSample>,
    pub stats: BandStats,
}

/// Computes one row band of the image
#[derive(Debug, Clone)]
pub struct WorkerUnit {
    assignment: WorkAssignment,
    grid: ImageGrid,
    window: ComplexPlaneWindow,
    params: EscapeParams,
}

impl WorkerUnit {
    /// Create a unit for `assignment`
    ///
    /// Fails with [`RenderError::Configuration`] if the grid, window or
    /// escape parameters are invalid, or if the band is empty or runs past the
    /// bottom of the image.
    pub fn new(
        assignment: WorkAssignment,
        grid: ImageGrid,
        window: ComplexPlaneWindow,
        params: EscapeParams,
    ) -> Result<Self, RenderError> {
        grid.validate()?;
        window.validate()?;
        params.validate()?;
        assignment.band.validate(&grid)?;

        Ok(Self {
            assignment,
            grid,
            window,
            params,
        })
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.assignment.worker_id
    }

    #[inline]
    pub fn band(&self) -> RowBand {
        self.assignment.band
    }

    /// Render the band on a dedicated pool
    ///
    /// `threads` caps the pool size; `None` uses every local CPU.
    pub fn render(&self, threads: Option<usize>) -> Result<BandOutput> {
        let pool = build_pool(self.id(), threads)?;
        Ok(self.render_in(&pool))
    }

    /// Render the band on an existing pool
    pub fn render_in(&self, pool: &ThreadPool) -> BandOutput {
        pool.install(|| self.render_current())
    }

    /// Render the band on whatever rayon pool the caller is running in
    pub fn render_current(&self) -> BandOutput {
        let band = self.band();
        let start = Instant::now();

        let mut buffer = PixelBuffer::new(self.grid.width, band.row_count);
        buffer
            .par_rows_mut()
            .enumerate()
            .for_each(|(local_row, row)| {
                let cy = self.window.row_to_imag(&self.grid, band.start_row + local_row);
                row.par_iter_mut().enumerate().for_each(|(col, slot)| {
                    let cx = self.window.col_to_real(&self.grid, col);
                    *slot = evaluate(cx, cy, &self.params);
                });
            });

        let elapsed = start.elapsed();
        let stats = BandStats::measure(
            self.id(),
            band,
            &buffer,
            elapsed,
            self.params.max_iteration,
        );
        debug!(
            "Worker {} finished {} in {:?} ({} interior pixels)",
            self.id(),
            band,
            elapsed,
            stats.interior_pixels
        );

        BandOutput {
            worker_id: self.id(),
            band,
            buffer,
            stats,
        }
    }
}

/// Build a rayon pool for one worker unit
pub fn build_pool(worker_id: usize, threads: Option<usize>) -> Result<ThreadPool> {
    let threads = threads.unwrap_or_else(num_cpus::get).max(1);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(move |i| format!("band-{}-{}", worker_id, i))
        .build()
        .with_context(|| format!("Failed to build thread pool for worker {}", worker_id))
}
