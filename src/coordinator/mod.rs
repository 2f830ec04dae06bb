//! Coordinator module
//!
//! Partitions the image, drives the worker units and reassembles their bands
//! into one full-image buffer. [`assemble`] is the core entry point: it takes
//! a [`RenderJob`] and a coloring policy and returns the finished RGB buffer.
//!
//! With more than one worker the coordinator only reassembles; all pixel work
//! happens in the worker units (see [`local`] for the in-process cluster and
//! [`crate::distributed`] for the networked one). With exactly one worker the
//! coordinator renders the single band itself.

pub mod assembler;
pub mod local;

use crate::config::Config;
use crate::error::RenderError;
use crate::fractal::color::{ColorPolicy, Rgb};
use crate::fractal::{ComplexPlaneWindow, EscapeParams, ImageGrid, PixelSample};
use crate::partition::partition_rows;
use crate::stats::RenderSummary;
use crate::util::buffer::PixelBuffer;
use crate::worker::WorkerUnit;
use crate::Result;
use anyhow::Context;
use assembler::Assembler;
use log::info;
use std::time::Instant;

/// One complete render request
#[derive(Debug, Clone, PartialEq)]
pub struct RenderJob {
    pub grid: ImageGrid,
    pub window: ComplexPlaneWindow,
    pub params: EscapeParams,
    /// Number of worker units (bands)
    pub workers: usize,
    /// Rayon threads per unit; `None` shares the local CPUs between units
    pub threads: Option<usize>,
}

impl RenderJob {
    pub fn from_config(config: &Config) -> Self {
        Self {
            grid: ImageGrid {
                width: config.image.width,
                height: config.image.height,
            },
            window: ComplexPlaneWindow {
                x_min: config.window.x_min,
                x_max: config.window.x_max,
                y_min: config.window.y_min,
                y_max: config.window.y_max,
            },
            params: EscapeParams {
                max_iteration: config.render.max_iteration,
                bailout: config.render.bailout,
            },
            workers: config.workers.count,
            threads: config.workers.threads,
        }
    }

    /// Check everything a unit would reject, before any unit starts
    pub fn validate(&self) -> Result<(), RenderError> {
        self.grid.validate()?;
        self.window.validate()?;
        self.params.validate()?;
        if self.workers == 0 {
            return Err(RenderError::Configuration(
                "worker count must be at least 1".to_string(),
            ));
        }
        if self.workers > self.grid.height {
            return Err(RenderError::Configuration(format!(
                "{} workers cannot share {} rows (every band needs at least one row)",
                self.workers, self.grid.height
            )));
        }
        if self.threads == Some(0) {
            return Err(RenderError::Configuration(
                "threads per worker must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Rayon threads each in-process unit gets
    pub fn threads_per_unit(&self) -> usize {
        self.threads
            .unwrap_or_else(|| num_cpus::get() / self.workers.max(1))
            .max(1)
    }
}

/// Full-image samples plus the statistics gathered while producing them
#[derive(Debug, Clone)]
pub struct Assembled {
    pub samples: PixelBuffer<PixelSample>,
    pub summary: RenderSummary,
}

impl Assembled {
    pub fn colorize<C: ColorPolicy + ?Sized>(&self, color: &C) -> PixelBuffer<Rgb> {
        self.samples.colorize(color)
    }
}

/// Render and reassemble the full sample buffer in this process
pub async fn render_samples(job: &RenderJob) -> Result<Assembled> {
    job.validate()?;
    info!(
        "Rendering {} over {} with {} worker unit(s)",
        job.grid, job.window, job.workers
    );

    if job.workers == 1 {
        return render_single(job).await;
    }
    local::run_local(job).await
}

/// Render the whole image and color it
pub async fn assemble<C: ColorPolicy + ?Sized>(job: &RenderJob, color: &C) -> Result<PixelBuffer<Rgb>> {
    let assembled = render_samples(job).await?;
    Ok(assembled.colorize(color))
}

/// Single-unit path: the coordinator is also the only worker
async fn render_single(job: &RenderJob) -> Result<Assembled> {
    let start = Instant::now();
    let assignments = partition_rows(job.grid.height, 1)?;
    let mut assembler = Assembler::new(job.grid, assignments.clone())?;
    let unit = WorkerUnit::new(assignments[0], job.grid, job.window, job.params)?;

    let threads = job.threads.unwrap_or_else(num_cpus::get);
    let output = tokio::task::spawn_blocking(move || unit.render(Some(threads)))
        .await
        .context("Render task failed")??;
    assembler.integrate(output)?;

    Ok(assembler.finish(start.elapsed())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fractal::color::{GradientChannel, SmoothGradient};

    fn boundary_job(workers: usize) -> RenderJob {
        RenderJob {
            grid: ImageGrid::new(800, 800).unwrap(),
            window: ComplexPlaneWindow::new(-2.0, 0.47, -1.12, 1.12).unwrap(),
            params: EscapeParams { max_iteration: 1000, bailout: 2.0 },
            workers,
            threads: None,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_boundary_scenario() {
        let reference = render_samples(&boundary_job(1)).await.unwrap();
        let assembled = render_samples(&boundary_job(4)).await.unwrap();

        assert_eq!(assembled.samples.len(), 800 * 800);
        assert_eq!(assembled.samples.get(0, 0), reference.samples.get(0, 0));
        assert_eq!(assembled.samples.get(799, 799), reference.samples.get(799, 799));
        assert_eq!(assembled.samples.get(400, 400).iterations, 1000);
        assert_eq!(assembled.samples, reference.samples);
        assert_eq!(assembled.summary.bands.len(), 4);
    }

    #[tokio::test]
    async fn test_repeated_runs_are_byte_identical() {
        let mut job = boundary_job(3);
        job.grid = ImageGrid::new(120, 90).unwrap();
        job.params.max_iteration = 300;

        let color = SmoothGradient::new(GradientChannel::Red, 300, 255);
        let first = assemble(&job, &color).await.unwrap();
        let second = assemble(&job, &color).await.unwrap();
        assert_eq!(first.to_rgb_bytes(), second.to_rgb_bytes());
    }

    #[tokio::test]
    async fn test_single_worker_matches_direct_unit() {
        let mut job = boundary_job(1);
        job.grid = ImageGrid::new(64, 40).unwrap();
        job.params.max_iteration = 200;
        job.threads = Some(3);

        let assembled = render_samples(&job).await.unwrap();
        let unit = WorkerUnit::new(
            partition_rows(40, 1).unwrap()[0],
            job.grid,
            job.window,
            job.params,
        )
        .unwrap();
        assert_eq!(assembled.samples, unit.render(Some(1)).unwrap().buffer);
        assert_eq!(assembled.summary.bands.len(), 1);
    }

    #[tokio::test]
    async fn test_assemble_applies_color_policy() {
        let mut job = boundary_job(2);
        job.grid = ImageGrid::new(16, 8).unwrap();
        job.params.max_iteration = 50;

        let rgb = assemble(&job, &|s: &PixelSample| [0, 0, (s.iterations % 256) as u8])
            .await
            .unwrap();
        assert_eq!(rgb.len(), 128);
        assert!(rgb.as_slice().iter().all(|px| px[0] == 0 && px[1] == 0));
    }

    #[test]
    fn test_job_validation() {
        let mut job = boundary_job(4);
        assert!(job.validate().is_ok());

        job.workers = 801;
        assert!(job.validate().is_err());
        job.workers = 0;
        assert!(job.validate().is_err());
        job.workers = 4;

        job.threads = Some(0);
        assert!(job.validate().is_err());
        job.threads = None;

        job.params.bailout = f64::NAN;
        assert!(job.validate().is_err());
        job.params.bailout = 2.0;

        job.window.x_max = job.window.x_min;
        assert!(matches!(job.validate(), Err(RenderError::Configuration(_))));
    }

    #[test]
    fn test_from_config_uses_defaults() {
        let job = RenderJob::from_config(&Config::default());
        assert_eq!(job, boundary_job(4));
    }
}
