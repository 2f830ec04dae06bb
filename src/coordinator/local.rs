//! In-process worker cluster
//!
//! Runs every worker unit of a job inside this process. Each unit renders on
//! its own rayon pool from a blocking task and hands its band to the
//! coordinator through a dedicated oneshot channel. All units and the
//! coordinator then meet at one `tokio::sync::Barrier` of `workers + 1`
//! participants; a unit only exits after passing it.

use super::assembler::Assembler;
use super::{Assembled, RenderJob};
use crate::partition::partition_rows;
use crate::worker::{BandOutput, WorkerUnit};
use crate::Result;
use anyhow::Context;
use log::{debug, info};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{oneshot, Barrier};
use tokio::task::JoinHandle;

/// Run `job` with one in-process worker unit per band
pub async fn run_local(job: &RenderJob) -> Result<Assembled> {
    let start = Instant::now();
    let assignments = partition_rows(job.grid.height, job.workers)?;
    let mut assembler = Assembler::new(job.grid, assignments.clone())?;

    // Every unit is validated before any of them starts.
    let units = assignments
        .into_iter()
        .map(|a| WorkerUnit::new(a, job.grid, job.window, job.params))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let threads = job.threads_per_unit();
    let barrier = Arc::new(Barrier::new(units.len() + 1));
    let mut receivers = Vec::with_capacity(units.len());
    let mut handles: Vec<JoinHandle<Result<()>>> = Vec::with_capacity(units.len());

    for unit in units {
        let (tx, rx) = oneshot::channel::<Result<BandOutput>>();
        let barrier = Arc::clone(&barrier);
        receivers.push(rx);
        handles.push(tokio::spawn(async move {
            let id = unit.id();
            let output = tokio::task::spawn_blocking(move || unit.render(Some(threads)))
                .await
                .with_context(|| format!("Worker {} render task failed", id))
                .and_then(|r| r);
            let failed = output.is_err();

            if tx.send(output).is_err() {
                anyhow::bail!("Coordinator stopped listening before worker {} finished", id);
            }
            if failed {
                return Ok(());
            }

            barrier.wait().await;
            debug!("Worker {} passed barrier", id);
            Ok(())
        }));
    }

    info!("Started {} worker units ({} threads each)", handles.len(), threads);

    if let Err(e) = collect_bands(&mut assembler, receivers).await {
        for handle in &handles {
            handle.abort();
        }
        return Err(e);
    }

    barrier.wait().await;
    for handle in handles {
        handle.await.context("Worker task panicked")??;
    }

    Ok(assembler.finish(start.elapsed())?)
}

/// Block on each worker's channel in worker order
async fn collect_bands(
    assembler: &mut Assembler,
    receivers: Vec<oneshot::Receiver<Result<BandOutput>>>,
) -> Result<()> {
    for (worker_id, rx) in receivers.into_iter().enumerate() {
        let output = rx
            .await
            .with_context(|| format!("Worker {} exited without sending its band", worker_id))?
            .with_context(|| format!("Worker {} failed", worker_id))?;
        assembler.integrate(output)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fractal::{ComplexPlaneWindow, EscapeParams, ImageGrid};

    fn job(workers: usize) -> RenderJob {
        RenderJob {
            grid: ImageGrid::new(48, 37).unwrap(),
            window: ComplexPlaneWindow::default(),
            params: EscapeParams { max_iteration: 120, bailout: 2.0 },
            workers,
            threads: Some(2),
        }
    }

    #[tokio::test]
    async fn test_local_cluster_collects_every_band() {
        let assembled = run_local(&job(5)).await.unwrap();
        assert_eq!(assembled.samples.len(), 48 * 37);
        assert_eq!(assembled.summary.bands.len(), 5);
        let rows: Vec<usize> = assembled.summary.bands.iter().map(|b| b.row_count).collect();
        assert_eq!(rows, vec![7, 7, 7, 7, 9]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_local_cluster_matches_single_unit() {
        let reference = run_local(&job(1)).await.unwrap();
        let distributed = run_local(&job(4)).await.unwrap();
        assert_eq!(reference.samples, distributed.samples);
    }

    #[tokio::test]
    async fn test_empty_band_rejected_before_start() {
        let mut bad = job(2);
        bad.grid = ImageGrid::new(48, 1).unwrap();
        assert!(run_local(&bad).await.is_err());
    }
}
