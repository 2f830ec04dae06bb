//! Distributed coordinator
//!
//! Drives a run across worker services. The coordinator:
//! - Connects to every worker address, in list order (list position = worker id)
//! - Sends each worker its ASSIGN
//! - Receives bands in increasing worker order, checking each payload's size
//!   and band before copying it into the full image
//! - Sends BARRIER to every worker once all bands are integrated, then waits
//!   for every BARRIER_ACK before handing the image back
//!
//! It performs no pixel computation of its own. Any failure aborts the run:
//! every still-open connection is sent an ERROR and the run returns the error.

use crate::coordinator::assembler::Assembler;
use crate::coordinator::{Assembled, RenderJob};
use crate::distributed::protocol::*;
use crate::error::RenderError;
use crate::partition::partition_rows;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::time::Instant;
use tokio::net::TcpStream;

/// Coordinator for distributed runs
pub struct DistributedCoordinator {
    job: RenderJob,
    worker_addrs: Vec<String>,
}

impl DistributedCoordinator {
    /// Create a coordinator for `worker_addrs`
    ///
    /// The job's worker count is replaced by the number of addresses. Every
    /// band must fit in one frame; otherwise this fails with
    /// [`RenderError::Configuration`](crate::error::RenderError) before any
    /// worker is contacted.
    pub fn new(mut job: RenderJob, worker_addrs: Vec<String>) -> Result<Self> {
        if worker_addrs.is_empty() {
            anyhow::bail!("No worker addresses provided");
        }

        job.workers = worker_addrs.len();
        job.validate()?;
        for assignment in partition_rows(job.grid.height, job.workers)? {
            band_payload_len(&assignment.band, &job.grid)?;
        }

        Ok(Self { job, worker_addrs })
    }

    pub fn job(&self) -> &RenderJob {
        &self.job
    }

    /// Run the job to completion
    pub async fn run(&self) -> Result<Assembled> {
        let start = Instant::now();
        let assignments = partition_rows(self.job.grid.height, self.job.workers)?;
        let mut assembler = Assembler::new(self.job.grid, assignments)?;

        let mut streams = self.connect_all().await?;
        info!("Connected to {} worker(s)", streams.len());

        if let Err(e) = self.exchange(&mut streams, &mut assembler).await {
            abort_all(&mut streams, &e).await;
            return Err(e);
        }

        Ok(assembler.finish(start.elapsed())?)
    }

    async fn connect_all(&self) -> Result<Vec<TcpStream>> {
        let mut streams = Vec::with_capacity(self.worker_addrs.len());
        for (worker_id, addr) in self.worker_addrs.iter().enumerate() {
            let stream = TcpStream::connect(addr)
                .await
                .with_context(|| format!("Failed to connect to worker {} at {}", worker_id, addr))?;
            stream.set_nodelay(true).ok();
            debug!("Worker {} connected at {}", worker_id, addr);
            streams.push(stream);
        }
        Ok(streams)
    }

    async fn exchange(&self, streams: &mut [TcpStream], assembler: &mut Assembler) -> Result<()> {
        let assignments = assembler.assignments().to_vec();
        for (assignment, stream) in assignments.iter().zip(streams.iter_mut()) {
            let msg = AssignMessage {
                protocol_version: PROTOCOL_VERSION,
                worker_id: assignment.worker_id,
                num_workers: self.job.workers,
                band: assignment.band,
                grid: self.job.grid,
                window: self.job.window,
                params: self.job.params,
                threads: self.job.threads,
            };
            write_message(stream, &Message::Assign(msg))
                .await
                .with_context(|| format!("Failed to send ASSIGN to worker {}", assignment.worker_id))?;
        }

        for (worker_id, stream) in streams.iter_mut().enumerate() {
            let ready = match read_message(stream).await? {
                Message::BandReady(ready) => ready,
                Message::Error(err) => {
                    anyhow::bail!("Worker {} on {} failed: {}", worker_id, err.node_id, err.error)
                }
                other => anyhow::bail!("Expected BAND_READY from worker {}, got {}", worker_id, other.kind()),
            };
            if ready.worker_id != worker_id {
                anyhow::bail!("Worker {} answered as worker {}", worker_id, ready.worker_id);
            }

            let expected = assembler.expected_bytes(worker_id)?;
            if ready.payload_len != expected as u64 {
                return Err(RenderError::TransferSizeMismatch {
                    worker_id,
                    expected,
                    received: ready.payload_len as usize,
                }
                .into());
            }
            let payload = read_payload(stream, worker_id, expected).await?;
            assembler.integrate_bytes(worker_id, ready.band, &payload, ready.stats)?;
            debug!("Integrated worker {} from {}", worker_id, ready.node_id);
        }

        for stream in streams.iter_mut() {
            write_message(stream, &Message::Barrier).await?;
        }
        for (worker_id, stream) in streams.iter_mut().enumerate() {
            match read_message(stream).await? {
                Message::BarrierAck(ack) if ack.worker_id == worker_id => {}
                Message::BarrierAck(ack) => {
                    anyhow::bail!("Worker {} acknowledged as worker {}", worker_id, ack.worker_id)
                }
                other => anyhow::bail!("Expected BARRIER_ACK from worker {}, got {}", worker_id, other.kind()),
            }
        }
        info!("All {} workers passed the barrier", streams.len());

        Ok(())
    }
}

async fn abort_all(streams: &mut [TcpStream], error: &anyhow::Error) {
    let msg = Message::Error(ErrorMessage {
        node_id: "coordinator".to_string(),
        worker_id: None,
        error: format!("{:#}", error),
    });
    for stream in streams.iter_mut() {
        if let Err(e) = write_message(stream, &msg).await {
            warn!("Failed to notify worker of abort: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::render_samples;
    use crate::distributed::NodeService;
    use crate::fractal::{ComplexPlaneWindow, EscapeParams, ImageGrid};
    use crate::util::buffer::SAMPLE_SIZE;
    use tokio::net::TcpListener;

    fn job() -> RenderJob {
        RenderJob {
            grid: ImageGrid::new(90, 67).unwrap(),
            window: ComplexPlaneWindow::default(),
            params: EscapeParams { max_iteration: 250, bailout: 2.0 },
            workers: 1,
            threads: Some(2),
        }
    }

    async fn start_service() -> String {
        let service = NodeService::bind("127.0.0.1:0", None).await.unwrap();
        let addr = service.local_addr().unwrap();
        tokio::spawn(service.run());
        addr.to_string()
    }

    #[test]
    fn test_new_requires_workers() {
        assert!(DistributedCoordinator::new(job(), Vec::new()).is_err());

        let coordinator =
            DistributedCoordinator::new(job(), vec!["a:1".into(), "b:1".into(), "c:1".into()]).unwrap();
        assert_eq!(coordinator.job().workers, 3);
    }

    #[test]
    fn test_new_rejects_band_larger_than_frame() {
        let mut big = job();
        big.grid = ImageGrid::new(8192, 8192).unwrap();

        let err = DistributedCoordinator::new(big.clone(), vec!["a:1".into()])
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<RenderError>(),
            Some(RenderError::Configuration(_))
        ));

        // Split across two workers every band fits
        assert!(DistributedCoordinator::new(big, vec!["a:1".into(), "b:1".into()]).is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_loopback_run_matches_local_reference() {
        let first = start_service().await;
        let second = start_service().await;
        // Two units share the first service.
        let addrs = vec![first.clone(), second, first];

        let coordinator = DistributedCoordinator::new(job(), addrs).unwrap();
        let assembled = coordinator.run().await.unwrap();

        let reference = render_samples(&job()).await.unwrap();
        assert_eq!(assembled.samples, reference.samples);
        assert_eq!(assembled.summary.bands.len(), 3);
        assert_eq!(assembled.summary.total_pixels, 90 * 67);
    }

    #[tokio::test]
    async fn test_short_payload_aborts_run() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        // Fake worker that announces the right size, then sends one sample too few.
        let fake = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let assign = match read_message(&mut stream).await.unwrap() {
                Message::Assign(a) => a,
                other => panic!("Wrong message type: {}", other.kind()),
            };
            let unit = crate::worker::WorkerUnit::new(
                assign.assignment(),
                assign.grid,
                assign.window,
                assign.params,
            )
            .unwrap();
            let output = unit.render(Some(1)).unwrap();
            let mut payload = output.buffer.to_bytes();
            payload.truncate(payload.len() - SAMPLE_SIZE);

            let ready = BandReadyMessage {
                worker_id: assign.worker_id,
                node_id: "fake".to_string(),
                band: output.band,
                payload_len: output.buffer.encoded_len() as u64,
                stats: output.stats,
            };
            write_message(&mut stream, &Message::BandReady(ready)).await.unwrap();
            write_payload(&mut stream, &payload).await.unwrap();

            read_message(&mut stream).await.unwrap()
        });

        let coordinator = DistributedCoordinator::new(job(), vec![addr]).unwrap();
        let err = coordinator.run().await.unwrap_err();
        let expected = 90 * 67 * SAMPLE_SIZE;
        assert_eq!(
            err.downcast_ref::<RenderError>(),
            Some(&RenderError::TransferSizeMismatch {
                worker_id: 0,
                expected,
                received: expected - SAMPLE_SIZE,
            })
        );

        assert!(matches!(fake.await.unwrap(), Message::Error(_)));
    }

    #[tokio::test]
    async fn test_wrong_announced_length_aborts_run() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        // Fake worker whose BAND_READY overstates the band size.
        let fake = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let assign = match read_message(&mut stream).await.unwrap() {
                Message::Assign(a) => a,
                other => panic!("Wrong message type: {}", other.kind()),
            };
            let unit = crate::worker::WorkerUnit::new(
                assign.assignment(),
                assign.grid,
                assign.window,
                assign.params,
            )
            .unwrap();
            let output = unit.render(Some(1)).unwrap();
            let payload_len = output.buffer.encoded_len() as u64 + 1;

            // The coordinator rejects the announcement before any payload frame.
            let ready = BandReadyMessage {
                worker_id: assign.worker_id,
                node_id: "fake".to_string(),
                band: output.band,
                payload_len,
                stats: output.stats,
            };
            write_message(&mut stream, &Message::BandReady(ready)).await.unwrap();

            read_message(&mut stream).await.unwrap()
        });

        let coordinator = DistributedCoordinator::new(job(), vec![addr]).unwrap();
        let err = coordinator.run().await.unwrap_err();
        let expected = 90 * 67 * SAMPLE_SIZE;
        assert_eq!(
            err.downcast_ref::<RenderError>(),
            Some(&RenderError::TransferSizeMismatch {
                worker_id: 0,
                expected,
                received: expected + 1,
            })
        );

        assert!(matches!(fake.await.unwrap(), Message::Error(_)));
    }

    #[tokio::test]
    async fn test_unreachable_worker_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let coordinator = DistributedCoordinator::new(job(), vec![addr]).unwrap();
        assert!(coordinator.run().await.is_err());
    }
}
