//! Worker service for distributed mode
//!
//! Runs on each worker node. Every coordinator connection is one worker unit:
//! - Receives an ASSIGN with its band and the job geometry
//! - Validates the band before doing any work
//! - Evaluates the band on a local rayon pool
//! - Sends BAND_READY followed by the raw band payload
//! - Waits for the coordinator's BARRIER and acknowledges it before exiting
//!
//! Connections are served on their own tasks, so one service can host
//! several units of the same run.

use crate::distributed::protocol::*;
use crate::worker::WorkerUnit;
use anyhow::{Context, Result};
use log::{debug, error, info};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};

/// Worker node service
pub struct NodeService {
    listener: TcpListener,
    node_id: Arc<String>,
    /// Overrides the coordinator's per-unit thread count when set
    threads: Option<usize>,
}

impl NodeService {
    /// Bind the service to `addr`
    pub async fn bind<A: ToSocketAddrs>(addr: A, threads: Option<usize>) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .context("Failed to bind worker service")?;

        Ok(Self {
            listener,
            node_id: Arc::new(get_node_id()),
            threads,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Failed to read listen address")
    }

    /// Accept coordinator connections until the process is stopped
    pub async fn run(self) -> Result<()> {
        info!(
            "Worker service {} listening on {}",
            self.node_id,
            self.local_addr()?
        );

        loop {
            let (stream, addr) = self
                .listener
                .accept()
                .await
                .context("Failed to accept connection")?;
            debug!("Coordinator connected from {}", addr);

            let node_id = Arc::clone(&self.node_id);
            let threads = self.threads;
            tokio::spawn(async move {
                if let Err(e) = handle_unit(stream, &node_id, threads).await {
                    error!("Worker unit for {} failed: {:#}", addr, e);
                }
            });
        }
    }
}

/// Serve one worker unit over `stream`
async fn handle_unit(mut stream: TcpStream, node_id: &str, threads: Option<usize>) -> Result<()> {
    let assign = match read_message(&mut stream).await? {
        Message::Assign(assign) => assign,
        other => {
            let msg = format!("Expected ASSIGN, got {}", other.kind());
            send_error(&mut stream, node_id, None, &msg).await;
            anyhow::bail!(msg);
        }
    };
    let worker_id = assign.worker_id;

    if let Err(e) = check_version(assign.protocol_version) {
        send_error(&mut stream, node_id, Some(worker_id), &e.to_string()).await;
        return Err(e.into());
    }

    let checked = WorkerUnit::new(assign.assignment(), assign.grid, assign.window, assign.params)
        .and_then(|unit| Ok((unit, band_payload_len(&assign.band, &assign.grid)?)));
    let (unit, payload_len) = match checked {
        Ok(checked) => checked,
        Err(e) => {
            send_error(&mut stream, node_id, Some(worker_id), &e.to_string()).await;
            return Err(e.into());
        }
    };
    info!(
        "Worker {}/{}: {} of {}",
        worker_id, assign.num_workers, assign.band, assign.grid
    );

    let threads = threads.or(assign.threads);
    let rendered = tokio::task::spawn_blocking(move || unit.render(threads))
        .await
        .context("Render task failed")
        .and_then(|r| r);
    let output = match rendered {
        Ok(output) => output,
        Err(e) => {
            send_error(&mut stream, node_id, Some(worker_id), &format!("{:#}", e)).await;
            return Err(e);
        }
    };

    let payload = output.buffer.to_bytes();
    let ready = BandReadyMessage {
        worker_id,
        node_id: node_id.to_string(),
        band: output.band,
        payload_len: payload_len as u64,
        stats: output.stats,
    };
    write_message(&mut stream, &Message::BandReady(ready)).await?;
    write_payload(&mut stream, &payload).await?;
    debug!("Worker {} sent {} bytes", worker_id, payload.len());

    match read_message(&mut stream).await? {
        Message::Barrier => {}
        Message::Error(err) => {
            anyhow::bail!("Coordinator aborted the run: {}", err.error);
        }
        other => anyhow::bail!("Expected BARRIER, got {}", other.kind()),
    }

    let ack = BarrierAckMessage {
        worker_id,
        node_id: node_id.to_string(),
    };
    write_message(&mut stream, &Message::BarrierAck(ack)).await?;
    info!("Worker {} passed barrier", worker_id);

    Ok(())
}

/// Best-effort error report; the connection is dropped right after
async fn send_error(stream: &mut TcpStream, node_id: &str, worker_id: Option<usize>, error: &str) {
    let msg = Message::Error(ErrorMessage {
        node_id: node_id.to_string(),
        worker_id,
        error: error.to_string(),
    });
    if let Err(e) = write_message(stream, &msg).await {
        debug!("Could not report error to coordinator: {:#}", e);
    }
}

fn get_node_id() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}
