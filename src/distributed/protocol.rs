//! Distributed mode protocol
//!
//! Messages exchanged between the coordinator and worker services. Control
//! messages are serialized with MessagePack (rmp-serde); a band's samples
//! travel as a separate raw frame right after its `BandReady` message, so the
//! coordinator can check the announced size against the size it expects before
//! allocating anything.
//!
//! # Protocol Version
//!
//! Current version: 1
//!
//! # Message Flow
//!
//! ```text
//! Coordinator                     Worker Service
//!     |                              |
//!     |-------- ASSIGN ------------->|
//!     |                              |  (evaluate band)
//!     |<------- BAND_READY ----------|
//!     |<------- [payload frame] -----|
//!     |                              |
//!     |     ... every worker ...     |
//!     |                              |
//!     |-------- BARRIER ------------>|
//!     |<------- BARRIER_ACK ---------|
//! ```
//!
//! # Message Framing
//!
//! Every frame is prefixed with a 4-byte length field (little-endian u32):
//!
//! ```text
//! [4 bytes: frame length][N bytes: MessagePack message or raw band samples]
//! ```

use crate::error::RenderError;
use crate::fractal::{ComplexPlaneWindow, EscapeParams, ImageGrid};
use crate::partition::{RowBand, WorkAssignment};
use crate::stats::BandStats;
use crate::util::buffer::SAMPLE_SIZE;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Protocol version
///
/// Coordinator and worker services must agree on it exactly.
pub const PROTOCOL_VERSION: u32 = 1;

/// Largest frame either side will accept (512 MiB)
pub const MAX_FRAME_BYTES: usize = 512 * 1024 * 1024;

/// Band assignment (Coordinator → Worker)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignMessage {
    pub protocol_version: u32,
    pub worker_id: usize,
    pub num_workers: usize,
    pub band: RowBand,
    pub grid: ImageGrid,
    pub window: ComplexPlaneWindow,
    pub params: EscapeParams,
    /// Rayon threads for this unit; `None` uses every CPU on the node
    pub threads: Option<usize>,
}

impl AssignMessage {
    pub fn assignment(&self) -> WorkAssignment {
        WorkAssignment {
            worker_id: self.worker_id,
            band: self.band,
        }
    }
}

/// Band finished (Worker → Coordinator)
///
/// Followed immediately by one payload frame of `payload_len` bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandReadyMessage {
    pub worker_id: usize,
    pub node_id: String,
    pub band: RowBand,
    pub payload_len: u64,
    pub stats: BandStats,
}

/// Barrier acknowledgement (Worker → Coordinator)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarrierAckMessage {
    pub worker_id: usize,
    pub node_id: String,
}

/// Fatal error report (either direction)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub node_id: String,
    pub worker_id: Option<usize>,
    pub error: String,
}

/// Protocol message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    /// Coordinator hands one band to a worker unit
    Assign(AssignMessage),

    /// Worker has evaluated its band; the payload frame follows
    BandReady(BandReadyMessage),

    /// Coordinator has integrated every band
    Barrier,

    /// Worker has seen the barrier and is about to exit its unit
    BarrierAck(BarrierAckMessage),

    /// Fatal error; the receiver aborts the run
    Error(ErrorMessage),
}

impl Message {
    /// Short name for logs and protocol errors
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Assign(_) => "ASSIGN",
            Message::BandReady(_) => "BAND_READY",
            Message::Barrier => "BARRIER",
            Message::BarrierAck(_) => "BARRIER_ACK",
            Message::Error(_) => "ERROR",
        }
    }
}

/// Fail with [`RenderError::ProtocolVersion`] unless `received` matches ours
pub fn check_version(received: u32) -> Result<(), RenderError> {
    if received != PROTOCOL_VERSION {
        return Err(RenderError::ProtocolVersion {
            expected: PROTOCOL_VERSION,
            received,
        });
    }
    Ok(())
}

/// Payload size of `band`, if it fits in one frame
///
/// A band too large for a frame can never be transferred, so it is a
/// configuration error and is caught before the band is rendered.
pub fn band_payload_len(band: &RowBand, grid: &ImageGrid) -> Result<usize, RenderError> {
    let len = band.sample_count(grid) * SAMPLE_SIZE;
    if len > MAX_FRAME_BYTES {
        return Err(RenderError::Configuration(format!(
            "band {} of a {} image needs {} bytes, more than the {} byte frame limit; use more workers",
            band, grid, len, MAX_FRAME_BYTES
        )));
    }
    Ok(len)
}

/// Serialize a message to a length-prefixed frame
pub fn serialize_message(msg: &Message) -> Result<Vec<u8>> {
    let msg_bytes = rmp_serde::to_vec(msg).context("Failed to serialize message")?;

    let msg_len = msg_bytes.len() as u32;
    let mut framed = Vec::with_capacity(4 + msg_bytes.len());
    framed.extend_from_slice(&msg_len.to_le_bytes());
    framed.extend_from_slice(&msg_bytes);

    Ok(framed)
}

/// Deserialize a message from a length-prefixed frame
///
/// Returns the message and the number of bytes consumed, prefix included.
pub fn deserialize_message(buf: &[u8]) -> Result<(Message, usize)> {
    if buf.len() < 4 {
        anyhow::bail!("Buffer too small for message length (need 4 bytes, got {})", buf.len());
    }

    let msg_len = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    if buf.len() < 4 + msg_len {
        anyhow::bail!("Incomplete message (need {} bytes, got {})", 4 + msg_len, buf.len());
    }

    let msg = rmp_serde::from_slice(&buf[4..4 + msg_len])
        .context("Failed to deserialize message")?;

    Ok((msg, 4 + msg_len))
}

async fn read_frame_len<R: AsyncRead + Unpin>(reader: &mut R) -> Result<usize> {
    let mut len_buf = [0u8; 4];
    reader
        .read_exact(&mut len_buf)
        .await
        .context("Failed to read frame length")?;

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_BYTES {
        anyhow::bail!("Frame too large: {} bytes (max {} bytes)", len, MAX_FRAME_BYTES);
    }
    Ok(len)
}

/// Read one complete message
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Message> {
    let msg_len = read_frame_len(reader).await?;

    let mut msg_buf = vec![0u8; msg_len];
    reader
        .read_exact(&mut msg_buf)
        .await
        .context("Failed to read message body")?;

    let msg = rmp_serde::from_slice(&msg_buf).context("Failed to deserialize message")?;
    Ok(msg)
}

/// Write one message and flush
pub async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, msg: &Message) -> Result<()> {
    let framed = serialize_message(msg)?;

    writer
        .write_all(&framed)
        .await
        .context("Failed to write message")?;
    writer.flush().await.context("Failed to flush stream")?;

    Ok(())
}

/// Write a raw band payload frame
pub async fn write_payload<W: AsyncWrite + Unpin>(writer: &mut W, payload: &[u8]) -> Result<()> {
    if payload.len() > MAX_FRAME_BYTES {
        anyhow::bail!(
            "Band payload too large: {} bytes (max {} bytes)",
            payload.len(),
            MAX_FRAME_BYTES
        );
    }

    writer
        .write_all(&(payload.len() as u32).to_le_bytes())
        .await
        .context("Failed to write payload length")?;
    writer
        .write_all(payload)
        .await
        .context("Failed to write payload")?;
    writer.flush().await.context("Failed to flush stream")?;

    Ok(())
}

/// Read a raw band payload frame of exactly `expected` bytes
///
/// The announced length is checked before the body is read; any other length
/// is a [`RenderError::TransferSizeMismatch`] for `worker_id`.
pub async fn read_payload<R: AsyncRead + Unpin>(
    reader: &mut R,
    worker_id: usize,
    expected: usize,
) -> Result<Vec<u8>> {
    let received = read_frame_len(reader).await?;
    if received != expected {
        return Err(RenderError::TransferSizeMismatch {
            worker_id,
            expected,
            received,
        }
        .into());
    }

    let mut payload = vec![0u8; expected];
    reader
        .read_exact(&mut payload)
        .await
        .with_context(|| format!("Failed to read band payload from worker {}", worker_id))?;

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assign() -> AssignMessage {
        AssignMessage {
            protocol_version: PROTOCOL_VERSION,
            worker_id: 2,
            num_workers: 4,
            band: RowBand::new(400, 200),
            grid: ImageGrid::new(800, 800).unwrap(),
            window: ComplexPlaneWindow::default(),
            params: EscapeParams::default(),
            threads: Some(8),
        }
    }

    #[test]
    fn test_band_payload_len_respects_frame_limit() {
        let grid = ImageGrid::new(8192, 8192).unwrap();
        // One band covering the whole image is 768 MiB
        assert!(matches!(
            band_payload_len(&RowBand::new(0, 8192), &grid),
            Err(RenderError::Configuration(_))
        ));
        // Two bands of 384 MiB each fit
        assert_eq!(
            band_payload_len(&RowBand::new(4096, 4096), &grid).unwrap(),
            4096 * 8192 * SAMPLE_SIZE
        );
    }

    #[test]
    fn test_serialize_deserialize_assign() {
        let msg = Message::Assign(assign());

        let bytes = serialize_message(&msg).unwrap();
        let (deserialized, consumed) = deserialize_message(&bytes).unwrap();

        assert_eq!(consumed, bytes.len());
        match deserialized {
            Message::Assign(a) => {
                assert_eq!(a, assign());
                assert_eq!(
                    a.assignment(),
                    WorkAssignment { worker_id: 2, band: RowBand::new(400, 200) }
                );
            }
            other => panic!("Wrong message type: {}", other.kind()),
        }
    }

    #[test]
    fn test_serialize_deserialize_barrier() {
        let bytes = serialize_message(&Message::Barrier).unwrap();
        let (deserialized, consumed) = deserialize_message(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(deserialized, Message::Barrier);
    }

    #[test]
    fn test_serialize_deserialize_error() {
        let msg = Message::Error(ErrorMessage {
            node_id: "node-a".to_string(),
            worker_id: Some(1),
            error: "band rows 0..0 has no rows".to_string(),
        });

        let bytes = serialize_message(&msg).unwrap();
        let (deserialized, _) = deserialize_message(&bytes).unwrap();
        assert_eq!(deserialized, msg);
    }

    #[test]
    fn test_length_prefix_is_little_endian() {
        let bytes = serialize_message(&Message::Barrier).unwrap();
        let len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        assert_eq!(len, bytes.len() - 4);
    }

    #[test]
    fn test_deserialize_incomplete() {
        assert!(deserialize_message(&[1, 0]).is_err());

        let bytes = serialize_message(&Message::Assign(assign())).unwrap();
        assert!(deserialize_message(&bytes[..bytes.len() - 1]).is_err());
    }

    #[test]
    fn test_version_check() {
        assert!(check_version(PROTOCOL_VERSION).is_ok());
        assert_eq!(
            check_version(7),
            Err(RenderError::ProtocolVersion { expected: PROTOCOL_VERSION, received: 7 })
        );
    }

    #[tokio::test]
    async fn test_stream_round_trip_with_payload() {
        let (mut a, mut b) = tokio::io::duplex(64 * 1024);

        let ready = Message::BandReady(BandReadyMessage {
            worker_id: 0,
            node_id: "node-a".to_string(),
            band: RowBand::new(0, 2),
            payload_len: 24,
            stats: BandStats {
                worker_id: 0,
                start_row: 0,
                row_count: 2,
                elapsed_ns: 10,
                interior_pixels: 0,
                total_iterations: 4,
            },
        });
        write_message(&mut a, &ready).await.unwrap();
        write_payload(&mut a, &[7u8; 24]).await.unwrap();

        assert_eq!(read_message(&mut b).await.unwrap(), ready);
        assert_eq!(read_payload(&mut b, 0, 24).await.unwrap(), vec![7u8; 24]);
    }

    #[tokio::test]
    async fn test_payload_size_mismatch() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        write_payload(&mut a, &[0u8; 23]).await.unwrap();

        let err = read_payload(&mut b, 3, 24).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<RenderError>(),
            Some(&RenderError::TransferSizeMismatch { worker_id: 3, expected: 24, received: 23 })
        );
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_all(&((MAX_FRAME_BYTES as u32) + 1).to_le_bytes()).await.unwrap();
        assert!(read_message(&mut b).await.is_err());
    }
}
