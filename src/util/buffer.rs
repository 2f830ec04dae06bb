//! Row-major pixel buffers
//!
//! A [`PixelBuffer`] is an owned, contiguous 2D buffer with a fixed width. It is
//! used both for one band (`width * row_count` samples) and for the full image
//! (`width * height`). Addressing always goes through `(row, col) -> index`;
//! callers never compute offsets into the backing storage themselves.
//!
//! Sample buffers also have a fixed-size byte encoding for transfer between
//! processes: each [`PixelSample`] is [`SAMPLE_SIZE`] bytes, so a band's
//! payload size is known exactly before it arrives.

use crate::error::RenderError;
use crate::fractal::color::{ColorPolicy, Rgb};
use crate::fractal::PixelSample;
use rayon::prelude::*;

/// Encoded size of one [`PixelSample`]: `u32` iterations + `f64` magnitude, little-endian
pub const SAMPLE_SIZE: usize = 12;

/// Owned row-major 2D buffer
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer<T> {
    width: usize,
    rows: usize,
    data: Vec<T>,
}

impl<T: Copy + Default> PixelBuffer<T> {
    /// Allocate a `width * rows` buffer filled with `T::default()`
    pub fn new(width: usize, rows: usize) -> Self {
        Self {
            width,
            rows,
            data: vec![T::default(); width * rows],
        }
    }
}

impl<T: Copy> PixelBuffer<T> {
    /// Wrap existing row-major data
    ///
    /// Returns `None` if `data.len() != width * rows`.
    pub fn from_vec(width: usize, rows: usize, data: Vec<T>) -> Option<Self> {
        if data.len() != width * rows {
            return None;
        }
        Some(Self { width, rows, data })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Index of `(row, col)` in the backing storage
    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        debug_assert!(row < self.rows && col < self.width);
        row * self.width + col
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[self.index(row, col)]
    }

    pub fn row(&self, row: usize) -> &[T] {
        let start = self.index(row, 0);
        &self.data[start..start + self.width]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [T] {
        let start = self.index(row, 0);
        &mut self.data[start..start + self.width]
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Mutable rows for disjoint parallel writes
    pub fn par_rows_mut(&mut self) -> rayon::slice::ChunksMut<'_, T>
    where
        T: Send,
    {
        self.data.par_chunks_mut(self.width)
    }

    /// Copy a band buffer into this buffer at sample `offset`
    ///
    /// The band must have the same width, start on a row boundary and fit
    /// entirely inside this buffer.
    pub fn copy_band_at(&mut self, offset: usize, band: &PixelBuffer<T>) -> Result<(), RenderError> {
        if band.width != self.width || offset.checked_rem(self.width) != Some(0) {
            return Err(RenderError::Configuration(format!(
                "band of width {} at sample {} does not line up with image width {}",
                band.width, offset, self.width
            )));
        }
        if offset + band.data.len() > self.data.len() {
            return Err(RenderError::Configuration(format!(
                "band of {} rows at row {} exceeds image height {}",
                band.rows,
                offset / self.width,
                self.rows
            )));
        }

        self.data[offset..offset + band.data.len()].copy_from_slice(&band.data);
        Ok(())
    }
}

impl PixelBuffer<PixelSample> {
    /// Apply a color policy to every sample
    pub fn colorize<C: ColorPolicy + ?Sized>(&self, policy: &C) -> PixelBuffer<Rgb> {
        let data = self.data.par_iter().map(|s| policy.color(s)).collect();
        PixelBuffer {
            width: self.width,
            rows: self.rows,
            data,
        }
    }

    /// Size in bytes of the encoded buffer
    #[inline]
    pub fn encoded_len(&self) -> usize {
        self.data.len() * SAMPLE_SIZE
    }

    /// Encode samples in row-major order, [`SAMPLE_SIZE`] bytes each
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.encoded_len());
        for sample in &self.data {
            bytes.extend_from_slice(&sample.iterations.to_le_bytes());
            bytes.extend_from_slice(&sample.magnitude_squared.to_le_bytes());
        }
        bytes
    }

    /// Decode a `width * rows` buffer
    ///
    /// `bytes` must be exactly `width * rows * SAMPLE_SIZE` long; any other size
    /// is a [`RenderError::TransferSizeMismatch`] attributed to `worker_id`.
    pub fn from_bytes(worker_id: usize, width: usize, rows: usize, bytes: &[u8]) -> Result<Self, RenderError> {
        let expected = width * rows * SAMPLE_SIZE;
        if bytes.len() != expected {
            return Err(RenderError::TransferSizeMismatch {
                worker_id,
                expected,
                received: bytes.len(),
            });
        }

        let data = bytes
            .chunks_exact(SAMPLE_SIZE)
            .map(|chunk| {
                let mut iterations = [0u8; 4];
                let mut magnitude = [0u8; 8];
                iterations.copy_from_slice(&chunk[..4]);
                magnitude.copy_from_slice(&chunk[4..]);
                PixelSample {
                    iterations: u32::from_le_bytes(iterations),
                    magnitude_squared: f64::from_le_bytes(magnitude),
                }
            })
            .collect();

        Ok(Self { width, rows, data })
    }
}

impl PixelBuffer<Rgb> {
    /// Flatten to `r, g, b, r, g, b, ...`
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        self.data.iter().flat_map(|px| px.iter().copied()).collect()
    }
}
