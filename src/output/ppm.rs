//! Binary PPM (P6) serializer
//!
//! Plain-text header `P6\n<width> <height>\n<max>\n`, then `width * height`
//! RGB triples in row-major order, one byte per channel.

use crate::fractal::color::Rgb;
use crate::util::buffer::PixelBuffer;
use crate::Result;
use anyhow::Context;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// PPM header for a `width x height` image
pub fn ppm_header(width: usize, height: usize, max_value: u8) -> String {
    format!("P6\n{} {}\n{}\n", width, height, max_value)
}

/// Write `image` as binary PPM
pub fn write_ppm<W: Write>(writer: &mut W, image: &PixelBuffer<Rgb>, max_value: u8) -> Result<()> {
    writer
        .write_all(ppm_header(image.width(), image.rows(), max_value).as_bytes())
        .context("Failed to write PPM header")?;
    writer
        .write_all(&image.to_rgb_bytes())
        .context("Failed to write PPM pixel data")?;
    Ok(())
}

/// Write `image` to a PPM file at `path`
pub fn save_ppm(path: &Path, image: &PixelBuffer<Rgb>, max_value: u8) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create image file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_ppm(&mut writer, image, max_value)?;
    writer
        .flush()
        .with_context(|| format!("Failed to flush image file: {}", path.display()))?;
    Ok(())
}
