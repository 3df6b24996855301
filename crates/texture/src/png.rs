//! PNG encoding for 8-bit grayscale and RGB rasters.
//!
//! Used when a texture strip is too wide for WebP. Rows are written
//! unfiltered and zlib-compressed in a single IDAT chunk.

use std::io::Write;

/// PNG file signature.
const SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Samples per pixel of a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channels {
    Gray,
    Rgb,
}

impl Channels {
    pub fn count(&self) -> usize {
        match self {
            Channels::Gray => 1,
            Channels::Rgb => 3,
        }
    }

    fn color_type(&self) -> u8 {
        match self {
            Channels::Gray => 0,
            Channels::Rgb => 2,
        }
    }
}

/// Create a PNG from interleaved 8-bit samples.
///
/// # Arguments
/// - `pixels`: `width * height * channels` samples, row-major
/// - `width`: Image width in pixels
/// - `height`: Image height in pixels
pub fn create_png(
    pixels: &[u8],
    width: usize,
    height: usize,
    channels: Channels,
) -> Result<Vec<u8>, String> {
    let stride = width * channels.count();
    if pixels.len() != stride * height {
        return Err(format!(
            "{} samples for a {}x{} image with {} channels",
            pixels.len(),
            width,
            height,
            channels.count()
        ));
    }

    let mut png = Vec::new();
    png.extend_from_slice(&SIGNATURE);

    // IHDR chunk
    let mut ihdr_data = Vec::with_capacity(13);
    ihdr_data.extend_from_slice(&(width as u32).to_be_bytes());
    ihdr_data.extend_from_slice(&(height as u32).to_be_bytes());
    ihdr_data.push(8); // bit depth
    ihdr_data.push(channels.color_type());
    ihdr_data.push(0); // compression method
    ihdr_data.push(0); // filter method
    ihdr_data.push(0); // interlace method
    write_chunk(&mut png, b"IHDR", &ihdr_data);

    let idat_data = deflate_idat(pixels, stride, height)
        .map_err(|e| format!("IDAT compression failed: {}", e))?;
    write_chunk(&mut png, b"IDAT", &idat_data);

    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

/// Write a PNG chunk
fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

/// Deflate scanlines for the IDAT chunk.
fn deflate_idat(pixels: &[u8], stride: usize, height: usize) -> std::io::Result<Vec<u8>> {
    let mut uncompressed = Vec::with_capacity(height * (1 + stride));
    for row in pixels.chunks_exact(stride.max(1)).take(height) {
        uncompressed.push(0); // filter type: none
        uncompressed.extend_from_slice(row);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(&uncompressed)?;
    encoder.finish()
}
