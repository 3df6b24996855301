//! Grid to texture-strip encoding.
//!
//! Every lead-time slice of a variable is normalised to bytes and the
//! slices are laid side by side along longitude:
//!
//! ```text
//!  lead 0        lead 1        lead 2
//! ┌───────────┬───────────┬───────────┐
//! │ lon 0..n  │ lon 0..n  │ lon 0..n  │  lat 0
//! │    ...    │    ...    │    ...    │  ...
//! └───────────┴───────────┴───────────┘
//! ```
//!
//! The lead-time axis is cut into chunks, one image per chunk.

use std::ops::Range;
use std::sync::Arc;

use aq_common::{TextureChunk, CAMS_SOURCE};
use atmos_grid::AtmosphericGrid;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use storage::AssetStore;
use tracing::{debug, info, instrument};

use crate::error::{TextureError, TextureResult};
use crate::png::{create_png, Channels};
use crate::variables::TextureVariable;

/// Lead times per image unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: i64 = 16;

/// Largest width or height libwebp accepts.
pub const WEBP_MAX_DIMENSION: usize = 16383;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    WebP,
    Png,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::WebP => "webp",
            ImageFormat::Png => "png",
        }
    }
}

/// Split `steps` lead times into consecutive chunks of `chunk_size`.
///
/// A non-positive chunk size, or one larger than `steps`, gives a single
/// chunk. The last chunk may be short.
pub fn chunk_ranges(steps: usize, chunk_size: i64) -> Vec<Range<usize>> {
    if steps == 0 {
        return Vec::new();
    }
    let size = if chunk_size <= 0 || chunk_size as usize > steps {
        steps
    } else {
        chunk_size as usize
    };
    (0..steps)
        .step_by(size)
        .map(|start| start..(start + size).min(steps))
        .collect()
}

/// WebP unless the widest strip would exceed its size limit.
pub fn choose_format(slice_width: usize, ranges: &[Range<usize>]) -> ImageFormat {
    let widest = ranges.iter().map(|r| r.len() * slice_width).max().unwrap_or(0);
    if widest > WEBP_MAX_DIMENSION {
        ImageFormat::Png
    } else {
        ImageFormat::WebP
    }
}

/// Asset path of one chunk; `index` is 1-based.
pub fn asset_path(
    variable: &str,
    base_time: DateTime<Utc>,
    source: &str,
    index: usize,
    total: usize,
    format: ImageFormat,
) -> String {
    let stamp = base_time.format("%Y-%m-%d_%H");
    format!(
        "{stamp}/{variable}_{stamp}_{source}.chunk_{index}_of_{total}.{ext}",
        ext = format.extension()
    )
}

/// Byte raster of one chunk.
#[derive(Debug)]
pub struct Raster {
    pub width: usize,
    pub height: usize,
    pub channels: Channels,
    pub pixels: Vec<u8>,
    /// Values outside the reference range.
    pub clipped: usize,
}

/// Lay out the lead-time slices in `steps` side by side.
pub fn build_raster(
    grid: &AtmosphericGrid,
    variable: TextureVariable,
    steps: Range<usize>,
) -> TextureResult<Raster> {
    let fields = variable.fields();
    let range = variable.range();
    let width = grid.longitudes().len();
    let height = grid.latitudes().len();
    let channels = if fields.len() == 1 {
        Channels::Gray
    } else {
        Channels::Rgb
    };

    let mut slices = Vec::with_capacity(steps.len());
    for step in steps.clone() {
        let per_field = fields
            .iter()
            .map(|f| grid.slice(*f, step))
            .collect::<Result<Vec<_>, _>>()?;
        slices.push(per_field);
    }

    let strip_width = width * steps.len();
    let mut pixels = Vec::with_capacity(strip_width * height * channels.count());
    let mut clipped = 0;
    for row in 0..height {
        for per_field in &slices {
            for col in 0..width {
                let index = row * width + col;
                for slice in per_field {
                    let (byte, was_clipped) = range.to_byte(slice[index]);
                    pixels.push(byte);
                    clipped += was_clipped as usize;
                }
                if channels == Channels::Rgb {
                    // Blue stays empty for the two wind components
                    for _ in per_field.len()..3 {
                        pixels.push(0);
                    }
                }
            }
        }
    }

    Ok(Raster {
        width: strip_width,
        height,
        channels,
        pixels,
        clipped,
    })
}

/// Encode a raster in the chosen format.
pub fn encode_raster(raster: &Raster, format: ImageFormat) -> TextureResult<Vec<u8>> {
    match format {
        ImageFormat::Png => create_png(&raster.pixels, raster.width, raster.height, raster.channels)
            .map_err(TextureError::Encode),
        ImageFormat::WebP => {
            if raster.width > WEBP_MAX_DIMENSION || raster.height > WEBP_MAX_DIMENSION {
                return Err(TextureError::Encode(format!(
                    "{}x{} exceeds the WebP limit",
                    raster.width, raster.height
                )));
            }
            let rgb: Vec<u8> = match raster.channels {
                Channels::Rgb => raster.pixels.clone(),
                Channels::Gray => raster.pixels.iter().flat_map(|&v| [v, v, v]).collect(),
            };
            let encoder =
                webp::Encoder::from_rgb(&rgb, raster.width as u32, raster.height as u32);
            Ok(encoder.encode_lossless().to_vec())
        }
    }
}

/// One encoded chunk, ready to be stored.
#[derive(Debug, Clone)]
pub struct EncodedTexture {
    pub variable: TextureVariable,
    pub path: String,
    pub bytes: Vec<u8>,
    pub time_start: DateTime<Utc>,
    pub time_end: DateTime<Utc>,
    /// 1-based
    pub index: usize,
    pub total: usize,
}

impl EncodedTexture {
    /// Metadata record for the chunk once stored at `texture_uri`.
    pub fn to_chunk(&self, base_time: DateTime<Utc>, source: &str, texture_uri: String) -> TextureChunk {
        let range = self.variable.range();
        TextureChunk {
            variable: self.variable.name().to_string(),
            base_time,
            source: source.to_string(),
            time_start: self.time_start,
            time_end: self.time_end,
            chunk: format!("{} of {}", self.index, self.total),
            min_value: range.min,
            max_value: range.max,
            units: self.variable.units().to_string(),
            texture_uri,
        }
    }
}

/// Turns a grid into texture strips for every pollutant and the wind.
#[derive(Debug, Clone, Copy)]
pub struct TextureEncoder {
    chunk_size: i64,
}

impl Default for TextureEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl TextureEncoder {
    pub fn new(chunk_size: i64) -> Self {
        Self { chunk_size }
    }

    /// Encode every variable. One format is used for the whole run.
    pub fn encode(&self, grid: &AtmosphericGrid) -> TextureResult<Vec<EncodedTexture>> {
        let ranges = chunk_ranges(grid.lead_hours().len(), self.chunk_size);
        let format = choose_format(grid.longitudes().len(), &ranges);
        let valid_times = grid.valid_times();
        let total = ranges.len();

        let jobs: Vec<(TextureVariable, usize, Range<usize>)> = TextureVariable::all()
            .into_iter()
            .flat_map(|variable| {
                ranges
                    .iter()
                    .cloned()
                    .enumerate()
                    .map(move |(i, range)| (variable, i + 1, range))
            })
            .collect();

        let encoded = jobs
            .into_par_iter()
            .map(|(variable, index, steps)| {
                let raster = build_raster(grid, variable, steps.clone())?;
                if raster.clipped > 0 {
                    debug!(
                        variable = variable.name(),
                        chunk = index,
                        clipped = raster.clipped,
                        "Clipped values outside the reference range"
                    );
                }
                let bytes = encode_raster(&raster, format)?;
                let times = &valid_times[steps];
                let (time_start, time_end) = match (times.iter().min(), times.iter().max()) {
                    (Some(start), Some(end)) => (*start, *end),
                    _ => return Err(TextureError::Encode("empty chunk".to_string())),
                };
                Ok(EncodedTexture {
                    variable,
                    path: asset_path(
                        variable.name(),
                        grid.base_time(),
                        CAMS_SOURCE,
                        index,
                        total,
                        format,
                    ),
                    bytes,
                    time_start,
                    time_end,
                    index,
                    total,
                })
            })
            .collect::<TextureResult<Vec<_>>>()?;

        info!(
            textures = encoded.len(),
            chunks_per_variable = total,
            format = format.extension(),
            "Encoded textures"
        );
        Ok(encoded)
    }

    /// Encode on the blocking pool, write every image and return the
    /// metadata records.
    #[instrument(skip_all, fields(base_time = %grid.base_time()))]
    pub async fn write(
        &self,
        grid: &Arc<AtmosphericGrid>,
        assets: &AssetStore,
    ) -> TextureResult<Vec<TextureChunk>> {
        let encoder = *self;
        let shared = Arc::clone(grid);
        let encoded = tokio::task::spawn_blocking(move || encoder.encode(&shared))
            .await
            .map_err(|e| TextureError::Encode(format!("encoder task failed: {}", e)))??;

        let mut chunks = Vec::with_capacity(encoded.len());
        for mut texture in encoded {
            let data = Bytes::from(std::mem::take(&mut texture.bytes));
            let uri = assets.put(&texture.path, data).await?;
            chunks.push(texture.to_chunk(grid.base_time(), CAMS_SOURCE, uri));
        }
        Ok(chunks)
    }
}
