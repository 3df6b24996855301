//! Map-renderable texture strips from atmospheric grids.
//!
//! Each pollutant becomes a grayscale strip and the 10 m wind an RG strip,
//! normalised against fixed reference ranges so that textures from
//! different runs share one colour scale.

pub mod encoder;
pub mod error;
pub mod png;
pub mod variables;

pub use encoder::{
    asset_path, build_raster, chunk_ranges, choose_format, encode_raster, EncodedTexture,
    ImageFormat, Raster, TextureEncoder, DEFAULT_CHUNK_SIZE, WEBP_MAX_DIMENSION,
};
pub use error::{TextureError, TextureResult};
pub use png::{create_png, Channels};
pub use variables::{ReferenceRange, TextureVariable};
