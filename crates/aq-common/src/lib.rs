//! Common types and utilities shared across the air-quality pipeline crates.

pub mod aqi;
pub mod error;
pub mod location;
pub mod pollutant;
pub mod records;

pub use aqi::{classify, classify_fractional, overall, AqiLevel, MAX_AQI_LEVEL};
pub use error::{AqError, AqResult};
pub use location::{GeoPoint, Location};
pub use pollutant::{Pollutant, MICROGRAMS_PER_CUBIC_METRE};
pub use records::{
    ForecastKey, ForecastPollutant, ForecastRecord, InSituKey, InSituMetadata, InSituRecord,
    PollutantReading, TextureChunk, TextureKey, CAMS_SOURCE, OPENAQ_SOURCE,
};
