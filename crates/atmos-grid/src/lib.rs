//! Atmospheric grids for the CAMS global composition forecast.
//!
//! A forecast run arrives as two GRIB2 files: a single-level file with
//! particulates, surface pressure and 10 m wind, and a model-level file
//! (level 137) with trace gases and temperature. [`AtmosphericGrid`]
//! merges them onto one axis set:
//!
//! ```text
//! GRIB2 bytes ──► decode_grib ──► RawGrid (single-level) ─┐
//! GRIB2 bytes ──► decode_grib ──► RawGrid (model-level) ──┤
//!                                                         ▼
//!                                   AtmosphericGrid::from_raw
//!                                     ├─► longitudes into (-180, 180]
//!                                     └─► kg kg**-1 ─► kg m**-3
//! ```
//!
//! The grid is immutable once built and safe to share between threads.

pub mod decode;
pub mod error;
pub mod fields;
pub mod grid;
pub mod interpolation;
pub mod raw;
pub mod units;

pub use decode::{decode_grib, decode_grib_bytes};
pub use error::{GridError, GridResult};
pub use fields::{
    validate_field_table, GridField, GridLevel, CONCENTRATION_UNITS, MIXING_RATIO_UNITS,
    SURFACE_MODEL_LEVEL,
};
pub use grid::{AtmosphericGrid, LocationSeries};
pub use raw::{normalize_longitude, RawField, RawGrid};
