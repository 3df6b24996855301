//! Air-quality ingestion library.
//!
//! Turns CAMS global forecasts and OpenAQ station measurements into
//! persisted per-location records and map textures.
//!
//! # Architecture
//!
//! - [`schedule`]: which forecast runs and in-situ days still need fetching
//! - [`cams`]: Atmosphere Data Store retrievals decoded into grids
//! - [`forecast`]: grid series to AQI-classified forecast records
//! - [`insitu`]: rate-limited OpenAQ client, cache, transform and enrichment
//! - [`orchestrator`]: one forecast or in-situ cycle end to end
//!
//! Providers are reached through the [`GridSource`] and
//! [`MeasurementSource`] traits so cycles can run against fakes.

pub mod cams;
pub mod error;
pub mod forecast;
mod http;
pub mod insitu;
pub mod orchestrator;
pub mod retry;
pub mod schedule;
pub mod sources;

// Re-exports
pub use cams::{CamsClient, CamsConfig, CamsRequest, CAMS_DATASET};
pub use error::{IngestionError, Result};
pub use forecast::{forecast_records, to_micrograms};
pub use insitu::{MeasurementCache, OpenAqClient, OpenAqConfig, RateLimiter, StationData};
pub use orchestrator::{
    ForecastCycleOptions, ForecastCycleSummary, InSituCycleOptions, InSituCycleSummary,
    Orchestrator,
};
pub use retry::RetryPolicy;
pub use schedule::{align_base_time, fetch_window, plan_forecast_runs, plan_in_situ_fetches};
pub use sources::{GridSource, MeasurementSource};
