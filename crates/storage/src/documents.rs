//! The document store contract.

use aq_common::{AqResult, ForecastRecord, InSituRecord, Location, TextureChunk};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const FORECAST_COLLECTION: &str = "forecast_data";
pub const TEXTURE_COLLECTION: &str = "data_textures";
pub const IN_SITU_COLLECTION: &str = "in_situ_data";
pub const LOCATIONS_COLLECTION: &str = "locations";

/// A record as held by the store, with store-managed timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stored<T> {
    #[serde(flatten)]
    pub record: T,
    pub created_time: DateTime<Utc>,
    pub last_modified_time: DateTime<Utc>,
}

/// Upsert and query access to the pipeline's collections.
///
/// Upserts match on each record's natural key. A match replaces the
/// document and bumps `last_modified_time` while `created_time` is kept, so
/// writing the same batch twice leaves one document per key.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn upsert_forecasts(&self, records: &[ForecastRecord]) -> AqResult<usize>;

    async fn upsert_textures(&self, chunks: &[TextureChunk]) -> AqResult<usize>;

    async fn upsert_in_situ(&self, records: &[InSituRecord]) -> AqResult<usize>;

    /// Distinct forecast base times within `[from, to]`.
    async fn forecast_base_times(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AqResult<Vec<DateTime<Utc>>>;

    /// Distinct in-situ measurement hours within `[from, to]`.
    async fn in_situ_timestamps(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AqResult<Vec<DateTime<Utc>>>;

    /// Reference locations of one type, e.g. "city".
    async fn locations(&self, location_type: &str) -> AqResult<Vec<Location>>;
}
