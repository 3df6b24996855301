//! Provider seams the orchestrator is written against.

use async_trait::async_trait;
use atmos_grid::AtmosphericGrid;
use chrono::{DateTime, Utc};

use aq_common::Location;

use crate::error::Result;
use crate::insitu::StationData;

/// Supplies harmonised forecast grids.
#[async_trait]
pub trait GridSource: Send + Sync {
    /// Both levels of the run starting at `base_time`, for `lead_hours`.
    async fn fetch_grid(
        &self,
        base_time: DateTime<Utc>,
        lead_hours: &[u32],
    ) -> Result<AtmosphericGrid>;
}

/// Supplies raw in-situ measurements around a city.
#[async_trait]
pub trait MeasurementSource: Send + Sync {
    /// Stations near `city` with their hourly aggregates in `(from, to]`.
    async fn fetch_city(
        &self,
        city: &Location,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<StationData>>;
}
