//! In-situ measurements from OpenAQ.
//!
//! ```text
//! OpenAqClient ──► StationData (raw hours) ──► parse_measurement ──► is_usable
//!   (or MeasurementCache)                                               │
//!                          enrich_records ◄── group_by_station_hour ◄───┘
//! ```

pub mod cache;
pub mod client;
pub mod enrich;
pub mod models;
pub mod rate_limit;
pub mod transform;

pub use cache::MeasurementCache;
pub use client::{OpenAqClient, OpenAqConfig};
pub use enrich::{enrich_records, ppm_to_micrograms, GAS_CONSTANT};
pub use models::{Station, StationData, StationMeasurement};
pub use rate_limit::RateLimiter;
pub use transform::{group_by_station_hour, is_usable, parse_measurement, SENTINEL_VALUES};

use atmos_grid::AtmosphericGrid;
use tracing::debug;

use aq_common::{InSituRecord, Location};

use crate::error::Result;

/// Parse, filter, merge and enrich everything fetched for one city.
///
/// A measurement that cannot be parsed fails the whole batch.
pub fn city_records(
    city: &Location,
    stations: &[StationData],
    grid: &AtmosphericGrid,
) -> Result<Vec<InSituRecord>> {
    let mut measurements = Vec::new();
    let mut discarded = 0usize;
    for data in stations {
        for raw in &data.hours {
            let measurement = parse_measurement(&data.station, raw)?;
            if is_usable(&measurement) {
                measurements.push(measurement);
            } else {
                discarded += 1;
            }
        }
    }

    let records = enrich_records(group_by_station_hour(city, measurements), grid)?;
    debug!(
        city = %city.name,
        records = records.len(),
        discarded = discarded,
        "Transformed in-situ measurements"
    );
    Ok(records)
}
