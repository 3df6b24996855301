//! Grid series to per-location forecast records.

use std::collections::BTreeMap;

use aq_common::{
    classify, overall, AqiLevel, ForecastPollutant, ForecastRecord, Location, Pollutant,
    MICROGRAMS_PER_CUBIC_METRE,
};
use atmos_grid::AtmosphericGrid;
use chrono::Duration;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::info;

use crate::error::{IngestionError, Result};

/// kg/m³ to µg/m³.
const MICROGRAMS_PER_KILOGRAM: i64 = 1_000_000_000;

/// Scale a grid concentration (kg/m³) to µg/m³.
///
/// The shortest decimal form of the `f32` is scaled exactly, so a stored
/// `1.5e-8` becomes `15.0` rather than `15.000000233`. Values outside the
/// decimal range fall back to float multiplication.
pub fn to_micrograms(value: f32) -> f64 {
    let fallback = value as f64 * MICROGRAMS_PER_KILOGRAM as f64;
    if !value.is_finite() {
        return fallback;
    }
    Decimal::from_scientific(&format!("{:e}", value))
        .ok()
        .and_then(|d| d.checked_mul(Decimal::from(MICROGRAMS_PER_KILOGRAM)))
        .and_then(|d| d.to_f64())
        .unwrap_or(fallback)
}

/// One record per location and lead time, location-major.
pub fn forecast_records(
    grid: &AtmosphericGrid,
    locations: &[Location],
    source: &str,
) -> Result<Vec<ForecastRecord>> {
    let series = grid.series_for_locations(locations, &Pollutant::ALL)?;
    let base_time = grid.base_time();
    let lead_hours = grid.lead_hours();

    let mut records = Vec::with_capacity(locations.len() * lead_hours.len());
    for (location, location_series) in locations.iter().zip(&series) {
        // Scale and classify each series once
        let scaled: BTreeMap<Pollutant, Vec<(f64, AqiLevel)>> = location_series
            .iter()
            .map(|(pollutant, values)| {
                let classified = values
                    .iter()
                    .map(|&v| {
                        let value = to_micrograms(v);
                        (value, classify(value, *pollutant))
                    })
                    .collect();
                (*pollutant, classified)
            })
            .collect();

        for (i, &lead) in lead_hours.iter().enumerate() {
            let mut pollutants = BTreeMap::new();
            for (pollutant, values) in &scaled {
                let (value, aqi_level) = values[i];
                pollutants.insert(
                    *pollutant,
                    ForecastPollutant {
                        value,
                        units: MICROGRAMS_PER_CUBIC_METRE.to_string(),
                        aqi_level,
                    },
                );
            }

            let levels: Vec<AqiLevel> = pollutants.values().map(|p| p.aqi_level).collect();
            let overall_aqi_level = overall(&levels).ok_or_else(|| {
                IngestionError::DataValidation(format!(
                    "no pollutant values for {} at +{}h",
                    location.name, lead
                ))
            })?;

            records.push(ForecastRecord {
                name: location.name.clone(),
                location_type: location.location_type.clone(),
                location: location.point(),
                base_time,
                valid_time: base_time + Duration::hours(lead as i64),
                forecast_range: lead,
                pollutants,
                overall_aqi_level,
                source: source.to_string(),
            });
        }
    }

    info!(
        base_time = %base_time,
        locations = locations.len(),
        records = records.len(),
        "Transformed forecast"
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aq_common::CAMS_SOURCE;
    use test_utils::{sample_base_time, sample_cities, synthetic_grid, GridSpec};

    #[test]
    fn test_decimal_scaling_is_exact() {
        assert_eq!(to_micrograms(1.5e-8), 15.0);
        assert_eq!(to_micrograms(4.2e-8), 42.0);
        assert_eq!(to_micrograms(0.0), 0.0);
        assert!(to_micrograms(f32::NAN).is_nan());
    }

    #[test]
    fn test_records_are_location_major() {
        let grid = synthetic_grid(&GridSpec::coarse(), sample_base_time());
        let cities = sample_cities();
        let records = forecast_records(&grid, &cities, CAMS_SOURCE).unwrap();

        let leads = grid.lead_hours().len();
        assert_eq!(records.len(), cities.len() * leads);
        assert_eq!(records[0].name, "Paris");
        assert_eq!(records[leads - 1].name, "Paris");
        assert_eq!(records[leads].name, "London");
        assert_eq!(records[1].forecast_range, grid.lead_hours()[1]);
        assert_eq!(
            records[1].valid_time,
            sample_base_time() + Duration::hours(grid.lead_hours()[1] as i64)
        );
    }

    #[test]
    fn test_overall_is_max_of_pollutants() {
        let grid = synthetic_grid(&GridSpec::coarse(), sample_base_time());
        let records = forecast_records(&grid, &sample_cities(), CAMS_SOURCE).unwrap();
        for record in &records {
            assert_eq!(record.pollutants.len(), 5);
            let max = record.pollutants.values().map(|p| p.aqi_level).max();
            assert_eq!(Some(record.overall_aqi_level), max);
            for (pollutant, value) in &record.pollutants {
                assert_eq!(value.aqi_level, classify(value.value, *pollutant));
                assert_eq!(value.units, "µg/m³");
            }
        }
    }
}
