//! Raw OpenAQ hours to merged per-station, per-hour records.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::Deserialize;
use serde_json::Value;

use aq_common::{
    InSituMetadata, InSituRecord, Location, Pollutant, PollutantReading,
    MICROGRAMS_PER_CUBIC_METRE, OPENAQ_SOURCE,
};

use crate::error::{IngestionError, Result};
use crate::insitu::models::{DateTimeField, Parameter, Station, StationMeasurement};

pub const PPM: &str = "ppm";

/// Placeholder values some networks report instead of leaving a gap.
pub const SENTINEL_VALUES: [f64; 4] = [-999.0, -9999.0, 9999.0, 99999.0];

#[derive(Debug, Deserialize)]
struct HourlyValue {
    value: f64,
    parameter: Parameter,
    period: Period,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Period {
    datetime_to: DateTimeField,
}

/// Interpret one hourly aggregate of `station`.
///
/// The reading is stamped with the end of its hour.
pub fn parse_measurement(station: &Station, raw: &Value) -> Result<StationMeasurement> {
    let hour = HourlyValue::deserialize(raw).map_err(|e| {
        IngestionError::DataValidation(format!(
            "malformed measurement from station {}: {}",
            station.id, e
        ))
    })?;

    let timestamp = truncate_to_hour(hour.period.datetime_to.utc)?;

    Ok(StationMeasurement {
        parameter: hour.parameter.name,
        value: hour.value,
        unit: hour.parameter.units.trim().to_string(),
        timestamp,
        station_id: station.id,
        station_name: station.display_name(),
        latitude: station.coordinates.latitude,
        longitude: station.coordinates.longitude,
        entity: station.entity(),
        sensor_type: Some(station.sensor_type().to_string()),
    })
}

fn truncate_to_hour(timestamp: DateTime<Utc>) -> Result<DateTime<Utc>> {
    timestamp
        .duration_trunc(Duration::hours(1))
        .map_err(|e| IngestionError::DataValidation(format!("bad timestamp {}: {}", timestamp, e)))
}

/// Supported pollutant, supported unit, positive and not a placeholder.
/// Readings in ppm also need a molar mass to be converted later.
pub fn is_usable(measurement: &StationMeasurement) -> bool {
    let Some(pollutant) = Pollutant::from_openaq_parameter(&measurement.parameter) else {
        return false;
    };
    let unit_ok = measurement.unit == MICROGRAMS_PER_CUBIC_METRE
        || (measurement.unit == PPM && pollutant.molecular_weight().is_some());
    unit_ok && measurement.value > 0.0 && !SENTINEL_VALUES.contains(&measurement.value)
}

/// Merge measurements into one record per (station, hour) for `city`.
///
/// A pollutant reported twice in one hour keeps the later reading.
pub fn group_by_station_hour(
    city: &Location,
    measurements: Vec<StationMeasurement>,
) -> Vec<InSituRecord> {
    let mut grouped: BTreeMap<(String, DateTime<Utc>), InSituRecord> = BTreeMap::new();

    for measurement in measurements {
        let Some(pollutant) = Pollutant::from_openaq_parameter(&measurement.parameter) else {
            continue;
        };
        let key = (measurement.station_name.clone(), measurement.timestamp);
        let record = grouped.entry(key).or_insert_with(|| InSituRecord {
            name: city.name.clone(),
            location_name: measurement.station_name.clone(),
            location_type: city.location_type.clone(),
            location: aq_common::GeoPoint::new(measurement.latitude, measurement.longitude),
            measurement_date: measurement.timestamp,
            api_source: OPENAQ_SOURCE.to_string(),
            pollutants: BTreeMap::new(),
            metadata: InSituMetadata {
                entity: measurement.entity.clone(),
                sensor_type: measurement.sensor_type.clone(),
                ..InSituMetadata::default()
            },
        });
        record.pollutants.insert(
            pollutant,
            PollutantReading::new(measurement.value, measurement.unit),
        );
    }

    grouped.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{openaq_hour, openaq_sensor, openaq_station, sample_base_time};

    fn station() -> Station {
        serde_json::from_value(openaq_station(
            7,
            "Paris Centre",
            48.86,
            2.35,
            sample_base_time(),
            vec![openaq_sensor(70, "no2", "µg/m³")],
        ))
        .unwrap()
    }

    fn measurement(parameter: &str, unit: &str, value: f64) -> StationMeasurement {
        parse_measurement(
            &station(),
            &openaq_hour(parameter, unit, value, sample_base_time()),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_hour() {
        let m = measurement("no2", "µg/m³", 21.5);
        assert_eq!(m.value, 21.5);
        assert_eq!(m.timestamp, sample_base_time());
        assert_eq!(m.station_name, "Paris Centre");
        assert_eq!(m.entity.as_deref(), Some("Government agency"));
    }

    #[test]
    fn test_parse_rejects_missing_value() {
        let mut raw = openaq_hour("no2", "µg/m³", 1.0, sample_base_time());
        raw["value"] = Value::Null;
        let err = parse_measurement(&station(), &raw).unwrap_err();
        assert!(matches!(err, IngestionError::DataValidation(_)));
    }

    #[test]
    fn test_usable_filter() {
        assert!(is_usable(&measurement("no2", "µg/m³", 21.5)));
        assert!(is_usable(&measurement("o3", "ppm", 0.03)));
        assert!(!is_usable(&measurement("no2", "ppb", 21.5)));
        assert!(!is_usable(&measurement("no2", "µg/m³", 0.0)));
        assert!(!is_usable(&measurement("no2", "µg/m³", -999.0)));
        assert!(!is_usable(&measurement("pm10", "µg/m³", 9999.0)));
        assert!(!is_usable(&measurement("co", "µg/m³", 300.0)));
    }

    #[test]
    fn test_ppm_needs_a_molar_mass() {
        assert!(is_usable(&measurement("so2", "ppm", 0.002)));
        assert!(!is_usable(&measurement("pm25", "ppm", 0.01)));
        assert!(!is_usable(&measurement("pm10", "ppm", 0.01)));
        assert!(is_usable(&measurement("pm25", "µg/m³", 12.0)));
    }

    #[test]
    fn test_grouping_merges_pollutants_per_hour() {
        let city = Location::city("Paris", 48.8566, 2.3522);
        let mut later = measurement("no2", "µg/m³", 30.0);
        later.timestamp += Duration::hours(1);
        let records = group_by_station_hour(
            &city,
            vec![
                measurement("no2", "µg/m³", 21.5),
                measurement("pm25", "µg/m³", 8.0),
                later,
            ],
        );

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].pollutants.len(), 2);
        assert!(records[0].pollutants.contains_key(&Pollutant::Pm2_5));
        assert_eq!(records[0].name, "Paris");
        assert_eq!(records[0].location_name, "Paris Centre");
        assert_eq!(records[0].api_source, "OpenAQ");
        assert_eq!(records[1].pollutants[&Pollutant::NitrogenDioxide].value, 30.0);
    }
}
