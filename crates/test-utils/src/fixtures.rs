//! Common fixtures: reference locations, base times and OpenAQ v3 payloads.

use aq_common::Location;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

/// A handful of cities spread over both hemispheres and the dateline.
pub fn sample_cities() -> Vec<Location> {
    vec![
        Location::city("Paris", 48.8566, 2.3522),
        Location::city("London", 51.5074, -0.1278),
        Location::city("Sydney", -33.8688, 151.2093),
        Location::city("Suva", -18.1416, 178.4419),
        Location::city("Anchorage", 61.2181, -149.9003),
    ]
}

/// Midnight run used throughout the tests.
pub fn sample_base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 22, 0, 0, 0).unwrap()
}

/// One sensor entry of a `/v3/locations` result.
pub fn openaq_sensor(id: u64, parameter: &str, units: &str) -> Value {
    json!({
        "id": id,
        "name": format!("{} {}", parameter, units),
        "parameter": {
            "id": id % 100,
            "name": parameter,
            "units": units,
            "displayName": parameter.to_uppercase(),
        }
    })
}

/// One station of a `/v3/locations` result.
pub fn openaq_station(
    id: u64,
    name: &str,
    latitude: f64,
    longitude: f64,
    last_seen: DateTime<Utc>,
    sensors: Vec<Value>,
) -> Value {
    json!({
        "id": id,
        "name": name,
        "locality": null,
        "timezone": "UTC",
        "isMobile": false,
        "isMonitor": true,
        "owner": { "id": 4, "name": "Government agency" },
        "provider": { "id": 1, "name": "EEA" },
        "sensors": sensors,
        "coordinates": { "latitude": latitude, "longitude": longitude },
        "datetimeFirst": { "utc": "2016-01-01T00:00:00Z", "local": "2016-01-01T00:00:00+00:00" },
        "datetimeLast": {
            "utc": last_seen.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            "local": last_seen.to_rfc3339(),
        }
    })
}

/// One hourly aggregate of a `/v3/sensors/{id}/hours` result, ending at
/// `hour_end`.
pub fn openaq_hour(parameter: &str, units: &str, value: f64, hour_end: DateTime<Utc>) -> Value {
    let hour_start = hour_end - chrono::Duration::hours(1);
    json!({
        "value": value,
        "parameter": { "id": 2, "name": parameter, "units": units },
        "period": {
            "label": "1hour",
            "interval": "01:00:00",
            "datetimeFrom": {
                "utc": hour_start.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
                "local": hour_start.to_rfc3339(),
            },
            "datetimeTo": {
                "utc": hour_end.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
                "local": hour_end.to_rfc3339(),
            }
        }
    })
}

/// Wrap results in an OpenAQ v3 page envelope.
pub fn openaq_page(results: Vec<Value>, page: u32, limit: u32, found: usize) -> Value {
    json!({
        "meta": {
            "name": "openaq-api",
            "website": "/",
            "page": page,
            "limit": limit,
            "found": found,
        },
        "results": results,
    })
}
