//! OpenAQ v3 payloads and the measurements parsed from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use aq_common::Pollutant;

/// Page envelope of every OpenAQ v3 list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    pub meta: PageMeta,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    /// A count, or a string such as ">1000" for large result sets.
    #[serde(default)]
    pub found: Value,
}

impl PageMeta {
    pub fn found_count(&self) -> Option<u64> {
        self.found.as_u64()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Named {
    #[serde(default)]
    pub id: Option<u64>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateTimeField {
    pub utc: DateTime<Utc>,
    #[serde(default)]
    pub local: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub id: u64,
    pub name: String,
    pub units: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    pub parameter: Parameter,
}

impl Sensor {
    pub fn pollutant(&self) -> Option<Pollutant> {
        Pollutant::from_openaq_parameter(&self.parameter.name)
    }
}

/// A monitoring station from `/v3/locations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_monitor: bool,
    #[serde(default)]
    pub owner: Option<Named>,
    #[serde(default)]
    pub provider: Option<Named>,
    #[serde(default)]
    pub sensors: Vec<Sensor>,
    pub coordinates: Coordinates,
    #[serde(default)]
    pub datetime_last: Option<DateTimeField>,
}

impl Station {
    /// Station name, or a stable stand-in for unnamed stations.
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("OpenAQ location {}", self.id))
    }

    pub fn last_seen(&self) -> Option<DateTime<Utc>> {
        self.datetime_last.as_ref().map(|d| d.utc)
    }

    /// Sensors measuring one of the tracked pollutants.
    pub fn supported_sensors(&self) -> impl Iterator<Item = &Sensor> {
        self.sensors.iter().filter(|s| s.pollutant().is_some())
    }

    /// Operator of the station.
    pub fn entity(&self) -> Option<String> {
        self.owner.as_ref().map(|o| o.name.clone())
    }

    pub fn sensor_type(&self) -> &'static str {
        if self.is_monitor {
            "reference grade"
        } else {
            "low-cost sensor"
        }
    }
}

/// A station with the raw hourly aggregates fetched for its sensors.
///
/// Hours stay unparsed JSON until the transform so a malformed entry is
/// reported where it is interpreted. This is also the on-disk cache format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationData {
    pub station: Station,
    pub hours: Vec<Value>,
}

/// One parsed reading. Never persisted as such.
#[derive(Debug, Clone, PartialEq)]
pub struct StationMeasurement {
    pub parameter: String,
    pub value: f64,
    pub unit: String,
    /// End of the averaging hour.
    pub timestamp: DateTime<Utc>,
    pub station_id: u64,
    pub station_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub entity: Option<String>,
    pub sensor_type: Option<String>,
}
