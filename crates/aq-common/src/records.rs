//! Typed documents persisted by the pipeline.
//!
//! Each record exposes the natural composite key it is upserted under.
//! Creation and modification timestamps belong to the store and are not
//! part of these types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aqi::AqiLevel;
use crate::location::GeoPoint;
use crate::pollutant::Pollutant;

/// Source tag for records derived from the CAMS global forecast.
pub const CAMS_SOURCE: &str = "cams-production";

/// Source tag for in-situ measurements.
pub const OPENAQ_SOURCE: &str = "OpenAQ";

/// A pollutant concentration, optionally remembering the value it was
/// converted from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollutantReading {
    pub value: f64,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_unit: Option<String>,
}

impl PollutantReading {
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
            original_value: None,
            original_unit: None,
        }
    }
}

/// Forecast value and AQI level for one pollutant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPollutant {
    pub value: f64,
    pub units: String,
    pub aqi_level: AqiLevel,
}

/// One location at one forecast lead time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub name: String,
    pub location_type: String,
    pub location: GeoPoint,
    pub base_time: DateTime<Utc>,
    pub valid_time: DateTime<Utc>,
    /// Lead time in hours.
    pub forecast_range: u32,
    #[serde(flatten)]
    pub pollutants: BTreeMap<Pollutant, ForecastPollutant>,
    pub overall_aqi_level: AqiLevel,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ForecastKey {
    pub base_time: DateTime<Utc>,
    pub valid_time: DateTime<Utc>,
    pub location_type: String,
    pub name: String,
    pub source: String,
}

impl ForecastRecord {
    pub fn key(&self) -> ForecastKey {
        ForecastKey {
            base_time: self.base_time,
            valid_time: self.valid_time,
            location_type: self.location_type.clone(),
            name: self.name.clone(),
            source: self.source.clone(),
        }
    }
}

/// Metadata for one encoded texture image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureChunk {
    pub variable: String,
    pub base_time: DateTime<Utc>,
    pub source: String,
    pub time_start: DateTime<Utc>,
    pub time_end: DateTime<Utc>,
    /// "i of n", 1-based.
    pub chunk: String,
    pub min_value: f64,
    pub max_value: f64,
    pub units: String,
    pub texture_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureKey {
    pub base_time: DateTime<Utc>,
    pub variable: String,
    pub source: String,
    pub time_start: DateTime<Utc>,
    pub time_end: DateTime<Utc>,
}

impl TextureChunk {
    pub fn key(&self) -> TextureKey {
        TextureKey {
            base_time: self.base_time,
            variable: self.variable.clone(),
            source: self.source.clone(),
            time_start: self.time_start,
            time_end: self.time_end,
        }
    }
}

/// Enrichment and provenance attached to an in-situ record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InSituMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor_type: Option<String>,
    /// Kelvin, nearest grid temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_temperature: Option<f64>,
    /// Pascal, nearest grid surface pressure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_surface_pressure: Option<f64>,
}

/// All pollutants measured at one station during one hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InSituRecord {
    /// City the station was resolved for.
    pub name: String,
    /// Station name.
    pub location_name: String,
    pub location_type: String,
    pub location: GeoPoint,
    pub measurement_date: DateTime<Utc>,
    pub api_source: String,
    #[serde(flatten)]
    pub pollutants: BTreeMap<Pollutant, PollutantReading>,
    pub metadata: InSituMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InSituKey {
    pub location_name: String,
    pub measurement_date: DateTime<Utc>,
    pub name: String,
}

impl InSituRecord {
    pub fn key(&self) -> InSituKey {
        InSituKey {
            location_name: self.location_name.clone(),
            measurement_date: self.measurement_date,
            name: self.name.clone(),
        }
    }
}
