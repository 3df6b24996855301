//! Pre-fetched in-situ responses on disk.
//!
//! A file `<dir>/<city>_<from>_<to>.json` holds the [`StationData`] list
//! for one city and fetch window. When present it replaces the network
//! call. The pipeline only reads these files.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::debug;

use aq_common::Location;

use crate::error::{IngestionError, Result};
use crate::insitu::models::StationData;

const STAMP_FORMAT: &str = "%Y%m%dT%H%M";

#[derive(Debug, Clone)]
pub struct MeasurementCache {
    dir: PathBuf,
}

impl MeasurementCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File holding `city`'s measurements for `(from, to]`.
    pub fn path_for(&self, city: &Location, from: DateTime<Utc>, to: DateTime<Utc>) -> PathBuf {
        let name: String = city
            .name
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!(
            "{}_{}_{}.json",
            name,
            from.format(STAMP_FORMAT),
            to.format(STAMP_FORMAT)
        ))
    }

    /// Cached measurements, or `None` when no file exists.
    pub async fn load(
        &self,
        city: &Location,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Option<Vec<StationData>>> {
        let path = self.path_for(city, from, to);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let stations: Vec<StationData> = serde_json::from_slice(&bytes).map_err(|e| {
            IngestionError::DataValidation(format!("cache file {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), stations = stations.len(), "Loaded cached measurements");
        Ok(Some(stations))
    }
}
