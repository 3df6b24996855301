//! One forecast cycle or one in-situ cycle, end to end.
//!
//! ```text
//! forecast:  plan base times ─► fetch grid ─► records ─► upsert
//!                                         └─► textures ─► assets + upsert
//!
//! in-situ:   plan fetch points ─┬─► fetch grid ───────────┐
//!                               └─► fetch cities (serial) ┴─► transform + enrich ─► bulk upsert
//! ```

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, instrument, warn};

use aq_common::{Location, CAMS_SOURCE};
use storage::{AssetStore, DocumentStore};
use texture::{TextureEncoder, DEFAULT_CHUNK_SIZE};

use crate::cams;
use crate::error::{IngestionError, Result};
use crate::forecast::forecast_records;
use crate::insitu::{city_records, MeasurementCache, StationData};
use crate::schedule::{align_base_time, fetch_window, plan_forecast_runs, plan_in_situ_fetches};
use crate::sources::{GridSource, MeasurementSource};

#[derive(Debug, Clone)]
pub struct ForecastCycleOptions {
    pub lookback_days: u32,
    /// Last lead time fetched per run.
    pub max_lead_hour: u32,
    /// Lead times per texture image.
    pub chunk_size: i64,
    pub location_type: String,
}

impl Default for ForecastCycleOptions {
    fn default() -> Self {
        Self {
            lookback_days: 1,
            max_lead_hour: cams::MAX_LEAD_HOUR,
            chunk_size: DEFAULT_CHUNK_SIZE,
            location_type: "city".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InSituCycleOptions {
    pub lookback_days: u32,
    pub location_type: String,
}

impl Default for InSituCycleOptions {
    fn default() -> Self {
        Self {
            lookback_days: 1,
            location_type: "city".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastCycleSummary {
    pub base_times: Vec<DateTime<Utc>>,
    pub forecast_records: usize,
    pub textures: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InSituCycleSummary {
    pub fetch_points: Vec<DateTime<Utc>>,
    pub grid_base_time: Option<DateTime<Utc>>,
    pub cities: usize,
    /// Cities skipped after their provider calls kept failing.
    pub failed_cities: Vec<String>,
    pub records: usize,
}

/// Everything fetched for the cities of one in-situ cycle.
struct CityFetches<'a> {
    fetched: Vec<(&'a Location, Vec<StationData>)>,
    failed: Vec<String>,
}

pub struct Orchestrator {
    store: Arc<dyn DocumentStore>,
    assets: Arc<AssetStore>,
    grids: Arc<dyn GridSource>,
    measurements: Option<Arc<dyn MeasurementSource>>,
    cache: Option<MeasurementCache>,
    locations: Option<Vec<Location>>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        assets: Arc<AssetStore>,
        grids: Arc<dyn GridSource>,
    ) -> Self {
        Self {
            store,
            assets,
            grids,
            measurements: None,
            cache: None,
            locations: None,
        }
    }

    /// Provider for in-situ cycles.
    pub fn with_measurements(mut self, measurements: Arc<dyn MeasurementSource>) -> Self {
        self.measurements = Some(measurements);
        self
    }

    /// Read in-situ responses from `cache` where available.
    pub fn with_cache(mut self, cache: MeasurementCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Use these locations instead of the store's `locations` collection.
    pub fn with_locations(mut self, locations: Vec<Location>) -> Self {
        self.locations = Some(locations);
        self
    }

    async fn locations(&self, location_type: &str) -> Result<Vec<Location>> {
        match &self.locations {
            Some(locations) => Ok(locations
                .iter()
                .filter(|l| l.location_type == location_type)
                .cloned()
                .collect()),
            None => Ok(self.store.locations(location_type).await?),
        }
    }

    /// Fetch, transform and persist every forecast run of the lookback
    /// window that is not stored yet.
    #[instrument(skip(self, options), fields(now = %now, lookback_days = options.lookback_days))]
    pub async fn run_forecast_cycle(
        &self,
        now: DateTime<Utc>,
        options: &ForecastCycleOptions,
    ) -> Result<ForecastCycleSummary> {
        let locations = self.locations(&options.location_type).await?;
        if locations.is_empty() {
            warn!(location_type = %options.location_type, "No locations to forecast for");
        }

        let window_start = now - Duration::days(options.lookback_days as i64);
        let stored = self.store.forecast_base_times(window_start, now).await?;
        let planned = plan_forecast_runs(now, options.lookback_days, &stored)?;
        info!(planned = planned.len(), stored = stored.len(), "Planned forecast runs");

        let lead_hours = cams::lead_hours(options.max_lead_hour);
        let encoder = TextureEncoder::new(options.chunk_size);
        let mut summary = ForecastCycleSummary::default();

        for base_time in planned {
            let grid = Arc::new(self.grids.fetch_grid(base_time, &lead_hours).await?);

            let records = forecast_records(&grid, &locations, CAMS_SOURCE)?;
            summary.forecast_records += self.store.upsert_forecasts(&records).await?;

            let chunks = encoder.write(&grid, &self.assets).await?;
            summary.textures += self.store.upsert_textures(&chunks).await?;

            info!(
                base_time = %base_time,
                records = records.len(),
                textures = chunks.len(),
                "Stored forecast run"
            );
            summary.base_times.push(base_time);
        }

        Ok(summary)
    }

    /// Fetch in-situ measurements for every incomplete day of the lookback
    /// window, enrich them from the forecast grid and persist them in one
    /// bulk upsert.
    #[instrument(skip(self, options), fields(now = %now, lookback_days = options.lookback_days))]
    pub async fn run_in_situ_cycle(
        &self,
        now: DateTime<Utc>,
        options: &InSituCycleOptions,
    ) -> Result<InSituCycleSummary> {
        let measurements = self.measurements.as_deref().ok_or_else(|| {
            IngestionError::Configuration("no in-situ measurement source configured".to_string())
        })?;
        let days = options.lookback_days;
        let cities = self.locations(&options.location_type).await?;

        let earliest = now - Duration::hours(24 * (days as i64 + 1));
        let stored = self.store.in_situ_timestamps(earliest, now).await?;
        let points = plan_in_situ_fetches(now, days, &stored);

        let grid_base = align_base_time(now - Duration::days(days as i64), now)?;
        let span_hours = (now - grid_base).num_hours().max(0) as u32;
        let lead_hours = cams::lead_hours(span_hours + 24);
        info!(
            fetch_points = points.len(),
            grid_base_time = %grid_base,
            cities = cities.len(),
            "Planned in-situ cycle"
        );

        let (grid, fetches) = tokio::try_join!(
            self.grids.fetch_grid(grid_base, &lead_hours),
            self.fetch_cities(measurements, &cities, &points),
        )?;

        let mut records = Vec::new();
        for (city, stations) in &fetches.fetched {
            records.extend(city_records(city, stations, &grid)?);
        }

        let written = if records.is_empty() {
            0
        } else {
            self.store.upsert_in_situ(&records).await?
        };
        info!(
            records = written,
            failed_cities = fetches.failed.len(),
            "Stored in-situ measurements"
        );

        Ok(InSituCycleSummary {
            fetch_points: points,
            grid_base_time: Some(grid_base),
            cities: cities.len(),
            failed_cities: fetches.failed,
            records: written,
        })
    }

    /// Cities one after another. Provider failures skip the city; anything
    /// else aborts.
    async fn fetch_cities<'a>(
        &self,
        measurements: &dyn MeasurementSource,
        cities: &'a [Location],
        points: &[DateTime<Utc>],
    ) -> Result<CityFetches<'a>> {
        let mut fetches = CityFetches {
            fetched: Vec::with_capacity(cities.len()),
            failed: Vec::new(),
        };

        for city in cities {
            match self.fetch_city(measurements, city, points).await {
                Ok(stations) => fetches.fetched.push((city, stations)),
                Err(e) if e.is_transient() => {
                    error!(city = %city.name, error = %e, "In-situ fetch failed, skipping city");
                    fetches.failed.push(city.name.clone());
                }
                Err(e) => return Err(e),
            }
        }

        Ok(fetches)
    }

    async fn fetch_city(
        &self,
        measurements: &dyn MeasurementSource,
        city: &Location,
        points: &[DateTime<Utc>],
    ) -> Result<Vec<StationData>> {
        let mut stations = Vec::new();
        for &point in points {
            let (from, to) = fetch_window(point);
            if let Some(cache) = &self.cache {
                if let Some(cached) = cache.load(city, from, to).await? {
                    stations.extend(cached);
                    continue;
                }
            }
            stations.extend(measurements.fetch_city(city, from, to).await?);
        }
        Ok(stations)
    }
}
