//! In-process document store.

use std::collections::{BTreeMap, BTreeSet};

use aq_common::{
    AqResult, ForecastKey, ForecastRecord, InSituKey, InSituRecord, Location, TextureChunk,
    TextureKey,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::documents::{DocumentStore, Stored};

#[derive(Default)]
struct Collections {
    forecasts: BTreeMap<ForecastKey, Stored<ForecastRecord>>,
    textures: BTreeMap<TextureKey, Stored<TextureChunk>>,
    in_situ: BTreeMap<InSituKey, Stored<InSituRecord>>,
    locations: Vec<Location>,
}

/// Document store backed by ordered maps, keyed like the database tables.
#[derive(Default)]
pub struct MemoryDocumentStore {
    inner: RwLock<Collections>,
}

fn upsert<K: Ord, T>(map: &mut BTreeMap<K, Stored<T>>, key: K, record: T, now: DateTime<Utc>) {
    match map.get_mut(&key) {
        Some(existing) => {
            existing.record = record;
            existing.last_modified_time = now;
        }
        None => {
            map.insert(
                key,
                Stored {
                    record,
                    created_time: now,
                    last_modified_time: now,
                },
            );
        }
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_locations(locations: Vec<Location>) -> Self {
        Self {
            inner: RwLock::new(Collections {
                locations,
                ..Default::default()
            }),
        }
    }

    pub async fn forecasts(&self) -> Vec<Stored<ForecastRecord>> {
        self.inner.read().await.forecasts.values().cloned().collect()
    }

    pub async fn textures(&self) -> Vec<Stored<TextureChunk>> {
        self.inner.read().await.textures.values().cloned().collect()
    }

    pub async fn in_situ(&self) -> Vec<Stored<InSituRecord>> {
        self.inner.read().await.in_situ.values().cloned().collect()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn upsert_forecasts(&self, records: &[ForecastRecord]) -> AqResult<usize> {
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        for record in records {
            upsert(&mut inner.forecasts, record.key(), record.clone(), now);
        }
        debug!(count = records.len(), "Upserted forecast records");
        Ok(records.len())
    }

    async fn upsert_textures(&self, chunks: &[TextureChunk]) -> AqResult<usize> {
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        for chunk in chunks {
            upsert(&mut inner.textures, chunk.key(), chunk.clone(), now);
        }
        debug!(count = chunks.len(), "Upserted texture metadata");
        Ok(chunks.len())
    }

    async fn upsert_in_situ(&self, records: &[InSituRecord]) -> AqResult<usize> {
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        for record in records {
            upsert(&mut inner.in_situ, record.key(), record.clone(), now);
        }
        debug!(count = records.len(), "Upserted in-situ records");
        Ok(records.len())
    }

    async fn forecast_base_times(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AqResult<Vec<DateTime<Utc>>> {
        let inner = self.inner.read().await;
        let times: BTreeSet<DateTime<Utc>> = inner
            .forecasts
            .keys()
            .map(|key| key.base_time)
            .filter(|t| *t >= from && *t <= to)
            .collect();
        Ok(times.into_iter().collect())
    }

    async fn in_situ_timestamps(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AqResult<Vec<DateTime<Utc>>> {
        let inner = self.inner.read().await;
        let times: BTreeSet<DateTime<Utc>> = inner
            .in_situ
            .keys()
            .map(|key| key.measurement_date)
            .filter(|t| *t >= from && *t <= to)
            .collect();
        Ok(times.into_iter().collect())
    }

    async fn locations(&self, location_type: &str) -> AqResult<Vec<Location>> {
        let inner = self.inner.read().await;
        Ok(inner
            .locations
            .iter()
            .filter(|l| l.location_type == location_type)
            .cloned()
            .collect())
    }
}
