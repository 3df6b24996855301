//! PostgreSQL document store.
//!
//! Each collection is a table with the natural key as primary key and the
//! full record in a JSONB `document` column.

use aq_common::{
    AqError, AqResult, ForecastRecord, InSituRecord, Location, TextureChunk,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, types::Json, FromRow, PgPool};
use tracing::{info, instrument};

use crate::documents::DocumentStore;

pub struct PgDocumentStore {
    pool: PgPool,
}

fn db_error(context: &str, err: sqlx::Error) -> AqError {
    AqError::Persistence(format!("{}: {}", context, err))
}

impl PgDocumentStore {
    /// Connect to the database at `database_url`.
    pub async fn connect(database_url: &str) -> AqResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| db_error("Connection failed", e))?;

        Ok(Self { pool })
    }

    /// Create the collection tables if they do not exist.
    pub async fn migrate(&self) -> AqResult<()> {
        for statement in SCHEMA_SQL.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| db_error("Migration failed", e))?;
            }
        }

        Ok(())
    }
}

#[derive(FromRow)]
struct LocationRow {
    name: String,
    location_type: String,
    latitude: f64,
    longitude: f64,
}

impl From<LocationRow> for Location {
    fn from(row: LocationRow) -> Self {
        Location {
            name: row.name,
            latitude: row.latitude,
            longitude: row.longitude,
            location_type: row.location_type,
        }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn upsert_forecasts(&self, records: &[ForecastRecord]) -> AqResult<usize> {
        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Begin failed", e))?;

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO forecast_data (
                    base_time, valid_time, location_type, name, source,
                    document, created_time, last_modified_time
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
                ON CONFLICT (base_time, valid_time, location_type, name, source)
                DO UPDATE SET
                    document = EXCLUDED.document,
                    last_modified_time = EXCLUDED.last_modified_time
                "#,
            )
            .bind(record.base_time)
            .bind(record.valid_time)
            .bind(&record.location_type)
            .bind(&record.name)
            .bind(&record.source)
            .bind(Json(record))
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Forecast upsert failed", e))?;
        }

        tx.commit().await.map_err(|e| db_error("Commit failed", e))?;
        info!("Upserted forecast records");
        Ok(records.len())
    }

    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    async fn upsert_textures(&self, chunks: &[TextureChunk]) -> AqResult<usize> {
        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Begin failed", e))?;

        for chunk in chunks {
            sqlx::query(
                r#"
                INSERT INTO data_textures (
                    base_time, variable, source, time_start, time_end,
                    document, created_time, last_modified_time
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
                ON CONFLICT (base_time, variable, source, time_start, time_end)
                DO UPDATE SET
                    document = EXCLUDED.document,
                    last_modified_time = EXCLUDED.last_modified_time
                "#,
            )
            .bind(chunk.base_time)
            .bind(&chunk.variable)
            .bind(&chunk.source)
            .bind(chunk.time_start)
            .bind(chunk.time_end)
            .bind(Json(chunk))
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Texture upsert failed", e))?;
        }

        tx.commit().await.map_err(|e| db_error("Commit failed", e))?;
        info!("Upserted texture metadata");
        Ok(chunks.len())
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn upsert_in_situ(&self, records: &[InSituRecord]) -> AqResult<usize> {
        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Begin failed", e))?;

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO in_situ_data (
                    location_name, measurement_date, name,
                    document, created_time, last_modified_time
                ) VALUES ($1, $2, $3, $4, $5, $5)
                ON CONFLICT (location_name, measurement_date, name)
                DO UPDATE SET
                    document = EXCLUDED.document,
                    last_modified_time = EXCLUDED.last_modified_time
                "#,
            )
            .bind(&record.location_name)
            .bind(record.measurement_date)
            .bind(&record.name)
            .bind(Json(record))
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("In-situ upsert failed", e))?;
        }

        tx.commit().await.map_err(|e| db_error("Commit failed", e))?;
        info!("Upserted in-situ records");
        Ok(records.len())
    }

    async fn forecast_base_times(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AqResult<Vec<DateTime<Utc>>> {
        sqlx::query_scalar::<_, DateTime<Utc>>(
            "SELECT DISTINCT base_time FROM forecast_data \
             WHERE base_time >= $1 AND base_time <= $2 \
             ORDER BY base_time",
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Query failed", e))
    }

    async fn in_situ_timestamps(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AqResult<Vec<DateTime<Utc>>> {
        sqlx::query_scalar::<_, DateTime<Utc>>(
            "SELECT DISTINCT measurement_date FROM in_situ_data \
             WHERE measurement_date >= $1 AND measurement_date <= $2 \
             ORDER BY measurement_date",
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Query failed", e))
    }

    async fn locations(&self, location_type: &str) -> AqResult<Vec<Location>> {
        let rows = sqlx::query_as::<_, LocationRow>(
            "SELECT name, location_type, latitude, longitude FROM locations \
             WHERE location_type = $1 ORDER BY name",
        )
        .bind(location_type)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Query failed", e))?;

        Ok(rows.into_iter().map(Location::from).collect())
    }
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS forecast_data (
    base_time TIMESTAMPTZ NOT NULL,
    valid_time TIMESTAMPTZ NOT NULL,
    location_type VARCHAR(50) NOT NULL,
    name VARCHAR(200) NOT NULL,
    source VARCHAR(50) NOT NULL,
    document JSONB NOT NULL,
    created_time TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    last_modified_time TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    PRIMARY KEY (base_time, valid_time, location_type, name, source)
);

CREATE INDEX IF NOT EXISTS idx_forecast_data_base_time ON forecast_data(base_time);

CREATE TABLE IF NOT EXISTS data_textures (
    base_time TIMESTAMPTZ NOT NULL,
    variable VARCHAR(50) NOT NULL,
    source VARCHAR(50) NOT NULL,
    time_start TIMESTAMPTZ NOT NULL,
    time_end TIMESTAMPTZ NOT NULL,
    document JSONB NOT NULL,
    created_time TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    last_modified_time TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    PRIMARY KEY (base_time, variable, source, time_start, time_end)
);

CREATE TABLE IF NOT EXISTS in_situ_data (
    location_name VARCHAR(200) NOT NULL,
    measurement_date TIMESTAMPTZ NOT NULL,
    name VARCHAR(200) NOT NULL,
    document JSONB NOT NULL,
    created_time TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    last_modified_time TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    PRIMARY KEY (location_name, measurement_date, name)
);

CREATE INDEX IF NOT EXISTS idx_in_situ_data_measurement_date ON in_situ_data(measurement_date);

CREATE TABLE IF NOT EXISTS locations (
    name VARCHAR(200) NOT NULL,
    location_type VARCHAR(50) NOT NULL,
    latitude DOUBLE PRECISION NOT NULL,
    longitude DOUBLE PRECISION NOT NULL,

    PRIMARY KEY (name, location_type)
)
"#;
