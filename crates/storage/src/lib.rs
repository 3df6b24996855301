//! Persistence for the air-quality pipeline.
//!
//! Provides:
//! - [`DocumentStore`]: idempotent upserts of forecast, texture and in-situ
//!   records keyed on their natural composite keys, plus the time queries
//!   the schedule planners need
//! - [`PgDocumentStore`]: PostgreSQL implementation (JSONB documents)
//! - [`MemoryDocumentStore`]: in-process implementation for tests and dry runs
//! - [`AssetStore`]: texture image bytes through `object_store`

pub mod assets;
pub mod documents;
pub mod memory;
pub mod postgres;

pub use assets::{AssetStore, S3Config};
pub use documents::{
    DocumentStore, Stored, FORECAST_COLLECTION, IN_SITU_COLLECTION, LOCATIONS_COLLECTION,
    TEXTURE_COLLECTION,
};
pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;
