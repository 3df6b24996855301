//! Air-quality ingester.
//!
//! Runs one forecast or in-situ cycle against CAMS and OpenAQ, persisting
//! records to PostgreSQL and textures to local disk or S3.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use config::{load_locations, IngesterConfig};
use ingestion::{
    CamsClient, ForecastCycleOptions, InSituCycleOptions, MeasurementCache, OpenAqClient,
    Orchestrator, RateLimiter,
};
use storage::{AssetStore, DocumentStore, MemoryDocumentStore, PgDocumentStore};
use texture::DEFAULT_CHUNK_SIZE;

#[derive(Parser, Debug)]
#[command(name = "ingester")]
#[command(about = "Air-quality forecast and in-situ ingester")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// YAML location list used instead of the locations collection
    #[arg(long, env = "LOCATIONS_FILE")]
    locations: Option<PathBuf>,

    /// Keep records in memory instead of writing to the database
    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch and store forecast runs that are missing from the lookback window
    Forecast {
        #[arg(long, default_value_t = 1)]
        lookback_days: u32,

        /// Lead times per texture image (<= 0 for a single image)
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE, allow_hyphen_values = true)]
        chunk_size: i64,

        #[arg(long, default_value_t = ingestion::cams::MAX_LEAD_HOUR)]
        max_lead_hour: u32,
    },
    /// Fetch station measurements for incomplete days of the lookback window
    Insitu {
        #[arg(long, default_value_t = 1)]
        lookback_days: u32,

        /// Station search radius around each city, in metres
        #[arg(long, default_value_t = 25_000)]
        radius: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    atmos_grid::validate_field_table().context("Grid field table is inconsistent")?;

    let config = IngesterConfig::from_env();
    info!(
        ads_url = %config.ads_url,
        openaq_url = %config.openaq_url,
        dry_run = args.dry_run,
        "Starting air-quality ingester"
    );

    // Credentials are checked before anything touches the network
    let cams = CamsClient::new(config.cams()?)?;
    let openaq = match &args.command {
        Command::Insitu { radius, .. } => Some(OpenAqClient::new(
            config.openaq(*radius)?,
            Arc::new(RateLimiter::new()),
        )?),
        Command::Forecast { .. } => None,
    };

    let store: Arc<dyn DocumentStore> = if args.dry_run {
        Arc::new(MemoryDocumentStore::new())
    } else {
        let store = PgDocumentStore::connect(config.database_url()?).await?;
        store.migrate().await?;
        Arc::new(store)
    };

    let assets = match &config.s3 {
        Some(s3) => AssetStore::s3(s3)?,
        None => AssetStore::local(&config.texture_root)?,
    };

    let mut orchestrator = Orchestrator::new(store, Arc::new(assets), Arc::new(cams));
    if let Some(path) = &args.locations {
        let locations = load_locations(path)?;
        info!(path = %path.display(), count = locations.len(), "Loaded locations file");
        orchestrator = orchestrator.with_locations(locations);
    }
    if let Some(openaq) = openaq {
        orchestrator = orchestrator.with_measurements(Arc::new(openaq));
    }
    if let Some(dir) = &config.insitu_cache_dir {
        orchestrator = orchestrator.with_cache(MeasurementCache::new(dir));
    }

    let now = Utc::now();
    match args.command {
        Command::Forecast {
            lookback_days,
            chunk_size,
            max_lead_hour,
        } => {
            let options = ForecastCycleOptions {
                lookback_days,
                max_lead_hour,
                chunk_size,
                ..ForecastCycleOptions::default()
            };
            let summary = orchestrator.run_forecast_cycle(now, &options).await?;
            info!(
                runs = summary.base_times.len(),
                records = summary.forecast_records,
                textures = summary.textures,
                "Forecast cycle complete"
            );
        }
        Command::Insitu { lookback_days, .. } => {
            let options = InSituCycleOptions {
                lookback_days,
                ..InSituCycleOptions::default()
            };
            let summary = orchestrator.run_in_situ_cycle(now, &options).await?;
            info!(
                fetches = summary.fetch_points.len(),
                cities = summary.cities,
                failed = ?summary.failed_cities,
                records = summary.records,
                "In-situ cycle complete"
            );
        }
    }

    Ok(())
}
