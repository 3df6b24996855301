//! CAMS global composition forecasts from the Atmosphere Data Store.
//!
//! A retrieval is a job: the request is submitted, its status polled until
//! the archive is ready, then the result is downloaded. Each cycle needs two
//! jobs, one per grid level.

use std::time::Duration;

use async_trait::async_trait;
use atmos_grid::{decode_grib_bytes, AtmosphericGrid, GridField, GridLevel, SURFACE_MODEL_LEVEL};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use crate::error::{IngestionError, Result};
use crate::http::{base_url, check_status, json_body};
use crate::retry::RetryPolicy;
use crate::sources::GridSource;

pub const CAMS_DATASET: &str = "cams-global-atmospheric-composition-forecasts";

/// Longest lead time the forecast is published for.
pub const MAX_LEAD_HOUR: u32 = 120;

/// Lead-time step between forecast fields.
pub const LEAD_HOUR_STEP: u32 = 3;

const AUTH_HEADER: &str = "PRIVATE-TOKEN";

/// Lead times `0, 3, ..` up to `max_hour`, capped at what is published.
pub fn lead_hours(max_hour: u32) -> Vec<u32> {
    (0..=max_hour.min(MAX_LEAD_HOUR))
        .step_by(LEAD_HOUR_STEP as usize)
        .collect()
}

/// One retrieval for one grid level.
#[derive(Debug, Clone, PartialEq)]
pub struct CamsRequest {
    pub base_time: DateTime<Utc>,
    pub level: GridLevel,
    pub lead_hours: Vec<u32>,
}

impl CamsRequest {
    pub fn new(base_time: DateTime<Utc>, level: GridLevel, lead_hours: &[u32]) -> Self {
        Self {
            base_time,
            level,
            lead_hours: lead_hours.to_vec(),
        }
    }

    /// Request body `inputs` as the ADS expects them.
    pub fn inputs(&self) -> Value {
        let date = self.base_time.format("%Y-%m-%d").to_string();
        let variables: Vec<&str> = GridField::for_level(self.level)
            .iter()
            .map(|f| f.request_name())
            .collect();
        let leads: Vec<String> = self.lead_hours.iter().map(|h| h.to_string()).collect();

        let mut inputs = json!({
            "date": [format!("{}/{}", date, date)],
            "type": ["forecast"],
            "format": "grib",
            "variable": variables,
            "time": [self.base_time.format("%H:%M").to_string()],
            "leadtime_hour": leads,
        });
        if self.level == GridLevel::ModelLevel {
            inputs["model_level"] = json!([SURFACE_MODEL_LEVEL.to_string()]);
        }
        inputs
    }
}

#[derive(Debug, Clone)]
pub struct CamsConfig {
    /// ADS API root, e.g. `https://ads.atmosphere.copernicus.eu/api`
    pub url: String,
    pub key: String,
    pub poll_interval: Duration,
    /// Polls before a job is given up as stuck.
    pub max_polls: u32,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
}

impl CamsConfig {
    pub fn new(url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key: key.into(),
            poll_interval: Duration::from_secs(5),
            max_polls: 720,
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Deserialize)]
struct JobStatus {
    #[serde(rename = "jobID")]
    job_id: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct JobResults {
    asset: Asset,
}

#[derive(Debug, Deserialize)]
struct Asset {
    value: AssetValue,
}

#[derive(Debug, Deserialize)]
struct AssetValue {
    href: String,
}

pub struct CamsClient {
    http: Client,
    config: CamsConfig,
}

impl CamsClient {
    pub fn new(config: CamsConfig) -> Result<Self> {
        if config.key.trim().is_empty() {
            return Err(IngestionError::Configuration(
                "ADS API key is not set".to_string(),
            ));
        }
        if config.url.trim().is_empty() {
            return Err(IngestionError::Configuration(
                "ADS API URL is not set".to_string(),
            ));
        }

        let http = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { http, config })
    }

    /// Submit, wait for and download one retrieval, retrying the whole
    /// round trip on transient failures.
    #[instrument(skip_all, fields(base_time = %request.base_time, level = %request.level))]
    pub async fn retrieve(&self, request: &CamsRequest) -> Result<Bytes> {
        let scope = format!("CAMS {} {}", request.base_time.format("%Y-%m-%d %H"), request.level);
        let bytes = self
            .config
            .retry
            .run(&scope, move || self.retrieve_once(request))
            .await?;

        info!(size = bytes.len(), "Downloaded forecast");
        Ok(bytes)
    }

    async fn retrieve_once(&self, request: &CamsRequest) -> Result<Bytes> {
        let job_id = self.submit(request).await?;
        self.wait_for(&job_id).await?;
        self.download(&job_id).await
    }

    async fn submit(&self, request: &CamsRequest) -> Result<String> {
        let url = format!(
            "{}/retrieve/v1/processes/{}/execution",
            base_url(&self.config.url),
            CAMS_DATASET
        );
        let response = self
            .http
            .post(&url)
            .header(AUTH_HEADER, &self.config.key)
            .json(&json!({ "inputs": request.inputs() }))
            .send()
            .await?;
        let job: JobStatus = json_body(response, "ADS submit").await?;

        debug!(job_id = %job.job_id, status = %job.status, "Submitted retrieval");
        Ok(job.job_id)
    }

    async fn wait_for(&self, job_id: &str) -> Result<()> {
        let url = format!("{}/retrieve/v1/jobs/{}", base_url(&self.config.url), job_id);

        for poll in 0..self.config.max_polls {
            let response = self
                .http
                .get(&url)
                .header(AUTH_HEADER, &self.config.key)
                .send()
                .await?;
            let job: JobStatus = json_body(response, "ADS status").await?;

            match job.status.as_str() {
                "successful" => return Ok(()),
                "failed" => {
                    return Err(IngestionError::transient(
                        "ADS",
                        format!("job {} failed", job_id),
                    ))
                }
                "rejected" | "dismissed" => {
                    return Err(IngestionError::DataValidation(format!(
                        "ADS job {} was {}",
                        job_id, job.status
                    )))
                }
                status => {
                    debug!(job_id = %job_id, status = %status, poll = poll, "Waiting for retrieval");
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
        }

        Err(IngestionError::transient(
            "ADS",
            format!("job {} not ready after {} polls", job_id, self.config.max_polls),
        ))
    }

    async fn download(&self, job_id: &str) -> Result<Bytes> {
        let url = format!(
            "{}/retrieve/v1/jobs/{}/results",
            base_url(&self.config.url),
            job_id
        );
        let response = self
            .http
            .get(&url)
            .header(AUTH_HEADER, &self.config.key)
            .send()
            .await?;
        let results: JobResults = json_body(response, "ADS results").await?;

        let response = self.http.get(&results.asset.value.href).send().await?;
        Ok(check_status(response, "ADS download").await?.bytes().await?)
    }
}

#[async_trait]
impl GridSource for CamsClient {
    async fn fetch_grid(
        &self,
        base_time: DateTime<Utc>,
        lead_hours: &[u32],
    ) -> Result<AtmosphericGrid> {
        let single = CamsRequest::new(base_time, GridLevel::SingleLevel, lead_hours);
        let model = CamsRequest::new(base_time, GridLevel::ModelLevel, lead_hours);

        let (single_bytes, model_bytes) =
            tokio::try_join!(self.retrieve(&single), self.retrieve(&model))?;

        // Decoding a global run is CPU-bound; keep it off the async workers
        let grid = tokio::task::spawn_blocking(move || {
            let single = decode_grib_bytes(&single_bytes, base_time, GridLevel::SingleLevel)?;
            let model = decode_grib_bytes(&model_bytes, base_time, GridLevel::ModelLevel)?;
            AtmosphericGrid::from_raw(single, model)
        })
        .await??;
        Ok(grid)
    }
}
