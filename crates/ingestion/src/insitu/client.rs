//! OpenAQ v3 client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use aq_common::Location;

use crate::error::{IngestionError, Result};
use crate::http::{base_url, json_body};
use crate::insitu::models::{Page, Station, StationData};
use crate::insitu::rate_limit::{header_number, RateLimiter};
use crate::retry::RetryPolicy;
use crate::sources::MeasurementSource;

const API_KEY_HEADER: &str = "X-API-Key";
const RETRY_AFTER_HEADER: &str = "retry-after";

#[derive(Debug, Clone)]
pub struct OpenAqConfig {
    pub url: String,
    pub api_key: String,
    /// Search radius around a city, metres (OpenAQ caps it at 25 km).
    pub radius_m: u32,
    pub page_limit: u32,
    /// Upper bound on pages read per listing.
    pub max_pages: u32,
    /// Waits granted on HTTP 429 before giving up.
    pub rate_limit_retries: u32,
    /// Wait on HTTP 429 without a `retry-after` header.
    pub default_retry_after: Duration,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
}

impl OpenAqConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            radius_m: 25_000,
            page_limit: 1000,
            max_pages: 100,
            rate_limit_retries: 3,
            default_retry_after: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

pub struct OpenAqClient {
    http: Client,
    config: OpenAqConfig,
    limiter: Arc<RateLimiter>,
}

impl OpenAqClient {
    pub fn new(config: OpenAqConfig, limiter: Arc<RateLimiter>) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(IngestionError::Configuration(
                "OpenAQ API key is not set".to_string(),
            ));
        }
        if config.page_limit == 0 {
            return Err(IngestionError::Configuration(
                "OpenAQ page limit must be positive".to_string(),
            ));
        }

        let http = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            config,
            limiter,
        })
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// One GET, waiting out 429 responses.
    async fn get_once(&self, scope: &str, path: &str, query: &[(String, String)]) -> Result<Value> {
        let url = format!("{}{}", base_url(&self.config.url), path);
        let mut rate_limited = 0;

        loop {
            self.limiter.acquire().await;
            let response = self
                .http
                .get(&url)
                .header(API_KEY_HEADER, &self.config.api_key)
                .query(query)
                .send()
                .await?;
            self.limiter.update_from_headers(response.headers()).await;

            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                rate_limited += 1;
                if rate_limited > self.config.rate_limit_retries {
                    return Err(IngestionError::RateLimited {
                        scope: scope.to_string(),
                        attempts: rate_limited,
                    });
                }
                let wait = header_number(response.headers(), RETRY_AFTER_HEADER)
                    .map(Duration::from_secs)
                    .unwrap_or(self.config.default_retry_after);
                warn!(
                    scope = scope,
                    path = path,
                    attempt = rate_limited,
                    wait_secs = wait.as_secs(),
                    "Rate limited, backing off"
                );
                tokio::time::sleep(wait).await;
                continue;
            }

            return json_body(response, scope).await;
        }
    }

    async fn get_json(&self, scope: &str, path: &str, query: &[(String, String)]) -> Result<Value> {
        self.config
            .retry
            .run(scope, move || self.get_once(scope, path, query))
            .await
    }

    /// All results of a paginated listing.
    async fn paginate(
        &self,
        scope: &str,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Vec<Value>> {
        let limit = self.config.page_limit;
        let mut results = Vec::new();

        for page_number in 1..=self.config.max_pages {
            let mut page_query = query.to_vec();
            page_query.push(("limit".to_string(), limit.to_string()));
            page_query.push(("page".to_string(), page_number.to_string()));

            let body = self.get_json(scope, path, &page_query).await?;
            let page: Page<Value> = serde_json::from_value(body).map_err(|e| {
                IngestionError::DataValidation(format!("{} page {}: {}", path, page_number, e))
            })?;

            let count = page.results.len();
            let found = page.meta.found_count();
            results.extend(page.results);
            debug!(path = path, page = page_number, count = count, "Fetched page");
            if count < limit as usize || found.is_some_and(|f| results.len() as u64 >= f) {
                return Ok(results);
            }
        }

        warn!(
            scope = scope,
            path = path,
            max_pages = self.config.max_pages,
            results = results.len(),
            "Page limit reached, listing may be truncated"
        );
        Ok(results)
    }

    /// Stations within the configured radius of `city`.
    #[instrument(skip_all, fields(city = %city.name))]
    pub async fn stations_near(&self, city: &Location) -> Result<Vec<Station>> {
        let query = vec![
            (
                "coordinates".to_string(),
                format!("{:.4},{:.4}", city.latitude, city.longitude),
            ),
            ("radius".to_string(), self.config.radius_m.to_string()),
        ];
        let raw = self.paginate(&city.name, "/v3/locations", &query).await?;

        raw.into_iter()
            .map(|value| {
                serde_json::from_value(value).map_err(|e| {
                    IngestionError::DataValidation(format!(
                        "unexpected station near {}: {}",
                        city.name, e
                    ))
                })
            })
            .collect()
    }

    /// Hourly aggregates of one sensor between `from` and `to`.
    pub async fn sensor_hours(
        &self,
        scope: &str,
        sensor_id: u64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Value>> {
        let query = vec![
            (
                "datetime_from".to_string(),
                from.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            (
                "datetime_to".to_string(),
                to.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
        ];
        let path = format!("/v3/sensors/{}/hours", sensor_id);
        self.paginate(scope, &path, &query).await
    }
}

#[async_trait]
impl MeasurementSource for OpenAqClient {
    #[instrument(skip_all, fields(city = %city.name, from = %from, to = %to))]
    async fn fetch_city(
        &self,
        city: &Location,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<StationData>> {
        let stations = self.stations_near(city).await?;
        let found = stations.len();

        let mut fetched = Vec::new();
        for station in stations {
            if !station.last_seen().is_some_and(|seen| seen >= from) {
                continue;
            }
            let sensors: Vec<u64> = station.supported_sensors().map(|s| s.id).collect();
            if sensors.is_empty() {
                continue;
            }

            let mut hours = Vec::new();
            for sensor_id in sensors {
                hours.extend(self.sensor_hours(&city.name, sensor_id, from, to).await?);
            }
            fetched.push(StationData { station, hours });
        }

        info!(
            stations_found = found,
            stations_used = fetched.len(),
            measurements = fetched.iter().map(|s| s.hours.len()).sum::<usize>(),
            "Fetched in-situ measurements"
        );
        Ok(fetched)
    }
}
