//! OpenAQ client behaviour against a local stand-in server.

mod common;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Duration as ChronoDuration;
use serde_json::json;

use aq_common::Location;
use ingestion::{IngestionError, MeasurementSource, OpenAqClient, OpenAqConfig, RateLimiter};
use test_utils::{openaq_hour, openaq_page, openaq_sensor, openaq_station, sample_base_time};

use common::{quick_retry, spawn_server};

const API_KEY: &str = "test-key";

fn client(base_url: &str, page_limit: u32) -> OpenAqClient {
    let mut config = OpenAqConfig::new(base_url, API_KEY);
    config.page_limit = page_limit;
    config.retry = quick_retry(2);
    config.default_retry_after = Duration::from_millis(10);
    OpenAqClient::new(config, Arc::new(RateLimiter::new())).unwrap()
}

fn paris() -> Location {
    Location::city("Paris", 48.8566, 2.3522)
}

#[test]
fn missing_key_is_rejected_before_any_call() {
    let err = OpenAqClient::new(OpenAqConfig::new("http://localhost", ""), Arc::new(RateLimiter::new()))
        .err();
    assert!(matches!(err, Some(IngestionError::Configuration(_))));
}

#[tokio::test]
async fn stations_are_read_across_pages() {
    async fn locations(
        headers: HeaderMap,
        Query(query): Query<HashMap<String, String>>,
    ) -> Response {
        if headers.get("x-api-key").and_then(|v| v.to_str().ok()) != Some(API_KEY) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        assert_eq!(query.get("coordinates").map(String::as_str), Some("48.8566,2.3522"));
        let page: u32 = query["page"].parse().unwrap();
        let station = |id| openaq_station(id, "s", 48.8, 2.3, sample_base_time(), vec![]);
        let results = match page {
            1 => vec![station(1), station(2)],
            2 => vec![station(3)],
            _ => vec![],
        };
        (
            [("x-ratelimit-remaining", "57"), ("x-ratelimit-reset", "30")],
            Json(openaq_page(results, page, 2, 3)),
        )
            .into_response()
    }

    let base_url = spawn_server(|_| Router::new().route("/v3/locations", get(locations))).await;
    let client = client(&base_url, 2);

    let stations = client.stations_near(&paris()).await.unwrap();
    let ids: Vec<u64> = stations.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(client.limiter().calls().await, 2);
    assert_eq!(client.limiter().remaining().await, Some(57));
}

#[tokio::test]
async fn too_many_requests_waits_then_succeeds() {
    async fn locations(State(calls): State<Arc<AtomicU32>>) -> Response {
        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return (StatusCode::TOO_MANY_REQUESTS, [("retry-after", "0")], "slow down")
                .into_response();
        }
        Json(openaq_page(vec![], 1, 100, 0)).into_response()
    }

    let calls = Arc::new(AtomicU32::new(0));
    let state = calls.clone();
    let base_url = spawn_server(move |_| {
        Router::new()
            .route("/v3/locations", get(locations))
            .with_state(state)
    })
    .await;

    let stations = client(&base_url, 100).stations_near(&paris()).await.unwrap();
    assert!(stations.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn too_many_requests_gives_up_after_three_waits() {
    async fn locations(State(calls): State<Arc<AtomicU32>>) -> Response {
        calls.fetch_add(1, Ordering::SeqCst);
        (StatusCode::TOO_MANY_REQUESTS, [("retry-after", "0")], "slow down").into_response()
    }

    let calls = Arc::new(AtomicU32::new(0));
    let state = calls.clone();
    let base_url = spawn_server(move |_| {
        Router::new()
            .route("/v3/locations", get(locations))
            .with_state(state)
    })
    .await;

    let err = client(&base_url, 100).stations_near(&paris()).await.unwrap_err();
    assert!(
        matches!(err, IngestionError::RateLimited { ref scope, attempts: 4 } if scope == "Paris"),
        "{err}"
    );
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn server_errors_are_retried_with_backoff() {
    async fn locations(State(calls): State<Arc<AtomicU32>>) -> Response {
        if calls.fetch_add(1, Ordering::SeqCst) < 2 {
            return (StatusCode::BAD_GATEWAY, "upstream down").into_response();
        }
        Json(openaq_page(vec![], 1, 100, 0)).into_response()
    }

    let calls = Arc::new(AtomicU32::new(0));
    let state = calls.clone();
    let base_url = spawn_server(move |_| {
        Router::new()
            .route("/v3/locations", get(locations))
            .with_state(state)
    })
    .await;

    client(&base_url, 100).stations_near(&paris()).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn persistent_server_errors_become_transient() {
    async fn locations() -> Response {
        (StatusCode::SERVICE_UNAVAILABLE, "maintenance").into_response()
    }

    let base_url = spawn_server(|_| Router::new().route("/v3/locations", get(locations))).await;
    let err = client(&base_url, 100).stations_near(&paris()).await.unwrap_err();
    assert!(matches!(err, IngestionError::Transient { ref scope, .. } if scope == "Paris"));
    assert!(err.is_transient());
}

#[tokio::test]
async fn fetch_city_keeps_recent_stations_with_tracked_sensors() {
    let to = sample_base_time();
    let from = to - ChronoDuration::hours(24);

    async fn locations() -> Json<serde_json::Value> {
        let now = sample_base_time();
        Json(openaq_page(
            vec![
                openaq_station(1, "Active", 48.86, 2.35, now, vec![openaq_sensor(10, "no2", "µg/m³")]),
                openaq_station(
                    2,
                    "Retired",
                    48.87,
                    2.36,
                    now - ChronoDuration::days(30),
                    vec![openaq_sensor(20, "no2", "µg/m³")],
                ),
                openaq_station(3, "CO only", 48.85, 2.34, now, vec![openaq_sensor(30, "co", "ppm")]),
            ],
            1,
            100,
            3,
        ))
    }

    async fn hours(Path(sensor_id): Path<u64>) -> Response {
        if sensor_id != 10 {
            return (StatusCode::NOT_FOUND, "unexpected sensor").into_response();
        }
        let end = sample_base_time();
        Json(openaq_page(
            vec![
                openaq_hour("no2", "µg/m³", 18.0, end - ChronoDuration::hours(1)),
                openaq_hour("no2", "µg/m³", 21.0, end),
            ],
            1,
            100,
            2,
        ))
        .into_response()
    }

    let base_url = spawn_server(|_| {
        Router::new()
            .route("/v3/locations", get(locations))
            .route("/v3/sensors/:id/hours", get(hours))
    })
    .await;

    let fetched = client(&base_url, 100)
        .fetch_city(&paris(), from, to)
        .await
        .unwrap();
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].station.id, 1);
    assert_eq!(fetched[0].hours.len(), 2);
    assert_eq!(fetched[0].hours[1]["value"], json!(21.0));
}

#[tokio::test]
async fn malformed_body_is_a_validation_error_and_not_retried() {
    async fn locations(State(calls): State<Arc<AtomicU32>>) -> Response {
        calls.fetch_add(1, Ordering::SeqCst);
        (
            [("content-type", "application/json")],
            r#"{"meta": {"page": 1, "#,
        )
            .into_response()
    }

    let calls = Arc::new(AtomicU32::new(0));
    let state = calls.clone();
    let base_url = spawn_server(move |_| {
        Router::new()
            .route("/v3/locations", get(locations))
            .with_state(state)
    })
    .await;

    let err = client(&base_url, 100).stations_near(&paris()).await.unwrap_err();
    assert!(matches!(err, IngestionError::DataValidation(_)), "{:?}", err);
    assert!(!err.is_transient());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unreachable_provider_is_transient_after_retries() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = client(&base_url, 100).stations_near(&paris()).await.unwrap_err();
    assert!(
        matches!(err, IngestionError::Transient { ref scope, .. } if scope == "Paris"),
        "{:?}",
        err
    );
    assert!(err.is_transient());
}

async fn spawn_full_pages(found: serde_json::Value) -> (String, Arc<AtomicU32>) {
    async fn locations(
        State((calls, found)): State<(Arc<AtomicU32>, serde_json::Value)>,
        Query(query): Query<HashMap<String, String>>,
    ) -> Json<serde_json::Value> {
        calls.fetch_add(1, Ordering::SeqCst);
        let page: u64 = query["page"].parse().unwrap();
        let station = |id| openaq_station(id, "s", 48.8, 2.3, sample_base_time(), vec![]);
        let mut body = openaq_page(vec![station(page * 10), station(page * 10 + 1)], page as u32, 2, 0);
        body["meta"]["found"] = found;
        Json(body)
    }

    let calls = Arc::new(AtomicU32::new(0));
    let state = (calls.clone(), found);
    let base_url = spawn_server(move |_| {
        Router::new()
            .route("/v3/locations", get(locations))
            .with_state(state)
    })
    .await;
    (base_url, calls)
}

#[tokio::test]
async fn paging_stops_once_every_found_result_is_read() {
    let (base_url, calls) = spawn_full_pages(json!(4)).await;

    let stations = client(&base_url, 2).stations_near(&paris()).await.unwrap();

    assert_eq!(stations.len(), 4);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn paging_is_capped_at_max_pages() {
    let (base_url, calls) = spawn_full_pages(json!(">1000")).await;
    let mut config = OpenAqConfig::new(&base_url, API_KEY);
    config.page_limit = 2;
    config.max_pages = 3;
    let client = OpenAqClient::new(config, Arc::new(RateLimiter::new())).unwrap();

    let stations = client.stations_near(&paris()).await.unwrap();

    assert_eq!(stations.len(), 6);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}
