//! ADS retrieval round trip against a local stand-in server.

mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use atmos_grid::GridLevel;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use ingestion::{CamsClient, CamsConfig, CamsRequest, IngestionError, CAMS_DATASET};
use test_utils::sample_base_time;

use common::{quick_retry, spawn_server};

const KEY: &str = "ads-key";
const PAYLOAD: &[u8] = b"GRIB fake payload 7777";

#[derive(Clone)]
struct Ads {
    base_url: String,
    /// Status reported on every poll after the first "running"
    final_status: &'static str,
    submits: Arc<AtomicU32>,
    polls: Arc<AtomicU32>,
    last_inputs: Arc<Mutex<Option<Value>>>,
}

async fn submit(State(ads): State<Ads>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    ads.submits.fetch_add(1, Ordering::SeqCst);
    if headers.get("private-token").and_then(|v| v.to_str().ok()) != Some(KEY) {
        return (StatusCode::UNAUTHORIZED, "bad token").into_response();
    }
    *ads.last_inputs.lock().unwrap() = Some(body["inputs"].clone());
    Json(json!({ "jobID": "job-1", "status": "accepted" })).into_response()
}

async fn status(State(ads): State<Ads>, Path(id): Path<String>) -> Json<Value> {
    let status = if ads.polls.fetch_add(1, Ordering::SeqCst) == 0 {
        "running"
    } else {
        ads.final_status
    };
    Json(json!({ "jobID": id, "status": status }))
}

async fn results(State(ads): State<Ads>, Path(id): Path<String>) -> Json<Value> {
    Json(json!({
        "asset": { "value": { "href": format!("{}/download/{}.grib", ads.base_url, id) } }
    }))
}

async fn download() -> &'static [u8] {
    PAYLOAD
}

fn ads_router(ads: Ads) -> Router {
    Router::new()
        .route(
            &format!("/retrieve/v1/processes/{}/execution", CAMS_DATASET),
            post(submit),
        )
        .route("/retrieve/v1/jobs/:id", get(status))
        .route("/retrieve/v1/jobs/:id/results", get(results))
        .route("/download/:file", get(download))
        .with_state(ads)
}

async fn spawn_ads(final_status: &'static str) -> (String, Ads) {
    let submits = Arc::new(AtomicU32::new(0));
    let polls = Arc::new(AtomicU32::new(0));
    let last_inputs = Arc::new(Mutex::new(None));
    let handle = Ads {
        base_url: String::new(),
        final_status,
        submits: submits.clone(),
        polls: polls.clone(),
        last_inputs: last_inputs.clone(),
    };
    let base_url = spawn_server(move |base_url| {
        ads_router(Ads {
            base_url,
            final_status,
            submits,
            polls,
            last_inputs,
        })
    })
    .await;
    (base_url, handle)
}

fn client(base_url: &str, key: &str, max_retries: u32) -> CamsClient {
    let mut config = CamsConfig::new(base_url, key);
    config.poll_interval = Duration::from_millis(10);
    config.max_polls = 10;
    config.retry = quick_retry(max_retries);
    CamsClient::new(config).unwrap()
}

#[tokio::test]
async fn retrieval_is_submitted_polled_and_downloaded() {
    let (base_url, ads) = spawn_ads("successful").await;
    let request = CamsRequest::new(sample_base_time(), GridLevel::ModelLevel, &[0, 3, 6]);

    let bytes = client(&base_url, KEY, 0).retrieve(&request).await.unwrap();

    assert_eq!(&bytes[..], PAYLOAD);
    assert_eq!(ads.submits.load(Ordering::SeqCst), 1);
    assert_eq!(ads.polls.load(Ordering::SeqCst), 2);
    let inputs = ads.last_inputs.lock().unwrap().clone().unwrap();
    assert_eq!(inputs["model_level"], json!(["137"]));
    assert_eq!(inputs["leadtime_hour"], json!(["0", "3", "6"]));
}

#[tokio::test]
async fn failed_jobs_are_resubmitted_until_retries_run_out() {
    let (base_url, ads) = spawn_ads("failed").await;
    let request = CamsRequest::new(sample_base_time(), GridLevel::SingleLevel, &[0]);

    let err = client(&base_url, KEY, 1).retrieve(&request).await.unwrap_err();

    assert!(matches!(err, IngestionError::Transient { .. }), "{err}");
    assert_eq!(ads.submits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn rejected_credentials_are_not_retried() {
    let (base_url, ads) = spawn_ads("successful").await;
    let request = CamsRequest::new(sample_base_time(), GridLevel::SingleLevel, &[0]);

    let err = client(&base_url, "wrong-key", 3).retrieve(&request).await.unwrap_err();

    assert!(matches!(err, IngestionError::Configuration(_)), "{err}");
    assert_eq!(ads.submits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn malformed_job_status_aborts_without_resubmitting() {
    async fn garbled(State(submits): State<Arc<AtomicU32>>) -> &'static str {
        submits.fetch_add(1, Ordering::SeqCst);
        "<html>maintenance</html>"
    }

    let submits = Arc::new(AtomicU32::new(0));
    let state = submits.clone();
    let base_url = spawn_server(move |_| {
        Router::new()
            .route(
                &format!("/retrieve/v1/processes/{}/execution", CAMS_DATASET),
                post(garbled),
            )
            .with_state(state)
    })
    .await;
    let request = CamsRequest::new(sample_base_time(), GridLevel::SingleLevel, &[0]);

    let err = client(&base_url, KEY, 3).retrieve(&request).await.unwrap_err();

    assert!(matches!(err, IngestionError::DataValidation(_)), "{err}");
    assert_eq!(submits.load(Ordering::SeqCst), 1);
}
