//! Helpers shared by the ingestion integration tests.

#![allow(dead_code)]

use std::time::Duration;

use axum::Router;
use ingestion::RetryPolicy;

/// Serve `build(base_url)` on an ephemeral local port and return the base URL.
pub async fn spawn_server(build: impl FnOnce(String) -> Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let app = build(base_url.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    base_url
}

/// Retries with delays short enough for tests.
pub fn quick_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
    }
}
