//! Quota tracking from OpenAQ's rate-limit headers.

use std::time::Duration;

use reqwest::header::HeaderMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::info;

pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RESET_HEADER: &str = "x-ratelimit-reset";

#[derive(Debug, Default)]
struct RateLimitState {
    /// Requests left in the current window, once the provider told us.
    remaining: Option<u32>,
    reset_at: Option<Instant>,
    calls: u64,
}

/// Shared by every request of one client. Created by the caller and passed
/// in, so a process can run several independently limited clients.
#[derive(Debug, Default)]
pub struct RateLimiter {
    state: Mutex<RateLimitState>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until a request may be sent.
    ///
    /// With the quota used up, the caller sleeps until the reset deadline.
    /// The lock is held while sleeping so queued callers wait as well.
    pub async fn acquire(&self) {
        let mut state = self.state.lock().await;
        if state.remaining == Some(0) {
            if let Some(reset_at) = state.reset_at {
                let now = Instant::now();
                if reset_at > now {
                    info!(
                        wait_ms = (reset_at - now).as_millis() as u64,
                        "Rate limit reached, waiting for reset"
                    );
                    tokio::time::sleep_until(reset_at).await;
                }
            }
            state.remaining = None;
            state.reset_at = None;
        }
        state.calls += 1;
    }

    /// Record the quota reported with a response.
    pub async fn update(&self, remaining: Option<u32>, reset_after: Option<Duration>) {
        let mut state = self.state.lock().await;
        if remaining.is_some() {
            state.remaining = remaining;
        }
        if let Some(after) = reset_after {
            state.reset_at = Some(Instant::now() + after);
        }
    }

    /// Record the quota from `x-ratelimit-remaining` and
    /// `x-ratelimit-reset` (seconds until the window resets).
    pub async fn update_from_headers(&self, headers: &HeaderMap) {
        let remaining = header_number(headers, REMAINING_HEADER).map(|v| v as u32);
        let reset_after = header_number(headers, RESET_HEADER).map(Duration::from_secs);
        self.update(remaining, reset_after).await;
    }

    /// Requests let through so far.
    pub async fn calls(&self) -> u64 {
        self.state.lock().await.calls
    }

    pub async fn remaining(&self) -> Option<u32> {
        self.state.lock().await.remaining
    }
}

pub(crate) fn header_number(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.ceil() as u64)
}
