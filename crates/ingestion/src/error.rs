//! Error types for the ingestion crate.

use aq_common::AqError;
use atmos_grid::GridError;
use texture::TextureError;
use thiserror::Error;

/// Errors that can occur during ingestion.
#[derive(Error, Debug)]
pub enum IngestionError {
    /// Missing credentials or invalid settings, raised before any network call.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Timeouts and 5xx responses; retried with backoff.
    #[error("Transient provider error ({scope}): {message}")]
    Transient { scope: String, message: String },

    /// The provider kept answering 429 after every allowed wait.
    #[error("Rate limit exhausted ({scope}) after {attempts} attempts")]
    RateLimited { scope: String, attempts: u32 },

    #[error("Data validation error: {0}")]
    DataValidation(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Schedule error: {0}")]
    Schedule(String),

    #[error("Grid error: {0}")]
    Grid(#[from] GridError),

    #[error("Texture error: {0}")]
    Texture(#[from] TextureError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestionError>;

impl IngestionError {
    pub fn transient(scope: impl Into<String>, message: impl Into<String>) -> Self {
        IngestionError::Transient {
            scope: scope.into(),
            message: message.into(),
        }
    }

    /// Whether backing off and repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            IngestionError::Transient { .. } => true,
            IngestionError::Http(e) => is_transport_error(e),
            _ => false,
        }
    }

    /// Provider trouble that outlived its retries.
    pub fn is_transient(&self) -> bool {
        match self {
            IngestionError::Transient { .. } | IngestionError::RateLimited { .. } => true,
            IngestionError::Http(e) => is_transport_error(e),
            _ => false,
        }
    }
}

/// Timeouts, refused connections and bodies cut off mid-transfer. Decode
/// and builder errors are not transport trouble.
fn is_transport_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request() || err.is_body()
}

impl From<AqError> for IngestionError {
    fn from(err: AqError) -> Self {
        match err {
            AqError::Configuration(msg) => IngestionError::Configuration(msg),
            AqError::TransientProvider { scope, message } => {
                IngestionError::Transient { scope, message }
            }
            AqError::DataValidation(msg) => IngestionError::DataValidation(msg),
            AqError::Persistence(msg) => IngestionError::Persistence(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_keep_their_kind() {
        let err: IngestionError = AqError::Persistence("disk full".to_string()).into();
        assert!(matches!(err, IngestionError::Persistence(_)));
        assert!(!err.is_retryable());

        let err: IngestionError = AqError::transient("Paris", "timeout").into();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_rate_limit_is_transient_but_not_retried() {
        let err = IngestionError::RateLimited {
            scope: "Paris".to_string(),
            attempts: 4,
        };
        assert!(err.is_transient());
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "Rate limit exhausted (Paris) after 4 attempts");
    }
}
