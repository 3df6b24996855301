//! Error taxonomy shared by the pipeline crates.

use thiserror::Error;

/// Result type alias using AqError.
pub type AqResult<T> = Result<T, AqError>;

/// Primary error type for pipeline operations.
#[derive(Debug, Error)]
pub enum AqError {
    /// Missing credentials or required settings. Raised before any network call.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Timeouts, 5xx responses and rate limiting that survived every retry.
    #[error("Transient provider error ({scope}): {message}")]
    TransientProvider { scope: String, message: String },

    /// Unexpected or missing field in a provider response.
    #[error("Data validation error: {0}")]
    DataValidation(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl AqError {
    pub fn transient(scope: impl Into<String>, message: impl Into<String>) -> Self {
        AqError::TransientProvider {
            scope: scope.into(),
            message: message.into(),
        }
    }

    /// Whether a retry of the whole operation could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, AqError::TransientProvider { .. })
    }
}

impl From<serde_json::Error> for AqError {
    fn from(err: serde_json::Error) -> Self {
        AqError::DataValidation(format!("JSON error: {}", err))
    }
}
