//! Reporter error types.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for reporter operations.
pub type PublishResult<T> = Result<T, PublishError>;

/// Errors that abort a run after the probe phase. None of these are retried.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to initialize producer: {0}")]
    Init(String),

    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("delivery not confirmed within {0:?}")]
    Timeout(Duration),
}
