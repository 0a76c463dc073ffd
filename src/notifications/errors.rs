//! Error types and the error-reporting channel.

use thiserror::Error;
use tracing::error;

/// Errors produced by a notification transport and surfaced by the facade.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notification not found: {0}")]
    NotFound(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unexpected status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl NotificationError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, NotificationError::NotFound(_))
    }
}

/// Sink for errors caught at the facade boundary.
///
/// Transport failures never propagate into observer callbacks; they end up
/// here instead.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, operation: &str, error: &NotificationError);
}

/// Reports errors through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogErrorReporter;

impl ErrorReporter for LogErrorReporter {
    fn report(&self, operation: &str, error: &NotificationError) {
        error!("Notification {} failed: {}", operation, error);
    }
}
