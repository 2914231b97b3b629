//! Error types for the Miro client.

use std::time::Duration;
use thiserror::Error;

/// Result type for Miro client operations.
pub type Result<T> = std::result::Result<T, MiroError>;

/// Miro client errors.
#[derive(Debug, Error)]
pub enum MiroError {
    /// Token rejected (401/403). Never retried.
    #[error("authentication failed (HTTP {status}): {message}")]
    Auth { status: u16, message: String },

    /// Vendor throttling (429)
    #[error("rate limited by Miro API")]
    RateLimited { retry_after: Option<Duration> },

    /// Network error (connection failed, timeout, body read)
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-2xx response other than auth and throttling
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Response body did not match the expected page shape
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Configuration error (missing token, invalid settings)
    #[error("configuration error: {0}")]
    Config(String),
}

impl MiroError {
    /// Whether the fetch loop may try the same page again.
    pub fn is_retryable(&self) -> bool {
        match self {
            MiroError::RateLimited { .. } | MiroError::Transport(_) => true,
            MiroError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Network, HTTP and body-shape failures, as opposed to auth,
    /// throttling or local configuration problems.
    pub fn is_transport_class(&self) -> bool {
        matches!(
            self,
            MiroError::Transport(_) | MiroError::Http { .. } | MiroError::Malformed(_)
        )
    }
}

impl From<reqwest::Error> for MiroError {
    fn from(err: reqwest::Error) -> Self {
        MiroError::Transport(err.to_string())
    }
}

/// An unrecovered failure while walking a paged endpoint.
///
/// `page` is 1-based; `offset` is the number of records accumulated before
/// the failing request, so a manual re-run knows where things stopped.
#[derive(Debug, Error)]
#[error("failed to fetch page {page} (after {offset} records): {source}")]
pub struct PageError {
    pub page: usize,
    pub offset: usize,
    #[source]
    pub source: MiroError,
}

impl PageError {
    pub fn kind(&self) -> &MiroError {
        &self.source
    }
}
