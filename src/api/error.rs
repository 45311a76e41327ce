//! Errors at the HTTP boundary

use reqwest::StatusCode;
use thiserror::Error;

/// Failure of an API request
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure: DNS, TLS, connection reset, timeout
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server rejected our credentials, or there are none to send
    #[error("not authenticated")]
    Unauthorized,

    /// Any other non-success status
    #[error("server returned {status}: {body}")]
    Status {
        /// HTTP status
        status: StatusCode,
        /// Response body, for diagnostics
        body: String,
    },

    /// The response body did not match the expected shape
    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Local failure, e.g. secure storage
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// Whether retrying with fresh credentials could help.
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}
