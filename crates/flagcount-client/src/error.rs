//! Fetch error types.

use thiserror::Error;

/// Result type alias for remote fetches.
pub type FetchResult<T> = Result<T, FetchError>;

/// A failed read against the remote API.
///
/// Every variant carries the endpoint that was queried. The client does
/// not classify failures as transient or permanent; retry policy belongs
/// to the caller.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("API request failed with status {status} for endpoint {endpoint}")]
    Status { endpoint: String, status: u16 },

    #[error("decoding response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("request to {endpoint} cancelled")]
    Cancelled { endpoint: String },

    #[error("building HTTP client: {0}")]
    Setup(#[source] reqwest::Error),
}

impl FetchError {
    /// Endpoint the failing request targeted, if one was issued.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            FetchError::Request { endpoint, .. }
            | FetchError::Status { endpoint, .. }
            | FetchError::Decode { endpoint, .. }
            | FetchError::Cancelled { endpoint } => Some(endpoint),
            FetchError::Setup(_) => None,
        }
    }
}
