//! Configuration error types.

use thiserror::Error;

/// Errors raised while validating the exporter configuration.
///
/// All of these are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("API key is required")]
    MissingApiKey,

    #[error("organization ID is required")]
    MissingOrganizationId,

    #[error("product ID is required")]
    MissingProductId,

    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),

    #[error("invalid API URL: {0}")]
    InvalidApiUrl(String),

    #[error("invalid log level: {0} (expected debug, info, warn or error)")]
    InvalidLogLevel(String),

    #[error("invalid log format: {0} (expected text or json)")]
    InvalidLogFormat(String),
}
