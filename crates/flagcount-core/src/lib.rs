//! flagcount-core: shared types for the flagcount exporter.
//!
//! Holds the resource records decoded from the remote feature-flag API,
//! the nested stale-flag report, and the exporter configuration with its
//! validation rules.

pub mod config;
pub mod error;
pub mod types;

pub use config::{ExporterConfig, LogFormat, LogLevel, ScrapeTarget};
pub use error::ConfigError;
pub use types::*;
