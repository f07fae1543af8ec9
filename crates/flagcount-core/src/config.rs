//! Exporter configuration and validation.
//!
//! The daemon fills an [`ExporterConfig`] from command-line flags and
//! environment variables, then calls [`ExporterConfig::validate`] before
//! anything else starts.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Default remote API base address.
pub const DEFAULT_API_URL: &str = "https://api.example.com";

/// Default scrape interval in seconds.
pub const DEFAULT_SCRAPE_INTERVAL_SECS: u64 = 60;

/// Default listening port for the exposition server.
pub const DEFAULT_PORT: u16 = 8080;

/// Default per-request timeout against the remote API, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Complete exporter configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ExporterConfig {
    pub api_key: String,
    pub organization_id: String,
    pub product_id: String,
    pub api_url: String,
    pub scrape_interval_secs: u64,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub request_timeout_secs: u64,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            organization_id: String::new(),
            product_id: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
            scrape_interval_secs: DEFAULT_SCRAPE_INTERVAL_SECS,
            port: DEFAULT_PORT,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ExporterConfig {
    /// Check that every required value is present and well-formed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if self.organization_id.trim().is_empty() {
            return Err(ConfigError::MissingOrganizationId);
        }
        if self.product_id.trim().is_empty() {
            return Err(ConfigError::MissingProductId);
        }
        if self.scrape_interval_secs == 0 {
            return Err(ConfigError::ZeroInterval("scrape interval"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroInterval("request timeout"));
        }
        let url = self.api_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://"))
            || url.trim_end_matches('/').ends_with(':')
        {
            return Err(ConfigError::InvalidApiUrl(self.api_url.clone()));
        }
        self.log_level.parse::<LogLevel>()?;
        Ok(())
    }

    /// Scrape interval as a [`Duration`].
    pub fn scrape_interval(&self) -> Duration {
        Duration::from_secs(self.scrape_interval_secs)
    }

    /// Per-request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parsed log level. Falls back to `info` when unparseable; call
    /// [`validate`](Self::validate) first to reject bad values.
    pub fn level(&self) -> LogLevel {
        self.log_level.parse().unwrap_or(LogLevel::Info)
    }

    /// Build the immutable scrape target from this configuration.
    pub fn target(&self) -> ScrapeTarget {
        ScrapeTarget::new(
            self.organization_id.trim(),
            self.product_id.trim(),
            self.api_url.trim(),
            self.api_key.trim(),
        )
    }
}

// ── Scrape target ──────────────────────────────────────────────────

/// Identifiers of what the exporter scrapes. Fixed for the life of the
/// process.
#[derive(Clone, PartialEq, Eq)]
pub struct ScrapeTarget {
    organization_id: String,
    product_id: String,
    product_name: String,
    api_url: String,
    credential: String,
}

impl ScrapeTarget {
    pub fn new(organization_id: &str, product_id: &str, api_url: &str, credential: &str) -> Self {
        Self {
            organization_id: organization_id.to_string(),
            product_id: product_id.to_string(),
            product_name: format!("product-{product_id}"),
            api_url: api_url.trim_end_matches('/').to_string(),
            credential: credential.to_string(),
        }
    }

    pub fn organization_id(&self) -> &str {
        &self.organization_id
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    /// Display name used in product labels.
    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    /// Base address with any trailing slash removed.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }
}

// The credential never reaches logs.
impl fmt::Debug for ScrapeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrapeTarget")
            .field("organization_id", &self.organization_id)
            .field("product_id", &self.product_id)
            .field("api_url", &self.api_url)
            .field("credential", &"<redacted>")
            .finish()
    }
}

// ── Logging settings ───────────────────────────────────────────────

/// Log verbosity accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(ConfigError::InvalidLogLevel(other.to_string())),
        }
    }
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigError::InvalidLogFormat(other.to_string())),
        }
    }
}
