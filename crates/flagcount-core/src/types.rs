//! Resource records returned by the remote feature-flag API.
//!
//! These are flat value objects decoded fresh on every scrape cycle and
//! dropped once their counts are folded into the metric store. Field
//! names follow the API's camelCase JSON.
//!
//! Decoding is lenient: a missing or `null` scalar or array decodes to its
//! zero value. Only collection lengths feed metrics, so a sparse record
//! never fails a fetch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Identifier of a product on the remote API.
pub type ProductId = String;

/// Identifier of a config (a flag collection) within a product.
pub type ConfigId = String;

/// Decode `null` as `T::default()`. Paired with `#[serde(default)]` for
/// absent fields.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ── Resource records ───────────────────────────────────────────────

/// A config belonging to a product.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default, deserialize_with = "null_as_default")]
    pub config_id: ConfigId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

/// An environment belonging to a product.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    #[serde(default, deserialize_with = "null_as_default")]
    pub environment_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

/// A feature flag (setting) defined in a config.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFlag {
    #[serde(default, deserialize_with = "null_as_default")]
    pub setting_id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub key: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub hint: Option<String>,
}

// ── Stale-flag report ──────────────────────────────────────────────

/// Per-product report of stale ("zombie") flags, grouped by config.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StaleFlagReport {
    #[serde(default, deserialize_with = "null_as_default")]
    pub product_id: ProductId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub configs: Vec<StaleConfig>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub environments: Vec<Environment>,
}

/// One config group inside a [`StaleFlagReport`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StaleConfig {
    #[serde(default, deserialize_with = "null_as_default")]
    pub config_id: ConfigId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub evaluation_version: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub has_code_references: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub settings: Vec<StaleSetting>,
}

/// A setting reported as stale.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StaleSetting {
    #[serde(default, deserialize_with = "null_as_default")]
    pub setting_id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub key: String,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub has_code_references: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<SettingTag>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub setting_values: Vec<StaleSettingValue>,
}

/// Tag attached to a stale setting.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SettingTag {
    #[serde(default, deserialize_with = "null_as_default")]
    pub tag_id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub setting_tag_id: i64,
}

/// Per-environment value record of a stale setting.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StaleSettingValue {
    #[serde(default, deserialize_with = "null_as_default")]
    pub environment_id: String,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_stale: bool,
}

impl StaleConfig {
    /// Number of stale settings in this group.
    pub fn stale_count(&self) -> usize {
        self.settings.len()
    }
}

impl StaleFlagReport {
    /// Total stale settings over all config groups.
    pub fn total_stale(&self) -> usize {
        self.configs.iter().map(StaleConfig::stale_count).sum()
    }
}
