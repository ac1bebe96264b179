//! Migration configuration.
//!
//! Loaded from YAML (every field optional), then overridden from the
//! environment and finally from command-line flags by the caller.
//!
//! | Env Var               | Field             | Default                |
//! |-----------------------|-------------------|------------------------|
//! | `WGM_DIALECT`         | `dialect`         | `prometheus`           |
//! | `WGM_DATASOURCE_UID`  | `datasource_uid`  | *(none)*               |
//! | `WGM_RATE_WINDOW`     | `rate_window`     | `5m`                   |
//! | `WGM_INFLUX_INTERVAL` | `influx_interval` | `$__interval`          |

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::dialect::Dialect;
use crate::error::MigrateError;

pub const DEFAULT_RATE_WINDOW: &str = "5m";
pub const DEFAULT_INFLUX_INTERVAL: &str = "$__interval";
pub const DEFAULT_ALERT_GROUP: &str = "Wavefront Alerts";
pub const DEFAULT_ALERT_FOLDER: &str = "Wavefront Migration";
pub const DEFAULT_EVALUATION_INTERVAL: &str = "60s";

lazy_static! {
    static ref DURATION: Regex = Regex::new(r"^\d+[smhdw]$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    pub dialect: Dialect,
    pub datasource_uid: String,
    /// Window used for `rate()`/`deriv()`/`last()` range selectors.
    pub rate_window: String,
    /// InfluxQL `GROUP BY time(...)` bucket.
    pub influx_interval: String,
    pub es_metric_field: String,
    pub es_value_field: String,
    pub es_time_field: String,
    pub alert_group: String,
    pub alert_folder: String,
    pub evaluation_interval: String,
    pub org_id: u32,
    /// Chart type tag -> Grafana panel type, merged over the built-in table.
    pub panel_types: BTreeMap<String, String>,
    /// WQL function name -> Grafana reducer, merged over the built-in table.
    pub reducers: BTreeMap<String, String>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::PromQl,
            datasource_uid: String::new(),
            rate_window: DEFAULT_RATE_WINDOW.to_string(),
            influx_interval: DEFAULT_INFLUX_INTERVAL.to_string(),
            es_metric_field: "metric".to_string(),
            es_value_field: "value".to_string(),
            es_time_field: "@timestamp".to_string(),
            alert_group: DEFAULT_ALERT_GROUP.to_string(),
            alert_folder: DEFAULT_ALERT_FOLDER.to_string(),
            evaluation_interval: DEFAULT_EVALUATION_INTERVAL.to_string(),
            org_id: 1,
            panel_types: BTreeMap::new(),
            reducers: BTreeMap::new(),
        }
    }
}

impl MigrationConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: &str) -> Result<Self, MigrateError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MigrateError::Config(format!("failed to read {path}: {e}")))?;
        let config = Self::from_yaml(&content)?;
        tracing::debug!(path, dialect = %config.dialect, "loaded migration config");
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, MigrateError> {
        serde_yaml::from_str(yaml)
            .map_err(|e| MigrateError::Config(format!("failed to parse config YAML: {e}")))
    }

    /// Apply `WGM_*` environment overrides.
    pub fn apply_env(&mut self) -> Result<(), MigrateError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), MigrateError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dialect) = lookup("WGM_DIALECT") {
            self.dialect = dialect.parse()?;
        }
        if let Some(uid) = lookup("WGM_DATASOURCE_UID") {
            self.datasource_uid = uid;
        }
        if let Some(window) = lookup("WGM_RATE_WINDOW") {
            self.rate_window = window;
        }
        if let Some(interval) = lookup("WGM_INFLUX_INTERVAL") {
            self.influx_interval = interval;
        }
        Ok(())
    }

    /// Reject settings that would make every generated document unusable.
    pub fn validate(&self) -> Result<(), MigrateError> {
        if self.datasource_uid.trim().is_empty() {
            return Err(MigrateError::Config("datasource_uid must be set".to_string()));
        }
        for (field, value) in [
            ("rate_window", &self.rate_window),
            ("evaluation_interval", &self.evaluation_interval),
        ] {
            if !DURATION.is_match(value) {
                return Err(MigrateError::Config(format!(
                    "{field} '{value}' is not a duration like 5m"
                )));
            }
        }
        if self.influx_interval.trim().is_empty() {
            return Err(MigrateError::Config("influx_interval must not be empty".to_string()));
        }
        Ok(())
    }
}
