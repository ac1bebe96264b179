//! Target query dialects.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MigrateError;

/// The query language a migrated panel or alert will speak.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    #[default]
    #[serde(rename = "prometheus", alias = "promql")]
    PromQl,
    #[serde(rename = "influxdb", alias = "influxql")]
    InfluxQl,
    #[serde(rename = "elasticsearch", alias = "es")]
    ElasticsearchDsl,
    /// Datasources with no translator (e.g. CloudWatch). Every query degrades.
    #[serde(rename = "unsupported", alias = "cloudwatch")]
    Unsupported,
}

impl Dialect {
    pub const ALL: [Dialect; 4] = [
        Dialect::PromQl,
        Dialect::InfluxQl,
        Dialect::ElasticsearchDsl,
        Dialect::Unsupported,
    ];

    /// Grafana datasource `type` for panels and alert queries.
    pub fn datasource_type(&self) -> &'static str {
        match self {
            Dialect::PromQl => "prometheus",
            Dialect::InfluxQl => "influxdb",
            Dialect::ElasticsearchDsl => "elasticsearch",
            Dialect::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Dialect::PromQl => "PromQL",
            Dialect::InfluxQl => "InfluxQL",
            Dialect::ElasticsearchDsl => "Elasticsearch",
            Dialect::Unsupported => "unsupported",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Dialect {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prometheus" | "promql" => Ok(Dialect::PromQl),
            "influxdb" | "influxql" => Ok(Dialect::InfluxQl),
            "elasticsearch" | "es" => Ok(Dialect::ElasticsearchDsl),
            "cloudwatch" | "unsupported" => Ok(Dialect::Unsupported),
            other => Err(MigrateError::Config(format!("unknown dialect '{other}'"))),
        }
    }
}
