//! Translation outputs.
use serde::{Deserialize, Serialize};
use std::fmt;

use wgm_core::config::{DEFAULT_INFLUX_INTERVAL, DEFAULT_RATE_WINDOW};
use wgm_core::{Dialect, MigrationConfig, MigrationIssue};

/// Marker embedded in every placeholder query.
pub const NEEDS_MANUAL_TRANSLATION: &str = "NEEDS MANUAL TRANSLATION";

/// Knobs the dialect translators read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslateOptions {
    pub rate_window: String,
    pub influx_interval: String,
    pub es_metric_field: String,
    pub es_value_field: String,
    pub es_time_field: String,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self {
            rate_window: DEFAULT_RATE_WINDOW.to_string(),
            influx_interval: DEFAULT_INFLUX_INTERVAL.to_string(),
            es_metric_field: "metric".to_string(),
            es_value_field: "value".to_string(),
            es_time_field: "@timestamp".to_string(),
        }
    }
}

impl From<&MigrationConfig> for TranslateOptions {
    fn from(config: &MigrationConfig) -> Self {
        Self {
            rate_window: config.rate_window.clone(),
            influx_interval: config.influx_interval.clone(),
            es_metric_field: config.es_metric_field.clone(),
            es_value_field: config.es_value_field.clone(),
            es_time_field: config.es_time_field.clone(),
        }
    }
}

/// Elasticsearch query in the shape of a Grafana Elasticsearch target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EsQuery {
    /// Lucene query string
    pub query: String,
    pub metrics: Vec<EsAgg>,
    pub bucket_aggs: Vec<EsAgg>,
    pub time_field: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EsAgg {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dialect", content = "query", rename_all = "snake_case")]
pub enum TargetQuery {
    PromQl(String),
    InfluxQl(String),
    Elasticsearch(EsQuery),
}

impl TargetQuery {
    pub fn dialect(&self) -> Dialect {
        match self {
            TargetQuery::PromQl(_) => Dialect::PromQl,
            TargetQuery::InfluxQl(_) => Dialect::InfluxQl,
            TargetQuery::Elasticsearch(_) => Dialect::ElasticsearchDsl,
        }
    }

    /// The textual query: the expression itself, or the Lucene string for ES.
    pub fn text(&self) -> &str {
        match self {
            TargetQuery::PromQl(q) | TargetQuery::InfluxQl(q) => q,
            TargetQuery::Elasticsearch(es) => &es.query,
        }
    }
}

impl fmt::Display for TargetQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Outcome of translating one query. Never an error: a query that cannot be
/// mapped keeps its source text and a placeholder for the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TranslationResult {
    Translated(TargetQuery),
    Untranslated {
        source: String,
        issue: MigrationIssue,
        placeholder: String,
    },
}

impl TranslationResult {
    pub fn is_translated(&self) -> bool {
        matches!(self, TranslationResult::Translated(_))
    }

    pub fn target(&self) -> Option<&TargetQuery> {
        match self {
            TranslationResult::Translated(q) => Some(q),
            TranslationResult::Untranslated { .. } => None,
        }
    }

    pub fn issue(&self) -> Option<&MigrationIssue> {
        match self {
            TranslationResult::Translated(_) => None,
            TranslationResult::Untranslated { issue, .. } => Some(issue),
        }
    }

    /// Text to put in a query field: the translation or the placeholder.
    pub fn query_text(&self) -> &str {
        match self {
            TranslationResult::Translated(q) => q.text(),
            TranslationResult::Untranslated { placeholder, .. } => placeholder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_follow_config() {
        let config = MigrationConfig { rate_window: "1m".to_string(), ..MigrationConfig::default() };
        let options = TranslateOptions::from(&config);
        assert_eq!(options.rate_window, "1m");
        assert_eq!(options.influx_interval, "$__interval");
    }

    #[test]
    fn test_query_text() {
        let ok = TranslationResult::Translated(TargetQuery::PromQl("up".to_string()));
        assert_eq!(ok.query_text(), "up");
        assert!(ok.issue().is_none());

        let degraded = TranslationResult::Untranslated {
            source: "hs(x)".to_string(),
            issue: MigrationIssue::unsupported("function hs() has no mapping"),
            placeholder: "# NEEDS MANUAL TRANSLATION: hs(x)".to_string(),
        };
        assert!(!degraded.is_translated());
        assert!(degraded.query_text().contains(NEEDS_MANUAL_TRANSLATION));
    }

    #[test]
    fn test_es_query_serializes_camel_case() {
        let es = EsQuery {
            query: "metric:\"cpu\"".to_string(),
            metrics: vec![],
            bucket_aggs: vec![],
            time_field: "@timestamp".to_string(),
        };
        let json = serde_json::to_value(&es).unwrap();
        assert_eq!(json["timeField"], "@timestamp");
        assert!(json["bucketAggs"].is_array());
    }
}
