//! Grafana query models, one JSON shape per datasource type.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use wgm_core::Dialect;
use wgm_translate::{EsQuery, TargetQuery, TranslationResult};

/// `intervalMs` Grafana's alert editor writes into every alert query.
pub const ALERT_INTERVAL_MS: u64 = 1000;
/// `maxDataPoints` Grafana's alert editor writes into every alert query.
pub const ALERT_MAX_DATA_POINTS: u64 = 43200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasourceRef {
    #[serde(rename = "type")]
    pub kind: String,
    pub uid: String,
}

impl DatasourceRef {
    pub fn new(dialect: Dialect, uid: &str) -> Self {
        Self { kind: dialect.datasource_type().to_string(), uid: uid.to_string() }
    }

    /// The server-side expression engine used by reduce/threshold/math steps.
    pub fn expression() -> Self {
        Self { kind: "__expr__".to_string(), uid: "__expr__".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryBody {
    PromQl(String),
    InfluxQl(String),
    Elasticsearch(EsQuery),
    /// Untranslated query, written into the dialect's main query field.
    Placeholder { dialect: Dialect, text: String },
}

impl QueryBody {
    pub fn from_result(result: &TranslationResult, dialect: Dialect) -> Self {
        match result {
            TranslationResult::Translated(TargetQuery::PromQl(q)) => QueryBody::PromQl(q.clone()),
            TranslationResult::Translated(TargetQuery::InfluxQl(q)) => QueryBody::InfluxQl(q.clone()),
            TranslationResult::Translated(TargetQuery::Elasticsearch(es)) => QueryBody::Elasticsearch(es.clone()),
            TranslationResult::Untranslated { placeholder, .. } => {
                QueryBody::Placeholder { dialect, text: placeholder.clone() }
            }
        }
    }

    /// The query string a reviewer sees in the editor.
    pub fn text(&self) -> &str {
        match self {
            QueryBody::PromQl(q) | QueryBody::InfluxQl(q) => q,
            QueryBody::Elasticsearch(es) => &es.query,
            QueryBody::Placeholder { text, .. } => text,
        }
    }
}

/// One target of a panel, or stage A of an alert rule.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryModel {
    pub ref_id: String,
    pub datasource: DatasourceRef,
    pub body: QueryBody,
    /// Alert queries evaluate instantly and carry the alert-editor fields.
    pub alerting: bool,
}

impl Serialize for QueryModel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("refId", &self.ref_id)?;
        map.serialize_entry("datasource", &self.datasource)?;

        match &self.body {
            QueryBody::PromQl(expr) => prometheus_fields(&mut map, expr, self.alerting)?,
            QueryBody::InfluxQl(query) => influx_fields(&mut map, query)?,
            QueryBody::Elasticsearch(es) => {
                map.serialize_entry("query", &es.query)?;
                map.serialize_entry("metrics", &es.metrics)?;
                map.serialize_entry("bucketAggs", &es.bucket_aggs)?;
                map.serialize_entry("timeField", &es.time_field)?;
            }
            QueryBody::Placeholder { dialect: Dialect::PromQl, text } => {
                prometheus_fields(&mut map, text, self.alerting)?
            }
            QueryBody::Placeholder { dialect: Dialect::InfluxQl, text } => influx_fields(&mut map, text)?,
            QueryBody::Placeholder { text, .. } => map.serialize_entry("query", text)?,
        }

        if self.alerting {
            map.serialize_entry("intervalMs", &ALERT_INTERVAL_MS)?;
            map.serialize_entry("maxDataPoints", &ALERT_MAX_DATA_POINTS)?;
        }
        map.end()
    }
}

fn prometheus_fields<M: SerializeMap>(map: &mut M, expr: &str, alerting: bool) -> Result<(), M::Error> {
    map.serialize_entry("expr", expr)?;
    if alerting {
        map.serialize_entry("instant", &true)?;
        map.serialize_entry("range", &false)?;
    } else {
        map.serialize_entry("format", "time_series")?;
    }
    Ok(())
}

fn influx_fields<M: SerializeMap>(map: &mut M, query: &str) -> Result<(), M::Error> {
    map.serialize_entry("query", query)?;
    map.serialize_entry("rawQuery", &true)?;
    map.serialize_entry("resultFormat", "time_series")
}

/// Grafana refIds: A..Z, then AA, AB, ...
pub fn ref_id(index: usize) -> String {
    let mut n = index + 1;
    let mut id = Vec::new();
    while n > 0 {
        n -= 1;
        id.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    id.reverse();
    String::from_utf8_lossy(&id).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wgm_translate::translate;

    fn model(query: &str, dialect: Dialect, alerting: bool) -> serde_json::Value {
        let body = QueryBody::from_result(&translate(query, dialect), dialect);
        let model = QueryModel { ref_id: "A".into(), datasource: DatasourceRef::new(dialect, "ds"), body, alerting };
        serde_json::to_value(&model).unwrap()
    }

    #[test]
    fn test_ref_ids() {
        assert_eq!(ref_id(0), "A");
        assert_eq!(ref_id(25), "Z");
        assert_eq!(ref_id(26), "AA");
        assert_eq!(ref_id(27), "AB");
        assert_eq!(ref_id(701), "ZZ");
        assert_eq!(ref_id(702), "AAA");
    }

    #[test]
    fn test_prometheus_panel_target() {
        assert_eq!(
            model("ts(cpu.usage)", Dialect::PromQl, false),
            json!({
                "refId": "A",
                "datasource": {"type": "prometheus", "uid": "ds"},
                "expr": "cpu_usage",
                "format": "time_series"
            })
        );
    }

    #[test]
    fn test_prometheus_alert_query_is_instant() {
        let json = model("ts(cpu.usage)", Dialect::PromQl, true);
        assert_eq!(json["instant"], true);
        assert_eq!(json["range"], false);
        assert_eq!(json["intervalMs"], 1000);
        assert_eq!(json["maxDataPoints"], 43200);
        assert!(json.get("format").is_none());
    }

    #[test]
    fn test_influx_placeholder_uses_raw_query() {
        let json = model("rate(ts(x))", Dialect::InfluxQl, false);
        assert_eq!(json["rawQuery"], true);
        assert!(json["query"].as_str().unwrap().starts_with("-- NEEDS MANUAL TRANSLATION"));
    }

    #[test]
    fn test_elasticsearch_target() {
        let json = model("ts(cpu)", Dialect::ElasticsearchDsl, false);
        assert_eq!(json["query"], "metric:\"cpu\"");
        assert_eq!(json["metrics"][0]["type"], "avg");
        assert_eq!(json["timeField"], "@timestamp");
    }
}
