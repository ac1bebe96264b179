use serde_json::json;

use wgm_core::{Dialect, MigrationIssue};

use super::{DialectTranslator, NO_GROUPS};
use crate::result::{EsAgg, EsQuery, TargetQuery, TranslateOptions};
use crate::shape::{Aggregation, QueryShape, Selector, Wrapper};

/// Renders shapes as a Lucene filter plus Grafana metric/bucket aggregations.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElasticsearchTranslator;

impl DialectTranslator for ElasticsearchTranslator {
    fn dialect(&self) -> Dialect {
        Dialect::ElasticsearchDsl
    }

    fn translate_shape(
        &self,
        shape: &QueryShape,
        options: &TranslateOptions,
    ) -> Result<TargetQuery, MigrationIssue> {
        if shape.selector.metric.contains('*') {
            return Err(MigrationIssue::unsupported("wildcard in metric name"));
        }

        let value_field = Some(options.es_value_field.clone());
        let (metric, by): (EsAgg, &[String]) = match shape.wrappers.as_slice() {
            [] => (metric_agg("avg", value_field), NO_GROUPS),
            [Wrapper::Aggregate { func, by }] => (aggregation(*func, value_field), by.as_slice()),
            [Wrapper::Percentile { p }] => {
                let mut agg = metric_agg("percentiles", value_field);
                agg.settings = Some(json!({ "percents": [p.to_string()] }));
                (agg, NO_GROUPS)
            }
            [other] => {
                return Err(MigrationIssue::unsupported(format!(
                    "{}() has no Elasticsearch aggregation",
                    other.name()
                )))
            }
            _ => return Err(MigrationIssue::unsupported("nested functions in Elasticsearch")),
        };

        let mut bucket_aggs: Vec<EsAgg> = by
            .iter()
            .enumerate()
            .map(|(i, field)| EsAgg {
                id: (i + 2).to_string(),
                kind: "terms".to_string(),
                field: Some(field.clone()),
                settings: Some(json!({
                    "size": "10",
                    "order": "desc",
                    "orderBy": "_term",
                    "min_doc_count": "1"
                })),
                meta: None,
            })
            .collect();
        bucket_aggs.push(EsAgg {
            id: (by.len() + 2).to_string(),
            kind: "date_histogram".to_string(),
            field: Some(options.es_time_field.clone()),
            settings: Some(json!({ "interval": "auto", "min_doc_count": "0" })),
            meta: None,
        });

        Ok(TargetQuery::Elasticsearch(EsQuery {
            query: lucene(&shape.selector, &options.es_metric_field),
            metrics: vec![metric],
            bucket_aggs,
            time_field: options.es_time_field.clone(),
        }))
    }
}

fn metric_agg(kind: &str, field: Option<String>) -> EsAgg {
    EsAgg { id: "1".to_string(), kind: kind.to_string(), field, settings: None, meta: None }
}

fn aggregation(func: Aggregation, field: Option<String>) -> EsAgg {
    match func {
        Aggregation::Stddev => {
            let mut agg = metric_agg("extended_stats", field);
            agg.meta = Some(json!({ "std_deviation": true }));
            agg
        }
        Aggregation::Count => metric_agg("count", None),
        other => metric_agg(other.name(), field),
    }
}

fn lucene(selector: &Selector, metric_field: &str) -> String {
    let mut terms = vec![format!("{metric_field}:\"{}\"", escape(&selector.metric))];
    for f in &selector.filters {
        // Lucene matches wildcards only outside quotes
        let value = if f.value.contains('*') { f.value.clone() } else { format!("\"{}\"", escape(&f.value)) };
        let term = format!("{}:{value}", f.key);
        terms.push(if f.negated { format!("NOT {term}") } else { term });
    }
    terms.join(" AND ")
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
