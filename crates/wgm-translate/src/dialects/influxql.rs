use wgm_core::{Dialect, MigrationIssue};

use super::{DialectTranslator, NO_GROUPS};
use crate::result::{TargetQuery, TranslateOptions};
use crate::shape::{Aggregation, QueryShape, Selector, Wrapper};

/// Renders shapes as InfluxQL `SELECT` statements over a `value` field.
///
/// InfluxQL has no counterpart for range functions, so only a bare selector
/// or a single aggregation translate.
#[derive(Debug, Clone, Copy, Default)]
pub struct InfluxQlTranslator;

impl DialectTranslator for InfluxQlTranslator {
    fn dialect(&self) -> Dialect {
        Dialect::InfluxQl
    }

    fn translate_shape(
        &self,
        shape: &QueryShape,
        options: &TranslateOptions,
    ) -> Result<TargetQuery, MigrationIssue> {
        if shape.selector.has_wildcard() {
            return Err(MigrationIssue::unsupported("wildcard in metric name or tag value"));
        }

        let (func, by): (&str, &[String]) = match shape.wrappers.as_slice() {
            [] => ("mean", NO_GROUPS),
            [Wrapper::Aggregate { func, by }] => (select_fn(*func), by.as_slice()),
            [other] => {
                return Err(MigrationIssue::unsupported(format!(
                    "{}() has no InfluxQL equivalent",
                    other.name()
                )))
            }
            _ => return Err(MigrationIssue::unsupported("nested functions in InfluxQL")),
        };

        let group_by: String = by.iter().map(|tag| format!(", \"{}\"", escape_ident(tag))).collect();
        Ok(TargetQuery::InfluxQl(format!(
            "SELECT {func}(\"value\") FROM \"{}\"{} GROUP BY time({}){group_by} fill(null)",
            escape_ident(&shape.selector.metric),
            where_clause(&shape.selector),
            options.influx_interval,
        )))
    }

    fn comment_prefix(&self) -> &'static str {
        "--"
    }
}

fn select_fn(func: Aggregation) -> &'static str {
    match func {
        Aggregation::Avg => "mean",
        other => other.name(),
    }
}

fn where_clause(selector: &Selector) -> String {
    if selector.filters.is_empty() {
        return String::new();
    }
    let conditions: Vec<String> = selector
        .filters
        .iter()
        .map(|f| {
            let op = if f.negated { "!=" } else { "=" };
            format!("\"{}\"{op}'{}'", escape_ident(&f.key), f.value.replace('\'', "\\'"))
        })
        .collect();
    format!(" WHERE {}", conditions.join(" AND "))
}

fn escape_ident(ident: &str) -> String {
    ident.replace('"', "\\\"")
}
