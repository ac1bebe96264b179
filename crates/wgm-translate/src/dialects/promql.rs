use wgm_core::{sanitize_name, Dialect, MigrationIssue};

use super::DialectTranslator;
use crate::condition::Comparison;
use crate::result::{TargetQuery, TranslateOptions};
use crate::shape::{QueryShape, Selector, Wrapper};

/// Renders shapes as PromQL instant-vector expressions.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromQlTranslator;

impl DialectTranslator for PromQlTranslator {
    fn dialect(&self) -> Dialect {
        Dialect::PromQl
    }

    fn translate_shape(
        &self,
        shape: &QueryShape,
        options: &TranslateOptions,
    ) -> Result<TargetQuery, MigrationIssue> {
        if shape.selector.has_wildcard() {
            return Err(MigrationIssue::unsupported("wildcard in metric name or tag value"));
        }

        let mut expr = selector(&shape.selector);
        for wrapper in shape.wrappers.iter().rev() {
            expr = match wrapper {
                Wrapper::Aggregate { func, by } if by.is_empty() => format!("{}({expr})", func.name()),
                Wrapper::Aggregate { func, by } => {
                    let labels: Vec<String> = by.iter().map(|l| sanitize_name(l)).collect();
                    format!("{} by ({}) ({expr})", func.name(), labels.join(", "))
                }
                Wrapper::Rate => format!("rate({expr}[{}])", options.rate_window),
                Wrapper::Deriv => format!("deriv({expr}[{}])", options.rate_window),
                Wrapper::Last => format!("last_over_time({expr}[{}])", options.rate_window),
                Wrapper::MovingAvg { window } => format!("avg_over_time({expr}[{window}])"),
                Wrapper::Percentile { p } => format!("quantile({}, {expr})", f64::from(*p) / 100.0),
            };
        }

        Ok(TargetQuery::PromQl(expr))
    }

    fn apply_comparison(
        &self,
        query: TargetQuery,
        comparison: &Comparison,
    ) -> Result<TargetQuery, MigrationIssue> {
        Ok(TargetQuery::PromQl(format!(
            "{} {} bool {}",
            query.text(),
            comparison.op,
            comparison.threshold
        )))
    }
}

fn selector(selector: &Selector) -> String {
    let metric = sanitize_name(&selector.metric);
    if selector.filters.is_empty() {
        return metric;
    }

    let matchers: Vec<String> = selector
        .filters
        .iter()
        .map(|f| {
            let op = if f.negated { "!=" } else { "=" };
            format!("{}{op}\"{}\"", sanitize_name(&f.key), escape(&f.value))
        })
        .collect();
    format!("{metric}{{{}}}", matchers.join(", "))
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
