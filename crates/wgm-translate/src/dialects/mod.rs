//! One translator per target dialect.
//!
//! Each implementation receives an already-recognised [`QueryShape`] and
//! either renders it or names the construct it cannot express. Adding a
//! dialect means adding an implementation and a [`for_dialect`] arm.

mod elasticsearch;
mod influxql;
mod promql;
mod unsupported;

pub use elasticsearch::ElasticsearchTranslator;
pub use influxql::InfluxQlTranslator;
pub use promql::PromQlTranslator;
pub use unsupported::UnsupportedTranslator;

use wgm_core::{Dialect, MigrationIssue};

use crate::condition::Comparison;
use crate::result::{TargetQuery, TranslateOptions, NEEDS_MANUAL_TRANSLATION};
use crate::shape::QueryShape;

pub trait DialectTranslator: Send + Sync {
    fn dialect(&self) -> Dialect;

    fn translate_shape(
        &self,
        shape: &QueryShape,
        options: &TranslateOptions,
    ) -> Result<TargetQuery, MigrationIssue>;

    /// Apply a top-level comparison to an already translated query.
    fn apply_comparison(
        &self,
        _query: TargetQuery,
        comparison: &Comparison,
    ) -> Result<TargetQuery, MigrationIssue> {
        Err(MigrationIssue::unsupported(format!(
            "threshold comparison '{}' has no {} form",
            comparison.op,
            self.dialect()
        )))
    }

    /// Line-comment prefix of the dialect.
    fn comment_prefix(&self) -> &'static str {
        "#"
    }

    /// Query text that cannot be mistaken for a working query.
    fn placeholder(&self, source: &str, issue: &MigrationIssue) -> String {
        let flat = source.split_whitespace().collect::<Vec<_>>().join(" ");
        format!(
            "{} {NEEDS_MANUAL_TRANSLATION} [{issue}]: {flat}",
            self.comment_prefix()
        )
    }
}

pub(crate) const NO_GROUPS: &[String] = &[];

static PROMQL: PromQlTranslator = PromQlTranslator;
static INFLUXQL: InfluxQlTranslator = InfluxQlTranslator;
static ELASTICSEARCH: ElasticsearchTranslator = ElasticsearchTranslator;
static UNSUPPORTED: UnsupportedTranslator = UnsupportedTranslator;

pub fn for_dialect(dialect: Dialect) -> &'static dyn DialectTranslator {
    match dialect {
        Dialect::PromQl => &PROMQL,
        Dialect::InfluxQl => &INFLUXQL,
        Dialect::ElasticsearchDsl => &ELASTICSEARCH,
        Dialect::Unsupported => &UNSUPPORTED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_dialect_matches() {
        for dialect in Dialect::ALL {
            assert_eq!(for_dialect(dialect).dialect(), dialect);
        }
    }

    #[test]
    fn test_placeholder_flattens_source() {
        let issue = MigrationIssue::unsupported("x");
        let text = for_dialect(Dialect::PromQl).placeholder("ts(a)\n  + ts(b)", &issue);
        assert_eq!(text, "# NEEDS MANUAL TRANSLATION [UNSUPPORTED/x]: ts(a) + ts(b)");
        let influx = for_dialect(Dialect::InfluxQl).placeholder("rate(ts(x))", &issue);
        assert!(influx.starts_with("-- NEEDS MANUAL TRANSLATION"));
    }
}
