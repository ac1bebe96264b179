//! WGM Translate: WQL to PromQL, InfluxQL and Elasticsearch
//!
//! Translation is a small pipeline: [`lexer`] tokenizes the query, [`shape`]
//! recognises a `ts()` selector under at most two wrapping functions, and a
//! [`DialectTranslator`] renders the shape for the target datasource.
//!
//! Translation is total. Anything outside the recognised forms comes back as
//! [`TranslationResult::Untranslated`] with the source text kept verbatim and
//! a placeholder query that cannot be mistaken for a working one.
//!
//! # Example
//!
//! ```
//! use wgm_core::Dialect;
//! use wgm_translate::translate;
//!
//! let result = translate("rate(ts(requests.count))", Dialect::PromQl);
//! assert_eq!(result.query_text(), "rate(requests_count[5m])");
//! ```

pub mod condition;
pub mod dialects;
pub mod lexer;
pub mod result;
pub mod shape;

pub use condition::{split_condition, BoolOp, Comparison, ConditionClause, SplitCondition};
pub use dialects::{for_dialect, DialectTranslator};
pub use lexer::CmpOp;
pub use result::{EsAgg, EsQuery, TargetQuery, TranslateOptions, TranslationResult, NEEDS_MANUAL_TRANSLATION};

use tracing::debug;
use wgm_core::{Dialect, MigrationIssue};

/// Translator bound to one set of options. Cheap to share across threads.
#[derive(Debug, Clone, Default)]
pub struct Translator {
    options: TranslateOptions,
}

impl Translator {
    pub fn new(options: TranslateOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TranslateOptions {
        &self.options
    }

    /// Translate one WQL query into `dialect`.
    pub fn translate(&self, query: &str, dialect: Dialect) -> TranslationResult {
        let target = for_dialect(dialect);
        match self.try_translate(query, target) {
            Ok(q) => TranslationResult::Translated(q),
            Err(issue) => {
                debug!(query, %dialect, reason = %issue, "query left for manual translation");
                TranslationResult::Untranslated {
                    placeholder: target.placeholder(query, &issue),
                    source: query.to_string(),
                    issue,
                }
            }
        }
    }

    fn try_translate(
        &self,
        query: &str,
        target: &dyn DialectTranslator,
    ) -> Result<TargetQuery, MigrationIssue> {
        if query.trim().is_empty() {
            return Err(MigrationIssue::malformed("empty query"));
        }

        let tokens = lexer::tokenize(query)?;
        let expr = shape::parse_expression(&tokens)?;
        let shape = shape::query_shape(&expr.term)?;
        let translated = target.translate_shape(&shape, &self.options)?;

        match expr.comparison {
            Some(comparison) => target.apply_comparison(translated, &comparison),
            None => Ok(translated),
        }
    }
}

/// Translate with default options.
pub fn translate(query: impl AsRef<str>, dialect: Dialect) -> TranslationResult {
    Translator::default().translate(query.as_ref(), dialect)
}

/// Name of the outermost function call, lower-cased (`ts` for a bare
/// selector). Works on queries that do not translate.
pub fn outer_function(query: &str) -> Option<String> {
    let tokens = lexer::tokenize(query).ok()?;
    tokens.windows(2).find_map(|pair| match (&pair[0].kind, &pair[1].kind) {
        (lexer::TokenKind::Ident(name), lexer::TokenKind::LParen) => Some(name.to_ascii_lowercase()),
        _ => None,
    })
}
