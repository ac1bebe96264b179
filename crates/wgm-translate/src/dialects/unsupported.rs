use wgm_core::{Dialect, MigrationIssue};

use super::DialectTranslator;
use crate::result::{TargetQuery, TranslateOptions};
use crate::shape::QueryShape;

/// Datasources without a translator; every query becomes a placeholder.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedTranslator;

impl DialectTranslator for UnsupportedTranslator {
    fn dialect(&self) -> Dialect {
        Dialect::Unsupported
    }

    fn translate_shape(
        &self,
        _shape: &QueryShape,
        _options: &TranslateOptions,
    ) -> Result<TargetQuery, MigrationIssue> {
        Err(MigrationIssue::unsupported("target datasource has no query translator"))
    }
}
