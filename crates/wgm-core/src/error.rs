//! Unified Error Model
//!
//! Two layers: `MigrationIssue` describes a degraded (but still emitted)
//! translation, `MigrateError` is reserved for the outer collaborators
//! (config loading, reading sources, writing targets).
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A non-fatal problem found while translating a query or mapping a document.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum MigrationIssue {
    /// The construct is valid WQL but has no mapping in the target dialect.
    #[error("UNSUPPORTED/{0}")]
    UnsupportedPattern(String),

    /// An expected token is missing or has the wrong shape.
    #[error("MALFORMED/{0}")]
    MalformedInput(String),

    /// A source field without a target equivalent; a default was used.
    #[error("GAP/{0}")]
    StructuralGap(String),
}

impl MigrationIssue {
    pub fn unsupported(detail: impl Into<String>) -> Self {
        Self::UnsupportedPattern(detail.into())
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedInput(detail.into())
    }

    pub fn gap(detail: impl Into<String>) -> Self {
        Self::StructuralGap(detail.into())
    }

    /// Human-readable detail without the category prefix.
    pub fn detail(&self) -> &str {
        match self {
            Self::UnsupportedPattern(d) | Self::MalformedInput(d) | Self::StructuralGap(d) => d,
        }
    }
}

/// Fatal errors. Never produced by translation or document building.
#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("CONFIG/{0}")]
    Config(String),

    #[error("SOURCE/{0}")]
    Source(String),

    #[error("WRITE/{0}")]
    Write(String),

    #[error("SERIALIZE/{0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO/{0}")]
    Io(#[from] std::io::Error),
}
