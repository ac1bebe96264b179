//! WGM Core: source documents, dialects and the issue taxonomy
//!
//! Value types shared by the translator and the Grafana builders. Nothing in
//! this crate performs I/O apart from [`MigrationConfig::load`].

pub mod config;
pub mod data_model;
pub mod dialect;
pub mod error;
pub mod ident;
pub mod reader;
pub mod wavefront;

pub use config::MigrationConfig;
pub use data_model::{ChartLayout, ChartType, SourceAlert, SourceChart, SourceDashboard, SourceQuery};
pub use dialect::Dialect;
pub use error::{MigrateError, MigrationIssue};
pub use ident::{derive_uid, sanitize_name};
pub use reader::{MemorySource, SourceReader};

/// Version of the migration toolkit
pub const WGM_VERSION: &str = "1.0.0";
