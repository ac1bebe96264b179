//! Source-configuration reader boundary.
//!
//! Fetching from the Wavefront API lives outside this workspace; anything
//! that can produce source documents implements [`SourceReader`].

use crate::data_model::{SourceAlert, SourceDashboard};
use crate::error::MigrateError;

pub trait SourceReader {
    fn dashboards(&self) -> Result<Vec<SourceDashboard>, MigrateError>;
    fn alerts(&self) -> Result<Vec<SourceAlert>, MigrateError>;
}

/// Reader over documents already in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    pub dashboards: Vec<SourceDashboard>,
    pub alerts: Vec<SourceAlert>,
}

impl SourceReader for MemorySource {
    fn dashboards(&self) -> Result<Vec<SourceDashboard>, MigrateError> {
        Ok(self.dashboards.clone())
    }

    fn alerts(&self) -> Result<Vec<SourceAlert>, MigrateError> {
        Ok(self.alerts.clone())
    }
}
