//! Where finished documents go.

use std::fmt;

use wgm_core::MigrateError;

use crate::alert::AlertGroup;
use crate::panel::TargetDashboard;
use crate::report::MigrationReport;

/// What happened to one written document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Stored at the given location (a path, URL or key).
    Written(String),
    /// Deliberately not written, e.g. filtered out or dry run.
    Skipped(String),
}

impl fmt::Display for WriteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteOutcome::Written(location) => write!(f, "written to {location}"),
            WriteOutcome::Skipped(reason) => write!(f, "skipped: {reason}"),
        }
    }
}

/// Destination for migrated Grafana documents.
pub trait TargetWriter: Send + Sync {
    fn write_dashboard(&self, dashboard: &TargetDashboard) -> Result<WriteOutcome, MigrateError>;

    fn write_alert_group(&self, group: &AlertGroup) -> Result<WriteOutcome, MigrateError>;

    fn write_report(&self, report: &MigrationReport) -> Result<WriteOutcome, MigrateError>;
}

/// Collects serialised documents in memory.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    documents: std::sync::Mutex<Vec<(String, String)>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(key, json)` pairs in write order.
    pub fn documents(&self) -> Vec<(String, String)> {
        self.documents.lock().map(|d| d.clone()).unwrap_or_default()
    }

    fn store<T: serde::Serialize>(&self, key: String, value: &T) -> Result<WriteOutcome, MigrateError> {
        let json = serde_json::to_string_pretty(value)?;
        self.documents
            .lock()
            .map_err(|_| MigrateError::Write(format!("writer poisoned while storing {key}")))?
            .push((key.clone(), json));
        Ok(WriteOutcome::Written(key))
    }
}

impl TargetWriter for MemoryWriter {
    fn write_dashboard(&self, dashboard: &TargetDashboard) -> Result<WriteOutcome, MigrateError> {
        self.store(format!("dashboard/{}", dashboard.uid), dashboard)
    }

    fn write_alert_group(&self, group: &AlertGroup) -> Result<WriteOutcome, MigrateError> {
        self.store(format!("alert_group/{}", group.name), &group.provisioning_file())
    }

    fn write_report(&self, report: &MigrationReport) -> Result<WriteOutcome, MigrateError> {
        self.store("report".to_string(), report)
    }
}
