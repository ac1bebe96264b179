//! Exported Wavefront JSON in, Grafana JSON out.

use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

use wgm_core::wavefront::{alerts_from_value, dashboards_from_value, items_from_value};
use wgm_core::{MigrateError, SourceAlert, SourceDashboard, SourceReader};
use wgm_grafana::{AlertGroup, MigrationReport, TargetDashboard, TargetWriter, WriteOutcome};

pub const REPORT_FILE: &str = "migration_report.json";

/// Reads a JSON export, or every `*.json` file of a directory in name order.
///
/// Dashboards and alerts may share a file; items with a `condition` are
/// alerts, items with `sections` are dashboards, anything else is ignored.
#[derive(Debug, Clone)]
pub struct JsonSourceReader {
    path: PathBuf,
}

impl JsonSourceReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn files(&self) -> Result<Vec<PathBuf>, MigrateError> {
        if self.path.is_file() {
            return Ok(vec![self.path.clone()]);
        }
        let entries = std::fs::read_dir(&self.path)
            .map_err(|e| MigrateError::Source(format!("cannot read {}: {e}", self.path.display())))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn items_with(&self, key: &str) -> Result<Value, MigrateError> {
        let mut items = Vec::new();
        for file in self.files()? {
            let content = std::fs::read_to_string(&file)?;
            let value: Value = serde_json::from_str(&content)
                .map_err(|e| MigrateError::Source(format!("{}: {e}", file.display())))?;
            let found: Vec<Value> = items_from_value::<Value>(value)?
                .into_iter()
                .filter(|item| item.get(key).is_some())
                .collect();
            debug!(file = %file.display(), kind = key, items = found.len(), "read export file");
            items.extend(found);
        }
        Ok(Value::Array(items))
    }
}

impl SourceReader for JsonSourceReader {
    fn dashboards(&self) -> Result<Vec<SourceDashboard>, MigrateError> {
        dashboards_from_value(self.items_with("sections")?)
    }

    fn alerts(&self) -> Result<Vec<SourceAlert>, MigrateError> {
        alerts_from_value(self.items_with("condition")?)
    }
}

/// Writes one pretty-printed JSON file per document into a directory.
#[derive(Debug, Clone)]
pub struct JsonDirWriter {
    dir: PathBuf,
}

impl JsonDirWriter {
    /// Creates `dir` if it does not exist.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, MigrateError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| MigrateError::Write(format!("cannot create {}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write_json<T: serde::Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<WriteOutcome, MigrateError> {
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)?;
        std::fs::write(&path, json).map_err(|e| MigrateError::Write(format!("{}: {e}", path.display())))?;
        Ok(WriteOutcome::Written(path.display().to_string()))
    }
}

impl TargetWriter for JsonDirWriter {
    fn write_dashboard(&self, dashboard: &TargetDashboard) -> Result<WriteOutcome, MigrateError> {
        self.write_json(&format!("dashboard_{}.json", file_stem(&dashboard.source_id)), dashboard)
    }

    /// The group provisioning file, plus one file per rule for API import.
    fn write_alert_group(&self, group: &AlertGroup) -> Result<WriteOutcome, MigrateError> {
        for rule in &group.rules {
            self.write_json(&format!("alert_{}.json", file_stem(&rule.uid)), rule)?;
        }
        self.write_json(&format!("alert_group_{}.json", file_stem(&group.name)), &group.provisioning_file())
    }

    fn write_report(&self, report: &MigrationReport) -> Result<WriteOutcome, MigrateError> {
        self.write_json(REPORT_FILE, report)
    }
}

/// Ids and names become `[A-Za-z0-9_-]` file name stems. A name that had to
/// be rewritten gets a short digest of the original, so `a.b` and `a_b` do
/// not overwrite each other.
fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if !stem.is_empty() && stem == name {
        return stem;
    }
    let digest = blake3::hash(name.as_bytes()).to_hex();
    let stem = if stem.is_empty() { "unnamed" } else { stem.as_str() };
    format!("{stem}-{}", &digest.as_str()[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("ops-overview"), "ops-overview");
        assert_eq!(file_stem("a_b"), "a_b");
        assert!(file_stem("Wavefront Alerts").starts_with("Wavefront_Alerts-"));
        assert!(file_stem("a/b").starts_with("a_b-"));
        assert!(file_stem("").starts_with("unnamed-"));
    }

    #[test]
    fn test_rewritten_names_do_not_collide() {
        assert_ne!(file_stem("a.b"), file_stem("a_b"));
        assert_ne!(file_stem("a.b"), file_stem("a/b"));
        assert_eq!(file_stem("a.b"), file_stem("a.b"));
    }

    #[test]
    fn test_dashboards_with_similar_ids_get_separate_files() {
        use wgm_core::{Dialect, SourceDashboard};
        use wgm_grafana::build_dashboard;

        let dir = tempfile::tempdir().unwrap();
        let writer = JsonDirWriter::create(dir.path()).unwrap();
        for id in ["a.b", "a_b"] {
            let src = SourceDashboard { id: id.into(), name: id.into(), tags: vec![], charts: vec![] };
            writer.write_dashboard(&build_dashboard(&src, "prom", Dialect::PromQl)).unwrap();
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
        assert!(dir.path().join("dashboard_a_b.json").is_file());
    }

    #[test]
    fn test_reader_splits_mixed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        std::fs::write(
            &path,
            r#"[
                {"id": "d", "name": "D", "sections": []},
                {"id": "a", "name": "A", "condition": "ts(x) > 1"},
                {"id": "other"}
            ]"#,
        )
        .unwrap();

        let reader = JsonSourceReader::new(&path);
        assert_eq!(reader.dashboards().unwrap().len(), 1);
        let alerts = reader.alerts().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, "a");
    }

    #[test]
    fn test_reader_rejects_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{").unwrap();
        assert!(matches!(JsonSourceReader::new(dir.path()).dashboards(), Err(MigrateError::Source(_))));
    }
}
