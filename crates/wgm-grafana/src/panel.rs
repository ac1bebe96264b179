//! Grafana dashboard documents.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use wgm_core::{ChartLayout, MigrationIssue};

use crate::query_model::{DatasourceRef, QueryModel};
use crate::tables::PanelType;

pub const SCHEMA_VERSION: u32 = 39;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridPos {
    pub h: u32,
    pub w: u32,
    pub x: u32,
    pub y: u32,
}

impl From<ChartLayout> for GridPos {
    fn from(layout: ChartLayout) -> Self {
        Self { h: layout.h, w: layout.w, x: layout.x, y: layout.y }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetPanel {
    pub id: u32,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub panel_type: PanelType,
    pub grid_pos: GridPos,
    pub datasource: DatasourceRef,
    pub targets: Vec<QueryModel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_config: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
    /// Review notes; carried in the migration report, not in Grafana JSON.
    #[serde(skip)]
    pub issues: Vec<MigrationIssue>,
}

impl TargetPanel {
    pub fn is_degraded(&self) -> bool {
        !self.issues.is_empty()
    }
}

/// A dashboard ready for `POST /api/dashboards/db`.
///
/// Serialises as the import payload `{"dashboard": {...}, "overwrite": true}`.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetDashboard {
    pub uid: String,
    pub title: String,
    pub tags: Vec<String>,
    pub panels: Vec<TargetPanel>,
    /// Wavefront dashboard id this was built from.
    pub source_id: String,
}

impl TargetDashboard {
    pub fn degraded_panels(&self) -> impl Iterator<Item = &TargetPanel> {
        self.panels.iter().filter(|p| p.is_degraded())
    }

    pub fn needs_review(&self) -> bool {
        self.degraded_panels().next().is_some()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DashboardModel<'a> {
    id: Option<u64>,
    uid: &'a str,
    title: &'a str,
    tags: &'a [String],
    timezone: &'static str,
    schema_version: u32,
    version: u32,
    refresh: &'static str,
    time: Value,
    panels: &'a [TargetPanel],
    annotations: Value,
}

impl Serialize for TargetDashboard {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let model = DashboardModel {
            id: None,
            uid: &self.uid,
            title: &self.title,
            tags: &self.tags,
            timezone: "browser",
            schema_version: SCHEMA_VERSION,
            version: 1,
            refresh: "30s",
            time: json!({ "from": "now-6h", "to": "now" }),
            panels: &self.panels,
            annotations: json!({
                "list": [{
                    "builtIn": 1,
                    "datasource": { "type": "grafana", "uid": "-- Grafana --" },
                    "enable": true,
                    "hide": true,
                    "iconColor": "rgba(0, 211, 255, 1)",
                    "name": "Annotations & Alerts",
                    "type": "dashboard"
                }]
            }),
        };

        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("dashboard", &model)?;
        map.serialize_entry("overwrite", &true)?;
        map.end()
    }
}
