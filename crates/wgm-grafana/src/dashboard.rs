//! Wavefront dashboard -> Grafana dashboard.

use serde_json::{json, Value};
use tracing::{debug, warn};

use wgm_core::{derive_uid, ChartType, Dialect, MigrationIssue, SourceChart, SourceDashboard};
use wgm_translate::{for_dialect, TranslationResult, Translator};

use crate::panel::{GridPos, TargetDashboard, TargetPanel};
use crate::query_model::{ref_id, DatasourceRef, QueryBody, QueryModel};
use crate::tables::{PanelType, PanelTypeMap};

pub const DASHBOARD_UID_PREFIX: &str = "wf-";
pub const MIGRATION_TAG: &str = "wavefront-migration";
pub const REVIEW_TAG: &str = "needs-review";

#[derive(Debug, Clone, Default)]
pub struct DashboardBuilder {
    translator: Translator,
    panel_types: PanelTypeMap,
}

impl DashboardBuilder {
    pub fn new(translator: Translator, panel_types: PanelTypeMap) -> Self {
        Self { translator, panel_types }
    }

    /// Build one Grafana dashboard. Every chart becomes exactly one panel.
    pub fn build(&self, src: &SourceDashboard, datasource_uid: &str, dialect: Dialect) -> TargetDashboard {
        let datasource = DatasourceRef::new(dialect, datasource_uid);
        let panels: Vec<TargetPanel> = src
            .charts
            .iter()
            .enumerate()
            .map(|(i, chart)| self.panel(i as u32 + 1, chart, &datasource, dialect))
            .collect();

        for panel in panels.iter().filter(|p| p.is_degraded()) {
            let reasons: Vec<String> = panel.issues.iter().map(ToString::to_string).collect();
            warn!(dashboard = %src.id, panel = %panel.title, reason = %reasons.join("; "), "panel needs review");
        }

        let mut tags: Vec<String> = Vec::new();
        for tag in src.tags.iter().map(String::as_str).chain([MIGRATION_TAG]) {
            if !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }
        if panels.iter().any(TargetPanel::is_degraded) && !tags.iter().any(|t| t == REVIEW_TAG) {
            tags.push(REVIEW_TAG.to_string());
        }

        debug!(dashboard = %src.id, panels = panels.len(), %dialect, "built dashboard");
        TargetDashboard {
            uid: derive_uid(DASHBOARD_UID_PREFIX, &src.id),
            title: src.name.clone(),
            tags,
            panels,
            source_id: src.id.clone(),
        }
    }

    fn panel(&self, id: u32, chart: &SourceChart, datasource: &DatasourceRef, dialect: Dialect) -> TargetPanel {
        let (panel_type, gap) = self.panel_types.lookup(&chart.chart_type);
        let mut issues: Vec<MigrationIssue> = gap.into_iter().collect();

        let mut targets = Vec::with_capacity(chart.queries.len().max(1));
        for (i, query) in chart.queries.iter().enumerate() {
            let result = self.translator.translate(query.as_str(), dialect);
            if let TranslationResult::Untranslated { issue, .. } = &result {
                issues.push(issue.clone());
            }
            targets.push(QueryModel {
                ref_id: ref_id(i),
                datasource: datasource.clone(),
                body: QueryBody::from_result(&result, dialect),
                alerting: false,
            });
        }
        if targets.is_empty() {
            let issue = MigrationIssue::gap("chart has no queries");
            targets.push(QueryModel {
                ref_id: ref_id(0),
                datasource: datasource.clone(),
                body: QueryBody::Placeholder {
                    dialect,
                    text: for_dialect(dialect).placeholder(&chart.name, &issue),
                },
                alerting: false,
            });
            issues.push(issue);
        }

        let description = review_description(chart.description.as_deref(), &issues);
        let (field_config, options) = presentation(panel_type, chart);

        TargetPanel {
            id,
            title: chart.name.clone(),
            description,
            panel_type,
            grid_pos: GridPos::from(chart.layout),
            datasource: datasource.clone(),
            targets,
            field_config,
            options,
            issues,
        }
    }
}

/// Build with the default translator and panel-type table.
pub fn build_dashboard(src: &SourceDashboard, datasource_uid: &str, dialect: Dialect) -> TargetDashboard {
    DashboardBuilder::default().build(src, datasource_uid, dialect)
}

fn review_description(description: Option<&str>, issues: &[MigrationIssue]) -> Option<String> {
    if issues.is_empty() {
        return description.map(str::to_string);
    }
    let notes: Vec<String> = issues.iter().map(|i| format!("[migration] {i}")).collect();
    Some(match description {
        Some(d) => format!("{d}\n\n{}", notes.join("\n")),
        None => notes.join("\n"),
    })
}

fn presentation(panel_type: PanelType, chart: &SourceChart) -> (Option<Value>, Option<Value>) {
    let chart_type = &chart.chart_type;
    match panel_type {
        PanelType::Timeseries => (Some(timeseries_field_config(chart_type)), None),
        PanelType::Barchart => {
            let stacking = if *chart_type == ChartType::StackedColumn { "normal" } else { "none" };
            (None, Some(json!({ "stacking": stacking, "legend": { "displayMode": "list", "placement": "bottom" } })))
        }
        PanelType::Stat => (Some(stat_field_config()), Some(stat_options(chart_type))),
        PanelType::Text => (
            None,
            Some(json!({
                "mode": "markdown",
                "content": chart.description.clone().unwrap_or_else(|| format!("## {}", chart.name))
            })),
        ),
        _ => (None, None),
    }
}

fn timeseries_field_config(chart_type: &ChartType) -> Value {
    let (draw_style, fill_opacity, show_points, stacking) = match chart_type {
        ChartType::Area => ("line", 10, "never", "none"),
        ChartType::StackedArea => ("line", 10, "never", "normal"),
        ChartType::Scatter => ("points", 0, "always", "none"),
        ChartType::Column | ChartType::StackedColumn => ("bars", 0, "never", "none"),
        _ => ("line", 0, "never", "none"),
    };

    json!({
        "defaults": {
            "color": { "mode": "palette-classic" },
            "custom": {
                "axisLabel": "",
                "axisPlacement": "auto",
                "barAlignment": 0,
                "drawStyle": draw_style,
                "fillOpacity": fill_opacity,
                "gradientMode": "none",
                "hideFrom": { "legend": false, "tooltip": false, "viz": false },
                "lineInterpolation": "linear",
                "lineWidth": 1,
                "pointSize": 5,
                "scaleDistribution": { "type": "linear" },
                "showPoints": show_points,
                "spanNulls": true,
                "stacking": { "group": "A", "mode": stacking },
                "thresholdsStyle": { "mode": "off" }
            },
            "mappings": [],
            "thresholds": {
                "mode": "absolute",
                "steps": [{ "color": "green", "value": null }]
            },
            "unit": "short"
        },
        "overrides": []
    })
}

fn stat_field_config() -> Value {
    json!({
        "defaults": {
            "color": { "mode": "thresholds" },
            "mappings": [],
            "thresholds": {
                "mode": "absolute",
                "steps": [
                    { "color": "green", "value": null },
                    { "color": "red", "value": 80 }
                ]
            },
            "unit": "short"
        },
        "overrides": []
    })
}

fn stat_options(chart_type: &ChartType) -> Value {
    let graph_mode = if *chart_type == ChartType::Sparkline { "area" } else { "none" };
    json!({
        "colorMode": "value",
        "graphMode": graph_mode,
        "justifyMode": "auto",
        "orientation": "auto",
        "reduceOptions": {
            "values": false,
            "fields": "",
            "calcs": ["lastNotNull"]
        },
        "textMode": "auto"
    })
}
