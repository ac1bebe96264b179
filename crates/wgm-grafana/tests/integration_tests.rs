//! Integration tests for wgm-grafana over exported Wavefront documents.
//!
//! Fixtures live in `testing/fixtures/wavefront/` at the workspace root and
//! go through the same JSON adapter the CLI uses.

use serde_json::Value;
use std::path::PathBuf;

use wgm_core::wavefront::{alerts_from_value, dashboards_from_value};
use wgm_core::{Dialect, MigrationConfig, SourceAlert, SourceDashboard};
use wgm_grafana::{
    build_alert_group, build_alert_rule, build_dashboard, builders_from_config, MigrationReport, PanelType,
};

fn workspace_root() -> PathBuf {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap();
    PathBuf::from(manifest_dir).parent().unwrap().parent().unwrap().to_path_buf()
}

fn read_json(relative: &str) -> Value {
    let content = std::fs::read_to_string(workspace_root().join(relative)).unwrap();
    serde_json::from_str(&content).unwrap()
}

fn dashboards() -> Vec<SourceDashboard> {
    dashboards_from_value(read_json("testing/fixtures/wavefront/dashboards.json")).unwrap()
}

fn alerts() -> Vec<SourceAlert> {
    alerts_from_value(read_json("testing/fixtures/wavefront/alerts.json")).unwrap()
}

// =============================================================================
// Dashboards
// =============================================================================

#[test]
fn test_no_panel_loss_for_any_dialect() {
    for dialect in Dialect::ALL {
        for src in dashboards() {
            let out = build_dashboard(&src, "ds", dialect);
            assert_eq!(out.panels.len(), src.charts.len(), "{} -> {dialect}", src.id);
            for panel in &out.panels {
                assert!(!panel.targets.is_empty());
                for target in &panel.targets {
                    assert!(!target.body.text().trim().is_empty(), "{} / {}", src.id, panel.title);
                }
            }
        }
    }
}

#[test]
fn test_ops_overview_to_prometheus() {
    let src = &dashboards()[0];
    let out = build_dashboard(src, "prom-main", Dialect::PromQl);
    let json = serde_json::to_value(&out).unwrap();
    let panels = json["dashboard"]["panels"].as_array().unwrap();

    assert_eq!(json["dashboard"]["uid"], "wf-ops-overview");
    assert_eq!(json["dashboard"]["title"], "Ops Overview");
    assert_eq!(panels.len(), 6);

    assert_eq!(panels[0]["targets"].as_array().unwrap().len(), 2);
    assert_eq!(panels[0]["targets"][0]["expr"], "cpu_usage{env=\"prod\"}");
    assert_eq!(panels[0]["targets"][1]["expr"], "avg by (host) (cpu_usage)");
    assert_eq!(panels[1]["targets"][0]["expr"], "rate(requests_count[5m])");
    assert_eq!(panels[1]["fieldConfig"]["defaults"]["custom"]["stacking"]["mode"], "normal");
    assert_eq!(panels[2]["type"], "stat");
    assert_eq!(panels[2]["targets"][0]["expr"], "avg_over_time(system_load_1[10m])");
    assert_eq!(panels[3]["type"], "barchart");
    assert_eq!(panels[3]["targets"][0]["expr"], "quantile(0.95, http_latency)");
    assert_eq!(panels[5]["type"], "text");

    assert_eq!(panels[0]["gridPos"], serde_json::json!({"h": 8, "w": 12, "x": 0, "y": 0}));
    assert_eq!(panels[2]["gridPos"], serde_json::json!({"h": 8, "w": 12, "x": 0, "y": 8}));
    assert_eq!(panels[4]["gridPos"], serde_json::json!({"h": 8, "w": 12, "x": 12, "y": 16}));
    assert_eq!(panels[5]["gridPos"], serde_json::json!({"h": 8, "w": 12, "x": 0, "y": 24}));
}

#[test]
fn test_degraded_panels_are_visible() {
    let out = build_dashboard(&dashboards()[0], "prom-main", Dialect::PromQl);
    let degraded: Vec<&str> = out.degraded_panels().map(|p| p.title.as_str()).collect();
    assert_eq!(degraded, vec!["Histogram Source", "Runbook"]);
    assert!(out.tags.iter().any(|t| t == "needs-review"));

    let histogram = &out.panels[4];
    assert_eq!(histogram.panel_type, PanelType::Timeseries);
    assert!(histogram.targets[0].body.text().starts_with("# NEEDS MANUAL TRANSLATION"));
    assert!(histogram.targets[0].body.text().contains("hs(http.latency.hist)"));
    assert!(histogram.description.as_deref().unwrap().contains("[migration] GAP/"));
}

#[test]
fn test_numeric_dashboard_id() {
    let storage = &dashboards()[1];
    assert_eq!(storage.id, "42");
    let out = build_dashboard(storage, "influx-main", Dialect::InfluxQl);
    assert_eq!(out.uid, "wf-42");
    assert!(out.panels[0].targets[0].body.text().starts_with("SELECT min(\"value\") FROM \"disk.free\""));
}

// =============================================================================
// Alerts
// =============================================================================

#[test]
fn test_high_cpu_rule() {
    let rule = build_alert_rule(&alerts()[0], "prom-main", Dialect::PromQl);
    let json = serde_json::to_value(&rule).unwrap();

    assert_eq!(json["uid"], "wf_1585012345678");
    assert_eq!(json["title"], "High CPU");
    assert_eq!(json["condition"], "C");
    assert_eq!(json["for"], "5m");
    assert_eq!(json["data"][0]["datasourceUid"], "prom-main");
    assert_eq!(json["data"][0]["relativeTimeRange"]["from"], 600);
    assert_eq!(json["data"][0]["model"]["expr"], "cpu_usage_percent");
    assert_eq!(json["data"][1]["model"]["reducer"], "last");
    assert_eq!(json["data"][2]["model"]["type"], "threshold");
    assert_eq!(json["data"][2]["model"]["conditions"][0]["evaluator"]["type"], "gt");
    assert_eq!(json["data"][2]["model"]["conditions"][0]["evaluator"]["params"][0], 80.0);
    assert_eq!(json["labels"]["tag_team_infra"], "team.infra");
    assert_eq!(json["labels"]["severity"], "severe");
    assert_eq!(json["annotations"]["description"], "CPU above 80% for five minutes");
}

#[test]
fn test_group_keeps_order_and_count() {
    let alerts = alerts();
    for dialect in Dialect::ALL {
        let group = build_alert_group(&alerts, "Wavefront Alerts", "Wavefront Migration", "60s", "ds", dialect);
        assert_eq!(group.rules.len(), alerts.len());
        for (rule, src) in group.rules.iter().zip(&alerts) {
            assert_eq!(rule.title, src.name);
        }
    }
}

#[test]
fn test_compound_and_flagged_rules() {
    let group = build_alert_group(&alerts(), "Wavefront Alerts", "Wavefront Migration", "60s", "prom", Dialect::PromQl);

    let low_disk = &group.rules[1];
    assert_eq!(low_disk.for_duration, "10m");
    let model = serde_json::to_value(&low_disk.data[2]).unwrap();
    assert_eq!(model["model"]["expression"], "$B <= 10");

    let burst = &group.rules[2];
    assert_eq!(burst.data.len(), 7);
    assert_eq!(burst.condition, "G");
    let combined = serde_json::to_value(&burst.data[6]).unwrap();
    assert_eq!(combined["model"]["expression"], "$C && $F");

    let histogram = &group.rules[3];
    assert!(histogram.is_degraded());
    assert_eq!(histogram.labels["migration_status"], "needs_manual_translation");
}

// =============================================================================
// Idempotence and Report
// =============================================================================

#[test]
fn test_builders_are_idempotent() {
    for dialect in Dialect::ALL {
        for src in dashboards() {
            let first = serde_json::to_string(&build_dashboard(&src, "ds", dialect)).unwrap();
            let second = serde_json::to_string(&build_dashboard(&src, "ds", dialect)).unwrap();
            assert_eq!(first, second);
        }
        let group = || build_alert_group(&alerts(), "g", "f", "60s", "ds", dialect);
        assert_eq!(
            serde_json::to_string(&group().provisioning_file()).unwrap(),
            serde_json::to_string(&group().provisioning_file()).unwrap()
        );
    }
}

#[test]
fn test_report_over_fixtures() {
    let mut report = MigrationReport::new();
    for src in dashboards() {
        report.add_dashboard(&build_dashboard(&src, "prom", Dialect::PromQl));
    }
    report.add_alert_group(&build_alert_group(&alerts(), "g", "f", "60s", "prom", Dialect::PromQl));

    assert_eq!(report.dashboards.total, 2);
    assert_eq!(report.dashboards.total_panels, 7);
    assert_eq!(report.dashboards.degraded_panels.len(), 2);
    assert_eq!(report.alerts.total_rules, 4);
    assert_eq!(report.alerts.flagged_rules.len(), 1);
    assert_eq!(report.alerts.flagged_rules[0].item, "wf_1585012345681");
}

// =============================================================================
// Shipped Mappings
// =============================================================================

#[test]
fn test_shipped_mappings_load() {
    let content = std::fs::read_to_string(workspace_root().join("config/mappings.yaml")).unwrap();
    let mut config: MigrationConfig = serde_yaml::from_str(&content).unwrap();
    config.datasource_uid = "prom".into();
    config.validate().unwrap();

    let (dashboards_builder, _) = builders_from_config(&config).unwrap();
    let out = dashboards_builder.build(&dashboards()[0], "prom", Dialect::PromQl);
    assert_eq!(out.panels[2].panel_type, PanelType::Stat);
}
