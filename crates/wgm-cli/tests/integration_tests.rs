//! End-to-end runs of the migrator over the shared Wavefront fixtures.

use clap::Parser;
use serde_json::Value;
use std::path::{Path, PathBuf};

use wgm_cli::{run_migration, Args, JsonDirWriter, JsonSourceReader, REPORT_FILE};

fn fixtures_dir() -> PathBuf {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap();
    Path::new(&manifest_dir).parent().unwrap().parent().unwrap().join("testing/fixtures/wavefront")
}

fn read(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

/// The single `alert_group_*.json` file of a run, if any.
fn group_file(dir: &Path) -> Option<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .find(|p| p.file_name().unwrap().to_string_lossy().starts_with("alert_group_"))
}

async fn migrate(extra: &[&str]) -> (tempfile::TempDir, Value) {
    let out = tempfile::tempdir().unwrap();
    let input = fixtures_dir();
    let mut argv = vec![
        "wgm",
        "--input",
        input.to_str().unwrap(),
        "--output",
        out.path().to_str().unwrap(),
        "--datasource-uid",
        "prom-main",
    ];
    argv.extend_from_slice(extra);
    let args = Args::try_parse_from(argv).unwrap();

    let config = args.resolve_config().unwrap();
    let writer = JsonDirWriter::create(&args.output).unwrap();
    run_migration(&config, &args.selection(), &JsonSourceReader::new(&args.input), &writer)
        .await
        .unwrap();

    let report = read(&out.path().join(REPORT_FILE));
    (out, report)
}

// =============================================================================
// Full Run
// =============================================================================

#[tokio::test]
async fn test_full_run_writes_every_document() {
    let (out, report) = migrate(&[]).await;

    for name in [
        "dashboard_ops-overview.json",
        "dashboard_42.json",
        "alert_wf_1585012345678.json",
        "alert_wf_1585012345681.json",
        REPORT_FILE,
    ] {
        assert!(out.path().join(name).is_file(), "missing {name}");
    }

    assert_eq!(report["dashboards"]["total"], 2);
    assert_eq!(report["dashboards"]["total_panels"], 7);
    assert_eq!(report["alerts"]["total_rules"], 4);
    assert_eq!(report["alerts"]["flagged_rules"].as_array().unwrap().len(), 1);

    let dashboard = read(&out.path().join("dashboard_ops-overview.json"));
    assert_eq!(dashboard["overwrite"], true);
    assert_eq!(dashboard["dashboard"]["panels"][0]["datasource"]["uid"], "prom-main");

    let group_path = group_file(out.path()).unwrap();
    assert!(group_path.file_name().unwrap().to_string_lossy().starts_with("alert_group_Wavefront_Alerts-"));
    let group = read(&group_path);
    assert_eq!(group["apiVersion"], 1);
    assert_eq!(group["groups"][0]["folder"], "Wavefront Migration");
    assert_eq!(group["groups"][0]["interval"], "60s");
}

#[tokio::test]
async fn test_runs_are_byte_identical() {
    let (first, _) = migrate(&[]).await;
    let (second, _) = migrate(&[]).await;

    let mut names: Vec<_> = std::fs::read_dir(first.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    names.sort();
    assert!(!names.is_empty());
    for name in names {
        let a = std::fs::read(first.path().join(&name)).unwrap();
        let b = std::fs::read(second.path().join(&name)).unwrap();
        assert_eq!(a, b, "{name:?} differs between runs");
    }
}

// =============================================================================
// Filters
// =============================================================================

#[tokio::test]
async fn test_dashboard_filter_and_skip_alerts() {
    let (out, report) = migrate(&["--dashboards", "42", "--skip-alerts"]).await;

    assert!(out.path().join("dashboard_42.json").is_file());
    assert!(!out.path().join("dashboard_ops-overview.json").exists());
    assert!(group_file(out.path()).is_none());
    assert_eq!(report["dashboards"]["total"], 1);
    assert_eq!(report["alerts"]["total_rules"], 0);
}

#[tokio::test]
async fn test_alert_group_flags() {
    let (out, _) = migrate(&[
        "--skip-dashboards",
        "--alerts",
        "1585012345678",
        "--alert-group-name",
        "Infra",
        "--alert-folder",
        "Migrated",
        "--alert-interval",
        "1m",
    ])
    .await;

    let group = read(&out.path().join("alert_group_Infra.json"));
    assert_eq!(group["groups"][0]["name"], "Infra");
    assert_eq!(group["groups"][0]["folder"], "Migrated");
    assert_eq!(group["groups"][0]["interval"], "1m");
    assert_eq!(group["groups"][0]["rules"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_influx_dialect_flag() {
    let (out, report) = migrate(&["--dialect", "influxdb", "--skip-alerts"]).await;

    let dashboard = read(&out.path().join("dashboard_ops-overview.json"));
    let target = &dashboard["dashboard"]["panels"][0]["targets"][0];
    assert_eq!(target["datasource"]["type"], "influxdb");
    assert!(target["query"].as_str().unwrap().starts_with("SELECT mean(\"value\") FROM \"cpu.usage\""));
    // rate() has no InfluxQL form here
    assert!(report["dashboards"]["degraded_panels"]
        .as_array()
        .unwrap()
        .iter()
        .any(|p| p["item"] == "Request Rate"));
}
