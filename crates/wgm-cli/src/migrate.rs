//! One migration run: read, build concurrently, write in input order.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

use wgm_core::{MigrationConfig, SourceReader};
use wgm_grafana::{builders_from_config, AlertGroup, MigrationReport, TargetWriter};

use crate::args::Selection;

pub async fn run_migration(
    config: &MigrationConfig,
    selection: &Selection,
    reader: &dyn SourceReader,
    writer: &dyn TargetWriter,
) -> Result<MigrationReport> {
    let (dashboard_builder, alert_builder) = builders_from_config(config)?;
    let dashboard_builder = Arc::new(dashboard_builder);
    let alert_builder = Arc::new(alert_builder);
    let mut report = MigrationReport::new();

    if !selection.skip_dashboards {
        let sources = reader.dashboards().context("reading dashboards")?;
        let handles: Vec<JoinHandle<_>> = sources
            .into_iter()
            .filter(|d| selection.keeps_dashboard(&d.id))
            .map(|src| {
                let builder = Arc::clone(&dashboard_builder);
                let uid = config.datasource_uid.clone();
                let dialect = config.dialect;
                tokio::task::spawn_blocking(move || builder.build(&src, &uid, dialect))
            })
            .collect();

        for handle in handles {
            let dashboard = handle.await.context("dashboard task panicked")?;
            let outcome = writer
                .write_dashboard(&dashboard)
                .with_context(|| format!("writing dashboard {}", dashboard.source_id))?;
            info!(dashboard = %dashboard.source_id, panels = dashboard.panels.len(), %outcome, "dashboard migrated");
            report.add_dashboard(&dashboard);
        }
    }

    if !selection.skip_alerts {
        let sources = reader.alerts().context("reading alerts")?;
        let handles: Vec<JoinHandle<_>> = sources
            .into_iter()
            .filter(|a| selection.keeps_alert(&a.id))
            .map(|src| {
                let builder = Arc::clone(&alert_builder);
                let uid = config.datasource_uid.clone();
                let dialect = config.dialect;
                tokio::task::spawn_blocking(move || builder.build_rule(&src, &uid, dialect))
            })
            .collect();

        let mut rules = Vec::with_capacity(handles.len());
        for handle in handles {
            rules.push(handle.await.context("alert task panicked")?);
        }

        if !rules.is_empty() {
            let group = AlertGroup {
                org_id: config.org_id,
                name: config.alert_group.clone(),
                folder: config.alert_folder.clone(),
                interval: config.evaluation_interval.clone(),
                rules,
            };
            let outcome = writer
                .write_alert_group(&group)
                .with_context(|| format!("writing alert group {}", group.name))?;
            info!(group = %group.name, rules = group.rules.len(), %outcome, "alert group migrated");
            report.add_alert_group(&group);
        }
    }

    writer.write_report(&report).context("writing migration report")?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgm_core::{MemorySource, SourceAlert, SourceQuery};
    use wgm_grafana::MemoryWriter;

    fn alert(id: &str) -> SourceAlert {
        SourceAlert {
            id: id.into(),
            name: id.into(),
            condition: SourceQuery::new("ts(x) > 1"),
            minutes: 5,
            tags: Default::default(),
            description: String::new(),
            summary: None,
            severity: None,
        }
    }

    #[tokio::test]
    async fn test_rules_keep_input_order() {
        let source = MemorySource { dashboards: vec![], alerts: (0..20).map(|i| alert(&format!("a{i:02}"))).collect() };
        let config = MigrationConfig { datasource_uid: "prom".into(), ..Default::default() };
        let writer = MemoryWriter::new();

        let report = run_migration(&config, &Selection::default(), &source, &writer).await.unwrap();
        assert_eq!(report.alerts.total_rules, 20);

        let docs = writer.documents();
        assert_eq!(docs[0].0, "alert_group/Wavefront Alerts");
        let group: serde_json::Value = serde_json::from_str(&docs[0].1).unwrap();
        let uids: Vec<&str> =
            group["groups"][0]["rules"].as_array().unwrap().iter().map(|r| r["uid"].as_str().unwrap()).collect();
        let expected: Vec<String> = (0..20).map(|i| format!("wf_a{i:02}")).collect();
        assert_eq!(uids, expected);
    }

    #[tokio::test]
    async fn test_skips_write_nothing_but_the_report() {
        let source = MemorySource { dashboards: vec![], alerts: vec![alert("a")] };
        let selection = Selection { skip_alerts: true, ..Default::default() };
        let writer = MemoryWriter::new();

        run_migration(&MigrationConfig::default(), &selection, &source, &writer).await.unwrap();
        let docs = writer.documents();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].0, "report");
    }
}
