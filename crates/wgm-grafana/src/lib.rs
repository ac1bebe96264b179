//! WGM Grafana: Grafana dashboards and alert rules from Wavefront documents
//!
//! - [`DashboardBuilder`] turns a [`SourceDashboard`](wgm_core::SourceDashboard)
//!   into a dashboard import payload, one panel per chart.
//! - [`AlertBuilder`] turns [`SourceAlert`](wgm_core::SourceAlert)s into
//!   Query -> Reduce -> Threshold rules and groups them for provisioning.
//! - [`MigrationReport`] lists what needs a human.
//!
//! Builders never fail: anything they cannot express is written as a visible
//! placeholder and flagged for review.

pub mod alert;
pub mod dashboard;
pub mod panel;
pub mod query_model;
pub mod report;
pub mod sink;
pub mod tables;

pub use alert::{build_alert_group, build_alert_rule, AlertBuilder, AlertGroup, AlertQuery, AlertStep, TargetAlertRule};
pub use dashboard::{build_dashboard, DashboardBuilder};
pub use panel::{GridPos, TargetDashboard, TargetPanel};
pub use query_model::{DatasourceRef, QueryBody, QueryModel};
pub use report::{MigrationReport, ReviewItem};
pub use sink::{MemoryWriter, TargetWriter, WriteOutcome};
pub use tables::{PanelType, PanelTypeMap, Reducer, ReducerTable};

use wgm_core::{MigrateError, MigrationConfig};
use wgm_translate::{TranslateOptions, Translator};

/// Both builders configured from one [`MigrationConfig`].
pub fn builders_from_config(config: &MigrationConfig) -> Result<(DashboardBuilder, AlertBuilder), MigrateError> {
    let translator = Translator::new(TranslateOptions::from(config));
    let panel_types = PanelTypeMap::with_overrides(&config.panel_types)?;
    let reducers = ReducerTable::with_overrides(&config.reducers)?;
    Ok((
        DashboardBuilder::new(translator.clone(), panel_types),
        AlertBuilder::new(translator, reducers).with_org_id(config.org_id),
    ))
}
