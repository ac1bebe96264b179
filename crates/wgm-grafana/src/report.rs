//! Review report: what migrated cleanly and what a human has to look at.

use serde::{Deserialize, Serialize};

use crate::alert::AlertGroup;
use crate::panel::TargetDashboard;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub dashboards: DashboardSummary,
    pub alerts: AlertSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total: usize,
    pub total_panels: usize,
    pub degraded_panels: Vec<ReviewItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub total_rules: usize,
    pub flagged_rules: Vec<ReviewItem>,
}

/// One panel or rule that needs manual review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewItem {
    /// Dashboard uid or alert group name.
    pub parent: String,
    /// Panel title or rule uid.
    pub item: String,
    pub reasons: Vec<String>,
}

impl MigrationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dashboard(&mut self, dashboard: &TargetDashboard) {
        self.dashboards.total += 1;
        self.dashboards.total_panels += dashboard.panels.len();
        self.dashboards.degraded_panels.extend(dashboard.degraded_panels().map(|panel| ReviewItem {
            parent: dashboard.uid.clone(),
            item: panel.title.clone(),
            reasons: panel.issues.iter().map(ToString::to_string).collect(),
        }));
    }

    pub fn add_alert_group(&mut self, group: &AlertGroup) {
        self.alerts.total_rules += group.rules.len();
        self.alerts.flagged_rules.extend(group.rules.iter().filter(|r| r.is_degraded()).map(|rule| ReviewItem {
            parent: group.name.clone(),
            item: rule.uid.clone(),
            reasons: rule.issues.iter().map(ToString::to_string).collect(),
        }));
    }

    pub fn needs_review(&self) -> bool {
        !self.dashboards.degraded_panels.is_empty() || !self.alerts.flagged_rules.is_empty()
    }
}
