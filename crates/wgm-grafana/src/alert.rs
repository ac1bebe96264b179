//! Wavefront alert -> Grafana alert rule.
//!
//! Every condition clause becomes a three-step chain:
//!
//! ```text
//! A  query      translated series, instant
//! B  reduce     series -> scalar (reducer from the outer WQL function)
//! C  threshold  gt / lt on B, or a math step `$B >= N` for the other operators
//! ```
//!
//! Compound conditions repeat the chain per clause and end in one math step
//! combining the clause results, AND binding tighter than OR.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use wgm_core::{derive_uid, sanitize_name, Dialect, MigrationIssue, SourceAlert};
use wgm_translate::{outer_function, split_condition, BoolOp, CmpOp, Comparison, TranslationResult, Translator};

use crate::query_model::{ref_id, DatasourceRef, QueryBody, QueryModel, ALERT_INTERVAL_MS, ALERT_MAX_DATA_POINTS};
use crate::tables::{Reducer, ReducerTable};

pub const RULE_UID_PREFIX: &str = "wf_";
pub const NO_DATA_STATE: &str = "NoData";
pub const EXEC_ERR_STATE: &str = "Alerting";
pub const EVALUATION_WINDOW_SECS: u64 = 600;
pub const REVIEW_LABEL: &str = "migration_status";
pub const REVIEW_LABEL_VALUE: &str = "needs_manual_translation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RelativeTimeRange {
    pub from: u64,
    pub to: u64,
}

/// One step of a rule's evaluation chain.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertStep {
    Query(QueryModel),
    Reduce { expression: String, reducer: Reducer },
    Threshold { expression: String, op: CmpOp, threshold: f64 },
    Math { expression: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertQuery {
    pub ref_id: String,
    pub datasource_uid: String,
    pub relative_time_range: RelativeTimeRange,
    pub step: AlertStep,
}

impl Serialize for AlertQuery {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let expr_datasource = DatasourceRef::expression();
        let model = match &self.step {
            AlertStep::Query(query) => serde_json::to_value(query).map_err(serde::ser::Error::custom)?,
            AlertStep::Reduce { expression, reducer } => json!({
                "datasource": expr_datasource,
                "expression": expression,
                "intervalMs": ALERT_INTERVAL_MS,
                "maxDataPoints": ALERT_MAX_DATA_POINTS,
                "reducer": reducer,
                "refId": self.ref_id,
                "type": "reduce"
            }),
            AlertStep::Threshold { expression, op, threshold } => json!({
                "conditions": [{
                    "evaluator": { "params": [threshold], "type": evaluator(*op) },
                    "operator": { "type": "and" },
                    "query": { "params": [self.ref_id] },
                    "reducer": { "params": [], "type": "last" },
                    "type": "query"
                }],
                "datasource": expr_datasource,
                "expression": expression,
                "intervalMs": ALERT_INTERVAL_MS,
                "maxDataPoints": ALERT_MAX_DATA_POINTS,
                "refId": self.ref_id,
                "type": "threshold"
            }),
            AlertStep::Math { expression } => json!({
                "datasource": expr_datasource,
                "expression": expression,
                "intervalMs": ALERT_INTERVAL_MS,
                "maxDataPoints": ALERT_MAX_DATA_POINTS,
                "refId": self.ref_id,
                "type": "math"
            }),
        };

        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("refId", &self.ref_id)?;
        map.serialize_entry("relativeTimeRange", &self.relative_time_range)?;
        map.serialize_entry("datasourceUid", &self.datasource_uid)?;
        map.serialize_entry("model", &model)?;
        map.end()
    }
}

fn evaluator(op: CmpOp) -> &'static str {
    match op {
        CmpOp::Lt => "lt",
        _ => "gt",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetAlertRule {
    pub uid: String,
    pub title: String,
    pub condition: String,
    pub data: Vec<AlertQuery>,
    pub no_data_state: String,
    pub exec_err_state: String,
    #[serde(rename = "for")]
    pub for_duration: String,
    pub annotations: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub is_paused: bool,
    #[serde(skip)]
    pub issues: Vec<MigrationIssue>,
}

impl TargetAlertRule {
    pub fn is_degraded(&self) -> bool {
        !self.issues.is_empty()
    }
}

/// Rules sharing one folder and evaluation interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertGroup {
    pub org_id: u32,
    pub name: String,
    pub folder: String,
    pub interval: String,
    pub rules: Vec<TargetAlertRule>,
}

impl AlertGroup {
    /// Wrap the group as a Grafana alerting provisioning file.
    pub fn provisioning_file(&self) -> ProvisioningFile<'_> {
        ProvisioningFile { api_version: 1, groups: vec![self] }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningFile<'a> {
    pub api_version: u32,
    pub groups: Vec<&'a AlertGroup>,
}

#[derive(Debug, Clone)]
pub struct AlertBuilder {
    translator: Translator,
    reducers: ReducerTable,
    org_id: u32,
}

impl Default for AlertBuilder {
    fn default() -> Self {
        Self::new(Translator::default(), ReducerTable::default())
    }
}

impl AlertBuilder {
    pub fn new(translator: Translator, reducers: ReducerTable) -> Self {
        Self { translator, reducers, org_id: 1 }
    }

    pub fn with_org_id(mut self, org_id: u32) -> Self {
        self.org_id = org_id;
        self
    }

    pub fn build_rule(&self, src: &SourceAlert, datasource_uid: &str, dialect: Dialect) -> TargetAlertRule {
        let split = split_condition(src.condition.as_str());
        let datasource = DatasourceRef::new(dialect, datasource_uid);
        let mut data = Vec::new();
        let mut issues = Vec::new();
        let mut clause_refs = Vec::with_capacity(split.clauses.len());

        for clause in &split.clauses {
            let result = self.translator.translate(&clause.query, dialect);
            match (&clause.issue, &result) {
                // the clause issue already explains a failed translation
                (Some(issue), _) => issues.push(issue.clone()),
                (None, TranslationResult::Untranslated { issue, .. }) => issues.push(issue.clone()),
                (None, TranslationResult::Translated(_)) => {}
            }

            let query_ref = ref_id(data.len());
            data.push(AlertQuery {
                ref_id: query_ref.clone(),
                datasource_uid: datasource_uid.to_string(),
                relative_time_range: window(),
                step: AlertStep::Query(QueryModel {
                    ref_id: query_ref.clone(),
                    datasource: datasource.clone(),
                    body: QueryBody::from_result(&result, dialect),
                    alerting: true,
                }),
            });

            let reduce_ref = ref_id(data.len());
            let reducer = self.reducers.lookup(outer_function(&clause.query).as_deref());
            data.push(expression_step(&reduce_ref, AlertStep::Reduce { expression: query_ref, reducer }));

            let threshold_ref = ref_id(data.len());
            data.push(expression_step(&threshold_ref, threshold_step(&reduce_ref, &clause.comparison)));
            clause_refs.push(threshold_ref);
        }

        let condition = match clause_refs.as_slice() {
            [single] => single.clone(),
            refs => {
                let combined_ref = ref_id(data.len());
                let expression = combine(refs, &split.joins);
                data.push(expression_step(&combined_ref, AlertStep::Math { expression }));
                combined_ref
            }
        };

        let rule = TargetAlertRule {
            uid: derive_uid(RULE_UID_PREFIX, &src.id),
            title: src.name.clone(),
            condition,
            data,
            no_data_state: NO_DATA_STATE.to_string(),
            exec_err_state: EXEC_ERR_STATE.to_string(),
            for_duration: format!("{}m", src.minutes),
            annotations: annotations(src, &issues),
            labels: labels(src, !issues.is_empty()),
            is_paused: false,
            issues,
        };

        if rule.is_degraded() {
            let reasons: Vec<String> = rule.issues.iter().map(ToString::to_string).collect();
            warn!(alert = %src.id, rule = %rule.uid, reason = %reasons.join("; "), "alert rule needs review");
        }
        debug!(alert = %src.id, rule = %rule.uid, steps = rule.data.len(), "built alert rule");
        rule
    }

    /// Build every rule under one group, in input order. Never fails.
    pub fn build_group(
        &self,
        alerts: &[SourceAlert],
        group_name: &str,
        folder_name: &str,
        interval: &str,
        datasource_uid: &str,
        dialect: Dialect,
    ) -> AlertGroup {
        AlertGroup {
            org_id: self.org_id,
            name: group_name.to_string(),
            folder: folder_name.to_string(),
            interval: interval.to_string(),
            rules: alerts.iter().map(|a| self.build_rule(a, datasource_uid, dialect)).collect(),
        }
    }
}

pub fn build_alert_rule(src: &SourceAlert, datasource_uid: &str, dialect: Dialect) -> TargetAlertRule {
    AlertBuilder::default().build_rule(src, datasource_uid, dialect)
}

pub fn build_alert_group(
    alerts: &[SourceAlert],
    group_name: &str,
    folder_name: &str,
    interval: &str,
    datasource_uid: &str,
    dialect: Dialect,
) -> AlertGroup {
    AlertBuilder::default().build_group(alerts, group_name, folder_name, interval, datasource_uid, dialect)
}

fn window() -> RelativeTimeRange {
    RelativeTimeRange { from: EVALUATION_WINDOW_SECS, to: 0 }
}

fn expression_step(ref_id: &str, step: AlertStep) -> AlertQuery {
    AlertQuery {
        ref_id: ref_id.to_string(),
        datasource_uid: "__expr__".to_string(),
        relative_time_range: window(),
        step,
    }
}

/// Grafana's threshold evaluator only knows gt/lt; the rest go through math.
fn threshold_step(input_ref: &str, comparison: &Comparison) -> AlertStep {
    match comparison.op {
        CmpOp::Gt | CmpOp::Lt => AlertStep::Threshold {
            expression: input_ref.to_string(),
            op: comparison.op,
            threshold: comparison.threshold,
        },
        op => AlertStep::Math {
            expression: format!("${input_ref} {op} {}", comparison.threshold),
        },
    }
}

/// `$C && $F || $I` with AND-runs parenthesised when mixed with OR.
fn combine(refs: &[String], joins: &[BoolOp]) -> String {
    let mut runs: Vec<Vec<String>> = vec![Vec::new()];
    for (i, r) in refs.iter().enumerate() {
        if let Some(last) = runs.last_mut() {
            last.push(format!("${r}"));
        }
        if joins.get(i) == Some(&BoolOp::Or) {
            runs.push(Vec::new());
        }
    }

    let mixed = runs.len() > 1;
    runs.iter()
        .map(|run| {
            let joined = run.join(&format!(" {} ", BoolOp::And.symbol()));
            if mixed && run.len() > 1 {
                format!("({joined})")
            } else {
                joined
            }
        })
        .collect::<Vec<_>>()
        .join(&format!(" {} ", BoolOp::Or.symbol()))
}

fn annotations(src: &SourceAlert, issues: &[MigrationIssue]) -> BTreeMap<String, String> {
    let mut annotations = BTreeMap::new();
    annotations.insert("description".to_string(), src.description.clone());
    annotations.insert(
        "summary".to_string(),
        src.summary.clone().filter(|s| !s.trim().is_empty()).unwrap_or_else(|| src.name.clone()),
    );
    annotations.insert("runbook_url".to_string(), String::new());
    annotations.insert("wavefront_condition".to_string(), src.condition.to_string());
    if !issues.is_empty() {
        let notes: Vec<String> = issues.iter().map(ToString::to_string).collect();
        annotations.insert("migration_notes".to_string(), notes.join("; "));
    }
    annotations
}

/// Source tags whose sanitised names collide get `_2`, `_3`, ... in key order.
fn labels(src: &SourceAlert, degraded: bool) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    for (key, value) in &src.tags {
        let base = format!("tag_{}", sanitize_name(key).trim_start_matches('_'));
        let mut name = base.clone();
        let mut n = 1;
        while labels.contains_key(&name) {
            n += 1;
            name = format!("{base}_{n}");
        }
        labels.insert(name, value.clone());
    }
    if let Some(severity) = src.severity.as_deref().filter(|s| !s.trim().is_empty()) {
        labels.insert("severity".to_string(), severity.to_ascii_lowercase());
    }
    if degraded {
        labels.insert(REVIEW_LABEL.to_string(), REVIEW_LABEL_VALUE.to_string());
    }
    labels
}
