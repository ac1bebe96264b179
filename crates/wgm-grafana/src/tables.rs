//! Lookup tables injected into the builders.
//!
//! Both tables start from built-in defaults and accept string overrides from
//! [`MigrationConfig`](wgm_core::MigrationConfig), so a deployment can remap
//! a chart type or reducer without touching the builders.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use wgm_core::{ChartType, MigrateError, MigrationIssue};

/// Grafana panel plugin ids the builder emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelType {
    Timeseries,
    Barchart,
    Table,
    Stat,
    Heatmap,
    Gauge,
    Text,
    Bargauge,
    Piechart,
    Histogram,
}

impl PanelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PanelType::Timeseries => "timeseries",
            PanelType::Barchart => "barchart",
            PanelType::Table => "table",
            PanelType::Stat => "stat",
            PanelType::Heatmap => "heatmap",
            PanelType::Gauge => "gauge",
            PanelType::Text => "text",
            PanelType::Bargauge => "bargauge",
            PanelType::Piechart => "piechart",
            PanelType::Histogram => "histogram",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let panel = match name.trim().to_ascii_lowercase().as_str() {
            "timeseries" => PanelType::Timeseries,
            "barchart" => PanelType::Barchart,
            "table" => PanelType::Table,
            "stat" => PanelType::Stat,
            "heatmap" => PanelType::Heatmap,
            "gauge" => PanelType::Gauge,
            "text" => PanelType::Text,
            "bargauge" => PanelType::Bargauge,
            "piechart" => PanelType::Piechart,
            "histogram" => PanelType::Histogram,
            _ => return None,
        };
        Some(panel)
    }
}

impl fmt::Display for PanelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grafana reduce-expression functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    Last,
    Mean,
    Min,
    Max,
    Sum,
    Count,
}

impl Reducer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reducer::Last => "last",
            Reducer::Mean => "mean",
            Reducer::Min => "min",
            Reducer::Max => "max",
            Reducer::Sum => "sum",
            Reducer::Count => "count",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let reducer = match name.trim().to_ascii_lowercase().as_str() {
            "last" => Reducer::Last,
            "mean" | "avg" => Reducer::Mean,
            "min" => Reducer::Min,
            "max" => Reducer::Max,
            "sum" => Reducer::Sum,
            "count" => Reducer::Count,
            _ => return None,
        };
        Some(reducer)
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static DEFAULT_PANEL_TYPES: Lazy<BTreeMap<String, PanelType>> = Lazy::new(|| {
    [
        ("line", PanelType::Timeseries),
        ("area", PanelType::Timeseries),
        ("stacked-area", PanelType::Timeseries),
        ("scatter", PanelType::Timeseries),
        ("column", PanelType::Barchart),
        ("stacked-column", PanelType::Barchart),
        ("table", PanelType::Table),
        ("single-stat", PanelType::Stat),
        ("sparkline", PanelType::Stat),
        ("status-list", PanelType::Stat),
        ("heatmap", PanelType::Heatmap),
        ("gauge", PanelType::Gauge),
        ("markdown", PanelType::Text),
        ("top-k", PanelType::Bargauge),
        ("pie", PanelType::Piechart),
        ("histogram", PanelType::Histogram),
    ]
    .into_iter()
    .map(|(tag, panel)| (tag.to_string(), panel))
    .collect()
});

static DEFAULT_REDUCERS: Lazy<BTreeMap<String, Reducer>> = Lazy::new(|| {
    [
        ("ts", Reducer::Last),
        ("sum", Reducer::Last),
        ("avg", Reducer::Last),
        ("max", Reducer::Last),
        ("min", Reducer::Last),
        ("count", Reducer::Last),
        ("stddev", Reducer::Last),
        ("rate", Reducer::Last),
        ("deriv", Reducer::Last),
        ("last", Reducer::Last),
        ("mavg", Reducer::Mean),
        ("percentile", Reducer::Mean),
    ]
    .into_iter()
    .map(|(func, reducer)| (func.to_string(), reducer))
    .collect()
});

/// Chart type tag -> panel type, with `timeseries` for anything unmapped.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelTypeMap {
    map: BTreeMap<String, PanelType>,
    fallback: PanelType,
}

impl Default for PanelTypeMap {
    fn default() -> Self {
        Self { map: DEFAULT_PANEL_TYPES.clone(), fallback: PanelType::Timeseries }
    }
}

impl PanelTypeMap {
    pub fn new(map: BTreeMap<String, PanelType>, fallback: PanelType) -> Self {
        Self { map, fallback }
    }

    /// Defaults with `overrides` (tag -> panel type name) layered on top.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Result<Self, MigrateError> {
        let mut table = Self::default();
        for (tag, name) in overrides {
            let panel = PanelType::parse(name)
                .ok_or_else(|| MigrateError::Config(format!("unknown panel type '{name}' for '{tag}'")))?;
            table.map.insert(ChartType::parse(tag).as_str().to_string(), panel);
        }
        Ok(table)
    }

    /// Panel type for a chart, plus the gap recorded when the fallback applies.
    pub fn lookup(&self, chart: &ChartType) -> (PanelType, Option<MigrationIssue>) {
        match self.map.get(chart.as_str()) {
            Some(panel) => (*panel, None),
            None => (
                self.fallback,
                Some(MigrationIssue::gap(format!(
                    "chart type '{chart}' has no panel mapping, using {}",
                    self.fallback
                ))),
            ),
        }
    }
}

/// Outer WQL function -> reducer used in stage B of an alert rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ReducerTable {
    map: BTreeMap<String, Reducer>,
    default: Reducer,
}

impl Default for ReducerTable {
    fn default() -> Self {
        Self { map: DEFAULT_REDUCERS.clone(), default: Reducer::Last }
    }
}

impl ReducerTable {
    pub fn new(map: BTreeMap<String, Reducer>, default: Reducer) -> Self {
        Self { map, default }
    }

    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Result<Self, MigrateError> {
        let mut table = Self::default();
        for (func, name) in overrides {
            let reducer = Reducer::parse(name)
                .ok_or_else(|| MigrateError::Config(format!("unknown reducer '{name}' for '{func}'")))?;
            table.map.insert(func.to_ascii_lowercase(), reducer);
        }
        Ok(table)
    }

    pub fn lookup(&self, function: Option<&str>) -> Reducer {
        function
            .and_then(|f| self.map.get(&f.to_ascii_lowercase()))
            .copied()
            .unwrap_or(self.default)
    }
}
