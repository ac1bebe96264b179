//! Data Model: SourceQuery, SourceDashboard, SourceChart, SourceAlert
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// WQL text exactly as authored in Wavefront.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceQuery(String);

impl SourceQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl AsRef<str> for SourceQuery {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceQuery {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SourceQuery {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDashboard {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub charts: Vec<SourceChart>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceChart {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub chart_type: ChartType,
    #[serde(default)]
    pub queries: Vec<SourceQuery>,
    #[serde(default)]
    pub layout: ChartLayout,
}

/// Position and size on a 24-column grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartLayout {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Default for ChartLayout {
    fn default() -> Self {
        Self { x: 0, y: 0, w: 12, h: 8 }
    }
}

/// Wavefront `chartSettings.type` tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChartType {
    #[default]
    Line,
    Area,
    StackedArea,
    Column,
    StackedColumn,
    Scatter,
    Table,
    SingleStat,
    Sparkline,
    Heatmap,
    Gauge,
    Markdown,
    TopK,
    StatusList,
    Pie,
    Histogram,
    Other(String),
}

impl ChartType {
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "line" => ChartType::Line,
            "area" => ChartType::Area,
            "stacked-area" => ChartType::StackedArea,
            "column" => ChartType::Column,
            "stacked-column" => ChartType::StackedColumn,
            "scatter" | "scatterplot" | "scatterplot-xy" => ChartType::Scatter,
            "table" => ChartType::Table,
            "single-stat" | "singlestat" => ChartType::SingleStat,
            "sparkline" => ChartType::Sparkline,
            "heatmap" => ChartType::Heatmap,
            "gauge" => ChartType::Gauge,
            "markdown" | "markdown-widget" => ChartType::Markdown,
            "top-k" => ChartType::TopK,
            "status-list" => ChartType::StatusList,
            "pie" => ChartType::Pie,
            "histogram" => ChartType::Histogram,
            _ => ChartType::Other(tag.trim().to_string()),
        }
    }

    /// Canonical tag, used as the key of panel-type tables.
    pub fn as_str(&self) -> &str {
        match self {
            ChartType::Line => "line",
            ChartType::Area => "area",
            ChartType::StackedArea => "stacked-area",
            ChartType::Column => "column",
            ChartType::StackedColumn => "stacked-column",
            ChartType::Scatter => "scatter",
            ChartType::Table => "table",
            ChartType::SingleStat => "single-stat",
            ChartType::Sparkline => "sparkline",
            ChartType::Heatmap => "heatmap",
            ChartType::Gauge => "gauge",
            ChartType::Markdown => "markdown",
            ChartType::TopK => "top-k",
            ChartType::StatusList => "status-list",
            ChartType::Pie => "pie",
            ChartType::Histogram => "histogram",
            ChartType::Other(tag) => tag,
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ChartType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ChartType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let tag = String::deserialize(deserializer)?;
        Ok(ChartType::parse(&tag))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceAlert {
    pub id: String,
    pub name: String,
    pub condition: SourceQuery,
    /// How long the condition must hold before firing.
    #[serde(default = "default_minutes")]
    pub minutes: u32,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
}

fn default_minutes() -> u32 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_type_round_trip_tags() {
        assert_eq!(ChartType::parse("single-stat"), ChartType::SingleStat);
        assert_eq!(ChartType::parse("Sparkline"), ChartType::Sparkline);
        assert_eq!(ChartType::parse("markdown-widget").as_str(), "markdown");
        assert_eq!(ChartType::parse("node-map"), ChartType::Other("node-map".to_string()));
    }

    #[test]
    fn test_source_alert_defaults() {
        let alert: SourceAlert = serde_json::from_str(
            r#"{"id": "1", "name": "CPU", "condition": "ts(cpu.usage) > 80"}"#,
        )
        .unwrap();
        assert_eq!(alert.minutes, 5);
        assert!(alert.tags.is_empty());
        assert_eq!(alert.condition.as_str(), "ts(cpu.usage) > 80");
    }

    #[test]
    fn test_chart_deserializes_unknown_type() {
        let chart: SourceChart = serde_json::from_str(
            r#"{"name": "Map", "type": "node-map", "queries": ["ts(a)"]}"#,
        )
        .unwrap();
        assert_eq!(chart.chart_type, ChartType::Other("node-map".to_string()));
        assert_eq!(chart.layout, ChartLayout::default());
    }
}
