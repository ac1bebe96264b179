//! Wavefront API JSON adapter.
//!
//! Converts the documents returned by `/api/v2/dashboard/{id}` and
//! `/api/v2/alert` (or exported copies of them) into the source model.
//! Wavefront lays charts out as sections of rows; they are flattened onto
//! Grafana's 24-column grid here so layout survives as plain coordinates.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::data_model::{ChartLayout, ChartType, SourceAlert, SourceChart, SourceDashboard, SourceQuery};
use crate::error::MigrateError;

pub const GRID_COLUMNS: u32 = 24;
pub const CHART_WIDTH: u32 = 12;
pub const CHART_HEIGHT: u32 = 8;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WfTags {
    #[serde(rename = "customerTags", default)]
    pub customer_tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WfDashboard {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tags: Option<WfTags>,
    #[serde(default)]
    pub sections: Vec<WfSection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WfSection {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub rows: Vec<WfRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WfRow {
    #[serde(default)]
    pub charts: Vec<WfChart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WfChart {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "chartSettings", default)]
    pub chart_settings: Option<WfChartSettings>,
    #[serde(default)]
    pub sources: Vec<WfSource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WfChartSettings {
    #[serde(rename = "type", default)]
    pub chart_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WfSource {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WfAlert {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub minutes: Option<u32>,
    #[serde(rename = "additionalInformation", default)]
    pub additional_information: Option<String>,
    #[serde(default)]
    pub tags: Option<WfTags>,
    #[serde(default)]
    pub severity: Option<String>,
}

impl From<WfDashboard> for SourceDashboard {
    fn from(wf: WfDashboard) -> Self {
        let mut charts = Vec::new();
        let mut y = 0;

        for row in wf.sections.iter().flat_map(|section| &section.rows) {
            let mut x = 0;
            for chart in &row.charts {
                let w = CHART_WIDTH.min(GRID_COLUMNS - x);
                charts.push(convert_chart(chart, ChartLayout { x, y, w, h: CHART_HEIGHT }, charts.len()));
                x += w;
                if x >= GRID_COLUMNS {
                    x = 0;
                    y += CHART_HEIGHT;
                }
            }
            if x > 0 {
                y += CHART_HEIGHT;
            }
        }

        SourceDashboard {
            name: wf.name.unwrap_or_else(|| "Migrated Dashboard".to_string()),
            id: wf.id,
            tags: wf.tags.map(|t| t.customer_tags).unwrap_or_default(),
            charts,
        }
    }
}

fn convert_chart(chart: &WfChart, layout: ChartLayout, index: usize) -> SourceChart {
    let chart_type = chart
        .chart_settings
        .as_ref()
        .and_then(|s| s.chart_type.as_deref())
        .map(ChartType::parse)
        .unwrap_or_default();

    SourceChart {
        name: chart.name.clone().unwrap_or_else(|| format!("Panel {}", index + 1)),
        description: chart.description.clone().filter(|d| !d.trim().is_empty()),
        chart_type,
        queries: chart
            .sources
            .iter()
            .filter(|s| !s.disabled && !s.query.trim().is_empty())
            .map(|s| SourceQuery::new(s.query.clone()))
            .collect(),
        layout,
    }
}

impl From<WfAlert> for SourceAlert {
    fn from(wf: WfAlert) -> Self {
        let tags: BTreeMap<String, String> = wf
            .tags
            .map(|t| t.customer_tags)
            .unwrap_or_default()
            .into_iter()
            .map(|tag| (tag.clone(), tag))
            .collect();

        SourceAlert {
            name: wf.name.unwrap_or_else(|| "Migrated Alert".to_string()),
            id: wf.id,
            condition: SourceQuery::new(wf.condition),
            minutes: wf.minutes.unwrap_or(5),
            tags,
            description: wf.additional_information.unwrap_or_default(),
            summary: None,
            severity: wf.severity,
        }
    }
}

/// Unwrap the shapes a Wavefront export can take: a bare object, an array,
/// `{"response": {...}}` or `{"response": {"items": [...]}}`.
pub fn items_from_value<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, MigrateError> {
    let value = match value {
        Value::Object(mut map) if map.contains_key("response") => {
            map.remove("response").unwrap_or(Value::Null)
        }
        other => other,
    };
    let value = match value {
        Value::Object(mut map) if map.get("items").map_or(false, Value::is_array) => {
            map.remove("items").unwrap_or(Value::Null)
        }
        other => other,
    };

    let items = match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        single => vec![single],
    };

    items
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(|e| MigrateError::Source(e.to_string())))
        .collect()
}

pub fn dashboards_from_value(value: Value) -> Result<Vec<SourceDashboard>, MigrateError> {
    Ok(items_from_value::<WfDashboard>(value)?.into_iter().map(Into::into).collect())
}

pub fn alerts_from_value(value: Value) -> Result<Vec<SourceAlert>, MigrateError> {
    Ok(items_from_value::<WfAlert>(value)?.into_iter().map(Into::into).collect())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Str(String),
        Num(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Str(s) => s,
        Id::Num(n) => n.to_string(),
    })
}
