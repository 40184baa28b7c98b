// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    String,
    Integer,
    Float,
    Boolean,
    DateTime,
    Array,
    Object,
}
impl SemanticType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, SemanticType::Integer | SemanticType::Float)
    }
    pub fn is_temporal(&self) -> bool {
        matches!(self, SemanticType::DateTime)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataStructureInfo {
    pub row_count: usize,
    pub dimension_fields: Vec<String>,
    pub metric_fields: Vec<String>,
    pub field_types: HashMap<String, SemanticType>,
    pub field_samples: HashMap<String, Value>,
}
impl DataStructureInfo {
    pub fn empty() -> Self {
        Self::default()
    }
    pub fn is_empty(&self) -> bool {
        self.dimension_fields.is_empty() && self.metric_fields.is_empty()
    }
    pub fn field_type(&self, field: &str) -> Option<SemanticType> {
        self.field_types.get(field).copied()
    }
    pub fn sample(&self, field: &str) -> Option<&Value> {
        self.field_samples.get(field)
    }
    pub fn first_dimension(&self) -> Option<&str> {
        self.dimension_fields.first().map(String::as_str)
    }
    pub fn first_metric(&self) -> Option<&str> {
        self.metric_fields.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataFeatures {
    pub is_time_series: bool,
    pub has_trend: bool,
    pub has_seasonality: bool,
    pub is_categorical: bool,
    pub is_continuous: bool,
    pub has_outliers: bool,
    pub metric_statistics: HashMap<String, MetricStats>,
}
impl DataFeatures {
    pub fn stats(&self, field: &str) -> Option<&MetricStats> {
        self.metric_statistics.get(field)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricStats {
    pub min: f64,
    pub max: f64,
    pub average: f64,
    pub median: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CorrelationStrength {
    VeryWeak,
    Weak,
    Moderate,
    Strong,
    VeryStrong,
}
impl CorrelationStrength {
    pub fn from_coefficient(coefficient: f64) -> Self {
        let magnitude = coefficient.abs();
        if magnitude < 0.2 {
            CorrelationStrength::VeryWeak
        } else if magnitude < 0.4 {
            CorrelationStrength::Weak
        } else if magnitude < 0.6 {
            CorrelationStrength::Moderate
        } else if magnitude < 0.8 {
            CorrelationStrength::Strong
        } else {
            CorrelationStrength::VeryStrong
        }
    }
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrelationStrength::VeryWeak => "very-weak",
            CorrelationStrength::Weak => "weak",
            CorrelationStrength::Moderate => "moderate",
            CorrelationStrength::Strong => "strong",
            CorrelationStrength::VeryStrong => "very-strong",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataCorrelation {
    pub field1: String,
    pub field2: String,
    pub coefficient: f64,
    pub strength: CorrelationStrength,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPattern {
    #[serde(rename = "type")]
    pub pattern_type: String,
    pub description: String,
    pub confidence: f64,
    pub related_fields: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Line,
    Pie,
    Scatter,
    Radar,
    Heatmap,
    Gauge,
    Funnel,
    Sankey,
    Tree,
    Graph,
}
impl ChartType {
    pub const ALL: [ChartType; 11] = [
        ChartType::Bar,
        ChartType::Line,
        ChartType::Pie,
        ChartType::Scatter,
        ChartType::Radar,
        ChartType::Heatmap,
        ChartType::Gauge,
        ChartType::Funnel,
        ChartType::Sankey,
        ChartType::Tree,
        ChartType::Graph,
    ];
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Bar => "bar",
            ChartType::Line => "line",
            ChartType::Pie => "pie",
            ChartType::Scatter => "scatter",
            ChartType::Radar => "radar",
            ChartType::Heatmap => "heatmap",
            ChartType::Gauge => "gauge",
            ChartType::Funnel => "funnel",
            ChartType::Sankey => "sankey",
            ChartType::Tree => "tree",
            ChartType::Graph => "graph",
        }
    }
    pub fn has_axes(&self) -> bool {
        !matches!(self, ChartType::Pie | ChartType::Radar)
    }
    pub fn parse(name: &str) -> Option<ChartType> {
        ChartType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == name.to_lowercase())
    }
}
impl std::fmt::Display for ChartType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisType {
    Category,
    Value,
    Time,
    Log,
}
impl AxisType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AxisType::Category => "category",
            AxisType::Value => "value",
            AxisType::Time => "time",
            AxisType::Log => "log",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxisConfig {
    #[serde(rename = "type")]
    pub axis_type: AxisType,
    pub name: String,
    pub show: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axis_line: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axis_label: Option<Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra_options: Map<String, Value>,
}
impl AxisConfig {
    pub fn new(axis_type: AxisType, name: impl Into<String>) -> Self {
        Self {
            axis_type,
            name: name.into(),
            show: true,
            data: None,
            axis_line: None,
            axis_label: None,
            extra_options: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub series_type: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub label: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub item_style: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub emphasis: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encode: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra_options: Map<String, Value>,
}
impl SeriesConfig {
    pub fn new(name: impl Into<String>, series_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            series_type: series_type.into(),
            label: Map::new(),
            item_style: Map::new(),
            emphasis: Map::new(),
            encode: None,
            stack: None,
            extra_options: Map::new(),
        }
    }
    pub fn encoded_field(&self, role: &str) -> Option<&str> {
        self.encode
            .as_ref()
            .and_then(|e| e.get(role))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DataSourceDescriptor {
    Static {
        payload: Value,
    },
    Remote {
        url: String,
        method: String,
        #[serde(default, skip_serializing_if = "Map::is_empty")]
        parameters: Map<String, Value>,
    },
    #[default]
    CurrentContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default)]
    pub auto_refresh: bool,
    #[serde(default)]
    pub refresh_interval: u64,
    #[serde(default)]
    pub data_source: DataSourceDescriptor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_axis: Option<AxisConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<AxisConfig>,
    pub series: Vec<SeriesConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toolbox: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interaction: Option<Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra_styles: Map<String, Value>,
}
impl ChartConfig {
    pub fn new(chart_type: ChartType) -> Self {
        Self {
            id: None,
            title: String::new(),
            subtitle: String::new(),
            chart_type,
            sub_type: None,
            theme: None,
            auto_refresh: false,
            refresh_interval: 0,
            data_source: DataSourceDescriptor::CurrentContext,
            x_axis: None,
            y_axis: None,
            series: Vec::new(),
            legend: None,
            toolbox: None,
            interaction: None,
            extra_styles: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_strength_thresholds() {
        assert_eq!(
            CorrelationStrength::from_coefficient(0.1),
            CorrelationStrength::VeryWeak
        );
        assert_eq!(
            CorrelationStrength::from_coefficient(-0.25),
            CorrelationStrength::Weak
        );
        assert_eq!(
            CorrelationStrength::from_coefficient(0.5),
            CorrelationStrength::Moderate
        );
        assert_eq!(
            CorrelationStrength::from_coefficient(-0.75),
            CorrelationStrength::Strong
        );
        assert_eq!(
            CorrelationStrength::from_coefficient(0.95),
            CorrelationStrength::VeryStrong
        );
    }

    #[test]
    fn chart_type_round_trips_through_name() {
        for chart_type in ChartType::ALL {
            assert_eq!(ChartType::parse(chart_type.as_str()), Some(chart_type));
        }
        assert_eq!(ChartType::parse("unknown"), None);
    }

    #[test]
    fn axes_only_absent_for_pie_and_radar() {
        assert!(!ChartType::Pie.has_axes());
        assert!(!ChartType::Radar.has_axes());
        assert!(ChartType::Bar.has_axes());
        assert!(ChartType::Heatmap.has_axes());
    }

    #[test]
    fn chart_config_serialises_without_empty_optionals() {
        let config = ChartConfig::new(ChartType::Pie);
        let json = serde_json::to_value(&config).unwrap();
        assert!(json.get("xAxis").is_none());
        assert!(json.get("x_axis").is_none());
        assert_eq!(json["type"], "pie");
    }
}
