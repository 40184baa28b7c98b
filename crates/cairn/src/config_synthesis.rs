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

use crate::chart_model::{
    AxisConfig, AxisType, ChartConfig, ChartType, DataFeatures, DataStructureInfo, SeriesConfig,
};
use crate::error::{ConfigError, ConfigResult, Degradation};
use crate::registry;
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct SynthesisConfig {
    pub outlier_clamp_sigma: f64,
    /// Heuristic gate for the outlier axis clamp: the narrowed range is
    /// only applied when `new_min > clamp_min_ratio * min` or
    /// `new_max < clamp_max_ratio * max`. The asymmetry is inherited
    /// behaviour, kept as a tunable.
    pub clamp_min_ratio: f64,
    pub clamp_max_ratio: f64,
    pub narrow_bar_row_threshold: usize,
    pub narrow_bar_width: String,
    pub pie_radius: String,
    pub pie_center: [String; 2],
}
impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            outlier_clamp_sigma: 2.5,
            clamp_min_ratio: 1.5,
            clamp_max_ratio: 0.7,
            narrow_bar_row_threshold: 10,
            narrow_bar_width: "40%".to_string(),
            pie_radius: "55%".to_string(),
            pie_center: ["50%".to_string(), "60%".to_string()],
        }
    }
}
impl SynthesisConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.outlier_clamp_sigma <= 0.0 {
            return Err(ConfigError::InvalidSynthesisConfig {
                field: "outlier_clamp_sigma".to_string(),
                value: self.outlier_clamp_sigma.to_string(),
            });
        }
        if self.clamp_min_ratio <= 0.0 || self.clamp_max_ratio <= 0.0 {
            return Err(ConfigError::InvalidSynthesisConfig {
                field: "clamp_ratio".to_string(),
                value: format!("{}/{}", self.clamp_min_ratio, self.clamp_max_ratio),
            });
        }
        Ok(())
    }
}

pub(crate) fn build_cartesian(
    structure: &DataStructureInfo,
    features: &DataFeatures,
    chart_type: ChartType,
    series_type: &str,
) -> ChartConfig {
    let mut config = ChartConfig::new(chart_type);
    let x_type = if features.is_time_series {
        AxisType::Time
    } else {
        AxisType::Category
    };
    config.x_axis = Some(AxisConfig::new(
        x_type,
        structure.first_dimension().unwrap_or(""),
    ));
    config.y_axis = Some(AxisConfig::new(AxisType::Value, ""));

    for metric in &structure.metric_fields {
        config.series.push(SeriesConfig::new(metric, series_type));
    }
    if config.series.is_empty() {
        config.series.push(SeriesConfig::new("", series_type));
    }
    if structure.metric_fields.len() > 1 {
        config.legend = Some(json!({ "show": true, "data": structure.metric_fields }));
    }
    config
}

pub(crate) fn build_bar(structure: &DataStructureInfo, features: &DataFeatures) -> ChartConfig {
    build_cartesian(structure, features, ChartType::Bar, "bar")
}

pub(crate) fn build_line(structure: &DataStructureInfo, features: &DataFeatures) -> ChartConfig {
    build_cartesian(structure, features, ChartType::Line, "line")
}

pub(crate) fn build_pie(structure: &DataStructureInfo, _features: &DataFeatures) -> ChartConfig {
    let mut config = ChartConfig::new(ChartType::Pie);
    let mut series = SeriesConfig::new(structure.first_metric().unwrap_or(""), "pie");
    series.label = json!({ "show": true, "formatter": "{b}: {c} ({d}%)" })
        .as_object()
        .cloned()
        .unwrap_or_default();
    series.item_style = json!({
        "borderRadius": 4,
        "borderColor": "#fff",
        "borderWidth": 1
    })
    .as_object()
    .cloned()
    .unwrap_or_default();
    config.series.push(series);
    config.legend = Some(json!({ "orient": "vertical", "left": "left" }));
    config
}

pub(crate) fn build_scatter(
    structure: &DataStructureInfo,
    _features: &DataFeatures,
) -> ChartConfig {
    let mut config = ChartConfig::new(ChartType::Scatter);
    if structure.metric_fields.len() < 2 {
        Degradation::InsufficientFields {
            chart_type: ChartType::Scatter,
            kind: "metric",
            needed: 2,
            available: structure.metric_fields.len(),
        }
        .report();
        config.x_axis = Some(AxisConfig::new(AxisType::Value, ""));
        config.y_axis = Some(AxisConfig::new(AxisType::Value, ""));
        config.series.push(SeriesConfig::new("", "scatter"));
        return config;
    }
    let x_field = &structure.metric_fields[0];
    let y_field = &structure.metric_fields[1];
    config.x_axis = Some(AxisConfig::new(AxisType::Value, x_field));
    config.y_axis = Some(AxisConfig::new(AxisType::Value, y_field));
    config
        .series
        .push(SeriesConfig::new(format!("{x_field} vs {y_field}"), "scatter"));
    config
}

pub(crate) fn build_radar(
    _structure: &DataStructureInfo,
    _features: &DataFeatures,
) -> ChartConfig {
    let mut config = ChartConfig::new(ChartType::Radar);
    // Indicators and per-row values are resolved at transcode time.
    config.series.push(SeriesConfig::new("Metrics", "radar"));
    config
}

pub(crate) fn build_heatmap(
    structure: &DataStructureInfo,
    _features: &DataFeatures,
) -> ChartConfig {
    let mut config = ChartConfig::new(ChartType::Heatmap);
    if structure.dimension_fields.len() < 2 {
        Degradation::InsufficientFields {
            chart_type: ChartType::Heatmap,
            kind: "dimension",
            needed: 2,
            available: structure.dimension_fields.len(),
        }
        .report();
        config.x_axis = Some(AxisConfig::new(AxisType::Category, ""));
        config.y_axis = Some(AxisConfig::new(AxisType::Category, ""));
        config.series.push(SeriesConfig::new("", "heatmap"));
        return config;
    }
    config.x_axis = Some(AxisConfig::new(
        AxisType::Category,
        &structure.dimension_fields[0],
    ));
    config.y_axis = Some(AxisConfig::new(
        AxisType::Category,
        &structure.dimension_fields[1],
    ));
    config.series.push(SeriesConfig::new(
        structure.first_metric().unwrap_or(""),
        "heatmap",
    ));
    config.extra_styles.insert(
        "visualMap".to_string(),
        json!({ "calculable": true, "orient": "horizontal", "left": "center" }),
    );
    config
}

#[derive(Debug, Clone, Default)]
pub struct ChartConfigSynthesiser {
    config: SynthesisConfig,
}
impl ChartConfigSynthesiser {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_config(config: SynthesisConfig) -> Self {
        Self { config }
    }

    pub fn synthesise(
        &self,
        structure: &DataStructureInfo,
        features: &DataFeatures,
        chart_type: ChartType,
    ) -> ChartConfig {
        let entry = registry::entry(chart_type);
        if entry.bar_fallback {
            Degradation::UnsupportedChartType {
                requested: chart_type,
            }
            .report();
        }
        let mut config = (entry.synthesise)(structure, features);
        config.chart_type = chart_type;
        if config.title.is_empty() {
            config.title = derive_title(structure);
        }
        config
    }

    /// Second pass over a synthesised (or externally supplied)
    /// configuration. Idempotent: every adjustment overwrites with a
    /// value derived only from structure and features.
    pub fn optimise(
        &self,
        mut config: ChartConfig,
        structure: &DataStructureInfo,
        features: &DataFeatures,
    ) -> ChartConfig {
        let skip_axes = matches!(config.chart_type, ChartType::Pie | ChartType::Radar);
        if !skip_axes {
            if features.is_time_series {
                if let Some(axis) = config.x_axis.as_mut() {
                    axis.axis_type = AxisType::Time;
                }
            }
            if features.has_outliers {
                self.clamp_value_axis(&mut config, structure, features);
            }
        }

        for series in &mut config.series {
            match series.series_type.as_str() {
                "line" => {
                    if features.is_time_series && features.has_trend {
                        series
                            .extra_options
                            .insert("smooth".to_string(), Value::Bool(true));
                    }
                }
                "bar" => {
                    if structure.row_count > self.config.narrow_bar_row_threshold {
                        series.extra_options.insert(
                            "barWidth".to_string(),
                            Value::String(self.config.narrow_bar_width.clone()),
                        );
                    }
                }
                "pie" => {
                    series.extra_options.insert(
                        "radius".to_string(),
                        Value::String(self.config.pie_radius.clone()),
                    );
                    series
                        .extra_options
                        .insert("center".to_string(), json!(self.config.pie_center));
                }
                _ => {}
            }
        }

        let tooltip = if config.chart_type == ChartType::Pie {
            json!({ "trigger": "item", "formatter": "{a} <br/>{b}: {c} ({d}%)" })
        } else {
            json!({ "trigger": "axis", "axisPointer": { "type": "shadow" } })
        };
        let mut interaction = json!({ "tooltip": tooltip });
        if config.chart_type == ChartType::Line && features.is_time_series && features.has_trend {
            interaction["dataZoom"] = json!([{ "type": "slider", "start": 0, "end": 100 }]);
        }
        config.interaction = Some(interaction);
        config.toolbox = Some(json!({
            "feature": {
                "saveAsImage": {},
                "dataView": { "readOnly": true },
                "restore": {}
            }
        }));
        config
    }

    fn clamp_value_axis(
        &self,
        config: &mut ChartConfig,
        structure: &DataStructureInfo,
        features: &DataFeatures,
    ) {
        let bound_metric = config
            .series
            .first()
            .map(|s| s.name.as_str())
            .filter(|name| features.metric_statistics.contains_key(*name))
            .or_else(|| structure.first_metric());
        let Some(stats) = bound_metric.and_then(|metric| features.stats(metric)) else {
            return;
        };
        let window = self.config.outlier_clamp_sigma * stats.std_dev;
        let new_min = stats.min.max(stats.average - window);
        let new_max = stats.max.min(stats.average + window);
        let substantial = new_min > self.config.clamp_min_ratio * stats.min
            || new_max < self.config.clamp_max_ratio * stats.max;
        if !substantial {
            return;
        }
        if let Some(axis) = config.y_axis.as_mut() {
            axis.extra_options.insert("min".to_string(), json!(new_min));
            axis.extra_options.insert("max".to_string(), json!(new_max));
        }
    }
}

fn derive_title(structure: &DataStructureInfo) -> String {
    match (structure.first_metric(), structure.first_dimension()) {
        (Some(metric), Some(dimension)) => format!("{metric} by {dimension}"),
        (Some(metric), None) => metric.to_string(),
        (None, Some(dimension)) => dimension.to_string(),
        (None, None) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_extraction::FeatureExtractor;
    use crate::shape_analysis::ShapeAnalyser;
    use serde_json::json;

    fn inputs(data: &serde_json::Value) -> (DataStructureInfo, DataFeatures) {
        let structure = ShapeAnalyser::new().analyse(data);
        let features = FeatureExtractor::new().extract_features(data, &structure);
        (structure, features)
    }

    #[test]
    fn bar_skeleton_has_axes_and_one_series_per_metric() {
        let data = json!([
            {"month": "Jan", "sales": 100, "cost": 40},
            {"month": "Feb", "sales": 200, "cost": 70}
        ]);
        let (structure, features) = inputs(&data);
        let config = ChartConfigSynthesiser::new().synthesise(&structure, &features, ChartType::Bar);
        assert_eq!(config.x_axis.as_ref().unwrap().name, "month");
        assert_eq!(config.x_axis.as_ref().unwrap().axis_type, AxisType::Category);
        assert_eq!(config.y_axis.as_ref().unwrap().axis_type, AxisType::Value);
        assert_eq!(config.series.len(), 2);
        assert_eq!(config.series[0].name, "sales");
        assert!(config.legend.is_some());
        assert_eq!(config.title, "sales by month");
    }

    #[test]
    fn pie_and_radar_have_no_axes() {
        let data = json!([
            {"category": "a", "count": 5},
            {"category": "b", "count": 9}
        ]);
        let (structure, features) = inputs(&data);
        let synthesiser = ChartConfigSynthesiser::new();
        for chart_type in [ChartType::Pie, ChartType::Radar] {
            let config = synthesiser.synthesise(&structure, &features, chart_type);
            assert!(config.x_axis.is_none());
            assert!(config.y_axis.is_none());
            assert!(!config.series.is_empty());
        }
    }

    #[test]
    fn scatter_uses_first_two_metric_fields() {
        let data = json!([
            {"height": 170, "weight": 65},
            {"height": 180, "weight": 80}
        ]);
        let (structure, features) = inputs(&data);
        let config =
            ChartConfigSynthesiser::new().synthesise(&structure, &features, ChartType::Scatter);
        assert_eq!(config.x_axis.as_ref().unwrap().name, "height");
        assert_eq!(config.y_axis.as_ref().unwrap().name, "weight");
        assert_eq!(config.series[0].name, "height vs weight");
    }

    #[test]
    fn scatter_with_one_metric_degrades_to_minimal_wiring() {
        let data = json!([{"label": "a", "v": 1}, {"label": "b", "v": 2}]);
        let (structure, features) = inputs(&data);
        let config =
            ChartConfigSynthesiser::new().synthesise(&structure, &features, ChartType::Scatter);
        assert!(config.x_axis.is_some());
        assert!(config.y_axis.is_some());
        assert_eq!(config.x_axis.as_ref().unwrap().name, "");
        assert_eq!(config.series.len(), 1);
    }

    #[test]
    fn unscored_types_fall_back_to_bar_construction() {
        let data = json!([{"label": "a", "v": 1}, {"label": "b", "v": 2}]);
        let (structure, features) = inputs(&data);
        let config =
            ChartConfigSynthesiser::new().synthesise(&structure, &features, ChartType::Gauge);
        assert_eq!(config.chart_type, ChartType::Gauge);
        assert_eq!(config.series[0].series_type, "bar");
        assert!(config.x_axis.is_some());
    }

    #[test]
    fn optimise_forces_time_axis_and_smooths_trending_lines() {
        let data = json!([
            {"date": "2024-01-01", "value": 10},
            {"date": "2024-01-02", "value": 20},
            {"date": "2024-01-03", "value": 30},
            {"date": "2024-01-04", "value": 40},
            {"date": "2024-01-05", "value": 50},
            {"date": "2024-01-06", "value": 60}
        ]);
        let (structure, features) = inputs(&data);
        let synthesiser = ChartConfigSynthesiser::new();
        let config = synthesiser.synthesise(&structure, &features, ChartType::Line);
        let optimised = synthesiser.optimise(config, &structure, &features);
        assert_eq!(optimised.x_axis.as_ref().unwrap().axis_type, AxisType::Time);
        assert_eq!(
            optimised.series[0].extra_options.get("smooth"),
            Some(&Value::Bool(true))
        );
        let interaction = optimised.interaction.as_ref().unwrap();
        assert_eq!(interaction["tooltip"]["trigger"], "axis");
        assert!(interaction.get("dataZoom").is_some());
        assert!(optimised.toolbox.is_some());
    }

    #[test]
    fn optimise_is_idempotent() {
        let data = json!([
            {"date": "2024-01-01", "value": 10},
            {"date": "2024-01-02", "value": 20},
            {"date": "2024-01-03", "value": 30},
            {"date": "2024-01-04", "value": 40},
            {"date": "2024-01-05", "value": 50},
            {"date": "2024-01-06", "value": 600}
        ]);
        let (structure, features) = inputs(&data);
        let synthesiser = ChartConfigSynthesiser::new();
        let config = synthesiser.synthesise(&structure, &features, ChartType::Line);
        let once = synthesiser.optimise(config, &structure, &features);
        let twice = synthesiser.optimise(once.clone(), &structure, &features);
        assert_eq!(
            serde_json::to_value(&once).unwrap(),
            serde_json::to_value(&twice).unwrap()
        );
    }

    #[test]
    fn outlier_clamp_only_applies_when_substantial() {
        // Narrow spread, no outliers: no clamp keys on the value axis.
        let calm = json!([
            {"label": "a", "v": 10}, {"label": "b", "v": 11},
            {"label": "c", "v": 12}, {"label": "d", "v": 13}
        ]);
        let (structure, features) = inputs(&calm);
        let synthesiser = ChartConfigSynthesiser::new();
        let config = synthesiser.synthesise(&structure, &features, ChartType::Bar);
        let optimised = synthesiser.optimise(config, &structure, &features);
        let y_axis = optimised.y_axis.as_ref().unwrap();
        assert!(y_axis.extra_options.get("min").is_none());
        assert!(y_axis.extra_options.get("max").is_none());
    }

    #[test]
    fn bars_narrow_on_large_row_counts() {
        let rows: Vec<serde_json::Value> =
            (0..15).map(|i| json!({"label": format!("c{i}"), "v": i})).collect();
        let data = serde_json::Value::Array(rows);
        let (structure, features) = inputs(&data);
        let synthesiser = ChartConfigSynthesiser::new();
        let config = synthesiser.synthesise(&structure, &features, ChartType::Bar);
        let optimised = synthesiser.optimise(config, &structure, &features);
        assert_eq!(
            optimised.series[0].extra_options.get("barWidth"),
            Some(&Value::String("40%".to_string()))
        );
    }

    #[test]
    fn pie_series_standardised_with_radius_and_centre() {
        let data = json!([
            {"category": "a", "count": 5},
            {"category": "b", "count": 9}
        ]);
        let (structure, features) = inputs(&data);
        let synthesiser = ChartConfigSynthesiser::new();
        let config = synthesiser.synthesise(&structure, &features, ChartType::Pie);
        let optimised = synthesiser.optimise(config, &structure, &features);
        let series = &optimised.series[0];
        assert_eq!(
            series.extra_options.get("radius"),
            Some(&Value::String("55%".to_string()))
        );
        let interaction = optimised.interaction.as_ref().unwrap();
        assert_eq!(interaction["tooltip"]["trigger"], "item");
    }
}
