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
    CorrelationStrength, DataCorrelation, DataFeatures, DataPattern, DataStructureInfo,
    MetricStats, SemanticType,
};
use crate::error::{ConfigError, ConfigResult};
use crate::shape_analysis::{resolve_records, AnalysisConfig};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct FeatureConfig {
    pub trend_slope_factor: f64,
    pub min_trend_points: usize,
    pub outlier_sigma: f64,
    pub strong_correlation_threshold: f64,
}
impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            trend_slope_factor: 0.05,
            min_trend_points: 5,
            outlier_sigma: 3.0,
            strong_correlation_threshold: 0.7,
        }
    }
}
impl FeatureConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.trend_slope_factor <= 0.0 {
            return Err(ConfigError::InvalidFeatureConfig {
                field: "trend_slope_factor".to_string(),
                value: self.trend_slope_factor.to_string(),
            });
        }
        if self.outlier_sigma <= 0.0 {
            return Err(ConfigError::InvalidFeatureConfig {
                field: "outlier_sigma".to_string(),
                value: self.outlier_sigma.to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.strong_correlation_threshold) {
            return Err(ConfigError::InvalidFeatureConfig {
                field: "strong_correlation_threshold".to_string(),
                value: self.strong_correlation_threshold.to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    analysis: AnalysisConfig,
    config: FeatureConfig,
}
impl FeatureExtractor {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_config(analysis: AnalysisConfig, config: FeatureConfig) -> Self {
        Self { analysis, config }
    }

    pub fn extract_features(&self, data: &Value, structure: &DataStructureInfo) -> DataFeatures {
        let rows = resolve_records(data);
        let metric_values = collect_metric_values(&rows, &structure.metric_fields);

        let mut metric_statistics = HashMap::new();
        for field in &structure.metric_fields {
            let values = metric_values.get(field).map(Vec::as_slice).unwrap_or(&[]);
            metric_statistics.insert(field.clone(), compute_stats(values));
        }

        let is_time_series = structure
            .dimension_fields
            .iter()
            .any(|field| self.probe_time_series(&rows, field));
        let has_trend = is_time_series
            && structure.metric_fields.iter().any(|field| {
                metric_values
                    .get(field)
                    .is_some_and(|values| self.has_linear_trend(values))
            });
        let is_categorical = structure
            .dimension_fields
            .iter()
            .any(|field| structure.field_type(field) == Some(SemanticType::String));
        let is_continuous = !structure.metric_fields.is_empty();
        let has_outliers = metric_statistics
            .values()
            .any(|stats| self.stats_have_outliers(stats));

        DataFeatures {
            is_time_series,
            has_trend,
            has_seasonality: false,
            is_categorical,
            is_continuous,
            has_outliers,
            metric_statistics,
        }
    }

    pub fn detect_correlations(
        &self,
        data: &Value,
        structure: &DataStructureInfo,
    ) -> Vec<DataCorrelation> {
        if structure.metric_fields.len() < 2 {
            return Vec::new();
        }
        let rows = resolve_records(data);
        let metric_values = collect_metric_values(&rows, &structure.metric_fields);

        let mut correlations = Vec::new();
        for (i, field1) in structure.metric_fields.iter().enumerate() {
            for field2 in structure.metric_fields.iter().skip(i + 1) {
                let (Some(xs), Some(ys)) = (metric_values.get(field1), metric_values.get(field2))
                else {
                    continue;
                };
                if xs.is_empty() || xs.len() != ys.len() {
                    continue;
                }
                let coefficient = pearson(xs, ys);
                correlations.push(DataCorrelation {
                    field1: field1.clone(),
                    field2: field2.clone(),
                    coefficient,
                    strength: CorrelationStrength::from_coefficient(coefficient),
                });
            }
        }
        correlations.sort_by(|a, b| {
            b.coefficient
                .abs()
                .partial_cmp(&a.coefficient.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        correlations
    }

    pub fn identify_patterns(
        &self,
        data: &Value,
        structure: &DataStructureInfo,
    ) -> Vec<DataPattern> {
        let features = self.extract_features(data, structure);
        let correlations = self.detect_correlations(data, structure);
        let mut patterns = Vec::new();

        if features.is_time_series && features.has_trend {
            let rows = resolve_records(data);
            let metric_values = collect_metric_values(&rows, &structure.metric_fields);
            let trending: Vec<String> = structure
                .metric_fields
                .iter()
                .filter(|field| {
                    metric_values
                        .get(*field)
                        .is_some_and(|values| self.has_linear_trend(values))
                })
                .cloned()
                .collect();
            patterns.push(DataPattern {
                pattern_type: "TimeTrend".to_string(),
                description: "Values show a sustained trend over time".to_string(),
                confidence: 0.8,
                related_fields: trending,
            });
        }

        if features.is_categorical && !structure.dimension_fields.is_empty() {
            let categories: Vec<String> = structure
                .dimension_fields
                .iter()
                .filter(|field| structure.field_type(field) == Some(SemanticType::String))
                .cloned()
                .collect();
            patterns.push(DataPattern {
                pattern_type: "CategoryDistribution".to_string(),
                description: "Metric values are distributed across discrete categories"
                    .to_string(),
                confidence: 0.75,
                related_fields: categories,
            });
        }

        let outlier_fields: Vec<String> = structure
            .metric_fields
            .iter()
            .filter(|field| {
                features
                    .stats(field)
                    .is_some_and(|stats| self.stats_have_outliers(stats))
            })
            .cloned()
            .collect();
        if !outlier_fields.is_empty() {
            patterns.push(DataPattern {
                pattern_type: "Outliers".to_string(),
                description: "Some metric values deviate strongly from the mean".to_string(),
                confidence: 0.7,
                related_fields: outlier_fields,
            });
        }

        let mut correlated_fields = Vec::new();
        for correlation in &correlations {
            if correlation.coefficient.abs() > self.config.strong_correlation_threshold {
                for field in [&correlation.field1, &correlation.field2] {
                    if !correlated_fields.contains(field) {
                        correlated_fields.push(field.clone());
                    }
                }
            }
        }
        if !correlated_fields.is_empty() {
            patterns.push(DataPattern {
                pattern_type: "StrongCorrelation".to_string(),
                description: "Metric fields move together strongly".to_string(),
                confidence: 0.85,
                related_fields: correlated_fields,
            });
        }

        patterns
    }

    fn probe_time_series(&self, rows: &[&Value], field: &str) -> bool {
        let probe: Vec<&Value> = rows
            .iter()
            .take(self.analysis.timeseries_probe_rows)
            .filter_map(|row| row.as_object().and_then(|record| record.get(field)))
            .collect();
        !probe.is_empty()
            && probe
                .iter()
                .all(|value| self.analysis.is_datetime_value(value))
    }

    fn has_linear_trend(&self, values: &[f64]) -> bool {
        if values.len() < self.config.min_trend_points {
            return false;
        }
        let n = values.len() as f64;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let slope = ols_slope(values);
        slope.abs() > self.config.trend_slope_factor * (max - min) / n
    }

    fn stats_have_outliers(&self, stats: &MetricStats) -> bool {
        let window = self.config.outlier_sigma * stats.std_dev;
        window > 0.0
            && (stats.min < stats.average - window || stats.max > stats.average + window)
    }
}

fn collect_metric_values(rows: &[&Value], metric_fields: &[String]) -> HashMap<String, Vec<f64>> {
    let mut values: HashMap<String, Vec<f64>> = HashMap::new();
    for field in metric_fields {
        values.insert(field.clone(), Vec::new());
    }
    for row in rows {
        let Some(record) = row.as_object() else {
            continue;
        };
        for field in metric_fields {
            if let Some(number) = record.get(field).and_then(Value::as_f64) {
                if let Some(bucket) = values.get_mut(field) {
                    bucket.push(number);
                }
            }
        }
    }
    values
}

pub(crate) fn compute_stats(values: &[f64]) -> MetricStats {
    if values.is_empty() {
        return MetricStats::default();
    }
    let n = values.len() as f64;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let average = values.iter().sum::<f64>() / n;

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };

    let variance = values.iter().map(|v| (v - average).powi(2)).sum::<f64>() / n;
    MetricStats {
        min,
        max,
        average,
        median,
        std_dev: variance.sqrt(),
    }
}

fn ols_slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (i, value) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        numerator += dx * (value - mean_y);
        denominator += dx * dx;
    }
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    let denominator = (var_x * var_y).sqrt();
    if denominator == 0.0 {
        0.0
    } else {
        (covariance / denominator).clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape_analysis::ShapeAnalyser;
    use serde_json::json;

    fn analyse(data: &Value) -> DataStructureInfo {
        ShapeAnalyser::new().analyse(data)
    }

    fn trending_series() -> Value {
        json!([
            {"date": "2024-01-01", "value": 10},
            {"date": "2024-01-02", "value": 20},
            {"date": "2024-01-03", "value": 30},
            {"date": "2024-01-04", "value": 40},
            {"date": "2024-01-05", "value": 50},
            {"date": "2024-01-06", "value": 60}
        ])
    }

    #[test]
    fn stats_match_hand_computed_values() {
        let stats = compute_stats(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert_eq!(stats.average, 2.5);
        assert_eq!(stats.median, 2.5);
        assert!((stats.std_dev - 1.118_033_988_749_895).abs() < 1e-12);
    }

    #[test]
    fn odd_count_median_is_midpoint() {
        let stats = compute_stats(&[5.0, 1.0, 3.0]);
        assert_eq!(stats.median, 3.0);
    }

    #[test]
    fn empty_metric_yields_zero_stats() {
        assert_eq!(compute_stats(&[]), MetricStats::default());
    }

    #[test]
    fn detects_time_series_and_trend() {
        let data = trending_series();
        let structure = analyse(&data);
        let features = FeatureExtractor::new().extract_features(&data, &structure);
        assert!(features.is_time_series);
        assert!(features.has_trend);
        assert!(features.is_continuous);
        assert!(!features.is_categorical);
    }

    #[test]
    fn categorical_flag_requires_string_dimension() {
        let data = json!([
            {"month": "Jan", "sales": 100},
            {"month": "Feb", "sales": 200}
        ]);
        let structure = analyse(&data);
        let features = FeatureExtractor::new().extract_features(&data, &structure);
        assert!(features.is_categorical);
        assert!(!features.is_time_series);
    }

    #[test]
    fn perfectly_linear_pair_has_unit_correlation() {
        let data = json!([
            {"x": 1, "y": 2}, {"x": 2, "y": 4}, {"x": 3, "y": 6},
            {"x": 4, "y": 8}, {"x": 5, "y": 10}
        ]);
        let structure = analyse(&data);
        let correlations = FeatureExtractor::new().detect_correlations(&data, &structure);
        assert_eq!(correlations.len(), 1);
        assert!((correlations[0].coefficient - 1.0).abs() < 1e-9);
        assert_eq!(correlations[0].strength, CorrelationStrength::VeryStrong);
    }

    #[test]
    fn correlation_is_symmetric() {
        let xs = [1.0, 2.0, 3.0, 4.0, 7.0];
        let ys = [2.0, 1.0, 5.0, 4.0, 6.0];
        assert!((pearson(&xs, &ys) - pearson(&ys, &xs)).abs() < 1e-12);
    }

    #[test]
    fn single_metric_produces_no_correlations() {
        let data = json!([{"a": "x", "v": 1}, {"a": "y", "v": 2}]);
        let structure = analyse(&data);
        assert!(FeatureExtractor::new()
            .detect_correlations(&data, &structure)
            .is_empty());
    }

    #[test]
    fn outlier_detection_uses_three_sigma() {
        let mut rows: Vec<Value> = (0..20).map(|i| json!({"v": 100 + (i % 3)})).collect();
        rows.push(json!({"v": 100000}));
        let data = Value::Array(rows);
        let structure = analyse(&data);
        let features = FeatureExtractor::new().extract_features(&data, &structure);
        assert!(features.has_outliers);
    }

    #[test]
    fn patterns_cover_trend_category_and_correlation() {
        let data = trending_series();
        let structure = analyse(&data);
        let patterns = FeatureExtractor::new().identify_patterns(&data, &structure);
        let trend = patterns
            .iter()
            .find(|p| p.pattern_type == "TimeTrend")
            .expect("expected TimeTrend pattern");
        assert_eq!(trend.confidence, 0.8);
        assert_eq!(trend.related_fields, vec!["value"]);
        assert!(!patterns.iter().any(|p| p.pattern_type == "CategoryDistribution"));
    }

    #[test]
    fn strong_correlation_pattern_lists_both_fields() {
        let data = json!([
            {"x": 1, "y": 2}, {"x": 2, "y": 4}, {"x": 3, "y": 6},
            {"x": 4, "y": 8}, {"x": 5, "y": 10}
        ]);
        let structure = analyse(&data);
        let patterns = FeatureExtractor::new().identify_patterns(&data, &structure);
        let strong = patterns
            .iter()
            .find(|p| p.pattern_type == "StrongCorrelation")
            .expect("expected StrongCorrelation pattern");
        assert_eq!(strong.confidence, 0.85);
        assert_eq!(strong.related_fields, vec!["x", "y"]);
    }

    #[test]
    fn malformed_input_degrades_to_default_features() {
        let data = json!("not telemetry");
        let structure = analyse(&data);
        let features = FeatureExtractor::new().extract_features(&data, &structure);
        assert!(!features.is_time_series);
        assert!(!features.is_continuous);
        assert!(features.metric_statistics.is_empty());
    }
}
