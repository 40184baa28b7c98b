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

use crate::chart_model::{ChartType, DataCorrelation, DataFeatures, DataStructureInfo};
use crate::registry;
use indexmap::IndexMap;

mod score_weights {
    pub const PIE_BASE: f64 = 0.5;
    pub const PIE_SINGLE_METRIC_BONUS: f64 = 0.3;
    pub const PIE_ROW_RANGE_BONUS: f64 = 0.2;
    pub const PIE_CATEGORICAL_BONUS: f64 = 0.2;
    pub const PIE_TIME_SERIES_PENALTY: f64 = 0.3;
    pub const PIE_CROWDING_PENALTY_MAX: f64 = 0.1;
    pub const PIE_CROWDING_ONSET_ROWS: usize = 15;
    pub const PIE_CROWDING_CAP_ROWS: usize = 30;

    pub const LINE_BASE: f64 = 0.5;
    pub const LINE_TIME_SERIES_BONUS: f64 = 0.3;
    pub const LINE_TREND_BONUS: f64 = 0.2;
    pub const LINE_ROW_COUNT_BONUS: f64 = 0.1;
    pub const LINE_MULTI_METRIC_BONUS: f64 = 0.1;

    pub const BAR_BASE: f64 = 0.6;
    pub const BAR_CATEGORICAL_BONUS: f64 = 0.2;
    pub const BAR_ROW_COUNT_BONUS: f64 = 0.1;
    pub const BAR_MULTI_METRIC_BONUS: f64 = 0.1;
    pub const BAR_TREND_PENALTY: f64 = 0.1;

    pub const SCATTER_BASE: f64 = 0.3;
    pub const SCATTER_METRIC_PAIR_BONUS: f64 = 0.3;
    pub const SCATTER_ROW_COUNT_BONUS: f64 = 0.2;
    pub const SCATTER_CORRELATION_BONUS: f64 = 0.2;
    pub const SCATTER_CORRELATION_THRESHOLD: f64 = 0.5;

    pub const RADAR_BASE: f64 = 0.3;
    pub const RADAR_METRIC_RANGE_BONUS: f64 = 0.4;
    pub const RADAR_ROW_COUNT_BONUS: f64 = 0.2;
    pub const RADAR_CATEGORICAL_BONUS: f64 = 0.1;

    pub const HEATMAP_BASE: f64 = 0.2;
    pub const HEATMAP_DIMENSION_BONUS: f64 = 0.3;
    pub const HEATMAP_SINGLE_METRIC_BONUS: f64 = 0.2;
    pub const HEATMAP_ROW_COUNT_BONUS: f64 = 0.2;
}
use score_weights as weights;

pub(crate) fn score_bar(
    structure: &DataStructureInfo,
    features: &DataFeatures,
    _correlations: &[DataCorrelation],
) -> f64 {
    let mut score = weights::BAR_BASE;
    if features.is_categorical {
        score += weights::BAR_CATEGORICAL_BONUS;
    }
    if structure.row_count <= 20 {
        score += weights::BAR_ROW_COUNT_BONUS;
    }
    if structure.metric_fields.len() > 1 {
        score += weights::BAR_MULTI_METRIC_BONUS;
    }
    if features.is_time_series && features.has_trend {
        score -= weights::BAR_TREND_PENALTY;
    }
    score
}

pub(crate) fn score_line(
    structure: &DataStructureInfo,
    features: &DataFeatures,
    _correlations: &[DataCorrelation],
) -> f64 {
    let mut score = weights::LINE_BASE;
    if features.is_time_series {
        score += weights::LINE_TIME_SERIES_BONUS;
    }
    if features.has_trend {
        score += weights::LINE_TREND_BONUS;
    }
    if structure.row_count >= 5 {
        score += weights::LINE_ROW_COUNT_BONUS;
    }
    if structure.metric_fields.len() > 1 && structure.dimension_fields.len() == 1 {
        score += weights::LINE_MULTI_METRIC_BONUS;
    }
    score
}

pub(crate) fn score_pie(
    structure: &DataStructureInfo,
    features: &DataFeatures,
    _correlations: &[DataCorrelation],
) -> f64 {
    let mut score = weights::PIE_BASE;
    if structure.metric_fields.len() == 1 {
        score += weights::PIE_SINGLE_METRIC_BONUS;
    }
    if (3..=10).contains(&structure.row_count) {
        score += weights::PIE_ROW_RANGE_BONUS;
    }
    if features.is_categorical {
        score += weights::PIE_CATEGORICAL_BONUS;
    }
    if features.is_time_series {
        score -= weights::PIE_TIME_SERIES_PENALTY;
    }
    if structure.row_count > weights::PIE_CROWDING_ONSET_ROWS {
        let capped = structure.row_count.min(weights::PIE_CROWDING_CAP_ROWS);
        let crowding = (capped - weights::PIE_CROWDING_ONSET_ROWS) as f64
            / weights::PIE_CROWDING_ONSET_ROWS as f64;
        score -= weights::PIE_CROWDING_PENALTY_MAX * crowding;
    }
    score
}

pub(crate) fn score_scatter(
    structure: &DataStructureInfo,
    _features: &DataFeatures,
    correlations: &[DataCorrelation],
) -> f64 {
    let mut score = weights::SCATTER_BASE;
    if structure.metric_fields.len() >= 2 {
        score += weights::SCATTER_METRIC_PAIR_BONUS;
    }
    if structure.row_count > 20 {
        score += weights::SCATTER_ROW_COUNT_BONUS;
    }
    if correlations
        .iter()
        .any(|c| c.coefficient.abs() > weights::SCATTER_CORRELATION_THRESHOLD)
    {
        score += weights::SCATTER_CORRELATION_BONUS;
    }
    score
}

pub(crate) fn score_radar(
    structure: &DataStructureInfo,
    features: &DataFeatures,
    _correlations: &[DataCorrelation],
) -> f64 {
    let mut score = weights::RADAR_BASE;
    if (3..=7).contains(&structure.metric_fields.len()) {
        score += weights::RADAR_METRIC_RANGE_BONUS;
    }
    if structure.row_count <= 7 {
        score += weights::RADAR_ROW_COUNT_BONUS;
    }
    if features.is_categorical {
        score += weights::RADAR_CATEGORICAL_BONUS;
    }
    score
}

pub(crate) fn score_heatmap(
    structure: &DataStructureInfo,
    _features: &DataFeatures,
    _correlations: &[DataCorrelation],
) -> f64 {
    let mut score = weights::HEATMAP_BASE;
    if structure.dimension_fields.len() >= 2 {
        score += weights::HEATMAP_DIMENSION_BONUS;
    }
    if structure.metric_fields.len() == 1 {
        score += weights::HEATMAP_SINGLE_METRIC_BONUS;
    }
    if structure.row_count > 20 {
        score += weights::HEATMAP_ROW_COUNT_BONUS;
    }
    score
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChartTypeScorer;
impl ChartTypeScorer {
    pub fn new() -> Self {
        Self
    }

    /// Scores every auto-scorable chart type against the dataset.
    /// Entries keep registry order, so iteration and tie-breaks are
    /// deterministic for identical input.
    pub fn score_all(
        &self,
        structure: &DataStructureInfo,
        features: &DataFeatures,
        correlations: &[DataCorrelation],
    ) -> IndexMap<ChartType, f64> {
        let mut scores = IndexMap::new();
        for entry in registry::entries() {
            if let Some(score_fn) = entry.score {
                let score = score_fn(structure, features, correlations).clamp(0.0, 1.0);
                scores.insert(entry.chart_type, score);
            }
        }
        scores
    }

    pub fn recommend(
        &self,
        structure: &DataStructureInfo,
        features: &DataFeatures,
        correlations: &[DataCorrelation],
    ) -> ChartType {
        let scores = self.score_all(structure, features, correlations);
        let mut best = ChartType::Bar;
        let mut best_score = f64::NEG_INFINITY;
        for (chart_type, score) in &scores {
            if *score > best_score {
                best = *chart_type;
                best_score = *score;
            }
        }
        best
    }

    pub fn recommend_top(
        &self,
        structure: &DataStructureInfo,
        features: &DataFeatures,
        correlations: &[DataCorrelation],
        max_count: usize,
    ) -> Vec<(ChartType, f64)> {
        let mut ranked: Vec<(ChartType, f64)> = self
            .score_all(structure, features, correlations)
            .into_iter()
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(max_count);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_extraction::FeatureExtractor;
    use crate::shape_analysis::ShapeAnalyser;
    use serde_json::{json, Value};

    fn pipeline_inputs(data: &Value) -> (DataStructureInfo, DataFeatures, Vec<DataCorrelation>) {
        let structure = ShapeAnalyser::new().analyse(data);
        let extractor = FeatureExtractor::new();
        let features = extractor.extract_features(data, &structure);
        let correlations = extractor.detect_correlations(data, &structure);
        (structure, features, correlations)
    }

    #[test]
    fn trending_time_series_recommends_line() {
        let data = json!([
            {"date": "2024-01-01", "value": 10},
            {"date": "2024-01-02", "value": 20},
            {"date": "2024-01-03", "value": 30},
            {"date": "2024-01-04", "value": 40},
            {"date": "2024-01-05", "value": 50},
            {"date": "2024-01-06", "value": 60}
        ]);
        let (structure, features, correlations) = pipeline_inputs(&data);
        assert!(features.is_time_series);
        assert!(features.has_trend);
        let recommended = ChartTypeScorer::new().recommend(&structure, &features, &correlations);
        assert_eq!(recommended, ChartType::Line);
    }

    #[test]
    fn small_categorical_single_metric_prefers_pie_over_bar() {
        let data = json!([
            {"category": "a", "count": 5},
            {"category": "b", "count": 9},
            {"category": "c", "count": 2},
            {"category": "d", "count": 7},
            {"category": "e", "count": 4}
        ]);
        let (structure, features, correlations) = pipeline_inputs(&data);
        let scores = ChartTypeScorer::new().score_all(&structure, &features, &correlations);
        assert!(scores[&ChartType::Pie] > scores[&ChartType::Bar]);
    }

    #[test]
    fn scores_stay_in_unit_interval() {
        let data = json!([
            {"category": "a", "count": 5},
            {"category": "b", "count": 9},
            {"category": "c", "count": 2}
        ]);
        let (structure, features, correlations) = pipeline_inputs(&data);
        for (_, score) in ChartTypeScorer::new().score_all(&structure, &features, &correlations) {
            assert!((0.0..=1.0).contains(&score));
        }
    }

    #[test]
    fn score_map_is_deterministic() {
        let data = json!([
            {"x": 1, "y": 2}, {"x": 2, "y": 4}, {"x": 3, "y": 6},
            {"x": 4, "y": 8}, {"x": 5, "y": 10}
        ]);
        let (structure, features, correlations) = pipeline_inputs(&data);
        let scorer = ChartTypeScorer::new();
        let first = scorer.score_all(&structure, &features, &correlations);
        let second = scorer.score_all(&structure, &features, &correlations);
        assert_eq!(
            first.iter().collect::<Vec<_>>(),
            second.iter().collect::<Vec<_>>()
        );
        assert_eq!(
            scorer.recommend(&structure, &features, &correlations),
            scorer.recommend(&structure, &features, &correlations)
        );
    }

    #[test]
    fn empty_structure_defaults_to_bar() {
        let structure = DataStructureInfo::empty();
        let features = DataFeatures::default();
        let recommended = ChartTypeScorer::new().recommend(&structure, &features, &[]);
        assert_eq!(recommended, ChartType::Bar);
    }

    #[test]
    fn pie_crowding_penalty_scales_with_rows() {
        let few = DataStructureInfo {
            row_count: 16,
            metric_fields: vec!["v".into()],
            ..Default::default()
        };
        let many = DataStructureInfo {
            row_count: 60,
            metric_fields: vec!["v".into()],
            ..Default::default()
        };
        let features = DataFeatures::default();
        let light = score_pie(&few, &features, &[]);
        let heavy = score_pie(&many, &features, &[]);
        assert!(heavy < light);
        // Penalty saturates at 30 rows.
        let capped = DataStructureInfo {
            row_count: 30,
            metric_fields: vec!["v".into()],
            ..Default::default()
        };
        assert_eq!(score_pie(&capped, &features, &[]), heavy);
    }

    #[test]
    fn correlated_metrics_boost_scatter() {
        let data = json!([
            {"x": 1, "y": 2}, {"x": 2, "y": 4}, {"x": 3, "y": 6},
            {"x": 4, "y": 8}, {"x": 5, "y": 10}
        ]);
        let (structure, features, correlations) = pipeline_inputs(&data);
        let with = score_scatter(&structure, &features, &correlations);
        let without = score_scatter(&structure, &features, &[]);
        assert!((with - without - 0.2).abs() < 1e-12);
    }

    #[test]
    fn recommend_top_orders_by_score() {
        let data = json!([
            {"category": "a", "count": 5},
            {"category": "b", "count": 9},
            {"category": "c", "count": 2},
            {"category": "d", "count": 7}
        ]);
        let (structure, features, correlations) = pipeline_inputs(&data);
        let top = ChartTypeScorer::new().recommend_top(&structure, &features, &correlations, 3);
        assert_eq!(top.len(), 3);
        assert!(top[0].1 >= top[1].1);
        assert!(top[1].1 >= top[2].1);
        assert_eq!(top[0].0, ChartType::Pie);
    }
}
