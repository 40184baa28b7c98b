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

//! Chart recommendation and configuration synthesis.
//!
//! Feed a JSON dataset through [`ChartPipeline`] to profile its shape,
//! extract statistical features, score candidate chart types and
//! synthesise a renderer-ready option document.

pub mod chart_model;
pub mod chart_scoring;
pub mod config_synthesis;
pub mod error;
pub mod external;
pub mod feature_extraction;
mod registry;
pub mod render_transcode;
pub mod shape_analysis;

pub use chart_model::{
    AxisConfig, AxisType, ChartConfig, ChartType, CorrelationStrength, DataCorrelation,
    DataFeatures, DataPattern, DataSourceDescriptor, DataStructureInfo, MetricStats, SemanticType,
    SeriesConfig,
};
pub use chart_scoring::ChartTypeScorer;
pub use config_synthesis::{ChartConfigSynthesiser, SynthesisConfig};
pub use error::{CairnError, ConfigError, Degradation, ExternalError, Result};
pub use external::{
    ConfigStore, DataProvider, ExportAdapter, InMemoryConfigStore, JsonExportAdapter,
    MetadataBinder, StandardMetadataBinder, StaticProvider,
};
pub use feature_extraction::{FeatureConfig, FeatureExtractor};
pub use render_transcode::{RendererTranscoder, TranscodeConfig};
pub use shape_analysis::{AnalysisConfig, ShapeAnalyser};

use indexmap::IndexMap;
use serde_json::Value;
use std::fmt::Write as _;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub analysis: AnalysisConfig,
    pub features: FeatureConfig,
    pub synthesis: SynthesisConfig,
    pub transcode: TranscodeConfig,
}
impl PipelineConfig {
    pub fn validate(&self) -> error::ConfigResult<()> {
        self.analysis.validate()?;
        self.features.validate()?;
        self.synthesis.validate()?;
        self.transcode.validate()?;
        Ok(())
    }
}

/// End-to-end pipeline: shape analysis, feature extraction, chart
/// scoring, configuration synthesis and renderer transcoding.
#[derive(Debug, Clone, Default)]
pub struct ChartPipeline {
    analyser: ShapeAnalyser,
    extractor: FeatureExtractor,
    scorer: ChartTypeScorer,
    synthesiser: ChartConfigSynthesiser,
    transcoder: RendererTranscoder,
}
impl ChartPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails only on invalid configuration; data problems downstream
    /// degrade instead of erroring.
    pub fn with_config(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            analyser: ShapeAnalyser::with_config(config.analysis.clone()),
            extractor: FeatureExtractor::with_config(config.analysis.clone(), config.features),
            scorer: ChartTypeScorer::new(),
            synthesiser: ChartConfigSynthesiser::with_config(config.synthesis),
            transcoder: RendererTranscoder::with_config(config.analysis, config.transcode),
        })
    }

    pub fn analyse(&self, data: &Value) -> DataStructureInfo {
        self.analyser.analyse(data)
    }

    pub fn extract_features(&self, data: &Value) -> (DataStructureInfo, DataFeatures) {
        let structure = self.analyser.analyse(data);
        let features = self.extractor.extract_features(data, &structure);
        (structure, features)
    }

    pub fn detect_correlations(&self, data: &Value) -> Vec<DataCorrelation> {
        let structure = self.analyser.analyse(data);
        self.extractor.detect_correlations(data, &structure)
    }

    pub fn identify_patterns(&self, data: &Value) -> Vec<DataPattern> {
        let structure = self.analyser.analyse(data);
        self.extractor.identify_patterns(data, &structure)
    }

    pub fn score_all(&self, data: &Value) -> IndexMap<ChartType, f64> {
        let structure = self.analyser.analyse(data);
        let features = self.extractor.extract_features(data, &structure);
        let correlations = self.extractor.detect_correlations(data, &structure);
        self.scorer.score_all(&structure, &features, &correlations)
    }

    pub fn recommend(&self, data: &Value) -> ChartType {
        let structure = self.analyser.analyse(data);
        let features = self.extractor.extract_features(data, &structure);
        let correlations = self.extractor.detect_correlations(data, &structure);
        let recommended = self.scorer.recommend(&structure, &features, &correlations);
        debug!(chart_type = recommended.as_str(), "recommendation");
        recommended
    }

    pub fn recommend_top(&self, data: &Value, max_count: usize) -> Vec<(ChartType, f64)> {
        let structure = self.analyser.analyse(data);
        let features = self.extractor.extract_features(data, &structure);
        let correlations = self.extractor.detect_correlations(data, &structure);
        self.scorer
            .recommend_top(&structure, &features, &correlations, max_count)
    }

    /// Synthesised and optimised configuration for `data`. With no
    /// requested type the scorer's recommendation is used.
    pub fn synthesise_config(&self, data: &Value, requested: Option<ChartType>) -> ChartConfig {
        let structure = self.analyser.analyse(data);
        let features = self.extractor.extract_features(data, &structure);
        let chart_type = requested.unwrap_or_else(|| {
            let correlations = self.extractor.detect_correlations(data, &structure);
            self.scorer.recommend(&structure, &features, &correlations)
        });
        let config = self.synthesiser.synthesise(&structure, &features, chart_type);
        self.synthesiser.optimise(config, &structure, &features)
    }

    pub fn render_option(&self, config: &ChartConfig) -> Value {
        self.transcoder.to_option_document(config)
    }

    pub fn transcode(&self, config: &ChartConfig, data: &Value) -> Value {
        self.transcoder.to_complete_option_document(config, data)
    }

    /// Human-readable summary of what the pipeline sees in `data`.
    pub fn report(&self, data: &Value) -> String {
        let structure = self.analyser.analyse(data);
        let features = self.extractor.extract_features(data, &structure);
        let correlations = self.extractor.detect_correlations(data, &structure);
        let patterns = self.extractor.identify_patterns(data, &structure);
        let ranked = self
            .scorer
            .recommend_top(&structure, &features, &correlations, 3);

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} row(s), {} dimension(s), {} metric(s)",
            structure.row_count,
            structure.dimension_fields.len(),
            structure.metric_fields.len()
        );
        let mut traits = Vec::new();
        if features.is_time_series {
            traits.push("time-series");
        }
        if features.has_trend {
            traits.push("trending");
        }
        if features.is_categorical {
            traits.push("categorical");
        }
        if features.is_continuous {
            traits.push("continuous");
        }
        if features.has_outliers {
            traits.push("outliers");
        }
        if !traits.is_empty() {
            let _ = writeln!(out, "traits: {}", traits.join(", "));
        }
        for (chart_type, score) in &ranked {
            let _ = writeln!(out, "  {chart_type}: {score:.2}");
        }
        for correlation in &correlations {
            let _ = writeln!(
                out,
                "correlation {} ~ {}: {:.2} ({})",
                correlation.field1,
                correlation.field2,
                correlation.coefficient,
                correlation.strength.as_str()
            );
        }
        for pattern in &patterns {
            let _ = writeln!(
                out,
                "pattern {} ({:.0}%): {}",
                pattern.pattern_type,
                pattern.confidence * 100.0,
                pattern.description
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn invalid_configuration_is_the_only_fatal_path() {
        let mut config = PipelineConfig::default();
        config.analysis.sample_rows = 0;
        assert!(matches!(
            ChartPipeline::with_config(config),
            Err(CairnError::Config(_))
        ));
        assert!(ChartPipeline::with_config(PipelineConfig::default()).is_ok());
    }

    #[test]
    fn report_summarises_shape_and_ranking() {
        let data = json!([
            {"category": "a", "count": 5},
            {"category": "b", "count": 9},
            {"category": "c", "count": 3}
        ]);
        let report = ChartPipeline::new().report(&data);
        assert!(report.contains("3 row(s), 1 dimension(s), 1 metric(s)"));
        assert!(report.contains("categorical"));
        assert!(report.contains("pie"));
    }
}
