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

//! Single dispatch table tying each chart type to its scoring,
//! synthesis and transcoding behaviour. Adding a chart type means
//! adding one entry here; no other module switches on `ChartType`.

use crate::chart_model::{
    ChartConfig, ChartType, DataCorrelation, DataFeatures, DataStructureInfo,
};
use crate::chart_scoring;
use crate::config_synthesis;
use crate::render_transcode::{self, TranscodeContext};
use serde_json::{Map, Value};

pub(crate) type ScoreFn = fn(&DataStructureInfo, &DataFeatures, &[DataCorrelation]) -> f64;
pub(crate) type SynthesiseFn = fn(&DataStructureInfo, &DataFeatures) -> ChartConfig;
pub(crate) type TranscodeFn = fn(&mut Map<String, Value>, &TranscodeContext);

pub(crate) struct ChartTypeEntry {
    pub chart_type: ChartType,
    /// `None` marks a type outside the scoring heuristics; it is never
    /// recommended, only honoured when explicitly requested.
    pub score: Option<ScoreFn>,
    pub synthesise: SynthesiseFn,
    pub transcode: TranscodeFn,
    /// Types without dedicated construction reuse bar wiring.
    pub bar_fallback: bool,
}

static ENTRIES: [ChartTypeEntry; 11] = [
    ChartTypeEntry {
        chart_type: ChartType::Bar,
        score: Some(chart_scoring::score_bar),
        synthesise: config_synthesis::build_bar,
        transcode: render_transcode::transcode_cartesian,
        bar_fallback: false,
    },
    ChartTypeEntry {
        chart_type: ChartType::Line,
        score: Some(chart_scoring::score_line),
        synthesise: config_synthesis::build_line,
        transcode: render_transcode::transcode_cartesian,
        bar_fallback: false,
    },
    ChartTypeEntry {
        chart_type: ChartType::Pie,
        score: Some(chart_scoring::score_pie),
        synthesise: config_synthesis::build_pie,
        transcode: render_transcode::transcode_pie,
        bar_fallback: false,
    },
    ChartTypeEntry {
        chart_type: ChartType::Scatter,
        score: Some(chart_scoring::score_scatter),
        synthesise: config_synthesis::build_scatter,
        transcode: render_transcode::transcode_scatter,
        bar_fallback: false,
    },
    ChartTypeEntry {
        chart_type: ChartType::Radar,
        score: Some(chart_scoring::score_radar),
        synthesise: config_synthesis::build_radar,
        transcode: render_transcode::transcode_radar,
        bar_fallback: false,
    },
    ChartTypeEntry {
        chart_type: ChartType::Heatmap,
        score: Some(chart_scoring::score_heatmap),
        synthesise: config_synthesis::build_heatmap,
        transcode: render_transcode::transcode_heatmap,
        bar_fallback: false,
    },
    ChartTypeEntry {
        chart_type: ChartType::Gauge,
        score: None,
        synthesise: config_synthesis::build_bar,
        transcode: render_transcode::transcode_cartesian,
        bar_fallback: true,
    },
    ChartTypeEntry {
        chart_type: ChartType::Funnel,
        score: None,
        synthesise: config_synthesis::build_bar,
        transcode: render_transcode::transcode_cartesian,
        bar_fallback: true,
    },
    ChartTypeEntry {
        chart_type: ChartType::Sankey,
        score: None,
        synthesise: config_synthesis::build_bar,
        transcode: render_transcode::transcode_cartesian,
        bar_fallback: true,
    },
    ChartTypeEntry {
        chart_type: ChartType::Tree,
        score: None,
        synthesise: config_synthesis::build_bar,
        transcode: render_transcode::transcode_cartesian,
        bar_fallback: true,
    },
    ChartTypeEntry {
        chart_type: ChartType::Graph,
        score: None,
        synthesise: config_synthesis::build_bar,
        transcode: render_transcode::transcode_cartesian,
        bar_fallback: true,
    },
];

pub(crate) fn entries() -> &'static [ChartTypeEntry] {
    &ENTRIES
}

pub(crate) fn entry(chart_type: ChartType) -> &'static ChartTypeEntry {
    ENTRIES
        .iter()
        .find(|e| e.chart_type == chart_type)
        .unwrap_or(&ENTRIES[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_every_chart_type_in_declaration_order() {
        assert_eq!(ENTRIES.len(), ChartType::ALL.len());
        for (entry, chart_type) in ENTRIES.iter().zip(ChartType::ALL) {
            assert_eq!(entry.chart_type, chart_type);
        }
    }

    #[test]
    fn fallback_entries_carry_no_score() {
        for entry in entries() {
            assert_eq!(entry.score.is_none(), entry.bar_fallback);
        }
    }

    #[test]
    fn lookup_defaults_to_bar_wiring() {
        assert_eq!(entry(ChartType::Gauge).chart_type, ChartType::Gauge);
        assert!(entry(ChartType::Gauge).bar_fallback);
    }
}
