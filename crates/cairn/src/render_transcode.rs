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

use crate::chart_model::{AxisConfig, AxisType, ChartConfig, DataStructureInfo, SeriesConfig};
use crate::error::{ConfigError, ConfigResult, Degradation};
use crate::registry;
use crate::shape_analysis::{resolve_records, AnalysisConfig, ShapeAnalyser};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone)]
pub struct TranscodeConfig {
    pub radar_headroom: f64,
    pub radar_fallback_indicator_max: f64,
    pub radar_anonymous_rows: usize,
}
impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            radar_headroom: 1.2,
            radar_fallback_indicator_max: 100.0,
            radar_anonymous_rows: 5,
        }
    }
}
impl TranscodeConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.radar_headroom < 1.0 {
            return Err(ConfigError::InvalidTranscodeConfig {
                field: "radar_headroom".to_string(),
                value: self.radar_headroom.to_string(),
            });
        }
        if self.radar_fallback_indicator_max <= 0.0 {
            return Err(ConfigError::InvalidTranscodeConfig {
                field: "radar_fallback_indicator_max".to_string(),
                value: self.radar_fallback_indicator_max.to_string(),
            });
        }
        Ok(())
    }
}

pub(crate) struct TranscodeContext<'a> {
    pub config: &'a ChartConfig,
    pub structure: &'a DataStructureInfo,
    pub rows: &'a [&'a Value],
    pub analysis: &'a AnalysisConfig,
    pub settings: &'a TranscodeConfig,
}

#[derive(Debug, Clone, Default)]
pub struct RendererTranscoder {
    analyser: ShapeAnalyser,
    config: TranscodeConfig,
}
impl RendererTranscoder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_config(analysis: AnalysisConfig, config: TranscodeConfig) -> Self {
        Self {
            analyser: ShapeAnalyser::with_config(analysis),
            config,
        }
    }

    /// Structural option document: axes, series skeletons and styling,
    /// without any row data bound.
    pub fn to_option_document(&self, config: &ChartConfig) -> Value {
        let mut doc = Map::new();
        let mut title = Map::new();
        title.insert("text".to_string(), Value::String(config.title.clone()));
        if !config.subtitle.is_empty() {
            title.insert("subtext".to_string(), Value::String(config.subtitle.clone()));
        }
        doc.insert("title".to_string(), Value::Object(title));
        if let Some(legend) = &config.legend {
            doc.insert("legend".to_string(), legend.clone());
        }
        if let Some(toolbox) = &config.toolbox {
            doc.insert("toolbox".to_string(), toolbox.clone());
        }
        if let Some(Value::Object(interaction)) = &config.interaction {
            for (key, value) in interaction {
                doc.insert(key.clone(), value.clone());
            }
        }
        if let Some(axis) = &config.x_axis {
            doc.insert("xAxis".to_string(), axis_document(axis));
        }
        if let Some(axis) = &config.y_axis {
            doc.insert("yAxis".to_string(), axis_document(axis));
        }
        let series: Vec<Value> = config.series.iter().map(series_document).collect();
        doc.insert("series".to_string(), Value::Array(series));
        for (key, value) in &config.extra_styles {
            doc.insert(key.clone(), value.clone());
        }
        Value::Object(doc)
    }

    /// Option document with row data bound from `data`, re-profiling
    /// the payload so field roles match what is actually present.
    pub fn to_complete_option_document(&self, config: &ChartConfig, data: &Value) -> Value {
        let structure = self.analyser.analyse(data);
        let rows = resolve_records(data);
        let mut doc = match self.to_option_document(config) {
            Value::Object(doc) => doc,
            other => return other,
        };
        let context = TranscodeContext {
            config,
            structure: &structure,
            rows: &rows,
            analysis: self.analyser.config(),
            settings: &self.config,
        };
        (registry::entry(config.chart_type).transcode)(&mut doc, &context);
        Value::Object(doc)
    }

    /// Checks whether `values` are renderable on an axis of the given
    /// type. Category axes accept anything; mismatches elsewhere are
    /// reported, never fatal.
    pub fn validate_axis_data(&self, axis: &AxisConfig, values: &[Value]) -> Option<String> {
        check_axis_values(axis.axis_type, values.iter(), self.analyser.config())
    }
}

fn check_axis_values<'a>(
    axis_type: AxisType,
    values: impl Iterator<Item = &'a Value>,
    analysis: &AnalysisConfig,
) -> Option<String> {
    match axis_type {
        AxisType::Category => None,
        AxisType::Value => {
            let bad = values.filter(|v| !v.is_null() && v.as_f64().is_none()).count();
            (bad > 0).then(|| format!("{bad} non-numeric value(s) on a value axis"))
        }
        AxisType::Time => {
            let bad = values
                .filter(|v| !v.is_null() && !analysis.is_datetime_value(v))
                .count();
            (bad > 0).then(|| format!("{bad} value(s) not parseable as datetime on a time axis"))
        }
        AxisType::Log => {
            let bad = values
                .filter(|v| !v.is_null() && !matches!(v.as_f64(), Some(n) if n > 0.0))
                .count();
            (bad > 0).then(|| format!("{bad} non-positive value(s) on a log axis"))
        }
    }
}

fn axis_document(axis: &AxisConfig) -> Value {
    let mut doc = Map::new();
    doc.insert("type".to_string(), Value::String(axis.axis_type.as_str().to_string()));
    if !axis.name.is_empty() {
        doc.insert("name".to_string(), Value::String(axis.name.clone()));
    }
    doc.insert("show".to_string(), Value::Bool(axis.show));
    if let Some(data) = &axis.data {
        doc.insert("data".to_string(), Value::Array(data.clone()));
    }
    if let Some(line) = &axis.axis_line {
        doc.insert("axisLine".to_string(), line.clone());
    }
    if let Some(label) = &axis.axis_label {
        doc.insert("axisLabel".to_string(), label.clone());
    }
    for (key, value) in &axis.extra_options {
        doc.insert(key.clone(), value.clone());
    }
    Value::Object(doc)
}

fn series_document(series: &SeriesConfig) -> Value {
    let mut doc = Map::new();
    doc.insert("name".to_string(), Value::String(series.name.clone()));
    doc.insert("type".to_string(), Value::String(series.series_type.clone()));
    if !series.label.is_empty() {
        doc.insert("label".to_string(), Value::Object(series.label.clone()));
    }
    if !series.item_style.is_empty() {
        doc.insert("itemStyle".to_string(), Value::Object(series.item_style.clone()));
    }
    if !series.emphasis.is_empty() {
        doc.insert("emphasis".to_string(), Value::Object(series.emphasis.clone()));
    }
    if let Some(encode) = &series.encode {
        doc.insert("encode".to_string(), json!(encode));
    }
    if let Some(stack) = &series.stack {
        doc.insert("stack".to_string(), Value::String(stack.clone()));
    }
    for (key, value) in &series.extra_options {
        doc.insert(key.clone(), value.clone());
    }
    Value::Object(doc)
}

fn metric_for_series(
    series: &SeriesConfig,
    index: usize,
    structure: &DataStructureInfo,
) -> Option<String> {
    if let Some(field) = series.encoded_field("y") {
        return Some(field.to_string());
    }
    if structure.metric_fields.iter().any(|m| m == &series.name) {
        return Some(series.name.clone());
    }
    structure
        .metric_fields
        .get(index)
        .or_else(|| structure.metric_fields.first())
        .cloned()
}

fn doc_series_mut(doc: &mut Map<String, Value>) -> Option<&mut Vec<Value>> {
    doc.get_mut("series").and_then(Value::as_array_mut)
}

pub(crate) fn transcode_cartesian(doc: &mut Map<String, Value>, context: &TranscodeContext) {
    let x_field = context
        .config
        .series
        .first()
        .and_then(|s| s.encoded_field("x"))
        .map(str::to_string)
        .or_else(|| {
            context
                .config
                .x_axis
                .as_ref()
                .map(|a| a.name.clone())
                .filter(|name| !name.is_empty())
        })
        .or_else(|| context.structure.first_dimension().map(str::to_string));
    let x_type = context
        .config
        .x_axis
        .as_ref()
        .map(|a| a.axis_type)
        .unwrap_or(AxisType::Category);

    let x_values: Vec<Value> = match &x_field {
        Some(field) => context
            .rows
            .iter()
            .map(|row| row.get(field).cloned().unwrap_or(Value::Null))
            .collect(),
        None => Vec::new(),
    };
    if let Some(reason) = check_axis_values(x_type, x_values.iter(), context.analysis) {
        Degradation::AxisDataMismatch {
            axis: "x".to_string(),
            reason,
        }
        .report();
    }
    if x_type == AxisType::Category {
        if let Some(Value::Object(axis)) = doc.get_mut("xAxis") {
            axis.insert("data".to_string(), Value::Array(x_values.clone()));
        }
    }

    let metrics: Vec<Option<String>> = context
        .config
        .series
        .iter()
        .enumerate()
        .map(|(i, s)| metric_for_series(s, i, context.structure))
        .collect();
    let Some(series_docs) = doc_series_mut(doc) else {
        return;
    };
    for (index, series_doc) in series_docs.iter_mut().enumerate() {
        let Some(metric) = metrics.get(index).cloned().flatten() else {
            continue;
        };
        let data: Vec<Value> = if x_type == AxisType::Category {
            context
                .rows
                .iter()
                .map(|row| row.get(&metric).cloned().unwrap_or(Value::Null))
                .collect()
        } else {
            let mut skipped = 0usize;
            let data = context
                .rows
                .iter()
                .zip(&x_values)
                .filter_map(|(row, x)| {
                    if x.is_null() {
                        return None;
                    }
                    let y = row.get(&metric).cloned().unwrap_or(Value::Null);
                    if y.as_f64().is_none() {
                        skipped += 1;
                        return None;
                    }
                    Some(Value::Array(vec![x.clone(), y]))
                })
                .collect();
            if skipped > 0 {
                Degradation::AxisDataMismatch {
                    axis: "y".to_string(),
                    reason: format!("{skipped} non-numeric value(s) for '{metric}' skipped"),
                }
                .report();
            }
            data
        };
        if let Value::Object(series_obj) = series_doc {
            series_obj.insert("data".to_string(), Value::Array(data));
            let unnamed = matches!(series_obj.get("name"), Some(Value::String(s)) if s.is_empty());
            if unnamed {
                series_obj.insert("name".to_string(), Value::String(metric));
            }
        }
    }
}

pub(crate) fn transcode_pie(doc: &mut Map<String, Value>, context: &TranscodeContext) {
    let Some(name_field) = context.structure.first_dimension().map(str::to_string) else {
        return;
    };
    let value_field = context
        .config
        .series
        .first()
        .and_then(|s| metric_for_series(s, 0, context.structure));
    let Some(value_field) = value_field else {
        return;
    };
    let mut names = Vec::new();
    let mut data = Vec::new();
    for row in context.rows {
        let name = match row.get(&name_field) {
            Some(Value::String(s)) => s.clone(),
            Some(other) if !other.is_null() => other.to_string(),
            _ => continue,
        };
        let Some(value) = row.get(&value_field).filter(|v| v.as_f64().is_some()) else {
            continue;
        };
        names.push(Value::String(name.clone()));
        data.push(json!({ "name": name, "value": value }));
    }
    match doc.get_mut("legend") {
        Some(Value::Object(legend)) => {
            legend.insert("data".to_string(), Value::Array(names));
        }
        _ => {
            doc.insert("legend".to_string(), json!({ "data": names }));
        }
    }
    if let Some(series_docs) = doc_series_mut(doc) {
        if let Some(Value::Object(series_obj)) = series_docs.first_mut() {
            series_obj.insert("data".to_string(), Value::Array(data));
        }
    }
}

pub(crate) fn transcode_scatter(doc: &mut Map<String, Value>, context: &TranscodeContext) {
    if context.structure.metric_fields.len() < 2 {
        Degradation::InsufficientFields {
            chart_type: context.config.chart_type,
            kind: "metric",
            needed: 2,
            available: context.structure.metric_fields.len(),
        }
        .report();
        return;
    }
    let x_field = context.structure.metric_fields[0].clone();
    let y_field = context.structure.metric_fields[1].clone();
    let data: Vec<Value> = context
        .rows
        .iter()
        .filter_map(|row| {
            let x = row.get(&x_field)?;
            let y = row.get(&y_field)?;
            x.as_f64()?;
            y.as_f64()?;
            Some(Value::Array(vec![x.clone(), y.clone()]))
        })
        .collect();
    if let Some(series_docs) = doc_series_mut(doc) {
        if let Some(Value::Object(series_obj)) = series_docs.first_mut() {
            series_obj.insert("data".to_string(), Value::Array(data));
        }
    }
}

pub(crate) fn transcode_radar(doc: &mut Map<String, Value>, context: &TranscodeContext) {
    let metrics = &context.structure.metric_fields;
    if metrics.is_empty() {
        return;
    }
    let indicators: Vec<Value> = metrics
        .iter()
        .map(|metric| {
            let max = context
                .rows
                .iter()
                .filter_map(|row| row.get(metric).and_then(Value::as_f64))
                .fold(f64::NEG_INFINITY, f64::max);
            let bound = if max.is_finite() && max > 0.0 {
                (max * context.settings.radar_headroom).ceil()
            } else {
                context.settings.radar_fallback_indicator_max
            };
            json!({ "name": metric, "max": bound })
        })
        .collect();
    doc.insert("radar".to_string(), json!({ "indicator": indicators }));

    let name_field = context.structure.first_dimension().map(str::to_string);
    let mut items = Vec::new();
    for (index, row) in context.rows.iter().enumerate() {
        if name_field.is_none() && index >= context.settings.radar_anonymous_rows {
            break;
        }
        let name = name_field
            .as_ref()
            .and_then(|f| row.get(f))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Item {}", index + 1));
        let values: Vec<Value> = metrics
            .iter()
            .map(|metric| {
                row.get(metric)
                    .filter(|v| v.as_f64().is_some())
                    .cloned()
                    .unwrap_or(json!(0.0))
            })
            .collect();
        items.push(json!({ "name": name, "value": values }));
    }
    if let Some(series_docs) = doc_series_mut(doc) {
        if let Some(Value::Object(series_obj)) = series_docs.first_mut() {
            series_obj.insert("data".to_string(), Value::Array(items));
        }
    }
}

pub(crate) fn transcode_heatmap(doc: &mut Map<String, Value>, context: &TranscodeContext) {
    if context.structure.dimension_fields.len() < 2 {
        Degradation::InsufficientFields {
            chart_type: context.config.chart_type,
            kind: "dimension",
            needed: 2,
            available: context.structure.dimension_fields.len(),
        }
        .report();
        return;
    }
    let x_field = context.structure.dimension_fields[0].clone();
    let y_field = context.structure.dimension_fields[1].clone();
    let value_field = context.structure.first_metric().map(str::to_string);

    let mut x_values: Vec<String> = Vec::new();
    let mut y_values: Vec<String> = Vec::new();
    let mut lookup: Vec<(String, String, f64)> = Vec::new();
    for row in context.rows {
        let Some(x) = row.get(&x_field).and_then(label_of) else {
            continue;
        };
        let Some(y) = row.get(&y_field).and_then(label_of) else {
            continue;
        };
        if !x_values.contains(&x) {
            x_values.push(x.clone());
        }
        if !y_values.contains(&y) {
            y_values.push(y.clone());
        }
        let value = value_field
            .as_ref()
            .and_then(|f| row.get(f))
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        lookup.push((x, y, value));
    }

    // Colour range comes from observed values, not the zero fill.
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for (_, _, value) in &lookup {
        min = min.min(*value);
        max = max.max(*value);
    }
    if lookup.is_empty() {
        min = 0.0;
        max = 0.0;
    }

    // Full Cartesian product so every cell renders, absent pairs as 0.
    // Cells reference the axis label sets by index.
    let mut data = Vec::new();
    for (x_index, x) in x_values.iter().enumerate() {
        for (y_index, y) in y_values.iter().enumerate() {
            let value = lookup
                .iter()
                .rev()
                .find(|(lx, ly, _)| lx == x && ly == y)
                .map(|(_, _, v)| *v)
                .unwrap_or(0.0);
            data.push(json!([x_index, y_index, value]));
        }
    }

    if let Some(Value::Object(axis)) = doc.get_mut("xAxis") {
        axis.insert(
            "data".to_string(),
            Value::Array(x_values.iter().cloned().map(Value::String).collect()),
        );
    }
    if let Some(Value::Object(axis)) = doc.get_mut("yAxis") {
        axis.insert(
            "data".to_string(),
            Value::Array(y_values.iter().cloned().map(Value::String).collect()),
        );
    }
    match doc.get_mut("visualMap") {
        Some(Value::Object(map)) => {
            map.entry("min".to_string()).or_insert_with(|| json!(min));
            map.entry("max".to_string()).or_insert_with(|| json!(max));
        }
        _ => {
            doc.insert("visualMap".to_string(), json!({ "min": min, "max": max }));
        }
    }
    if let Some(series_docs) = doc_series_mut(doc) {
        if let Some(Value::Object(series_obj)) = series_docs.first_mut() {
            series_obj.insert("data".to_string(), Value::Array(data));
        }
    }
}

fn label_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}
