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

use crate::chart_model::{DataStructureInfo, SemanticType};
use crate::error::{ConfigError, ConfigResult, Degradation};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub sample_rows: usize,
    pub timeseries_probe_rows: usize,
    pub temporal_formats: Vec<String>,
}
impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rows: 10,
            timeseries_probe_rows: 5,
            temporal_formats: vec![
                "%Y-%m-%d".to_string(),
                "%Y-%m-%d %H:%M:%S".to_string(),
                "%Y-%m-%dT%H:%M:%S".to_string(),
                "%Y-%m-%dT%H:%M:%SZ".to_string(),
                "%Y/%m/%d".to_string(),
                "%m/%d/%Y".to_string(),
                "%d/%m/%Y".to_string(),
            ],
        }
    }
}
impl AnalysisConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.sample_rows == 0 {
            return Err(ConfigError::InvalidAnalysisConfig {
                field: "sample_rows".to_string(),
                value: "0".to_string(),
            });
        }
        if self.timeseries_probe_rows == 0 {
            return Err(ConfigError::InvalidAnalysisConfig {
                field: "timeseries_probe_rows".to_string(),
                value: "0".to_string(),
            });
        }
        if self.temporal_formats.is_empty() {
            return Err(ConfigError::InvalidAnalysisConfig {
                field: "temporal_formats".to_string(),
                value: "[]".to_string(),
            });
        }
        Ok(())
    }
    pub fn parse_datetime(&self, value: &str) -> Option<NaiveDateTime> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(dt.naive_utc());
        }
        for format in &self.temporal_formats {
            if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
                return Some(dt);
            }
            if let Ok(date) = NaiveDate::parse_from_str(value, format) {
                return date.and_hms_opt(0, 0, 0);
            }
        }
        None
    }
    pub fn is_datetime_value(&self, value: &Value) -> bool {
        value
            .as_str()
            .is_some_and(|s| self.parse_datetime(s).is_some())
    }
}

/// Resolves the record set the pipeline operates on: an array of
/// records, the largest array-valued property of a wrapping object, or
/// the object itself as a single record.
pub(crate) fn resolve_records(data: &Value) -> Vec<&Value> {
    match data {
        Value::Array(rows) => rows.iter().collect(),
        Value::Object(map) => {
            let largest = map
                .values()
                .filter_map(|v| v.as_array())
                .max_by_key(|a| a.len());
            match largest {
                Some(rows) => rows.iter().collect(),
                None => vec![data],
            }
        }
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct ShapeAnalyser {
    config: AnalysisConfig,
}
impl ShapeAnalyser {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_config(config: AnalysisConfig) -> Self {
        Self { config }
    }
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn analyse(&self, data: &Value) -> DataStructureInfo {
        match data {
            Value::Array(_) | Value::Object(_) => {
                let rows = resolve_records(data);
                self.analyse_records(&rows)
            }
            other => {
                Degradation::Analysis {
                    reason: format!("root value is {}, expected array or object", kind_name(other)),
                }
                .report();
                DataStructureInfo::empty()
            }
        }
    }

    fn analyse_records(&self, rows: &[&Value]) -> DataStructureInfo {
        let Some(first) = rows.first() else {
            return DataStructureInfo {
                row_count: 0,
                ..DataStructureInfo::empty()
            };
        };
        let Some(template) = first.as_object() else {
            Degradation::Analysis {
                reason: format!("records are {}, expected objects", kind_name(first)),
            }
            .report();
            return DataStructureInfo::empty();
        };

        // Field order follows the first record's key order.
        let field_names: Vec<String> = template.keys().cloned().collect();
        let field_samples = self.sample_fields(rows, &field_names);

        let mut dimension_fields = Vec::new();
        let mut metric_fields = Vec::new();
        let mut field_types = HashMap::new();
        for name in &field_names {
            let semantic = field_samples
                .get(name)
                .map(|sample| self.semantic_type(sample))
                .unwrap_or(SemanticType::String);
            if semantic.is_numeric() {
                metric_fields.push(name.clone());
            } else {
                dimension_fields.push(name.clone());
            }
            field_types.insert(name.clone(), semantic);
        }

        DataStructureInfo {
            row_count: rows.len(),
            dimension_fields,
            metric_fields,
            field_types,
            field_samples,
        }
    }

    fn sample_fields(&self, rows: &[&Value], field_names: &[String]) -> HashMap<String, Value> {
        let mut samples: HashMap<String, Value> = HashMap::new();
        for row in rows.iter().take(self.config.sample_rows) {
            let Some(record) = row.as_object() else {
                continue;
            };
            for name in field_names {
                if samples.contains_key(name) {
                    continue;
                }
                if let Some(value) = record.get(name) {
                    if !value.is_null() {
                        samples.insert(name.clone(), value.clone());
                    }
                }
            }
            if samples.len() == field_names.len() {
                break;
            }
        }
        samples
    }

    pub fn semantic_type(&self, value: &Value) -> SemanticType {
        match value {
            Value::Bool(_) => SemanticType::Boolean,
            Value::Number(n) => {
                if n.is_i64() || n.is_u64() {
                    SemanticType::Integer
                } else {
                    SemanticType::Float
                }
            }
            Value::String(s) => {
                if self.config.parse_datetime(s).is_some() {
                    SemanticType::DateTime
                } else {
                    SemanticType::String
                }
            }
            Value::Array(_) => SemanticType::Array,
            Value::Object(_) => SemanticType::Object,
            Value::Null => SemanticType::String,
        }
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
