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

use crate::chart_model::ChartType;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum CairnError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("External collaborator error: {0}")]
    External(#[from] ExternalError),
    #[error("Serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid analysis configuration: {field} = {value}")]
    InvalidAnalysisConfig { field: String, value: String },
    #[error("Invalid feature configuration: {field} = {value}")]
    InvalidFeatureConfig { field: String, value: String },
    #[error("Invalid synthesis configuration: {field} = {value}")]
    InvalidSynthesisConfig { field: String, value: String },
    #[error("Invalid transcode configuration: {field} = {value}")]
    InvalidTranscodeConfig { field: String, value: String },
    #[error("Missing required collaborator: {name}")]
    MissingCollaborator { name: String },
    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },
}

#[derive(Error, Debug)]
pub enum ExternalError {
    #[error("Operation not supported: {operation}")]
    Unsupported { operation: String },
    #[error("Data source could not be resolved: {reason}")]
    UnresolvedSource { reason: String },
    #[error("Configuration store failure: {reason}")]
    StoreFailure { reason: String },
}

/// Recoverable, data-dependent conditions. These are reported on the
/// diagnostic channel and never propagated: bad data must not crash a
/// recommendation.
#[derive(Error, Debug, Clone)]
pub enum Degradation {
    #[error("Analysis degraded to empty structure: {reason}")]
    Analysis { reason: String },
    #[error("Axis '{axis}' data mismatch: {reason}")]
    AxisDataMismatch { axis: String, reason: String },
    #[error("Chart type '{requested}' has no dedicated construction, using bar fallback")]
    UnsupportedChartType { requested: ChartType },
    #[error("Chart type '{chart_type}' needs {needed} {kind} field(s), found {available}")]
    InsufficientFields {
        chart_type: ChartType,
        kind: &'static str,
        needed: usize,
        available: usize,
    },
}
impl Degradation {
    pub fn report(&self) {
        warn!(degradation = self.category(), "{self}");
    }
    pub fn category(&self) -> &'static str {
        match self {
            Degradation::Analysis { .. } => "analysis",
            Degradation::AxisDataMismatch { .. } => "axis-data-mismatch",
            Degradation::UnsupportedChartType { .. } => "unsupported-chart-type",
            Degradation::InsufficientFields { .. } => "insufficient-fields",
        }
    }
}

impl CairnError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CairnError::External(ExternalError::Unsupported { .. }))
    }
    pub fn category(&self) -> &'static str {
        match self {
            CairnError::Config(_) => "Configuration",
            CairnError::External(_) => "External",
            CairnError::Serialisation(_) => "Serialisation",
        }
    }
}

pub type Result<T> = std::result::Result<T, CairnError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
