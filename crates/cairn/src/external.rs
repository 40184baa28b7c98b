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

//! Collaborator seams for embedding hosts: data resolution, config
//! persistence, export and metadata binding. The built-in
//! implementations cover in-process use; hosts substitute their own.

use crate::chart_model::{ChartConfig, DataSourceDescriptor};
use crate::error::{ExternalError, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::RwLock;

pub trait DataProvider: Send + Sync {
    fn resolve(&self, descriptor: &DataSourceDescriptor) -> std::result::Result<Value, ExternalError>;
}

/// Resolves only `Static` descriptors; anything requiring IO belongs
/// to the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticProvider;
impl DataProvider for StaticProvider {
    fn resolve(&self, descriptor: &DataSourceDescriptor) -> std::result::Result<Value, ExternalError> {
        match descriptor {
            DataSourceDescriptor::Static { payload } => Ok(payload.clone()),
            DataSourceDescriptor::Remote { url, .. } => Err(ExternalError::UnresolvedSource {
                reason: format!("remote source '{url}' requires a host data provider"),
            }),
            DataSourceDescriptor::CurrentContext => Err(ExternalError::UnresolvedSource {
                reason: "current-context source requires a host data provider".to_string(),
            }),
        }
    }
}

pub trait ConfigStore: Send + Sync {
    fn save(&self, config: &ChartConfig) -> std::result::Result<String, ExternalError>;
    fn load(&self, id: &str) -> std::result::Result<ChartConfig, ExternalError>;
    fn delete(&self, id: &str) -> std::result::Result<(), ExternalError>;
}

#[derive(Debug, Default)]
pub struct InMemoryConfigStore {
    configs: RwLock<HashMap<String, ChartConfig>>,
    counter: RwLock<u64>,
}
impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}
impl ConfigStore for InMemoryConfigStore {
    fn save(&self, config: &ChartConfig) -> std::result::Result<String, ExternalError> {
        let id = match &config.id {
            Some(id) => id.clone(),
            None => {
                let mut counter = self.counter.write().map_err(|_| poisoned())?;
                *counter += 1;
                format!("chart-{counter}")
            }
        };
        let mut stored = config.clone();
        stored.id = Some(id.clone());
        self.configs
            .write()
            .map_err(|_| poisoned())?
            .insert(id.clone(), stored);
        Ok(id)
    }
    fn load(&self, id: &str) -> std::result::Result<ChartConfig, ExternalError> {
        self.configs
            .read()
            .map_err(|_| poisoned())?
            .get(id)
            .cloned()
            .ok_or_else(|| ExternalError::StoreFailure {
                reason: format!("no configuration with id '{id}'"),
            })
    }
    fn delete(&self, id: &str) -> std::result::Result<(), ExternalError> {
        self.configs
            .write()
            .map_err(|_| poisoned())?
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ExternalError::StoreFailure {
                reason: format!("no configuration with id '{id}'"),
            })
    }
}

fn poisoned() -> ExternalError {
    ExternalError::StoreFailure {
        reason: "configuration store lock poisoned".to_string(),
    }
}

pub trait ExportAdapter: Send + Sync {
    fn export_config(&self, _config: &ChartConfig) -> Result<String> {
        Err(ExternalError::Unsupported {
            operation: "export_config".to_string(),
        }
        .into())
    }
    fn export_option_document(&self, _document: &Value) -> Result<String> {
        Err(ExternalError::Unsupported {
            operation: "export_option_document".to_string(),
        }
        .into())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonExportAdapter;
impl ExportAdapter for JsonExportAdapter {
    fn export_config(&self, config: &ChartConfig) -> Result<String> {
        Ok(serde_json::to_string_pretty(config)?)
    }
    fn export_option_document(&self, document: &Value) -> Result<String> {
        Ok(serde_json::to_string_pretty(document)?)
    }
}

pub trait MetadataBinder: Send + Sync {
    fn bind(&self, config: &mut ChartConfig, metadata: &Map<String, Value>);
}

/// Applies well-known keys (`id`, `title`, `subtitle`, `theme`) and
/// folds the remainder into `extra_styles`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardMetadataBinder;
impl MetadataBinder for StandardMetadataBinder {
    fn bind(&self, config: &mut ChartConfig, metadata: &Map<String, Value>) {
        for (key, value) in metadata {
            match (key.as_str(), value) {
                ("id", Value::String(id)) => config.id = Some(id.clone()),
                ("title", Value::String(title)) => config.title = title.clone(),
                ("subtitle", Value::String(subtitle)) => config.subtitle = subtitle.clone(),
                ("theme", Value::String(theme)) => config.theme = Some(theme.clone()),
                _ => {
                    config.extra_styles.insert(key.clone(), value.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart_model::ChartType;
    use serde_json::json;

    #[test]
    fn static_provider_resolves_only_static_sources() {
        let provider = StaticProvider;
        let payload = json!([{"a": 1}]);
        let resolved = provider
            .resolve(&DataSourceDescriptor::Static {
                payload: payload.clone(),
            })
            .unwrap();
        assert_eq!(resolved, payload);
        assert!(provider.resolve(&DataSourceDescriptor::CurrentContext).is_err());
    }

    #[test]
    fn in_memory_store_round_trips_and_assigns_ids() {
        let store = InMemoryConfigStore::new();
        let config = ChartConfig::new(ChartType::Bar);
        let id = store.save(&config).unwrap();
        let loaded = store.load(&id).unwrap();
        assert_eq!(loaded.id.as_deref(), Some(id.as_str()));
        store.delete(&id).unwrap();
        assert!(store.load(&id).is_err());
    }

    #[test]
    fn metadata_binder_applies_known_keys_and_keeps_the_rest() {
        let mut config = ChartConfig::new(ChartType::Line);
        let metadata = json!({
            "id": "c-1",
            "title": "Revenue",
            "theme": "dark",
            "backgroundColor": "#111"
        });
        StandardMetadataBinder.bind(&mut config, metadata.as_object().unwrap());
        assert_eq!(config.id.as_deref(), Some("c-1"));
        assert_eq!(config.title, "Revenue");
        assert_eq!(config.theme.as_deref(), Some("dark"));
        assert!(config.extra_styles.contains_key("backgroundColor"));
    }

    #[test]
    fn export_adapter_serialises_configs() {
        let exported = JsonExportAdapter
            .export_config(&ChartConfig::new(ChartType::Pie))
            .unwrap();
        assert!(exported.contains("\"type\": \"pie\""));
    }
}
