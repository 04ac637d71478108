//! Configuration for the permission search index

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{Result, WardenError};

/// Per-kind settings: which initial group rights apply at resource creation
/// and the kind-specific feature field type hints for the index mapping.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KindConfig {
    /// Group id to right-letter string, granted at creation time.
    #[serde(default)]
    pub initial_group_rights: HashMap<String, String>,
    /// Feature field name to mapping fragment, merged into the kind's index
    /// mapping under `features.properties`.
    #[serde(default)]
    pub feature_mappings: HashMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_storage_url")]
    pub url: String,
    /// Retry ceiling of the connectivity guard.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_storage_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_max_retries() -> u32 {
    5
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            url: default_storage_url(),
            max_retries: default_max_retries(),
        }
    }
}

/// Process configuration: the tracked resource kinds and storage settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub resources: HashMap<String, KindConfig>,
    #[serde(default)]
    pub storage: StorageSettings,
}

impl Config {
    /// Loads configuration from `config/default`, an optional `config/local`
    /// override and `WARDEN`-prefixed environment variables.
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("WARDEN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| WardenError::invalid_request(format!("configuration: {}", e)))?;

        config
            .try_deserialize()
            .map_err(|e| WardenError::invalid_request(format!("configuration: {}", e)))
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    /// Kind settings, falling back to empty defaults for unconfigured kinds.
    pub fn kind(&self, kind: &str) -> KindConfig {
        self.resources.get(kind).cloned().unwrap_or_default()
    }
}
