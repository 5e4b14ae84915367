//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use quadload_core::{
    DEFAULT_BATCH_SIZE, DEFAULT_DATABASE, DEFAULT_WORKERS, GeoMode, LoaderConfig, RetryPolicy,
    SerializerOptions, triples_collection,
};

/// Global configuration for quadload
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub load: LoadConfig,
    pub serialize: SerializeConfig,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding one `<collection>.ndjson` file per collection
    pub output_dir: PathBuf,
    pub database: String,
    /// Overrides the `<database>__triples` default
    pub collection: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./data"),
            database: DEFAULT_DATABASE.to_string(),
            collection: None,
        }
    }
}

impl StoreConfig {
    pub fn collection(&self) -> String {
        self.collection
            .clone()
            .unwrap_or_else(|| triples_collection(&self.database))
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub batch_size: usize,
    pub workers: usize,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            workers: DEFAULT_WORKERS,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default)]
#[serde(default)]
pub struct SerializeConfig {
    pub hashed_fields: bool,
    pub geo: GeoMode,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_retries: policy.max_retries,
            base_delay_ms: u64::try_from(policy.base_delay.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./quadload.toml (current directory)
    /// 2. ~/.config/quadload/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("quadload.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "quadload") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Loader settings from the file values (CLI overrides applied by the caller)
    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            batch_size: self.load.batch_size,
            workers: self.load.workers,
            collection: self.store.collection(),
            serializer: SerializerOptions {
                hashed_fields: self.serialize.hashed_fields,
                geo: self.serialize.geo,
            },
            retry: RetryPolicy {
                max_retries: self.retry.max_retries,
                base_delay: Duration::from_millis(self.retry.base_delay_ms),
            },
        }
    }
}
