//! Configuration management for DocuChain

use crate::error::{LedgerError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "docuchain.toml";
pub const ENV_STORAGE_BACKEND: &str = "DOCUCHAIN_STORAGE_BACKEND";
pub const ENV_STORAGE_PATH: &str = "DOCUCHAIN_STORAGE_PATH";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One JSON file, rewritten on every append.
    File,
    /// One SQLite row per block.
    Sqlite,
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" | "json" => Ok(StorageBackend::File),
            "sqlite" | "db" => Ok(StorageBackend::Sqlite),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(LedgerError::ConfigError(format!(
                "unknown storage backend '{}' (expected file, sqlite or memory)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    #[serde(default = "default_storage_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_storage_path(),
        }
    }
}

fn default_backend() -> StorageBackend {
    StorageBackend::File
}

fn default_storage_path() -> String {
    "./data/blockchain.json".to_string()
}

/// Loads configuration from `path`, falling back to defaults when the file is
/// absent, then applies environment overrides and validates the result.
pub fn load_config_from(path: &Path) -> Result<Config> {
    let config_str = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(LedgerError::ConfigError(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };
    let mut config: Config = if config_str.trim().is_empty() {
        Config::default()
    } else {
        toml::from_str(&config_str)
            .map_err(|e| LedgerError::ConfigError(format!("{}: {}", path.display(), e)))?
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate(&config)?;
    Ok(config)
}

fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
    if let Some(backend) = lookup(ENV_STORAGE_BACKEND) {
        config.storage.backend = backend.parse()?;
    }
    if let Some(path) = lookup(ENV_STORAGE_PATH) {
        config.storage.path = path;
    }
    Ok(())
}

fn validate(config: &Config) -> Result<()> {
    if config.storage.backend != StorageBackend::Memory && config.storage.path.trim().is_empty() {
        return Err(LedgerError::ConfigError(
            "storage.path must be set for file and sqlite backends".to_string(),
        ));
    }
    Ok(())
}
