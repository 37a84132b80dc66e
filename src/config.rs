//! Application Configuration
//!
//! This module provides configuration management for the application,
//! supporting YAML configuration files with sensible defaults and a few
//! environment overrides for deployment.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use log::{info, warn};

use crate::error::{Result, StorageError};
use crate::metadata::config::MetadataBackend;

const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Blob storage configuration
    pub storage: StorageConfig,
    /// Sidecar metadata configuration
    pub metadata: MetadataConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    /// Maximum payload size in bytes
    pub max_payload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9710,
            workers: 4,
            max_payload_size: 1073741824, // 1GB
        }
    }
}

/// Filesystem storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one subdirectory per container; may be relative
    pub base_path: String,
    /// Guess a content type from the key's extension when none is given
    pub auto_detect_content_type: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: "./data/storage".to_string(),
            auto_detect_content_type: false,
        }
    }
}

/// Sidecar metadata configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub backend: MetadataBackend,
    /// Database file path (SQLite backend)
    pub db_path: String,
    /// Enable WAL mode (SQLite backend)
    pub wal_mode: bool,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            backend: MetadataBackend::SQLite,
            db_path: "./data/metadata.db".to_string(),
            wal_mode: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Path to the log4rs configuration file
    pub config_file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            config_file: "server_log.yaml".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `CONFIG_FILE` (or `config.yaml`), then
    /// apply environment overrides
    pub fn load() -> Result<Self> {
        let path = env::var("CONFIG_FILE").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let mut config = Self::load_from(Path::new(&path))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from file, use defaults if not found
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| StorageError::io(path, e))?;
        let config: AppConfig = serde_yaml::from_str(&content)
            .map_err(|e| StorageError::Config(format!("{}: {}", path.display(), e)))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply `STORAGE_DIRECTORY`, `AUTO_DETECT_CONTENT_TYPE`,
    /// `METADATA_BACKEND` and `DB_FILE`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = env::var("STORAGE_DIRECTORY") {
            info!("Using storage directory from environment: {}", dir);
            self.storage.base_path = dir;
        }
        if let Ok(flag) = env::var("AUTO_DETECT_CONTENT_TYPE") {
            match flag.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.storage.auto_detect_content_type = true,
                "0" | "false" | "no" => self.storage.auto_detect_content_type = false,
                other => warn!("Ignoring invalid AUTO_DETECT_CONTENT_TYPE value: {}", other),
            }
        }
        if let Ok(backend) = env::var("METADATA_BACKEND") {
            match backend.parse::<MetadataBackend>() {
                Ok(backend) => {
                    info!("Using metadata backend from environment: {:?}", backend);
                    self.metadata.backend = backend;
                }
                Err(e) => warn!("Invalid metadata backend in environment: {}. Keeping {:?}.", e, self.metadata.backend),
            }
        }
        if let Ok(path) = env::var("DB_FILE") {
            info!("Using database path from environment: {}", path);
            self.metadata.db_path = path;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for var in ["STORAGE_DIRECTORY", "AUTO_DETECT_CONTENT_TYPE", "METADATA_BACKEND", "DB_FILE"] {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 9710);
        assert_eq!(config.storage.base_path, "./data/storage");
        assert!(!config.storage.auto_detect_content_type);
        assert_eq!(config.metadata.backend, MetadataBackend::SQLite);
        assert_eq!(config.logging.config_file, "server_log.yaml");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "storage:\n  base_path: /srv/blobs\n  auto_detect_content_type: true\nmetadata:\n  backend: Mock\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.storage.base_path, "/srv/blobs");
        assert!(config.storage.auto_detect_content_type);
        assert_eq!(config.metadata.backend, MetadataBackend::Mock);
        assert_eq!(config.metadata.db_path, "./data/metadata.db");
        assert_eq!(config.server.port, 9710);
    }

    #[test]
    fn test_malformed_yaml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "server: [not, a, map").unwrap();
        assert!(matches!(AppConfig::load_from(&path), Err(StorageError::Config(_))));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        env::set_var("STORAGE_DIRECTORY", "/tmp/blobs");
        env::set_var("AUTO_DETECT_CONTENT_TYPE", "true");
        env::set_var("METADATA_BACKEND", "mock");
        env::set_var("DB_FILE", "/tmp/meta.db");

        let mut config = AppConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.storage.base_path, "/tmp/blobs");
        assert!(config.storage.auto_detect_content_type);
        assert_eq!(config.metadata.backend, MetadataBackend::Mock);
        assert_eq!(config.metadata.db_path, "/tmp/meta.db");
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_env_values_are_ignored() {
        clear_env();
        env::set_var("METADATA_BACKEND", "cassandra");
        env::set_var("AUTO_DETECT_CONTENT_TYPE", "maybe");

        let mut config = AppConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.metadata.backend, MetadataBackend::SQLite);
        assert!(!config.storage.auto_detect_content_type);
        clear_env();
    }
}
