//! Application State Management
//!
//! This module provides the application state shared by every HTTP worker:
//! the configured storage strategy and the configuration it was built from.

use std::sync::Arc;
use actix_web::web;
use log::info;

use crate::config::{AppConfig, StorageConfig};
use crate::error::Result;
use crate::metadata::config::create_store;
use crate::metadata::mock_store::MockMetadataStore;
use crate::storage::{FilesystemStorageStrategy, StorageStrategy};

/// Application state containing the storage strategy and its configuration
#[derive(Clone)]
pub struct AppState {
    pub strategy: Arc<dyn StorageStrategy>,
    pub config: AppConfig,
}

impl AppState {
    /// Create a new application state from `config.yaml` and the environment
    pub fn new() -> Result<Self> {
        Self::from_config(AppConfig::load()?)
    }

    /// Create application state from configuration
    pub fn from_config(config: AppConfig) -> Result<Self> {
        info!("Initializing application state with configuration");

        let metadata = create_store(&config.metadata)?;
        let strategy = FilesystemStorageStrategy::new(&config.storage, metadata)?;

        info!("Application state initialized successfully");
        Ok(Self {
            strategy: Arc::new(strategy),
            config,
        })
    }

    /// Create application state for testing: storage under `base_path`,
    /// in-memory sidecar
    pub fn new_for_testing(base_path: &str) -> Result<Self> {
        let mut config = AppConfig::default();
        config.storage = StorageConfig {
            base_path: base_path.to_string(),
            auto_detect_content_type: true,
        };
        let strategy = FilesystemStorageStrategy::new(&config.storage, Arc::new(MockMetadataStore::new()))?;
        Ok(Self {
            strategy: Arc::new(strategy),
            config,
        })
    }
}

/// Helper function to extract app state from Actix-web data
pub fn extract_app_state(data: &web::Data<AppState>) -> &AppState {
    data.as_ref()
}
