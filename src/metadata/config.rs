//! Selection of the sidecar metadata backend

use crate::config::MetadataConfig;
use crate::error::Result;
use crate::metadata::{mock_store::MockMetadataStore, sqlite_store::SQLiteMetadataStore, MetadataStorage};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Available metadata storage backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataBackend {
    SQLite,
    Mock,
}

impl Default for MetadataBackend {
    fn default() -> Self {
        MetadataBackend::SQLite
    }
}

impl std::str::FromStr for MetadataBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(MetadataBackend::SQLite),
            "mock" | "memory" => Ok(MetadataBackend::Mock),
            _ => Err(format!("Unknown metadata backend: {}", s)),
        }
    }
}

/// Create a metadata storage instance based on the configuration
pub fn create_store(config: &MetadataConfig) -> Result<Arc<dyn MetadataStorage>> {
    match config.backend {
        MetadataBackend::SQLite => {
            info!(
                "Creating SQLite metadata store at {} (wal_mode: {})",
                config.db_path, config.wal_mode
            );
            let store = SQLiteMetadataStore::open(Path::new(&config.db_path), config.wal_mode)?;
            Ok(Arc::new(store))
        }
        MetadataBackend::Mock => {
            info!("Creating in-memory metadata store");
            Ok(Arc::new(MockMetadataStore::new()))
        }
    }
}
