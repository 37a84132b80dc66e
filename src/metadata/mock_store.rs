//! In-memory implementation of MetadataStorage trait for testing

use crate::container::ContainerAccess;
use crate::error::{Result, StorageError};
use crate::metadata::{descendant_prefix, MetadataStorage, SidecarRecord};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Tables {
    records: HashMap<String, SidecarRecord>,
    access: HashMap<String, ContainerAccess>,
}

/// Mock implementation of MetadataStorage, held entirely in memory
#[derive(Default)]
pub struct MockMetadataStore {
    tables: Mutex<Tables>,
}

impl MockMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all data from the store (useful for test cleanup)
    pub fn clear(&self) {
        if let Ok(mut tables) = self.tables.lock() {
            tables.records.clear();
            tables.access.clear();
        }
    }

    /// Paths currently holding a record, sorted
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = match self.tables.lock() {
            Ok(tables) => tables.records.keys().cloned().collect(),
            Err(_) => Vec::new(),
        };
        paths.sort();
        paths
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StorageError::Metadata("mock sidecar lock poisoned".to_string()))
    }
}

impl MetadataStorage for MockMetadataStore {
    fn put_metadata(&self, path: &str, record: &SidecarRecord) -> Result<()> {
        self.lock()?.records.insert(path.to_string(), record.clone());
        Ok(())
    }

    fn get_metadata(&self, path: &str) -> Result<Option<SidecarRecord>> {
        Ok(self.lock()?.records.get(path).cloned())
    }

    fn delete_metadata(&self, path: &str) -> Result<()> {
        self.lock()?.records.remove(path);
        Ok(())
    }

    fn delete_metadata_under(&self, dir: &str) -> Result<()> {
        let prefix = descendant_prefix(dir);
        let dir = prefix.trim_end_matches(std::path::MAIN_SEPARATOR);
        let mut tables = self.lock()?;
        tables.records.retain(|path, _| path != dir && !path.starts_with(&prefix));
        tables.access.retain(|path, _| path != dir && !path.starts_with(&prefix));
        Ok(())
    }

    fn put_container_access(&self, container_path: &str, access: ContainerAccess) -> Result<()> {
        self.lock()?.access.insert(container_path.to_string(), access);
        Ok(())
    }

    fn get_container_access(&self, container_path: &str) -> Result<Option<ContainerAccess>> {
        Ok(self.lock()?.access.get(container_path).copied())
    }

    fn delete_container_access(&self, container_path: &str) -> Result<()> {
        self.lock()?.access.remove(container_path);
        Ok(())
    }

    fn record_count(&self) -> Result<usize> {
        Ok(self.lock()?.records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_store_paths_and_clear() {
        let store = MockMetadataStore::new();
        store.put_metadata("/b", &SidecarRecord::directory()).unwrap();
        store.put_metadata("/a", &SidecarRecord::directory()).unwrap();
        assert_eq!(store.paths(), vec!["/a".to_string(), "/b".to_string()]);

        store.clear();
        assert_eq!(store.record_count().unwrap(), 0);
    }
}
