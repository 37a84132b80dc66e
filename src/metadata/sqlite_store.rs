//! SQLite implementation of MetadataStorage trait

use crate::container::ContainerAccess;
use crate::error::{Result, StorageError};
use crate::metadata::{descendant_prefix, MetadataStorage, SidecarRecord};
use log::{debug, info, warn};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite implementation of MetadataStorage
pub struct SQLiteMetadataStore {
    conn: Mutex<Connection>,
}

impl SQLiteMetadataStore {
    /// Open (or create) the database at `db_path`
    pub fn open(db_path: &Path, wal_mode: bool) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
            }
        }
        let conn = Connection::open(db_path)?;
        if wal_mode {
            let mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
            if !mode.eq_ignore_ascii_case("wal") {
                warn!("SQLite refused WAL mode, journal_mode is {}", mode);
            }
        }
        info!("Opened SQLite metadata store at {}", db_path.display());
        Self::with_connection(conn)
    }

    /// In-memory database, mostly for tests
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sidecar (
                path TEXT PRIMARY KEY NOT NULL,
                record BLOB NOT NULL
            );
            CREATE TABLE IF NOT EXISTS container_access (
                path TEXT PRIMARY KEY NOT NULL,
                access TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Metadata("sidecar connection lock poisoned".to_string()))
    }
}

impl MetadataStorage for SQLiteMetadataStore {
    fn put_metadata(&self, path: &str, record: &SidecarRecord) -> Result<()> {
        let bytes = record.to_bytes()?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO sidecar (path, record) VALUES (?1, ?2)",
            params![path, bytes],
        )?;
        Ok(())
    }

    fn get_metadata(&self, path: &str) -> Result<Option<SidecarRecord>> {
        let conn = self.lock()?;
        let bytes: Option<Vec<u8>> = conn
            .query_row(
                "SELECT record FROM sidecar WHERE path = ?1",
                params![path],
                |row| row.get(0),
            )
            .optional()?;
        bytes.map(|b| SidecarRecord::from_bytes(&b)).transpose()
    }

    fn delete_metadata(&self, path: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM sidecar WHERE path = ?1", params![path])?;
        Ok(())
    }

    fn delete_metadata_under(&self, dir: &str) -> Result<()> {
        let prefix = descendant_prefix(dir);
        let dir = prefix.trim_end_matches(std::path::MAIN_SEPARATOR);
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM sidecar WHERE path = ?1 OR substr(path, 1, length(?2)) = ?2",
            params![dir, prefix],
        )?;
        conn.execute(
            "DELETE FROM container_access WHERE path = ?1 OR substr(path, 1, length(?2)) = ?2",
            params![dir, prefix],
        )?;
        debug!("Removed {} sidecar records under {}", removed, dir);
        Ok(())
    }

    fn put_container_access(&self, container_path: &str, access: ContainerAccess) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO container_access (path, access) VALUES (?1, ?2)",
            params![container_path, access.as_str()],
        )?;
        Ok(())
    }

    fn get_container_access(&self, container_path: &str) -> Result<Option<ContainerAccess>> {
        let conn = self.lock()?;
        let access: Option<String> = conn
            .query_row(
                "SELECT access FROM container_access WHERE path = ?1",
                params![container_path],
                |row| row.get(0),
            )
            .optional()?;
        access
            .map(|a| a.parse::<ContainerAccess>().map_err(StorageError::Metadata))
            .transpose()
    }

    fn delete_container_access(&self, container_path: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM container_access WHERE path = ?1",
            params![container_path],
        )?;
        Ok(())
    }

    fn record_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sidecar", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::ContentMetadata;
    use std::collections::BTreeMap;

    #[test]
    fn test_sqlite_metadata_store_basic_operations() {
        let store = SQLiteMetadataStore::in_memory().unwrap();
        let path = "/data/c/photos/cat.jpg";

        let mut user_metadata = BTreeMap::new();
        user_metadata.insert("k1".to_string(), "v1".to_string());
        let content = ContentMetadata {
            content_type: Some("image/jpeg".to_string()),
            ..Default::default()
        };
        let record = SidecarRecord::file(&content, user_metadata, "etag-1".to_string());

        store.put_metadata(path, &record).unwrap();
        assert_eq!(store.get_metadata(path).unwrap(), Some(record));
        assert_eq!(store.record_count().unwrap(), 1);

        // Replace, not merge
        let replacement = SidecarRecord::file(&ContentMetadata::default(), BTreeMap::new(), "etag-2".to_string());
        store.put_metadata(path, &replacement).unwrap();
        let stored = store.get_metadata(path).unwrap().unwrap();
        assert!(stored.user_metadata.is_empty());
        assert_eq!(stored.etag.as_deref(), Some("etag-2"));

        store.delete_metadata(path).unwrap();
        assert!(store.get_metadata(path).unwrap().is_none());
        store.delete_metadata(path).unwrap();
    }

    #[test]
    fn test_sqlite_store_on_disk_with_wal() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("metadata.db");
        let store = SQLiteMetadataStore::open(&db_path, true).unwrap();
        store.put_metadata("/x", &SidecarRecord::directory()).unwrap();
        drop(store);

        let reopened = SQLiteMetadataStore::open(&db_path, false).unwrap();
        assert_eq!(reopened.get_metadata("/x").unwrap(), Some(SidecarRecord::directory()));
    }
}
