//! Metadata Sidecar Layer
//!
//! A plain file cannot carry user metadata or a content type, so the
//! filesystem strategy keeps them in a sidecar store keyed by the blob's
//! mapped absolute path. Backends are swappable (SQLite, in-memory)
//! without affecting the storage strategy.
//!
//! The strategy keeps the sidecar consistent with the filesystem: every
//! write replaces the record wholesale and every delete removes it.

pub mod sqlite_store;
pub mod mock_store;
pub mod config;


use std::collections::BTreeMap;
use std::path::{Path, MAIN_SEPARATOR};

use serde::{Deserialize, Serialize};

use crate::blob::ContentMetadata;
use crate::container::ContainerAccess;
use crate::error::Result;

/// What kind of filesystem entry a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    File,
    Directory,
}

/// Attributes persisted for one blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidecarRecord {
    pub kind: EntryKind,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub cache_control: Option<String>,
    pub user_metadata: BTreeMap<String, String>,
    pub etag: Option<String>,
}

impl SidecarRecord {
    pub fn directory() -> Self {
        Self {
            kind: EntryKind::Directory,
            content_type: None,
            content_disposition: None,
            content_encoding: None,
            content_language: None,
            cache_control: None,
            user_metadata: BTreeMap::new(),
            etag: None,
        }
    }

    pub fn file(content: &ContentMetadata, user_metadata: BTreeMap<String, String>, etag: String) -> Self {
        Self {
            kind: EntryKind::File,
            content_type: content.content_type.clone(),
            content_disposition: content.content_disposition.clone(),
            content_encoding: content.content_encoding.clone(),
            content_language: content.content_language.clone(),
            cache_control: content.cache_control.clone(),
            user_metadata,
            etag: Some(etag),
        }
    }

    /// Content attributes of the record, with the length supplied by the
    /// filesystem
    pub fn content(&self, content_length: u64) -> ContentMetadata {
        ContentMetadata {
            content_type: self.content_type.clone(),
            content_length: Some(content_length),
            content_disposition: self.content_disposition.clone(),
            content_encoding: self.content_encoding.clone(),
            content_language: self.content_language.clone(),
            cache_control: self.cache_control.clone(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Key under which the sidecar stores the record for `path`
pub fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Prefix shared by every descendant of the directory key `dir`
pub fn descendant_prefix(dir: &str) -> String {
    let mut prefix = dir.trim_end_matches(MAIN_SEPARATOR).to_string();
    prefix.push(MAIN_SEPARATOR);
    prefix
}

/// Trait defining the sidecar metadata interface
pub trait MetadataStorage: Send + Sync {
    /// Store the record for `path`, replacing any previous record
    fn put_metadata(&self, path: &str, record: &SidecarRecord) -> Result<()>;

    fn get_metadata(&self, path: &str) -> Result<Option<SidecarRecord>>;

    /// Delete the record for `path`; absent records are not an error
    fn delete_metadata(&self, path: &str) -> Result<()>;

    /// Delete the record for `dir` and every record below it
    fn delete_metadata_under(&self, dir: &str) -> Result<()>;

    fn put_container_access(&self, container_path: &str, access: ContainerAccess) -> Result<()>;

    fn get_container_access(&self, container_path: &str) -> Result<Option<ContainerAccess>>;

    fn delete_container_access(&self, container_path: &str) -> Result<()>;

    /// Number of blob records held
    fn record_count(&self) -> Result<usize>;
}
