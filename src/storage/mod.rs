//! Blob Storage Layer Abstraction
//!
//! `StorageStrategy` is the object-store contract consumed by the HTTP
//! layer and by anything else fronting the store. The filesystem
//! implementation lives in `local_store`.

pub mod listing;
pub mod local_store;


use std::path::PathBuf;

use crate::blob::{Blob, BlobMetadata};
use crate::container::{ContainerAccess, ContainerMetadata, Location};
use crate::error::Result;
use crate::options::{GetOptions, ListContainerOptions};

pub use listing::{BlobKeys, ContainerNames};
pub use local_store::FilesystemStorageStrategy;

/// Lazy, single-pass stream of container names
pub type NameStream = Box<dyn Iterator<Item = Result<String>> + Send>;

/// Lazy, single-pass stream of blob keys
pub type KeyStream = Box<dyn Iterator<Item = Result<String>> + Send>;

/// Trait defining the object-store interface
pub trait StorageStrategy: Send + Sync {
    /// Create a container; `false` if it already existed
    fn create_container(&self, container: &str) -> Result<bool>;

    fn container_exists(&self, container: &str) -> Result<bool>;

    /// Remove a container and everything in it; missing containers are fine
    fn delete_container(&self, container: &str) -> Result<()>;

    /// Remove the blobs selected by `options`, keeping the container
    fn clear_container(&self, container: &str, options: &ListContainerOptions) -> Result<()>;

    fn container_names(&self) -> Result<NameStream>;

    fn container_access(&self, container: &str) -> Result<ContainerAccess>;

    fn set_container_access(&self, container: &str, access: ContainerAccess) -> Result<()>;

    fn container_location(&self, container: &str) -> Option<Location>;

    fn container_metadata(&self, container: &str) -> Result<Option<ContainerMetadata>>;

    /// Create the directory chain for `path`; `None` is the container root
    fn create_directory(&self, container: &str, path: Option<&str>) -> Result<()>;

    fn directory_exists(&self, container: &str, path: Option<&str>) -> Result<bool>;

    /// Remove `path` recursively; `None` clears the whole container
    fn delete_directory(&self, container: &str, path: Option<&str>) -> Result<()>;

    /// Validated, empty blob handle for `key`
    fn new_blob(&self, key: &str) -> Result<Blob>;

    fn blob_exists(&self, container: &str, key: &str) -> Result<bool>;

    /// Store `blob`, returning its ETag
    fn put_blob(&self, container: &str, blob: Blob) -> Result<String>;

    fn get_blob(&self, container: &str, key: &str, options: &GetOptions) -> Result<Option<Blob>>;

    fn blob_metadata(&self, container: &str, key: &str) -> Result<Option<BlobMetadata>>;

    /// Absolute path `key` maps to, whether or not it exists
    fn file_for_blob_key(&self, container: &str, key: &str) -> Result<PathBuf>;

    /// Remove a blob; missing blobs are fine
    fn remove_blob(&self, container: &str, key: &str) -> Result<()>;

    fn blob_keys(&self, container: &str, options: &ListContainerOptions) -> Result<KeyStream>;

    fn count_blobs(&self, container: &str, options: &ListContainerOptions) -> Result<u64> {
        let mut count = 0u64;
        for key in self.blob_keys(container, options)? {
            key?;
            count += 1;
        }
        Ok(count)
    }
}
