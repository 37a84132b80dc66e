//! Local filesystem storage implementation
//!
//! Containers are directories directly under the base directory and blob
//! keys are relative paths below them. Regular files hold content blobs,
//! directories hold directory blobs, and everything a file cannot carry
//! lives in the sidecar `MetadataStorage`, keyed by the mapped path.

use std::env;
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use tempfile::Builder;

use crate::blob::{
    Blob, BlobFactory, BlobKey, BlobMetadata, ContentMetadata, DefaultBlobFactory, Payload,
    DIRECTORY_CONTENT_TYPE, STAGING_PREFIX,
};
use crate::config::StorageConfig;
use crate::container::{ContainerAccess, ContainerMetadata, Location, LocationSupplier, NoLocation};
use crate::content_type;
use crate::error::{Result, StorageError};
use crate::metadata::{path_key, EntryKind, MetadataStorage, SidecarRecord};
use crate::options::{GetOptions, ListContainerOptions};
use crate::storage::listing::{BlobKeys, ContainerNames};
use crate::storage::{KeyStream, NameStream, StorageStrategy};
use crate::validation::{
    BlobKeyValidator, ContainerNameValidator, FilesystemBlobKeyValidator,
    FilesystemContainerNameValidator,
};

/// MD5 of zero bytes, the ETag of every directory blob
const EMPTY_ETAG: &str = "d41d8cd98f00b204e9800998ecf8427e";

const COPY_BUFFER_SIZE: usize = 64 * 1024;

const NAME_SEPARATORS: [char; 2] = ['/', '\\'];

/// Filesystem-backed object store
pub struct FilesystemStorageStrategy {
    base_dir: PathBuf,
    auto_detect_content_type: bool,
    metadata: Arc<dyn MetadataStorage>,
    container_validator: Arc<dyn ContainerNameValidator>,
    key_validator: Arc<dyn BlobKeyValidator>,
    blob_factory: Arc<dyn BlobFactory>,
    location: Arc<dyn LocationSupplier>,
}

impl FilesystemStorageStrategy {
    /// Create a strategy rooted at `config.base_path` with the default
    /// validators, blob factory and location supplier. A relative base path
    /// is resolved against the current directory; the directory is created
    /// if missing.
    pub fn new(config: &StorageConfig, metadata: Arc<dyn MetadataStorage>) -> Result<Self> {
        let base_dir = absolute_base_dir(Path::new(&config.base_path))?;
        fs::create_dir_all(&base_dir).map_err(|e| StorageError::io(&base_dir, e))?;
        info!(
            "Filesystem storage rooted at {} (auto_detect_content_type: {})",
            base_dir.display(),
            config.auto_detect_content_type
        );
        Ok(Self {
            base_dir,
            auto_detect_content_type: config.auto_detect_content_type,
            metadata,
            container_validator: Arc::new(FilesystemContainerNameValidator),
            key_validator: Arc::new(FilesystemBlobKeyValidator),
            blob_factory: Arc::new(DefaultBlobFactory),
            location: Arc::new(NoLocation),
        })
    }

    pub fn with_container_validator(mut self, validator: Arc<dyn ContainerNameValidator>) -> Self {
        self.container_validator = validator;
        self
    }

    pub fn with_key_validator(mut self, validator: Arc<dyn BlobKeyValidator>) -> Self {
        self.key_validator = validator;
        self
    }

    pub fn with_blob_factory(mut self, factory: Arc<dyn BlobFactory>) -> Self {
        self.blob_factory = factory;
        self
    }

    pub fn with_location_supplier(mut self, supplier: Arc<dyn LocationSupplier>) -> Self {
        self.location = supplier;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn container_dir(&self, container: &str) -> Result<PathBuf> {
        self.container_validator.validate(container)?;
        Ok(self.base_dir.join(container))
    }

    fn existing_container_dir(&self, container: &str) -> Result<PathBuf> {
        let dir = self.container_dir(container)?;
        if !dir.is_dir() {
            return Err(StorageError::ContainerNotFound(container.to_string()));
        }
        Ok(dir)
    }

    fn parse_key(&self, key: &str) -> Result<BlobKey> {
        self.key_validator.validate(key)?;
        Ok(BlobKey::parse(key))
    }

    /// Validated directory key for a pseudo-folder path, `None` for the root
    fn directory_key(&self, path: Option<&str>) -> Result<Option<BlobKey>> {
        let trimmed = path.map(|p| p.trim_matches(NAME_SEPARATORS)).unwrap_or("");
        if trimmed.is_empty() {
            return Ok(None);
        }
        let key = BlobKey::Directory(trimmed.to_string());
        self.key_validator.validate(&key.to_string())?;
        Ok(Some(key))
    }

    fn content_type_for(&self, path: &Path) -> Option<String> {
        if self.auto_detect_content_type {
            content_type::detect(path)
        } else {
            None
        }
    }

    /// Filesystem attributes merged with the sidecar record, if `key`
    /// exists with exactly the kind it names
    fn read_blob_metadata(
        &self,
        container: &str,
        container_dir: &Path,
        key: &BlobKey,
    ) -> Result<Option<(BlobMetadata, PathBuf)>> {
        let path = key_path(container_dir, key);
        let fs_meta = match fs::metadata(&path) {
            Ok(meta) => meta,
            Err(e) if is_missing(&e) => return Ok(None),
            Err(e) => return Err(StorageError::io(&path, e)),
        };
        let kind_matches = match key {
            BlobKey::File(_) => fs_meta.is_file(),
            BlobKey::Directory(_) => fs_meta.is_dir(),
        };
        if !kind_matches {
            return Ok(None);
        }

        let record = self.metadata.get_metadata(&path_key(&path))?;
        let last_modified = fs_meta.modified().ok().map(DateTime::<Utc>::from);

        let (content, user_metadata, etag) = if key.is_directory() {
            let content = ContentMetadata {
                content_type: Some(DIRECTORY_CONTENT_TYPE.to_string()),
                content_length: Some(0),
                ..Default::default()
            };
            let user_metadata = record.map(|r| r.user_metadata).unwrap_or_default();
            (content, user_metadata, EMPTY_ETAG.to_string())
        } else {
            match record {
                Some(record) if record.kind == EntryKind::File => {
                    let mut content = record.content(fs_meta.len());
                    if content.content_type.is_none() {
                        content.content_type = self.content_type_for(&path);
                    }
                    let etag = match record.etag {
                        Some(etag) => etag,
                        None => file_etag(&path)?,
                    };
                    (content, record.user_metadata, etag)
                }
                _ => {
                    debug!("No sidecar record for {}, using filesystem attributes", path.display());
                    let content = ContentMetadata {
                        content_type: self.content_type_for(&path),
                        content_length: Some(fs_meta.len()),
                        ..Default::default()
                    };
                    (content, Default::default(), file_etag(&path)?)
                }
            }
        };

        let metadata = BlobMetadata {
            key: key.clone(),
            container: Some(container.to_string()),
            content,
            user_metadata,
            last_modified,
            etag: Some(etag),
        };
        Ok(Some((metadata, path)))
    }

    fn put_directory_blob(&self, path: &Path) -> Result<String> {
        fs::create_dir_all(path).map_err(|e| StorageError::io(path, e))?;
        self.metadata.put_metadata(&path_key(path), &SidecarRecord::directory())?;
        Ok(EMPTY_ETAG.to_string())
    }

    fn put_file_blob(&self, path: &Path, blob: Blob) -> Result<String> {
        let parent = path
            .parent()
            .ok_or_else(|| StorageError::invalid_name(format!("no parent for {}", path.display())))?;
        fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;

        let Blob { metadata, payload } = blob;
        let etag = write_atomically(parent, path, payload, metadata.content.content_length)?;

        let mut content = metadata.content;
        if content.content_type.is_none() {
            content.content_type = self.content_type_for(path);
        }
        let record = SidecarRecord::file(&content, metadata.user_metadata, etag.clone());
        let key = path_key(path);
        if let Err(e) = self.metadata.put_metadata(&key, &record) {
            // A file must not outlive a failed record write
            error!("Sidecar write failed for {}, removing the file: {}", path.display(), e);
            if let Err(rm) = fs::remove_file(path) {
                warn!("Could not remove {}: {}", path.display(), rm);
            }
            if let Err(rm) = self.metadata.delete_metadata(&key) {
                warn!("Could not remove stale record for {}: {}", path.display(), rm);
            }
            return Err(e);
        }
        Ok(etag)
    }

    /// Remove empty directories above `removed`, stopping below the
    /// container root, at directory blobs and at anything non-empty
    fn prune_empty_parents(&self, container_dir: &Path, removed: &Path) {
        let mut current = removed.parent();
        while let Some(dir) = current {
            if dir == container_dir || !dir.starts_with(container_dir) {
                break;
            }
            match self.metadata.get_metadata(&path_key(dir)) {
                Ok(Some(record)) if record.kind == EntryKind::Directory => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("Stopped pruning at {}: {}", dir.display(), e);
                    break;
                }
            }
            if !is_empty_dir(dir) {
                break;
            }
            if let Err(e) = fs::remove_dir(dir) {
                // A sibling may have been written meanwhile
                debug!("Stopped pruning at {}: {}", dir.display(), e);
                break;
            }
            debug!("Pruned empty directory {}", dir.display());
            current = dir.parent();
        }
    }

    fn remove_file_entry(&self, path: &Path) -> Result<()> {
        match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => {
                debug!("{} is a directory, not a file blob", path.display());
                return Ok(());
            }
            Ok(_) => match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if is_missing(&e) => {}
                Err(e) => return Err(StorageError::io(path, e)),
            },
            Err(e) if is_missing(&e) => {}
            Err(e) => return Err(StorageError::io(path, e)),
        }
        self.metadata.delete_metadata(&path_key(path))
    }

    /// Removes the directory when empty; a non-empty one only loses its
    /// directory blob record and stays as an implicit folder
    fn remove_directory_entry(&self, path: &Path) -> Result<()> {
        if !path.is_dir() {
            return Ok(());
        }
        if is_empty_dir(path) {
            match fs::remove_dir(path) {
                Ok(()) => {}
                Err(e) if is_missing(&e) => {}
                Err(e) => return Err(StorageError::io(path, e)),
            }
        }
        self.metadata.delete_metadata(&path_key(path))
    }

    /// Remove a directory and every record below it. Anything that is not
    /// a directory is left alone, record included.
    fn remove_tree(&self, path: &Path) -> Result<()> {
        match fs::metadata(path) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                debug!("{} is not a directory, nothing to remove", path.display());
                return Ok(());
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) if e.kind() == io::ErrorKind::NotADirectory => {
                debug!("{} lies below a file, nothing to remove", path.display());
                return Ok(());
            }
            Err(e) => return Err(StorageError::io(path, e)),
        }
        match fs::remove_dir_all(path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(StorageError::io(path, e)),
        }
        self.metadata.delete_metadata_under(&path_key(path))
    }
}

impl StorageStrategy for FilesystemStorageStrategy {
    fn create_container(&self, container: &str) -> Result<bool> {
        let dir = self.container_dir(container)?;
        if dir.is_dir() {
            return Ok(false);
        }
        fs::create_dir_all(&self.base_dir).map_err(|e| StorageError::io(&self.base_dir, e))?;
        match fs::create_dir(&dir) {
            Ok(()) => {
                info!("Created container {}", container);
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(false),
            Err(e) => Err(StorageError::io(&dir, e)),
        }
    }

    fn container_exists(&self, container: &str) -> Result<bool> {
        Ok(self.container_dir(container)?.is_dir())
    }

    fn delete_container(&self, container: &str) -> Result<()> {
        let dir = self.container_dir(container)?;
        self.remove_tree(&dir)?;
        info!("Deleted container {}", container);
        Ok(())
    }

    fn clear_container(&self, container: &str, options: &ListContainerOptions) -> Result<()> {
        let dir = self.container_dir(container)?;
        if !dir.is_dir() {
            debug!("Clear of missing container {} is a no-op", container);
            return Ok(());
        }
        let keys = BlobKeys::new(dir.clone(), options.clone())?.collect::<Result<Vec<_>>>()?;
        for raw in &keys {
            let key = BlobKey::parse(raw);
            let path = key_path(&dir, &key);
            match key {
                BlobKey::File(_) => self.remove_file_entry(&path)?,
                BlobKey::Directory(_) if options.recursive => self.remove_tree(&path)?,
                BlobKey::Directory(_) => self.remove_directory_entry(&path)?,
            }
        }
        info!("Cleared {} entries from container {}", keys.len(), container);
        Ok(())
    }

    fn container_names(&self) -> Result<NameStream> {
        Ok(Box::new(ContainerNames::new(&self.base_dir)?))
    }

    fn container_access(&self, container: &str) -> Result<ContainerAccess> {
        let dir = self.existing_container_dir(container)?;
        Ok(self
            .metadata
            .get_container_access(&path_key(&dir))?
            .unwrap_or_default())
    }

    fn set_container_access(&self, container: &str, access: ContainerAccess) -> Result<()> {
        let dir = self.existing_container_dir(container)?;
        self.metadata.put_container_access(&path_key(&dir), access)?;
        info!("Set access of container {} to {}", container, access);
        Ok(())
    }

    fn container_location(&self, _container: &str) -> Option<Location> {
        self.location.location()
    }

    fn container_metadata(&self, container: &str) -> Result<Option<ContainerMetadata>> {
        let dir = self.container_dir(container)?;
        let fs_meta = match fs::metadata(&dir) {
            Ok(meta) if meta.is_dir() => meta,
            Ok(_) => return Ok(None),
            Err(e) if is_missing(&e) => return Ok(None),
            Err(e) => return Err(StorageError::io(&dir, e)),
        };
        let creation_date = fs_meta
            .created()
            .or_else(|_| fs_meta.modified())
            .ok()
            .map(DateTime::<Utc>::from);
        let access = self
            .metadata
            .get_container_access(&path_key(&dir))?
            .unwrap_or_default();
        Ok(Some(ContainerMetadata {
            name: container.to_string(),
            creation_date,
            location: self.container_location(container),
            access,
        }))
    }

    fn create_directory(&self, container: &str, path: Option<&str>) -> Result<()> {
        let container = container.trim_matches(NAME_SEPARATORS);
        let Some(key) = self.directory_key(path)? else {
            self.container_dir(container)?;
            return Ok(());
        };
        let dir = self.existing_container_dir(container)?;
        let target = key_path(&dir, &key);
        self.put_directory_blob(&target)?;
        debug!("Created directory {} in container {}", key, container);
        Ok(())
    }

    fn directory_exists(&self, container: &str, path: Option<&str>) -> Result<bool> {
        let container = container.trim_matches(NAME_SEPARATORS);
        let dir = self.container_dir(container)?;
        match self.directory_key(path)? {
            None => Ok(dir.is_dir()),
            Some(key) => Ok(key_path(&dir, &key).is_dir()),
        }
    }

    fn delete_directory(&self, container: &str, path: Option<&str>) -> Result<()> {
        let container = container.trim_matches(NAME_SEPARATORS);
        match self.directory_key(path)? {
            None => self.clear_container(container, &ListContainerOptions::default()),
            Some(key) => {
                let dir = self.container_dir(container)?;
                self.remove_tree(&key_path(&dir, &key))?;
                debug!("Deleted directory {} in container {}", key, container);
                Ok(())
            }
        }
    }

    fn new_blob(&self, key: &str) -> Result<Blob> {
        let key = self.parse_key(key)?;
        Ok(self.blob_factory.builder(key).build())
    }

    fn blob_exists(&self, container: &str, key: &str) -> Result<bool> {
        let dir = self.container_dir(container)?;
        let key = self.parse_key(key)?;
        let path = key_path(&dir, &key);
        Ok(match key {
            BlobKey::File(_) => path.is_file(),
            BlobKey::Directory(_) => path.is_dir(),
        })
    }

    fn put_blob(&self, container: &str, blob: Blob) -> Result<String> {
        let key = blob.key().clone();
        self.key_validator.validate(&key.to_string())?;
        let dir = self.existing_container_dir(container)?;
        let path = key_path(&dir, &key);

        let etag = if key.is_directory() {
            if blob.payload.is_some() {
                debug!("Ignoring payload of directory blob {}", key);
            }
            self.put_directory_blob(&path)?
        } else {
            self.put_file_blob(&path, blob)?
        };
        info!("Stored blob {} in container {} (etag {})", key, container, etag);
        Ok(etag)
    }

    fn get_blob(&self, container: &str, key: &str, options: &GetOptions) -> Result<Option<Blob>> {
        let dir = self.container_dir(container)?;
        let key = self.parse_key(key)?;
        let Some((mut metadata, path)) = self.read_blob_metadata(container, &dir, &key)? else {
            debug!("Blob {} not found in container {}", key, container);
            return Ok(None);
        };

        let payload = if key.is_directory() {
            None
        } else {
            let mut file = match File::open(&path) {
                Ok(file) => file,
                Err(e) if is_missing(&e) => return Ok(None),
                Err(e) => return Err(StorageError::io(&path, e)),
            };
            match options.range {
                Some(range) => {
                    let length = metadata.content.content_length.unwrap_or(0);
                    if range.start >= length {
                        return Err(StorageError::InvalidRange {
                            start: range.start,
                            length,
                        });
                    }
                    let selected = range.len_within(length);
                    file.seek(SeekFrom::Start(range.start))
                        .map_err(|e| StorageError::io(&path, e))?;
                    metadata.content.content_length = Some(selected);
                    Some(Payload::Stream(Box::new(file.take(selected))))
                }
                None => Some(Payload::Stream(Box::new(file))),
            }
        };

        let mut builder = self
            .blob_factory
            .builder(metadata.key.clone())
            .container(container)
            .content(metadata.content)
            .user_metadata(metadata.user_metadata);
        if let Some(when) = metadata.last_modified {
            builder = builder.last_modified(when);
        }
        if let Some(etag) = metadata.etag {
            builder = builder.etag(etag);
        }
        if let Some(payload) = payload {
            builder = builder.payload(payload);
        }
        Ok(Some(builder.build()))
    }

    fn blob_metadata(&self, container: &str, key: &str) -> Result<Option<BlobMetadata>> {
        let dir = self.container_dir(container)?;
        let key = self.parse_key(key)?;
        Ok(self
            .read_blob_metadata(container, &dir, &key)?
            .map(|(metadata, _)| metadata))
    }

    fn file_for_blob_key(&self, container: &str, key: &str) -> Result<PathBuf> {
        let dir = self.container_dir(container)?;
        let key = self.parse_key(key)?;
        Ok(key_path(&dir, &key))
    }

    fn remove_blob(&self, container: &str, key: &str) -> Result<()> {
        let dir = self.container_dir(container)?;
        let key = self.parse_key(key)?;
        if !dir.is_dir() {
            return Ok(());
        }
        let path = key_path(&dir, &key);
        match key {
            BlobKey::File(_) => self.remove_file_entry(&path)?,
            BlobKey::Directory(_) => self.remove_directory_entry(&path)?,
        }
        self.prune_empty_parents(&dir, &path);
        info!("Removed blob {} from container {}", key, container);
        Ok(())
    }

    fn blob_keys(&self, container: &str, options: &ListContainerOptions) -> Result<KeyStream> {
        let dir = self.existing_container_dir(container)?;
        Ok(Box::new(BlobKeys::new(dir, options.clone())?))
    }
}

/// Mapped path of `key` below `container_dir`, one path component per
/// key segment
fn key_path(container_dir: &Path, key: &BlobKey) -> PathBuf {
    let mut path = container_dir.to_path_buf();
    for segment in key.segments() {
        path.push(segment);
    }
    path
}

fn absolute_base_dir(base: &Path) -> Result<PathBuf> {
    let joined = if base.is_absolute() {
        base.to_path_buf()
    } else {
        env::current_dir()
            .map_err(|e| StorageError::io(base, e))?
            .join(base)
    };
    Ok(joined
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect())
}

/// Stream `payload` into a temp file next to `target`, check the declared
/// length, then rename over `target`. Returns the hex MD5 of the content.
/// On any failure the temp file is dropped and `target` is untouched.
fn write_atomically(
    dir: &Path,
    target: &Path,
    payload: Option<Payload>,
    declared_length: Option<u64>,
) -> Result<String> {
    let mut temp = Builder::new()
        .prefix(STAGING_PREFIX)
        .tempfile_in(dir)
        .map_err(|e| StorageError::io(dir, e))?;
    let mut digest = md5::Context::new();
    let mut written = 0u64;

    if let Some(payload) = payload {
        let mut reader = payload.into_reader().map_err(|e| StorageError::io(target, e))?;
        let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
        loop {
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(StorageError::io(target, e)),
            };
            digest.consume(&buffer[..n]);
            temp.write_all(&buffer[..n])
                .map_err(|e| StorageError::io(temp.path(), e))?;
            written += n as u64;
        }
    }

    if let Some(expected) = declared_length {
        if expected != written {
            warn!(
                "Rejecting write to {}: declared {} bytes, received {}",
                target.display(),
                expected,
                written
            );
            return Err(StorageError::ContentLengthMismatch {
                expected,
                actual: written,
            });
        }
    }

    temp.as_file()
        .sync_data()
        .map_err(|e| StorageError::io(temp.path(), e))?;
    temp.persist(target)
        .map_err(|e| StorageError::io(target, e.error))?;
    Ok(hex::encode(digest.compute().0))
}

fn file_etag(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| StorageError::io(path, e))?;
    let mut digest = md5::Context::new();
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    loop {
        match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => digest.consume(&buffer[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(StorageError::io(path, e)),
        }
    }
    Ok(hex::encode(digest.compute().0))
}

fn is_missing(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

fn is_empty_dir(dir: &Path) -> bool {
    match fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(e) => {
            debug!("Cannot read {}: {}", dir.display(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::mock_store::MockMetadataStore;

    #[test]
    fn test_key_path_maps_segments() {
        let dir = Path::new("/base/c");
        assert_eq!(key_path(dir, &BlobKey::parse("a/b/c.txt")), Path::new("/base/c/a/b/c.txt"));
        assert_eq!(key_path(dir, &BlobKey::parse("a/b/")), Path::new("/base/c/a/b"));
    }

    #[test]
    fn test_absolute_base_dir_drops_current_dir_components() {
        let resolved = absolute_base_dir(Path::new("./data/./storage")).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("data/storage"));
        assert!(!resolved.components().any(|c| matches!(c, Component::CurDir)));
    }

    #[test]
    fn test_write_atomically_rejects_short_payload() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("blob");
        let err = write_atomically(dir.path(), &target, Some(Payload::from(vec![7u8; 10])), Some(20))
            .unwrap_err();
        assert!(matches!(err, StorageError::ContentLengthMismatch { expected: 20, actual: 10 }));
        assert!(!target.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_write_atomically_returns_md5() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("blob");
        let etag = write_atomically(dir.path(), &target, Some(Payload::from("hello")), None).unwrap();
        assert_eq!(etag, "5d41402abc4b2a76b9719d911017c592");
        assert_eq!(file_etag(&target).unwrap(), etag);
    }

    #[test]
    fn test_is_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(is_empty_dir(dir.path()));
        fs::write(dir.path().join("f"), b"f").unwrap();
        assert!(!is_empty_dir(dir.path()));
        assert!(!is_empty_dir(&dir.path().join("f")));
        assert!(!is_empty_dir(&dir.path().join("missing")));
    }

    #[test]
    fn test_staging_file_carries_reserved_prefix() {
        struct Peek {
            dir: PathBuf,
            seen: std::sync::Arc<std::sync::Mutex<Vec<String>>>,
            done: bool,
        }
        impl Read for Peek {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if self.done {
                    return Ok(0);
                }
                let names = fs::read_dir(&self.dir)?
                    .map(|e| e.map(|e| e.file_name().to_string_lossy().into_owned()))
                    .collect::<io::Result<Vec<_>>>()?;
                *self.seen.lock().unwrap() = names;
                self.done = true;
                buf[0] = b'x';
                Ok(1)
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let reader = Peek {
            dir: dir.path().to_path_buf(),
            seen: seen.clone(),
            done: false,
        };
        let target = dir.path().join("blob");
        write_atomically(dir.path(), &target, Some(Payload::Stream(Box::new(reader))), None).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].starts_with(STAGING_PREFIX));
    }

    #[test]
    fn test_empty_etag_constant() {
        assert_eq!(hex::encode(md5::compute(b"").0), EMPTY_ETAG);
    }

    #[test]
    fn test_strategy_construction_creates_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            base_path: dir.path().join("nested/base").to_string_lossy().into_owned(),
            auto_detect_content_type: false,
        };
        let strategy = FilesystemStorageStrategy::new(&config, Arc::new(MockMetadataStore::new())).unwrap();
        assert!(strategy.base_dir().is_dir());
    }
}
