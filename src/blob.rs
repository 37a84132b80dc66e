//! Blob model: keys, payloads, metadata and the builder/factory pair
//! through which the storage adapter creates every blob it hands out.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::PathBuf;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Separator between key segments
pub const KEY_SEPARATOR: char = '/';

/// Name prefix of in-flight upload files. Never a valid key segment and
/// never listed.
pub const STAGING_PREFIX: &str = ".fs_blobstore-tmp-";

/// Content type reported for directory blobs
pub const DIRECTORY_CONTENT_TYPE: &str = "application/x-directory";

/// Identity of a blob within a container.
///
/// `"photos/cat.jpg"` and `"photos/"` name different kinds of object: the
/// first is a content blob stored as a regular file, the second a
/// directory blob stored as a directory. The stored path never carries the
/// trailing separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BlobKey {
    File(String),
    Directory(String),
}

impl BlobKey {
    /// Split a raw key into its kind and path. Does not validate.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_suffix(KEY_SEPARATOR) {
            Some(path) => BlobKey::Directory(path.to_string()),
            None => BlobKey::File(raw.to_string()),
        }
    }

    /// Key path without the trailing separator
    pub fn path(&self) -> &str {
        match self {
            BlobKey::File(path) | BlobKey::Directory(path) => path,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, BlobKey::Directory(_))
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path().split(KEY_SEPARATOR)
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlobKey::File(path) => write!(f, "{}", path),
            BlobKey::Directory(path) => write!(f, "{}{}", path, KEY_SEPARATOR),
        }
    }
}

impl From<&str> for BlobKey {
    fn from(raw: &str) -> Self {
        BlobKey::parse(raw)
    }
}

/// Blob content source
pub enum Payload {
    Bytes(Bytes),
    File(PathBuf),
    Stream(Box<dyn Read + Send>),
}

impl Payload {
    /// Length if it can be known without consuming the payload
    pub fn known_length(&self) -> Option<u64> {
        match self {
            Payload::Bytes(bytes) => Some(bytes.len() as u64),
            Payload::File(path) => std::fs::metadata(path).ok().map(|m| m.len()),
            Payload::Stream(_) => None,
        }
    }

    pub fn into_reader(self) -> io::Result<Box<dyn Read + Send>> {
        match self {
            Payload::Bytes(bytes) => Ok(Box::new(Cursor::new(bytes))),
            Payload::File(path) => Ok(Box::new(File::open(path)?)),
            Payload::Stream(reader) => Ok(reader),
        }
    }

    pub fn into_bytes(self) -> io::Result<Bytes> {
        match self {
            Payload::Bytes(bytes) => Ok(bytes),
            other => {
                let mut buffer = Vec::new();
                other.into_reader()?.read_to_end(&mut buffer)?;
                Ok(Bytes::from(buffer))
            }
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Bytes(bytes) => write!(f, "Payload::Bytes({} bytes)", bytes.len()),
            Payload::File(path) => write!(f, "Payload::File({})", path.display()),
            Payload::Stream(_) => write!(f, "Payload::Stream(..)"),
        }
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Payload::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(Bytes::from(bytes))
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Payload::Bytes(Bytes::copy_from_slice(bytes))
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Bytes(Bytes::from(text))
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Bytes(Bytes::copy_from_slice(text.as_bytes()))
    }
}

impl From<PathBuf> for Payload {
    fn from(path: PathBuf) -> Self {
        Payload::File(path)
    }
}

/// HTTP-style content attributes persisted alongside a blob
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentMetadata {
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub cache_control: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlobMetadata {
    pub key: BlobKey,
    pub container: Option<String>,
    pub content: ContentMetadata,
    pub user_metadata: BTreeMap<String, String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub etag: Option<String>,
}

impl BlobMetadata {
    /// Raw key, with the trailing separator for directory blobs
    pub fn name(&self) -> String {
        self.key.to_string()
    }
}

#[derive(Debug)]
pub struct Blob {
    pub metadata: BlobMetadata,
    pub payload: Option<Payload>,
}

impl Blob {
    pub fn key(&self) -> &BlobKey {
        &self.metadata.key
    }

    /// Drain the payload into memory; an absent payload reads as empty
    pub fn into_bytes(self) -> io::Result<Bytes> {
        match self.payload {
            Some(payload) => payload.into_bytes(),
            None => Ok(Bytes::new()),
        }
    }
}

/// Assembles a `Blob`. The declared content length defaults to the
/// payload's known length; an explicit `content_length` call wins.
#[derive(Debug)]
pub struct BlobBuilder {
    key: BlobKey,
    container: Option<String>,
    payload: Option<Payload>,
    content: ContentMetadata,
    declared_length: Option<u64>,
    user_metadata: BTreeMap<String, String>,
    last_modified: Option<DateTime<Utc>>,
    etag: Option<String>,
}

impl BlobBuilder {
    pub fn new(key: BlobKey) -> Self {
        Self {
            key,
            container: None,
            payload: None,
            content: ContentMetadata::default(),
            declared_length: None,
            user_metadata: BTreeMap::new(),
            last_modified: None,
            etag: None,
        }
    }

    pub fn container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    pub fn payload(mut self, payload: impl Into<Payload>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Replace all content attributes, including the declared length
    pub fn content(mut self, content: ContentMetadata) -> Self {
        self.declared_length = content.content_length;
        self.content = content;
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content.content_type = Some(content_type.into());
        self
    }

    pub fn content_length(mut self, length: u64) -> Self {
        self.declared_length = Some(length);
        self
    }

    pub fn content_disposition(mut self, value: impl Into<String>) -> Self {
        self.content.content_disposition = Some(value.into());
        self
    }

    pub fn content_encoding(mut self, value: impl Into<String>) -> Self {
        self.content.content_encoding = Some(value.into());
        self
    }

    pub fn content_language(mut self, value: impl Into<String>) -> Self {
        self.content.content_language = Some(value.into());
        self
    }

    pub fn cache_control(mut self, value: impl Into<String>) -> Self {
        self.content.cache_control = Some(value.into());
        self
    }

    pub fn user_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.user_metadata = metadata;
        self
    }

    pub fn add_user_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.user_metadata.insert(key.into(), value.into());
        self
    }

    pub fn last_modified(mut self, when: DateTime<Utc>) -> Self {
        self.last_modified = Some(when);
        self
    }

    pub fn etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    pub fn build(self) -> Blob {
        let mut content = self.content;
        content.content_length = self
            .declared_length
            .or_else(|| self.payload.as_ref().and_then(Payload::known_length));
        Blob {
            metadata: BlobMetadata {
                key: self.key,
                container: self.container,
                content,
                user_metadata: self.user_metadata,
                last_modified: self.last_modified,
                etag: self.etag,
            },
            payload: self.payload,
        }
    }
}

/// Supplies fresh blob builders to the storage adapter
pub trait BlobFactory: Send + Sync {
    fn builder(&self, key: BlobKey) -> BlobBuilder;
}

/// Factory producing plain `BlobBuilder`s
#[derive(Debug, Default, Clone)]
pub struct DefaultBlobFactory;

impl BlobFactory for DefaultBlobFactory {
    fn builder(&self, key: BlobKey) -> BlobBuilder {
        BlobBuilder::new(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_distinguishes_trailing_separator() {
        assert_eq!(BlobKey::parse("a/b"), BlobKey::File("a/b".to_string()));
        assert_eq!(BlobKey::parse("a/b/"), BlobKey::Directory("a/b".to_string()));
        assert_ne!(BlobKey::parse("k"), BlobKey::parse("k/"));
    }

    #[test]
    fn test_display_restores_raw_key() {
        for raw in ["file.txt", "nested/dir/file.txt", "folder/", "a/b/c/"] {
            assert_eq!(BlobKey::parse(raw).to_string(), raw);
        }
    }

    #[test]
    fn test_segments() {
        let key = BlobKey::parse("a/b/c/");
        assert_eq!(key.segments().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_builder_takes_length_from_payload() {
        let blob = BlobBuilder::new(BlobKey::parse("k")).payload(vec![0u8; 1024]).build();
        assert_eq!(blob.metadata.content.content_length, Some(1024));
    }

    #[test]
    fn test_explicit_length_overrides_payload_length() {
        let blob = BlobBuilder::new(BlobKey::parse("k"))
            .content_length(512)
            .payload(vec![0u8; 1024])
            .build();
        assert_eq!(blob.metadata.content.content_length, Some(512));
    }

    #[test]
    fn test_stream_payload_has_no_known_length() {
        let reader: Box<dyn Read + Send> = Box::new(Cursor::new(vec![1u8, 2, 3]));
        let blob = BlobBuilder::new(BlobKey::parse("k")).payload(Payload::Stream(reader)).build();
        assert_eq!(blob.metadata.content.content_length, None);
        assert_eq!(blob.into_bytes().unwrap().as_ref(), &[1u8, 2, 3]);
    }

    #[test]
    fn test_missing_payload_reads_empty() {
        let blob = DefaultBlobFactory.builder(BlobKey::parse("dir/")).build();
        assert!(blob.into_bytes().unwrap().is_empty());
    }
}
