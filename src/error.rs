//! Error vocabulary of the filesystem blob store.
//!
//! Every layer below the HTTP surface returns `StorageError`. Raw
//! `io::Error`s never leave the adapter unwrapped: they are always tagged
//! with the path that produced them.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;

/// Errors produced by the storage adapter and its sidecar store
#[derive(Debug)]
pub enum StorageError {
    /// Container name or blob key rejected before any I/O
    InvalidName(String),

    /// Operation needs a container that does not exist
    ContainerNotFound(String),

    /// Declared content length differs from the bytes actually written
    ContentLengthMismatch { expected: u64, actual: u64 },

    /// Requested byte range starts past the end of the blob
    InvalidRange { start: u64, length: u64 },

    /// Filesystem failure at `path`
    Io { path: PathBuf, source: io::Error },

    /// Sidecar metadata backend failure
    Metadata(String),

    /// Configuration could not be loaded or applied
    Config(String),
}

impl StorageError {
    pub fn invalid_name(msg: impl Into<String>) -> Self {
        StorageError::InvalidName(msg.into())
    }

    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        StorageError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn metadata(err: impl fmt::Display) -> Self {
        StorageError::Metadata(err.to_string())
    }

    /// True for I/O-category failures, including length mismatches
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            StorageError::Io { .. } | StorageError::ContentLengthMismatch { .. }
        )
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::InvalidName(msg) => write!(f, "Invalid name: {}", msg),
            StorageError::ContainerNotFound(name) => write!(f, "Container not found: {}", name),
            StorageError::ContentLengthMismatch { expected, actual } => write!(
                f,
                "Content length mismatch: declared {} bytes, received {} bytes",
                expected, actual
            ),
            StorageError::InvalidRange { start, length } => write!(
                f,
                "Range start {} is beyond blob length {}",
                start, length
            ),
            StorageError::Io { path, source } => {
                write!(f, "I/O error on {}: {}", path.display(), source)
            }
            StorageError::Metadata(msg) => write!(f, "Metadata store error: {}", msg),
            StorageError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::metadata(err)
    }
}

impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        StorageError::Metadata(format!("record serialization failed: {}", err))
    }
}

impl ResponseError for StorageError {
    fn status_code(&self) -> StatusCode {
        match self {
            StorageError::InvalidName(_) | StorageError::ContentLengthMismatch { .. } => {
                StatusCode::BAD_REQUEST
            }
            StorageError::ContainerNotFound(_) => StatusCode::NOT_FOUND,
            StorageError::InvalidRange { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            StorageError::Io { .. } | StorageError::Metadata(_) | StorageError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_keeps_path_and_source() {
        let err = StorageError::io(
            "/data/c/k",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.is_io());
        assert!(err.to_string().contains("/data/c/k"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            StorageError::invalid_name("bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            StorageError::ContainerNotFound("c".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            StorageError::InvalidRange { start: 10, length: 5 }.status_code(),
            StatusCode::RANGE_NOT_SATISFIABLE
        );
        assert_eq!(
            StorageError::Metadata("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_length_mismatch_is_io_category() {
        let err = StorageError::ContentLengthMismatch { expected: 512, actual: 1024 };
        assert!(err.is_io());
        assert_eq!(
            err.to_string(),
            "Content length mismatch: declared 512 bytes, received 1024 bytes"
        );
    }
}
