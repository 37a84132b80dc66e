//! Container name and blob key validation.
//!
//! Validators run before any filesystem call, so a rejected name never
//! partially applies. They are injected into the storage strategy rather
//! than shared globally.

use std::collections::HashSet;

use lazy_static::lazy_static;

use crate::blob::{KEY_SEPARATOR, STAGING_PREFIX};
use crate::error::{Result, StorageError};

lazy_static! {
    /// Device names Windows refuses as file names, whatever the extension
    static ref RESERVED_NAMES: HashSet<&'static str> = {
        let mut names: HashSet<&'static str> = ["CON", "PRN", "AUX", "NUL"].into_iter().collect();
        names.extend([
            "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8", "COM9",
            "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
        ]);
        names
    };
}

const PATH_SEPARATORS: [char; 2] = ['/', '\\'];

pub trait ContainerNameValidator: Send + Sync {
    fn validate(&self, name: &str) -> Result<()>;
}

pub trait BlobKeyValidator: Send + Sync {
    fn validate(&self, key: &str) -> Result<()>;
}

/// Containers are single directories directly under the base directory
#[derive(Debug, Default, Clone)]
pub struct FilesystemContainerNameValidator;

impl ContainerNameValidator for FilesystemContainerNameValidator {
    fn validate(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(StorageError::invalid_name("container name must not be empty"));
        }
        if name.contains(PATH_SEPARATORS) {
            return Err(StorageError::invalid_name(format!(
                "container name '{}' must not contain a path separator",
                name
            )));
        }
        if name == "." || name == ".." {
            return Err(StorageError::invalid_name(format!(
                "container name '{}' is reserved",
                name
            )));
        }
        if name.contains('\0') {
            return Err(StorageError::invalid_name("container name contains a NUL byte"));
        }
        if is_reserved_device_name(name) {
            return Err(StorageError::invalid_name(format!(
                "container name '{}' is a reserved device name",
                name
            )));
        }
        Ok(())
    }
}

/// Keys are relative `/`-separated paths below the container directory
#[derive(Debug, Default, Clone)]
pub struct FilesystemBlobKeyValidator;

impl BlobKeyValidator for FilesystemBlobKeyValidator {
    fn validate(&self, key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(StorageError::invalid_name("blob key must not be empty"));
        }
        if key.starts_with(PATH_SEPARATORS) {
            return Err(StorageError::invalid_name(format!(
                "blob key '{}' must not start with a path separator",
                key
            )));
        }
        if key.contains('\0') {
            return Err(StorageError::invalid_name("blob key contains a NUL byte"));
        }
        let path = key.strip_suffix(KEY_SEPARATOR).unwrap_or(key);
        for segment in path.split(KEY_SEPARATOR) {
            match segment {
                "" => {
                    return Err(StorageError::invalid_name(format!(
                        "blob key '{}' contains an empty path segment",
                        key
                    )))
                }
                "." | ".." => {
                    return Err(StorageError::invalid_name(format!(
                        "blob key '{}' contains a relative path segment",
                        key
                    )))
                }
                s if s.starts_with(STAGING_PREFIX) => {
                    return Err(StorageError::invalid_name(format!(
                        "blob key '{}' uses the reserved prefix {}",
                        key, STAGING_PREFIX
                    )))
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn is_reserved_device_name(name: &str) -> bool {
    let stem = name.split('.').next().unwrap_or(name);
    RESERVED_NAMES.contains(stem.to_ascii_uppercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_name_with_separator_is_rejected() {
        let validator = FilesystemContainerNameValidator;
        assert!(matches!(
            validator.validate("file/system"),
            Err(StorageError::InvalidName(_))
        ));
        assert!(validator.validate("file\\system").is_err());
    }

    #[test]
    fn test_container_name_edge_cases() {
        let validator = FilesystemContainerNameValidator;
        assert!(validator.validate("").is_err());
        assert!(validator.validate(".").is_err());
        assert!(validator.validate("..").is_err());
        assert!(validator.validate("con").is_err());
        assert!(validator.validate("LPT1.txt").is_err());
        assert!(validator.validate("bad\0name").is_err());
        assert!(validator.validate("my-container").is_ok());
        assert!(validator.validate("container.with.dots").is_ok());
        assert!(validator.validate("console").is_ok());
    }

    #[test]
    fn test_leading_separator_is_rejected() {
        let validator = FilesystemBlobKeyValidator;
        assert!(validator.validate("/test.jpg").is_err());
        assert!(validator.validate("\\test.jpg").is_err());
        assert!(validator.validate("test.jpg").is_ok());
    }

    #[test]
    fn test_hierarchy_and_directory_keys_are_accepted() {
        let validator = FilesystemBlobKeyValidator;
        assert!(validator.validate("a/b/c.txt").is_ok());
        assert!(validator.validate("a/b/").is_ok());
        assert!(validator.validate("folder/").is_ok());
    }

    #[test]
    fn test_traversal_and_empty_segments_are_rejected() {
        let validator = FilesystemBlobKeyValidator;
        assert!(validator.validate("").is_err());
        assert!(validator.validate("../escape").is_err());
        assert!(validator.validate("a/../../escape").is_err());
        assert!(validator.validate("a/./b").is_err());
        assert!(validator.validate("a//b").is_err());
        assert!(validator.validate("a//").is_err());
        assert!(validator.validate("nul\0byte").is_err());
    }

    #[test]
    fn test_staging_prefix_is_reserved() {
        let validator = FilesystemBlobKeyValidator;
        assert!(validator.validate(".fs_blobstore-tmp-abc123").is_err());
        assert!(validator.validate("a/.fs_blobstore-tmp-abc123").is_err());
        assert!(validator.validate(".fs_blobstore-tmp-dir/").is_err());
        assert!(validator.validate("a/.hidden").is_ok());
    }

    #[test]
    fn test_hostile_characters_do_not_panic() {
        let validator = FilesystemBlobKeyValidator;
        for key in ["ctrl\u{1}char", "star*?<>|", "colon:name", "tab\tkey"] {
            assert!(validator.validate(key).is_ok());
        }
    }
}
