//! Lazy directory walks behind container and key listings

use std::fs::{self, DirEntry, ReadDir};
use std::io;
use std::path::{Path, PathBuf};
use std::vec;

use log::warn;

use crate::blob::{KEY_SEPARATOR, STAGING_PREFIX};
use crate::error::{Result, StorageError};
use crate::options::ListContainerOptions;

/// Immediate subdirectories of the base directory, one pass
pub struct ContainerNames {
    base: PathBuf,
    entries: ReadDir,
}

impl ContainerNames {
    pub fn new(base: &Path) -> Result<Self> {
        let entries = fs::read_dir(base).map_err(|e| StorageError::io(base, e))?;
        Ok(Self {
            base: base.to_path_buf(),
            entries,
        })
    }
}

impl Iterator for ContainerNames {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(StorageError::io(&self.base, e))),
            };
            if !is_dir(&entry) {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => return Some(Ok(name)),
                Err(raw) => warn!("Skipping container with non UTF-8 name {:?}", raw),
            }
        }
    }
}

struct Entry {
    name: String,
    is_dir: bool,
}

struct Frame {
    dir: PathBuf,
    key_prefix: String,
    entries: vec::IntoIter<Entry>,
}

/// Depth-first walk of a container yielding one key per regular file and
/// one `dir/` key per directory, in name order within each directory.
///
/// Only directories that can hold a selected key are read, so a prefix
/// deep in the tree does not walk unrelated subtrees.
pub struct BlobKeys {
    stack: Vec<Frame>,
    options: ListContainerOptions,
    remaining: Option<usize>,
}

impl BlobKeys {
    pub fn new(container_dir: PathBuf, options: ListContainerOptions) -> Result<Self> {
        let entries = read_sorted(&container_dir)?;
        Ok(Self {
            stack: vec![Frame {
                dir: container_dir,
                key_prefix: String::new(),
                entries,
            }],
            remaining: options.max_results,
            options,
        })
    }
}

impl Iterator for BlobKeys {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == Some(0) {
            return None;
        }
        loop {
            let frame = self.stack.last_mut()?;
            let Some(entry) = frame.entries.next() else {
                self.stack.pop();
                continue;
            };

            let mut key = format!("{}{}", frame.key_prefix, entry.name);
            if entry.is_dir {
                key.push(KEY_SEPARATOR);
                if self.options.should_descend(&key) {
                    let dir = frame.dir.join(&entry.name);
                    match read_sorted(&dir) {
                        Ok(entries) => self.stack.push(Frame {
                            dir,
                            key_prefix: key.clone(),
                            entries,
                        }),
                        // Removed since the parent was read
                        Err(StorageError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                            continue
                        }
                        Err(e) => return Some(Err(e)),
                    }
                }
            }

            if self.options.matches(&key) {
                if let Some(remaining) = self.remaining.as_mut() {
                    *remaining -= 1;
                }
                return Some(Ok(key));
            }
        }
    }
}

fn read_sorted(dir: &Path) -> Result<vec::IntoIter<Entry>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| StorageError::io(dir, e))? {
        let entry = entry.map_err(|e| StorageError::io(dir, e))?;
        let is_dir = is_dir(&entry);
        match entry.file_name().into_string() {
            // Uploads still being written
            Ok(name) if name.starts_with(STAGING_PREFIX) => continue,
            Ok(name) => entries.push(Entry { name, is_dir }),
            Err(raw) => warn!("Skipping non UTF-8 entry {:?} in {}", raw, dir.display()),
        }
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries.into_iter())
}

/// Follows symlinks so a linked directory lists like a real one
fn is_dir(entry: &DirEntry) -> bool {
    match entry.file_type() {
        Ok(ft) if ft.is_symlink() => fs::metadata(entry.path()).map(|m| m.is_dir()).unwrap_or(false),
        Ok(ft) => ft.is_dir(),
        Err(_) => false,
    }
}
