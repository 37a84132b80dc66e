//! Option types for listing, clearing and reading blobs.

use crate::blob::KEY_SEPARATOR;

/// Scopes listing, counting and clearing within a container.
///
/// Recursive by default. Setting `/` as the delimiter turns recursion off,
/// matching what object stores do for delimited listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListContainerOptions {
    pub prefix: Option<String>,
    pub recursive: bool,
    pub max_results: Option<usize>,
}

impl Default for ListContainerOptions {
    fn default() -> Self {
        Self {
            prefix: None,
            recursive: true,
            max_results: None,
        }
    }
}

impl ListContainerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefix = if prefix.is_empty() { None } else { Some(prefix) };
        self
    }

    /// Restrict to the contents of `dir`; surrounding separators are ignored
    pub fn in_directory(self, dir: &str) -> Self {
        let dir = dir.trim_matches(KEY_SEPARATOR);
        if dir.is_empty() {
            self.prefix("")
        } else {
            self.prefix(format!("{}{}", dir, KEY_SEPARATOR))
        }
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn delimiter(mut self, delimiter: Option<&str>) -> Self {
        if let Some(d) = delimiter {
            if d.len() == 1 && d.starts_with(KEY_SEPARATOR) {
                self.recursive = false;
            }
        }
        self
    }

    pub fn max_results(mut self, max: usize) -> Self {
        self.max_results = Some(max);
        self
    }

    pub fn prefix_str(&self) -> &str {
        self.prefix.as_deref().unwrap_or("")
    }

    /// Whether a listed key falls inside these options
    pub fn matches(&self, key: &str) -> bool {
        let prefix = self.prefix_str();
        let Some(rest) = key.strip_prefix(prefix) else {
            return false;
        };
        // The directory named by the prefix is the scope, not a member of it
        if rest.is_empty() && key.ends_with(KEY_SEPARATOR) {
            return false;
        }
        if self.recursive {
            return true;
        }
        let rest = rest.strip_suffix(KEY_SEPARATOR).unwrap_or(rest);
        !rest.contains(KEY_SEPARATOR)
    }

    /// Whether a directory key (with trailing separator) can contain
    /// anything these options select
    pub fn should_descend(&self, dir_key: &str) -> bool {
        let prefix = self.prefix_str();
        if prefix.starts_with(dir_key) {
            return true;
        }
        self.recursive && dir_key.starts_with(prefix)
    }
}

/// Inclusive byte range; an open end reads to the end of the blob
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: Option<u64>,
}

impl ByteRange {
    /// Parse an HTTP `bytes=a-b` header value. Suffix ranges are not supported.
    pub fn parse_header(value: &str) -> Option<Self> {
        let bounds = value.trim().strip_prefix("bytes=")?;
        let (start, end) = bounds.split_once('-')?;
        let start = start.trim().parse::<u64>().ok()?;
        let end = match end.trim() {
            "" => None,
            e => Some(e.parse::<u64>().ok()?),
        };
        if matches!(end, Some(e) if e < start) {
            return None;
        }
        Some(Self { start, end })
    }

    /// Number of bytes selected from a blob of `length` bytes
    pub fn len_within(&self, length: u64) -> u64 {
        if self.start >= length {
            return 0;
        }
        let last = self.end.map_or(length - 1, |e| e.min(length - 1));
        last - self.start + 1
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetOptions {
    pub range: Option<ByteRange>,
}

impl GetOptions {
    pub fn range(start: u64, end: Option<u64>) -> Self {
        Self {
            range: Some(ByteRange { start, end }),
        }
    }
}
