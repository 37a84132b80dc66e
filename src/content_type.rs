//! Content-type detection from file extensions.

use std::collections::HashMap;
use std::path::Path;

use lazy_static::lazy_static;

lazy_static! {
    /// Extensions where the guess from `mime_guess` is not what object
    /// stores report
    static ref OVERRIDES: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::new();
        map.insert("json", "application/json");
        map.insert("yaml", "application/yaml");
        map.insert("yml", "application/yaml");
        map.insert("md", "text/markdown");
        map.insert("ts", "application/typescript");
        map
    };
}

/// Guess a content type for `path` from its extension.
/// Returns `None` when the extension is missing or unknown.
pub fn detect(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if let Some(content_type) = OVERRIDES.get(ext.as_str()) {
        return Some((*content_type).to_string());
    }
    mime_guess::from_ext(&ext).first_raw().map(str::to_owned)
}
