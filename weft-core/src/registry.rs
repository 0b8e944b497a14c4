//! Filesystem-backed partial registries.
//!
//! The compile entry points only consume a `name -> source` mapping; this
//! module builds one from a directory tree for callers that keep their
//! partials on disk.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::error::TemplateError;

/// Load every regular file under `root` as a partial.
///
/// A partial's name is its root-relative path without the extension, with
/// path separators turned into dots: `header/nav.wft` registers as
/// `header.nav`. When two files differ only by extension the later one
/// wins.
pub fn load_partials_dir(root: impl AsRef<Path>) -> Result<HashMap<String, String>, TemplateError> {
    let root = root.as_ref();
    let mut partials = HashMap::new();
    for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let source = fs::read_to_string(path)?;
        let relative = path.strip_prefix(root).unwrap_or(path);
        let name = relative
            .with_extension("")
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(".");
        partials.insert(name, source);
    }
    Ok(partials)
}
