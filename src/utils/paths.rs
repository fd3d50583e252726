// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path without touching the filesystem.
///
/// Trailing separators disappear, `.` segments are dropped and `name/..`
/// pairs collapse. Leading `..` segments of a relative path are kept, and
/// `..` directly under the filesystem root is discarded. An input that
/// collapses to nothing becomes `.`.
///
/// # Example
/// ```
/// use pipeline_atlas::utils::normalize_path;
/// use std::path::Path;
///
/// assert_eq!(normalize_path(Path::new("res/./main//")), Path::new("res/main"));
/// assert_eq!(normalize_path(Path::new("res/tmp/../main")), Path::new("res/main"));
/// ```
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    let mut depth = 0usize;

    for component in path.components() {
        match component {
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if depth > 0 {
                    normalized.pop();
                    depth -= 1;
                } else if !normalized.has_root() {
                    normalized.push("..");
                }
            }
            Component::Normal(segment) => {
                normalized.push(segment);
                depth += 1;
            }
        }
    }

    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}

/// Last path segment used to label a root in listings.
pub fn root_label(root: &Path) -> String {
    root.file_name()
        .map(OsStr::to_string_lossy)
        .map(|name| name.into_owned())
        .unwrap_or_else(|| root.display().to_string())
}

/// Case-insensitive `.json` extension check.
pub fn has_json_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_trailing_separators_and_dots() {
        assert_eq!(normalize_path(Path::new("a/b/")), PathBuf::from("a/b"));
        assert_eq!(normalize_path(Path::new("./a/./b")), PathBuf::from("a/b"));
        assert_eq!(normalize_path(Path::new("/srv//res/")), PathBuf::from("/srv/res"));
    }

    #[test]
    fn test_normalize_collapses_parent_segments() {
        assert_eq!(normalize_path(Path::new("a/b/../c")), PathBuf::from("a/c"));
        assert_eq!(normalize_path(Path::new("../a")), PathBuf::from("../a"));
        assert_eq!(normalize_path(Path::new("a/..")), PathBuf::from("."));
        assert_eq!(normalize_path(Path::new("/..")), PathBuf::from("/"));
    }

    #[test]
    fn test_root_label_uses_basename() {
        assert_eq!(root_label(Path::new("/data/resource/base")), "base");
        assert_eq!(root_label(Path::new("/")), "/");
    }

    #[test]
    fn test_json_extension_is_case_insensitive() {
        assert!(has_json_extension("main.json"));
        assert!(has_json_extension("MAIN.JSON"));
        assert!(!has_json_extension("main.json.bak"));
        assert!(!has_json_extension("json"));
    }
}
