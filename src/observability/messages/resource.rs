// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for resource index and asset events.
//!
//! This module contains message types for logging events related to:
//! * Index construction and reloads
//! * Pipeline file loads, saves and creation
//! * Search pattern failures
//! * Node renames and template image changes

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Duration;
use tracing::Span;

/// Resource index finished an eager load of all roots.
///
/// # Log Level
/// `info!` - Important operational event
pub struct IndexLoaded {
    pub root_count: usize,
    pub file_count: usize,
    pub node_count: usize,
    pub duration: Duration,
}

impl Display for IndexLoaded {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Resource index loaded: {} roots, {} files, {} nodes in {:?}",
            self.root_count, self.file_count, self.node_count, self.duration
        )
    }
}

impl StructuredLog for IndexLoaded {
    fn log(&self) {
        tracing::info!(
            root_count = self.root_count,
            file_count = self.file_count,
            node_count = self.node_count,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "index_loaded",
            span_name = name,
            root_count = self.root_count,
            file_count = self.file_count,
            node_count = self.node_count,
        )
    }
}

/// A root has no `pipeline/` directory and contributes no files.
///
/// # Log Level
/// `debug!` - Expected for image-only or freshly created roots
pub struct PipelineDirectoryMissing<'a> {
    pub root: &'a Path,
}

impl Display for PipelineDirectoryMissing<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "No pipeline directory under '{}'", self.root.display())
    }
}

impl StructuredLog for PipelineDirectoryMissing<'_> {
    fn log(&self) {
        tracing::debug!(root = %self.root.display(), "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "pipeline_directory_missing",
            span_name = name,
            root = %self.root.display(),
        )
    }
}

/// One pipeline file could not be loaded; indexing continues without it.
///
/// # Log Level
/// `warn!` - The file is skipped, not fatal
pub struct PipelineFileLoadFailed<'a> {
    pub path: &'a Path,
    pub error: &'a dyn std::error::Error,
}

impl Display for PipelineFileLoadFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Skipping pipeline file '{}': {}",
            self.path.display(),
            self.error
        )
    }
}

impl StructuredLog for PipelineFileLoadFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            path = %self.path.display(),
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "pipeline_file_load_failed",
            span_name = name,
            path = %self.path.display(),
            error = %self.error,
        )
    }
}

/// A pipeline file was written to disk.
///
/// # Log Level
/// `info!` - Important operational event
pub struct PipelineFileSaved<'a> {
    pub path: &'a Path,
    pub node_count: usize,
}

impl Display for PipelineFileSaved<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Saved {} nodes to '{}'",
            self.node_count,
            self.path.display()
        )
    }
}

impl StructuredLog for PipelineFileSaved<'_> {
    fn log(&self) {
        tracing::info!(
            path = %self.path.display(),
            node_count = self.node_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "pipeline_file_saved",
            span_name = name,
            path = %self.path.display(),
            node_count = self.node_count,
        )
    }
}

/// An empty pipeline file was created.
///
/// # Log Level
/// `info!` - Important operational event
pub struct PipelineFileCreated<'a> {
    pub path: &'a Path,
}

impl Display for PipelineFileCreated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Created pipeline file '{}'", self.path.display())
    }
}

impl StructuredLog for PipelineFileCreated<'_> {
    fn log(&self) {
        tracing::info!(path = %self.path.display(), "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "pipeline_file_created",
            span_name = name,
            path = %self.path.display(),
        )
    }
}

/// A regex search query failed to compile; the search returns nothing.
///
/// # Log Level
/// `warn!` - Malformed caller input
pub struct InvalidSearchPattern<'a> {
    pub pattern: &'a str,
    pub error: &'a regex::Error,
}

impl Display for InvalidSearchPattern<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Invalid search pattern '{}': {}", self.pattern, self.error)
    }
}

impl StructuredLog for InvalidSearchPattern<'_> {
    fn log(&self) {
        tracing::warn!(pattern = self.pattern, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "invalid_search_pattern",
            span_name = name,
            pattern = self.pattern,
        )
    }
}

/// A node id was renamed.
///
/// # Log Level
/// `info!` - Important operational event
pub struct NodeRenamed<'a> {
    pub filename: &'a str,
    pub old_id: &'a str,
    pub new_id: &'a str,
    pub references_updated: usize,
}

impl Display for NodeRenamed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Renamed node '{}' to '{}' in '{}' ({} references updated)",
            self.old_id, self.new_id, self.filename, self.references_updated
        )
    }
}

impl StructuredLog for NodeRenamed<'_> {
    fn log(&self) {
        tracing::info!(
            filename = self.filename,
            old_id = self.old_id,
            new_id = self.new_id,
            references_updated = self.references_updated,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "node_renamed",
            span_name = name,
            filename = self.filename,
            old_id = self.old_id,
            new_id = self.new_id,
        )
    }
}

/// A template image was written.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ImageSaved<'a> {
    pub path: &'a Path,
    pub bytes: usize,
}

impl Display for ImageSaved<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Saved image '{}' ({} bytes)", self.path.display(), self.bytes)
    }
}

impl StructuredLog for ImageSaved<'_> {
    fn log(&self) {
        tracing::info!(path = %self.path.display(), bytes = self.bytes, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "image_saved",
            span_name = name,
            path = %self.path.display(),
            bytes = self.bytes,
        )
    }
}

/// A template image was removed, possibly along with its emptied folder.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ImageDeleted<'a> {
    pub path: &'a Path,
    pub removed_parent: bool,
}

impl Display for ImageDeleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.removed_parent {
            write!(
                f,
                "Deleted image '{}' and its empty parent directory",
                self.path.display()
            )
        } else {
            write!(f, "Deleted image '{}'", self.path.display())
        }
    }
}

impl StructuredLog for ImageDeleted<'_> {
    fn log(&self) {
        tracing::info!(
            path = %self.path.display(),
            removed_parent = self.removed_parent,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "image_deleted",
            span_name = name,
            path = %self.path.display(),
            removed_parent = self.removed_parent,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_saved_message() {
        let msg = PipelineFileSaved {
            path: Path::new("/res/pipeline/main.json"),
            node_count: 3,
        };
        assert_eq!(msg.to_string(), "Saved 3 nodes to '/res/pipeline/main.json'");
    }

    #[test]
    fn test_load_failed_message_includes_reason() {
        let error = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let msg = PipelineFileLoadFailed {
            path: Path::new("bad.json"),
            error: &error,
        };
        assert_eq!(msg.to_string(), "Skipping pipeline file 'bad.json': boom");
    }

    #[test]
    fn test_image_deleted_mentions_parent_cleanup() {
        let plain = ImageDeleted {
            path: Path::new("image/a.png"),
            removed_parent: false,
        };
        let cleaned = ImageDeleted {
            path: Path::new("image/dir/a.png"),
            removed_parent: true,
        };
        assert!(!plain.to_string().contains("parent"));
        assert!(cleaned.to_string().contains("empty parent directory"));
    }
}
