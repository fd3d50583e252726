// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Error types for resource root operations.
//!
//! Conditions that callers are expected to branch on as a normal outcome
//! (a file that simply is not there, a create that lost to an existing
//! file) are reported through `Option`/`bool` return values instead. The
//! variants below are the failures that must reach the caller explicitly.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResourceError {
    /// The root was never registered with the index.
    #[error("resource root '{}' is not part of this index", .0.display())]
    UnknownRoot(PathBuf),

    /// A pipeline file required by the operation does not exist.
    #[error("pipeline file '{filename}' not found under '{}'", .root.display())]
    FileNotFound { root: PathBuf, filename: String },

    /// `create` hit a file that already exists.
    #[error("pipeline file '{filename}' already exists under '{}'", .root.display())]
    FileExists { root: PathBuf, filename: String },

    /// A node id is absent from its file.
    #[error("node '{node_id}' not found in '{filename}'")]
    NodeNotFound { filename: String, node_id: String },

    /// Renaming would overwrite another node of the same file.
    #[error("node id '{node_id}' already exists in '{filename}'")]
    NodeIdConflict { filename: String, node_id: String },

    /// A node id argument was blank.
    #[error("node id must not be empty")]
    EmptyNodeId,

    /// The file is not valid JSON.
    #[error("failed to parse '{}': {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An image payload could not be decoded.
    #[error("invalid image payload for '{path}': {source}")]
    InvalidPayload {
        path: String,
        #[source]
        source: base64::DecodeError,
    },

    /// Filesystem failure, tagged with the operation that hit it.
    #[error("{operation} failed for '{}': {source}", .path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ResourceError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ResourceError::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for resource operations.
pub type ResourceResult<T> = Result<T, ResourceError>;
