// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Error types for the debug event stream.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamError {
    /// The receiving end of the stream went away.
    #[error("debug stream sink closed")]
    SinkClosed,

    /// An event could not be encoded as JSON.
    #[error("failed to encode debug event: {0}")]
    Encode(#[from] serde_json::Error),

    /// Writing a frame to the underlying transport failed.
    #[error("failed to write debug frame: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for stream operations.
pub type StreamResult<T> = Result<T, StreamError>;
