// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Serialize;

/// Anything the debug broker can fan out and the stream can frame.
pub trait BrokerEvent: Clone + Serialize + Send + Sync + 'static {
    /// The greeting a stream sends before any published event.
    fn handshake() -> Self;

    /// Empty events are dropped by `publish` without reaching any inbox.
    fn is_empty(&self) -> bool {
        false
    }
}
