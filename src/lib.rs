// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod config;        // profiles, roots and tuning
pub mod debug;         // debug event broker and stream
pub mod errors;        // error handling
pub mod observability;
pub mod resource;      // pipeline files, index, search, graph, assets
pub mod traits;        // broker event and frame sink seams
pub mod utils;

pub use crate::config::{load_and_validate_config, Config};
pub use crate::debug::{DebugEvent, EventBroker};
pub use crate::resource::{ResourceIndex, SearchQuery};
