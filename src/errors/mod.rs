// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod resource;
mod stream;

pub use config::{ConfigError, ConfigResult, ValidationError};
pub use resource::{ResourceError, ResourceResult};
pub use stream::{StreamError, StreamResult};
