// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{DEFAULT_HEARTBEAT_SECS, DEFAULT_MAX_RESULTS, DEFAULT_PROFILE_NAME};
use crate::errors::{ConfigError, ConfigResult};
use crate::utils::normalize_path;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration for the resource workbench.
///
/// Describes which resource roots make up each named profile, which
/// profile is active, and tuning knobs for search and the debug stream.
/// Every section is optional; an empty document yields a single empty
/// "Default Profile".
///
/// # Example
/// ```yaml
/// resource_profiles:
///   - name: Main
///     paths: ["/games/assets/resource/base", "/games/assets/resource/event"]
/// current_state:
///   resource_profile_index: 0
/// search:
///   max_results: 50
/// debug:
///   heartbeat_seconds: 15
///   inbox_capacity: 256
/// ```
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_profiles")]
    pub resource_profiles: Vec<ResourceProfile>,
    #[serde(default)]
    pub current_state: CurrentState,
    #[serde(default)]
    pub search: SearchOptions,
    #[serde(default)]
    pub debug: DebugOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            resource_profiles: default_profiles(),
            current_state: CurrentState::default(),
            search: SearchOptions::default(),
            debug: DebugOptions::default(),
        }
    }
}

/// A named set of resource roots loaded together.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ResourceProfile {
    pub name: String,
    #[serde(default)]
    pub paths: Vec<String>,
}

/// Selection state persisted between sessions.
#[derive(Debug, Deserialize, Default)]
pub struct CurrentState {
    #[serde(default)]
    pub device_index: usize,
    #[serde(default)]
    pub resource_profile_index: usize,
}

/// Search tuning.
#[derive(Debug, Deserialize)]
pub struct SearchOptions {
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

/// Debug stream tuning.
///
/// `inbox_capacity` of `None` gives every subscriber an unbounded inbox;
/// `Some(n)` bounds it and drops events for that subscriber once full.
#[derive(Debug, Deserialize)]
pub struct DebugOptions {
    #[serde(default = "default_heartbeat_seconds")]
    pub heartbeat_seconds: u64,
    #[serde(default)]
    pub inbox_capacity: Option<usize>,
}

impl Default for DebugOptions {
    fn default() -> Self {
        Self {
            heartbeat_seconds: DEFAULT_HEARTBEAT_SECS,
            inbox_capacity: None,
        }
    }
}

impl DebugOptions {
    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_seconds)
    }
}

fn default_profiles() -> Vec<ResourceProfile> {
    vec![ResourceProfile {
        name: DEFAULT_PROFILE_NAME.to_string(),
        paths: Vec::new(),
    }]
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

fn default_heartbeat_seconds() -> u64 {
    DEFAULT_HEARTBEAT_SECS
}

impl Config {
    /// The profile selected by `current_state`, if the index is valid.
    pub fn active_profile(&self) -> Option<&ResourceProfile> {
        self.resource_profiles
            .get(self.current_state.resource_profile_index)
    }

    /// Normalized, non-blank roots of the active profile.
    pub fn active_roots(&self) -> Vec<PathBuf> {
        self.active_profile()
            .map(|profile| {
                profile
                    .paths
                    .iter()
                    .map(|p| p.trim())
                    .filter(|p| !p.is_empty())
                    .map(|p| normalize_path(Path::new(p)))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Load a config from a YAML or TOML file, chosen by extension.
pub fn load_config<P: AsRef<Path>>(path: P) -> ConfigResult<Config> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
                path: path.to_path_buf(),
                source,
            })
        }
        Some("toml") => toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        }),
        _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Load a config and run every validation check against it.
///
/// All findings are reported together rather than stopping at the first.
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> ConfigResult<Config> {
    let cfg = load_config(path)?;

    if let Err(findings) = crate::config::validate_config(&cfg) {
        return Err(ConfigError::Invalid(findings));
    }

    Ok(cfg)
}
