// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Findings produced while validating a loaded configuration
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// No resource profile is configured at all
    NoResourceProfiles,
    /// The selected profile index does not point at a configured profile
    ProfileIndexOutOfRange {
        /// The index stored in `current_state`
        index: usize,
        /// How many profiles exist
        available: usize,
    },
    /// A profile lists a blank root path
    EmptyRootPath {
        /// Name of the offending profile
        profile: String,
    },
    /// `search.max_results` was set to zero, which would hide every hit
    ZeroSearchLimit,
    /// `debug.heartbeat_seconds` was set to zero
    ZeroHeartbeat,
    /// `debug.inbox_capacity` was set to zero
    ZeroInboxCapacity,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::NoResourceProfiles => {
                write!(f, "No resource profiles are configured")
            }
            ValidationError::ProfileIndexOutOfRange { index, available } => {
                write!(
                    f,
                    "Resource profile index {} is out of range ({} profiles configured)",
                    index, available
                )
            }
            ValidationError::EmptyRootPath { profile } => {
                write!(f, "Resource profile '{}' contains an empty root path", profile)
            }
            ValidationError::ZeroSearchLimit => {
                write!(f, "search.max_results must be greater than zero")
            }
            ValidationError::ZeroHeartbeat => {
                write!(f, "debug.heartbeat_seconds must be greater than zero")
            }
            ValidationError::ZeroInboxCapacity => {
                write!(f, "debug.inbox_capacity must be greater than zero when set")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors raised while loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid TOML in {}: {source}", .path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unsupported config format for {} (expected .yaml, .yml or .toml)", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("Configuration validation failed:\n{}", join_findings(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_findings(findings: &[ValidationError]) -> String {
    findings
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

pub type ConfigResult<T> = Result<T, ConfigError>;
