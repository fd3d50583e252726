// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Configuration validation.
//!
//! Checks run independently and their findings are accumulated, so a user
//! fixing a config sees every problem at once instead of one per attempt.
//!
//! 1. **Profile checks**: at least one profile, the selected index points
//!    at one of them, and no profile lists a blank root
//! 2. **Tuning checks**: search and debug knobs are non-zero

use crate::config::Config;
use crate::errors::ValidationError;

/// Validate a loaded configuration.
///
/// # Returns
///
/// * `Ok(())` - Configuration is usable as-is
/// * `Err(Vec<ValidationError>)` - Every finding, in check order
pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(profile_errors) = validate_profiles(config) {
        errors.extend(profile_errors);
    }

    if let Err(tuning_errors) = validate_tuning(config) {
        errors.extend(tuning_errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_profiles(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.resource_profiles.is_empty() {
        errors.push(ValidationError::NoResourceProfiles);
        return Err(errors);
    }

    let index = config.current_state.resource_profile_index;
    if index >= config.resource_profiles.len() {
        errors.push(ValidationError::ProfileIndexOutOfRange {
            index,
            available: config.resource_profiles.len(),
        });
    }

    for profile in &config.resource_profiles {
        if profile.paths.iter().any(|p| p.trim().is_empty()) {
            errors.push(ValidationError::EmptyRootPath {
                profile: profile.name.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_tuning(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.search.max_results == 0 {
        errors.push(ValidationError::ZeroSearchLimit);
    }
    if config.debug.heartbeat_seconds == 0 {
        errors.push(ValidationError::ZeroHeartbeat);
    }
    if config.debug.inbox_capacity == Some(0) {
        errors.push(ValidationError::ZeroInboxCapacity);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
