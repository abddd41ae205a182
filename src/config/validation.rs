// src/config/validation.rs

use super::Mode;
use crate::constants::{MAX_JOBS, PLACEHOLDER_VALUES};
use crate::errors::ConfigError;
use crate::paths::is_safe_component;
use std::collections::BTreeSet;

/// Checks that the credential fields are present, reporting all missing ones at once.
pub(super) fn check_required(
    workspace: &str,
    username: &str,
    api_token: &str,
) -> Result<(), ConfigError> {
    let missing: Vec<String> = [
        ("workspace", workspace),
        ("username", username),
        ("api_token", api_token),
    ]
    .iter()
    .filter(|(_, value)| value.is_empty())
    .map(|(name, _)| name.to_string())
    .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::MissingFields(missing))
    }
}

/// Rejects values copied unchanged from `config.example.json`.
pub(super) fn check_placeholders(
    workspace: &str,
    username: &str,
    api_token: &str,
) -> Result<(), ConfigError> {
    for (field, value) in [
        ("workspace", workspace),
        ("username", username),
        ("api_token", api_token),
    ] {
        if PLACEHOLDER_VALUES.contains(&value) {
            return Err(ConfigError::Placeholder {
                field: field.to_string(),
            });
        }
    }
    Ok(())
}

/// Validates the project filter for the selected mode.
pub(super) fn check_project_keys(mode: Mode, keys: &BTreeSet<String>) -> Result<(), ConfigError> {
    if mode == Mode::Projects && keys.is_empty() {
        return Err(ConfigError::NoProjectKeys);
    }
    if let Some(bad) = keys.iter().find(|k| !is_safe_component(k)) {
        return Err(ConfigError::InvalidValue {
            option: "project_keys".to_string(),
            reason: format!("'{}' cannot be used as a directory name", bad),
        });
    }
    Ok(())
}

pub(super) fn check_jobs(jobs: usize) -> Result<(), ConfigError> {
    if jobs == 0 || jobs > MAX_JOBS {
        return Err(ConfigError::InvalidValue {
            option: "jobs".to_string(),
            reason: format!("must be between 1 and {}", MAX_JOBS),
        });
    }
    Ok(())
}

pub(super) fn check_api_base_url(api_base_url: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(api_base_url).map_err(|e| ConfigError::InvalidValue {
        option: "api_base_url".to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidValue {
            option: "api_base_url".to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    Ok(())
}
