// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime configuration collaborator.
//!
//! Merges JSON configuration from fixed locations:
//! built-in defaults ← system ← user ← `RUNTIME_CONFIG_PATH`.
//! Its only consumer-visible output today is the log level.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const SYSTEM_CONFIG_PATH: &str = "/etc/openjd/worker/adaptors/runtime/configuration.json";
const USER_CONFIG_REL_PATH: &str = ".openjd/worker/adaptors/runtime/configuration.json";

/// Additional config file for the runtime.
pub const RUNTIME_CONFIG_PATH_ENV: &str = "RUNTIME_CONFIG_PATH";

const LOG_LEVELS: [&str; 5] = ["ERROR", "WARN", "INFO", "DEBUG", "TRACE"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Nonvalid configuration file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Unknown log level '{0}' (expected one of ERROR, WARN, INFO, DEBUG, TRACE)")]
    UnknownLogLevel(String),
}

/// One configuration layer; all fields optional so layers overlay cleanly.
#[derive(Debug, Clone, Default, Deserialize)]
struct PartialConfig {
    log_level: Option<String>,
}

/// Resolved runtime configuration.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Log level name: ERROR, WARN, INFO, DEBUG, or TRACE.
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_level: "INFO".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Load the runtime configuration from its fixed locations.
    ///
    /// Missing files are skipped; unreadable or nonvalid JSON is fatal.
    pub fn load() -> Result<Self, ConfigError> {
        let mut resolved = Self::default();

        let mut paths: Vec<PathBuf> = vec![PathBuf::from(SYSTEM_CONFIG_PATH)];
        if let Ok(home) = std::env::var("HOME") {
            paths.push(Path::new(&home).join(USER_CONFIG_REL_PATH));
        }
        if let Ok(extra) = std::env::var(RUNTIME_CONFIG_PATH_ENV) {
            if !extra.is_empty() {
                paths.push(PathBuf::from(extra));
            }
        }

        for path in paths {
            if let Some(layer) = load_layer(&path)? {
                resolved.overlay(layer)?;
            }
        }

        Ok(resolved)
    }

    /// Load the log level for a named adaptor from `<UPPER>_CONFIG_PATH`,
    /// falling back to this runtime configuration's level.
    pub fn adaptor_log_level(&self, adaptor_name: &str) -> Result<String, ConfigError> {
        let env_name = format!("{}_CONFIG_PATH", adaptor_name.to_uppercase());
        if let Ok(path) = std::env::var(&env_name) {
            if let Some(layer) = load_layer(Path::new(&path))? {
                if let Some(level) = layer.log_level {
                    return Ok(validate_log_level(&level)?.to_string());
                }
            }
        }
        Ok(self.log_level.clone())
    }

    fn overlay(&mut self, layer: PartialConfig) -> Result<(), ConfigError> {
        if let Some(level) = layer.log_level {
            self.log_level = validate_log_level(&level)?.to_string();
        }
        Ok(())
    }
}

fn load_layer(path: &Path) -> Result<Option<PartialConfig>, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let layer = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(layer))
}

fn validate_log_level(level: &str) -> Result<&'static str, ConfigError> {
    let upper = level.to_uppercase();
    LOG_LEVELS
        .into_iter()
        .find(|&known| known == upper)
        .ok_or_else(|| ConfigError::UnknownLogLevel(level.to_string()))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
