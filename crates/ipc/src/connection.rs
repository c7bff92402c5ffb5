// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection rendezvous: the backend publishes its endpoint through a
//! connection file; the frontend discovers it there or via the
//! `OPENJD_ADAPTOR_SOCKET` environment variable (which takes precedence).

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::secure_file::secure_create;

/// Endpoint override consumed by the frontend's loader.
pub const OPENJD_ADAPTOR_SOCKET_ENV: &str = "OPENJD_ADAPTOR_SOCKET";

/// Contents of the connection file.
///
/// The endpoint is an absolute socket path (POSIX) or a pipe name of the
/// form `\\.\pipe\<name>_<pid>` (Windows).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    pub endpoint: String,
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Failed to open connection file '{path}': {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to decode connection file '{path}': {source}")]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Error writing to connection file '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Timed out after {timeout:?} waiting for file at {path}")]
    WaitTimeout { timeout: Duration, path: PathBuf },
}

/// Write the connection file, owner-only.
pub fn write_connection_file(
    settings: &ConnectionSettings,
    path: &Path,
) -> Result<(), ConnectionError> {
    let file = secure_create(path).map_err(|source| ConnectionError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::to_writer(file, settings).map_err(|source| ConnectionError::Write {
        path: path.to_path_buf(),
        source: source.into(),
    })
}

/// Load connection settings, preferring the environment override.
pub fn load_connection_settings(
    connection_file: &Path,
) -> Result<ConnectionSettings, ConnectionError> {
    if let Some(settings) = load_from_env() {
        return Ok(settings);
    }
    load_from_file(connection_file)
}

/// Load connection settings from `OPENJD_ADAPTOR_SOCKET`, if set.
pub fn load_from_env() -> Option<ConnectionSettings> {
    std::env::var(OPENJD_ADAPTOR_SOCKET_ENV)
        .ok()
        .filter(|endpoint| !endpoint.is_empty())
        .map(|endpoint| ConnectionSettings { endpoint })
}

/// Load connection settings from the connection file.
pub fn load_from_file(path: &Path) -> Result<ConnectionSettings, ConnectionError> {
    let contents = std::fs::read_to_string(path).map_err(|source| {
        let err = ConnectionError::Open {
            path: path.to_path_buf(),
            source,
        };
        error!("{err}");
        err
    })?;

    serde_json::from_str(&contents).map_err(|source| {
        let err = ConnectionError::Decode {
            path: path.to_path_buf(),
            source,
        };
        error!("{err}");
        err
    })
}

/// Wait for a file to exist *and be openable*, polling at `poll` intervals.
///
/// The backend creates the file before its contents are durable, so a bare
/// existence check is not sufficient.
pub async fn wait_for_file(
    path: &Path,
    timeout: Duration,
    poll: Duration,
) -> Result<(), ConnectionError> {
    let start = Instant::now();

    loop {
        if path.exists() && std::fs::File::open(path).is_ok() {
            return Ok(());
        }
        if start.elapsed() >= timeout {
            return Err(ConnectionError::WaitTimeout {
                timeout,
                path: path.to_path_buf(),
            });
        }
        tokio::time::sleep(poll).await;
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
