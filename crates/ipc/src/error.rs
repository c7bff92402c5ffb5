// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC error taxonomy.

use std::time::Duration;

use thiserror::Error;

/// Errors from the transport and framing layers.
#[derive(Debug, Error)]
pub enum IpcError {
    /// The endpoint exists but is not accepting connections yet.
    #[error("Connection endpoint is not ready")]
    ConnectionNotReady,

    #[error("Timed out connecting to '{endpoint}' after {timeout:?}: {source}")]
    ConnectTimeout {
        endpoint: String,
        timeout: Duration,
        source: std::io::Error,
    },

    #[error("Read timed out after {0:?}")]
    ReadTimeout(Duration),

    /// Broken pipe, not connected, or closed handle.
    #[error("Peer disconnected")]
    PipeDisconnected,

    #[error("Malformed message: {0}")]
    Malformed(String),

    #[error("Message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IpcError {
    /// Collapse disconnect-shaped IO errors into [`IpcError::PipeDisconnected`].
    pub fn from_io(e: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match e.kind() {
            ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::UnexpectedEof => IpcError::PipeDisconnected,
            _ => IpcError::Io(e),
        }
    }
}
