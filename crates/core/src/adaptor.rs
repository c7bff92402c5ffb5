// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The adaptor contract.

use async_trait::async_trait;
use thiserror::Error;

/// Data passed to the adaptor at initialization (`--init-data`).
pub type InitData = serde_json::Map<String, serde_json::Value>;

/// Data passed to the adaptor for a single run (`--run-data`).
pub type RunData = serde_json::Map<String, serde_json::Value>;

/// Errors surfaced by adaptor lifecycle callbacks.
#[derive(Debug, Error)]
pub enum AdaptorError {
    /// The adaptor's work failed (bad input, nonzero exit, ...).
    #[error("{0}")]
    Failed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A user-supplied adaptor wrapping a third-party application.
///
/// The runtime drives implementations through a fixed lifecycle:
/// `on_start` once, `on_run` once per task, then `on_stop` and `on_cleanup`.
/// `on_cancel` may be invoked at any time, concurrently with an in-flight
/// callback, and implementations are expected to make that callback observe
/// the cancel and return promptly.
#[async_trait]
pub trait Adaptor: Send + Sync {
    /// Invoked once before any task runs. Start everything the tasks share.
    async fn on_start(&self) -> Result<(), AdaptorError> {
        Ok(())
    }

    /// Invoked once per task with the task's run data.
    async fn on_run(&self, run_data: &RunData) -> Result<(), AdaptorError>;

    /// Invoked after the last task to stop what `on_start` started.
    async fn on_stop(&self) -> Result<(), AdaptorError> {
        Ok(())
    }

    /// Invoked after stop, even when stop failed.
    async fn on_cleanup(&self) -> Result<(), AdaptorError> {
        Ok(())
    }

    /// Invoked to interrupt an in-flight lifecycle callback.
    async fn on_cancel(&self) -> Result<(), AdaptorError> {
        Ok(())
    }
}
