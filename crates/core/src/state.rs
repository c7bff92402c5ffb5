// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adaptor lifecycle states and worker status.

use serde::{Deserialize, Serialize};

/// Lifecycle states an adaptor moves through.
///
/// Normal flow is `NotStarted → Start → Run (repeatable) → Stop → Cleanup`.
/// `Canceled` is reachable from any state and is terminal for scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptorState {
    NotStarted,
    Start,
    Run,
    Stop,
    Cleanup,
    Canceled,
}

impl AdaptorState {
    /// Whether in-flight work in this state is interruptible by a cancel.
    ///
    /// Stop and cleanup always run to completion; only startup and task
    /// execution are cancelable.
    pub fn is_cancelable(self) -> bool {
        matches!(self, AdaptorState::Start | AdaptorState::Run)
    }
}

impl std::fmt::Display for AdaptorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AdaptorState::NotStarted => "not_started",
            AdaptorState::Start => "start",
            AdaptorState::Run => "run",
            AdaptorState::Stop => "stop",
            AdaptorState::Cleanup => "cleanup",
            AdaptorState::Canceled => "canceled",
        };
        f.write_str(name)
    }
}

/// Whether the backend's worker slot currently holds a running task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdaptorStatus {
    Idle,
    Working,
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
