// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire model for the heartbeat exchange.

use serde::{Deserialize, Serialize};

use adaptor_core::{AdaptorState, AdaptorStatus};

/// A chunk of buffered log output, identified and ACKed as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferedOutput {
    pub id: String,
    pub output: String,
}

impl BufferedOutput {
    /// Sentinel id meaning "no data buffered yet".
    pub const EMPTY_ID: &'static str = "EMPTY";

    /// The chunk returned when no log buffer is installed.
    pub fn empty() -> Self {
        Self {
            id: Self::EMPTY_ID.to_string(),
            output: String::new(),
        }
    }
}

/// Response to `GET /heartbeat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatResponse {
    pub state: AdaptorState,
    pub status: AdaptorStatus,
    pub output: BufferedOutput,
    #[serde(default)]
    pub failed: bool,
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
