// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI crate.

use std::time::Duration;

// Timeout configuration (env vars in milliseconds)
fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Per-request timeout for IPC requests to the backend.
pub fn request_timeout() -> Duration {
    parse_duration_ms("OPENJD_TIMEOUT_IPC_MS").unwrap_or(Duration::from_secs(5))
}

/// Interval between heartbeats while waiting for a lifecycle state.
pub fn heartbeat_interval() -> Duration {
    parse_duration_ms("OPENJD_HEARTBEAT_MS").unwrap_or(Duration::from_secs(1))
}

/// Timeout for the backend to write the connection file. Windows pipe
/// readiness is slower, hence the larger default there.
pub fn connect_wait_timeout() -> Duration {
    let default = if cfg!(windows) {
        Duration::from_secs(10)
    } else {
        Duration::from_secs(5)
    };
    parse_duration_ms("OPENJD_CONNECT_WAIT_MS").unwrap_or(default)
}

/// Polling interval while waiting for the connection file.
pub fn poll_interval() -> Duration {
    parse_duration_ms("OPENJD_CONNECT_POLL_MS").unwrap_or(Duration::from_millis(50))
}
