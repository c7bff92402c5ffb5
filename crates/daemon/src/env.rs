// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::time::Duration;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Timeout for reading one request from a connection. Enforced by dropping
/// the connection handle, so a stuck peer cannot hang the server.
pub fn read_timeout() -> Duration {
    parse_duration_ms("OPENJD_READ_TIMEOUT_MS").unwrap_or(Duration::from_secs(5))
}

/// Grace period for outstanding connection handlers during shutdown.
pub fn shutdown_grace() -> Duration {
    parse_duration_ms("OPENJD_SHUTDOWN_GRACE_MS").unwrap_or(Duration::from_secs(2))
}
