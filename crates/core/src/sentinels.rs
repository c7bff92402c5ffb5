// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stdout sentinel lines consumed by outer job runners.
//!
//! Sentinel-prefixed lines must reach stdout unformatted; everything else
//! is prefixed with its log level. The failure sentinel is also scanned for
//! in buffered log chunks to surface adaptor failures across the IPC
//! boundary.

use std::io::Write;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

pub const OPENJD_FAIL_PREFIX: &str = "openjd_fail: ";
pub const OPENJD_PROGRESS_PREFIX: &str = "openjd_progress: ";
pub const OPENJD_STATUS_PREFIX: &str = "openjd_status: ";
pub const OPENJD_ENV_PREFIX: &str = "openjd_env: ";

/// Matches any sentinel line, e.g. `openjd_status: rendering`.
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
pub static OPENJD_LOG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^openjd_\S+: ").expect("constant regex pattern is valid")
});

// Failure lines arrive as "<level>: openjd_fail: <message>" once formatted,
// or bare "openjd_fail: <message>" when emitted by a subprocess.
#[allow(clippy::expect_used)]
static FAILURE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(?:\w+: )?openjd_fail: ").expect("constant regex pattern is valid")
});

/// Whether any line of `output` carries the failure sentinel.
pub fn output_indicates_failure(output: &str) -> bool {
    FAILURE_PATTERN.is_match(output)
}

/// Notify the outer job runner of progress, a status message, or both.
pub fn update_status(progress: Option<f64>, status_message: Option<&str>) {
    if progress.is_none() && status_message.is_none() {
        warn!("Both progress and status message were None. Ignoring status update.");
        return;
    }

    let mut stdout = std::io::stdout().lock();
    if let Some(progress) = progress {
        if progress.is_finite() {
            let _ = writeln!(stdout, "{OPENJD_PROGRESS_PREFIX}{progress}");
        } else {
            warn!(
                "Attempted to set progress to something non-finite: {progress}. \
                 Ignoring progress update."
            );
        }
    }
    if let Some(message) = status_message {
        let _ = writeln!(stdout, "{OPENJD_STATUS_PREFIX}{message}");
    }
    let _ = stdout.flush();
}

#[cfg(test)]
#[path = "sentinels_tests.rs"]
mod tests;
