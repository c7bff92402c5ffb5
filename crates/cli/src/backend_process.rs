// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend process management.
//!
//! The frontend reenters its own executable with the hidden
//! `daemon _serve` command to host the backend server.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use crate::data::DataMap;
use crate::frontend::ClientError;

/// Spawn the backend child process, detached from this one's lifetime.
///
/// The child gets a null stdin and its stdout/stderr redirected to a
/// bootstrap log file, so startup failures are inspectable even though the
/// daemon's regular output only flows through the log buffer.
pub fn spawn_backend(
    reentry_exe: Option<PathBuf>,
    init_data: &DataMap,
    path_mapping_data: &DataMap,
    connection_file: &Path,
) -> Result<Child, ClientError> {
    let exe = match reentry_exe {
        Some(exe) => exe,
        None => std::env::current_exe().map_err(ClientError::SpawnFailed)?,
    };

    let bootstrap = bootstrap_log_path();
    let stdout_log = std::fs::File::create(&bootstrap).map_err(ClientError::SpawnFailed)?;
    let stderr_log = stdout_log.try_clone().map_err(ClientError::SpawnFailed)?;

    let mut command = Command::new(exe);
    command
        .arg("daemon")
        .arg("_serve")
        .arg("--init-data")
        .arg(serde_json::to_string(init_data)?)
        .arg("--path-mapping-rules")
        .arg(serde_json::to_string(path_mapping_data)?)
        .arg("--connection-file")
        .arg(connection_file)
        .stdin(Stdio::null())
        .stdout(stdout_log)
        .stderr(stderr_log);

    detach(&mut command);

    command.spawn().map_err(ClientError::SpawnFailed)
}

// A fresh process group keeps terminal-delivered signals (Ctrl-C) from
// reaching the backend; cancellation goes through /cancel instead.
#[cfg(unix)]
fn detach(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn detach(_command: &mut Command) {}

fn bootstrap_log_path() -> PathBuf {
    std::env::temp_dir().join(format!(
        "adaptor-runtime-bootstrap-{}.log",
        std::process::id()
    ))
}
