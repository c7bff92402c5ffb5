// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Managed subprocess with line-logged output.

use std::path::PathBuf;
use std::process::Stdio;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Insufficient args")]
    NoArgs,

    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("Command exited with {0}")]
    NonzeroExit(std::process::ExitStatus),

    #[error("Command was canceled")]
    Canceled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A subprocess whose stdout/stderr lines are logged as they arrive.
///
/// Stdout lines log at info and stderr lines at warn; sentinel-prefixed
/// lines pass through the conditional formatter untouched either way, so a
/// wrapped application can emit `openjd_*` updates itself.
#[derive(Debug)]
pub struct LoggingSubprocess {
    args: Vec<String>,
    startup_directory: Option<PathBuf>,
}

impl LoggingSubprocess {
    pub fn new(args: Vec<String>, startup_directory: Option<PathBuf>) -> Result<Self, ProcessError> {
        if args.is_empty() {
            return Err(ProcessError::NoArgs);
        }
        Ok(Self {
            args,
            startup_directory,
        })
    }

    /// Run the subprocess to completion, logging output line by line.
    ///
    /// When `cancel` fires, the child is killed and the run resolves to
    /// [`ProcessError::Canceled`]. A nonzero exit is an error.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<(), ProcessError> {
        info!("Running command: {}", self.args.join(" "));

        let mut command = Command::new(&self.args[0]);
        command
            .args(&self.args[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.startup_directory {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
            command: self.args[0].clone(),
            source,
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_logger = tokio::spawn(log_lines(stdout, false));
        let stderr_logger = tokio::spawn(log_lines(stderr, true));

        let status = tokio::select! {
            status = child.wait() => status?,
            _ = cancel.cancelled() => {
                if let Err(e) = child.start_kill() {
                    warn!("Failed to kill subprocess: {e}");
                }
                let _ = child.wait().await;
                let _ = stdout_logger.await;
                let _ = stderr_logger.await;
                return Err(ProcessError::Canceled);
            }
        };

        // Drain loggers so trailing output is not lost
        let _ = stdout_logger.await;
        let _ = stderr_logger.await;

        if !status.success() {
            return Err(ProcessError::NonzeroExit(status));
        }
        Ok(())
    }
}

async fn log_lines<R>(stream: Option<R>, is_stderr: bool)
where
    R: AsyncRead + Unpin,
{
    let Some(stream) = stream else {
        return;
    };

    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if is_stderr {
                    warn!("{line}");
                } else {
                    info!("{line}");
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read subprocess output: {e}");
                break;
            }
        }
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
