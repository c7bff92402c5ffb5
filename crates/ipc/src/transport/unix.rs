// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! UNIX-domain stream socket transport.
//!
//! The listener rejects peers running as a different OS user: the server
//! reads the kernel-supplied peer credentials (`SO_PEERCRED` on Linux,
//! `LOCAL_PEERCRED` on macOS, both surfaced through `peer_cred()`) and
//! compares the peer uid against its own.

use std::path::Path;
use std::time::{Duration, Instant};

use tokio::net::{UnixListener, UnixStream};

use crate::error::IpcError;

const CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Bind a listener at `endpoint`, removing a stale socket file first.
pub fn bind(endpoint: &Path) -> Result<UnixListener, IpcError> {
    if endpoint.exists() {
        std::fs::remove_file(endpoint)?;
    }
    Ok(UnixListener::bind(endpoint)?)
}

/// Connect to `endpoint`, retrying while the socket is not yet accepting
/// connections, until `timeout` elapses.
pub async fn connect(endpoint: &Path, timeout: Duration) -> Result<UnixStream, IpcError> {
    let start = Instant::now();

    loop {
        match UnixStream::connect(endpoint).await {
            Ok(stream) => return Ok(stream),
            Err(e) if is_not_ready(&e) => {
                if start.elapsed() >= timeout {
                    return Err(IpcError::ConnectTimeout {
                        endpoint: endpoint.display().to_string(),
                        timeout,
                        source: e,
                    });
                }
                tokio::time::sleep(CONNECT_RETRY_INTERVAL).await;
            }
            Err(e) => return Err(IpcError::from_io(e)),
        }
    }
}

/// Whether the connecting peer runs as the same OS user as this process.
pub fn peer_is_same_user(stream: &UnixStream) -> Result<bool, IpcError> {
    let cred = stream.peer_cred()?;
    Ok(cred.uid() == nix::unistd::getuid().as_raw())
}

// The socket file may not exist yet, or exist without an accepting listener.
fn is_not_ready(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::NotFound | std::io::ErrorKind::ConnectionRefused
    )
}

#[cfg(test)]
#[path = "unix_tests.rs"]
mod tests;
