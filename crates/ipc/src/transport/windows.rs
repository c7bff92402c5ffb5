// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named pipe transport.
//!
//! Pipes are duplex byte streams carrying the length-prefixed JSON
//! envelopes from [`crate::envelope`]. Remote (network) clients are
//! rejected at creation time; the first-instance flag prevents another
//! process from squatting on the pipe name before the server owns it.

use std::time::{Duration, Instant};

use tokio::net::windows::named_pipe::{ClientOptions, NamedPipeClient, NamedPipeServer, ServerOptions};

use crate::error::IpcError;

/// Per-instance pipe buffer size.
pub const NAMED_PIPE_BUFFER_SIZE: u32 = 8192;

const CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

// winerror.h
const ERROR_PIPE_BUSY: i32 = 231;

/// The pipe name for this process's backend server.
pub fn process_pipe_name() -> String {
    format!(r"\\.\pipe\AdaptorNamedPipe_{}", std::process::id())
}

/// Create a pipe instance for `name`.
///
/// `first` must be true for the instance that claims the name. At least two
/// instances are always permitted so a shutdown rendezvous connection can
/// be made while a request is in flight.
pub fn create_instance(name: &str, first: bool) -> Result<NamedPipeServer, IpcError> {
    ServerOptions::new()
        .first_pipe_instance(first)
        .reject_remote_clients(true)
        .in_buffer_size(NAMED_PIPE_BUFFER_SIZE)
        .out_buffer_size(NAMED_PIPE_BUFFER_SIZE)
        .create(name)
        .map_err(IpcError::from_io)
}

/// Connect to the server pipe, retrying while the pipe does not exist yet
/// or all instances are busy, until `timeout` elapses.
pub async fn connect(name: &str, timeout: Duration) -> Result<NamedPipeClient, IpcError> {
    let start = Instant::now();

    loop {
        match ClientOptions::new().open(name) {
            Ok(client) => return Ok(client),
            Err(e) if is_not_ready(&e) => {
                if start.elapsed() >= timeout {
                    return Err(IpcError::ConnectTimeout {
                        endpoint: name.to_string(),
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

fn is_not_ready(e: &std::io::Error) -> bool {
    e.kind() == std::io::ErrorKind::NotFound || e.raw_os_error() == Some(ERROR_PIPE_BUSY)
}
