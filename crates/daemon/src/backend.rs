// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend runner: serve until shutdown, publishing the endpoint through
//! the connection file.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use adaptor_core::AdaptorRunner;
use adaptor_ipc::connection::{self, ConnectionError, ConnectionSettings};
use adaptor_ipc::SocketPathError;

use crate::handlers::ServeCtx;
use crate::log_buffer::LogBuffer;
use crate::server::{BackgroundServer, ServerError};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    SocketPath(#[from] SocketPathError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// Runs the backend logic for daemon mode.
///
/// Brings up the background server, writes the connection file, and blocks
/// until the shutdown event fires, then removes the rendezvous artifacts.
pub struct BackendRunner {
    runner: AdaptorRunner,
    connection_file: PathBuf,
    buffer: Option<Arc<dyn LogBuffer>>,
}

impl BackendRunner {
    pub fn new(
        runner: AdaptorRunner,
        connection_file: PathBuf,
        buffer: Option<Arc<dyn LogBuffer>>,
    ) -> Self {
        Self {
            runner,
            connection_file,
            buffer,
        }
    }

    pub async fn run(self) -> Result<(), BackendError> {
        info!("Running in background daemon mode.");

        let (server, endpoint) = bind_server(self.runner.clone(), self.buffer.clone())?;
        debug!("Listening on {endpoint}");

        let shutdown = server.shutdown_handle();
        spawn_signal_handler(server.serve_ctx());
        let serve_task = tokio::spawn(server.serve());

        let settings = ConnectionSettings {
            endpoint: endpoint.clone(),
        };
        if let Err(e) = connection::write_connection_file(&settings, &self.connection_file) {
            error!("Error writing to connection file: {e}");
            info!("Shutting down server...");
            shutdown.notify_one();
            let _ = serve_task.await;
            cleanup_rendezvous(&self.connection_file, &endpoint);
            return Err(e.into());
        }

        // Serve returns once the shutdown event is set
        let _ = serve_task.await;

        cleanup_rendezvous(&self.connection_file, &endpoint);
        info!("Background server has been shut down.");
        Ok(())
    }
}

#[cfg(unix)]
fn bind_server(
    runner: AdaptorRunner,
    buffer: Option<Arc<dyn LogBuffer>>,
) -> Result<(BackgroundServer, String), BackendError> {
    let endpoint = adaptor_ipc::sockets::process_socket_path("runtime", None, true)?;
    let endpoint_str = endpoint.display().to_string();
    let server = BackgroundServer::bind(endpoint, runner, buffer)?;
    Ok((server, endpoint_str))
}

// Retries with randomized suffixes in case another process already holds
// the pid-derived pipe name.
#[cfg(windows)]
fn bind_server(
    runner: AdaptorRunner,
    buffer: Option<Arc<dyn LogBuffer>>,
) -> Result<(BackgroundServer, String), BackendError> {
    const MAX_ATTEMPTS: u32 = 5;

    let base_name = adaptor_ipc::transport::windows::process_pipe_name();
    let mut pipe_name = base_name.clone();
    let mut attempt = 0;
    loop {
        match BackgroundServer::bind(pipe_name.clone(), runner.clone(), buffer.clone()) {
            Ok(server) => return Ok((server, pipe_name)),
            Err(e) => {
                attempt += 1;
                if attempt >= MAX_ATTEMPTS {
                    return Err(e.into());
                }
                pipe_name = format!(
                    "{base_name}_{attempt}_{}",
                    uuid::Uuid::new_v4().simple()
                );
            }
        }
    }
}

/// An interruption signal kicks off the cancel workflow, the same
/// conditional path `/cancel` requests take.
#[cfg(unix)]
fn spawn_signal_handler(ctx: Arc<ServeCtx>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let (Ok(mut sigint), Ok(mut sigterm)) =
            (signal(SignalKind::interrupt()), signal(SignalKind::terminate()))
        else {
            warn!("Failed to install signal handlers");
            return;
        };

        loop {
            tokio::select! {
                _ = sigint.recv() => {}
                _ = sigterm.recv() => {}
            }
            info!("Interruption signal received.");
            let _ = crate::handlers::cancel(&ctx).await;
        }
    });
}

#[cfg(windows)]
fn spawn_signal_handler(ctx: Arc<ServeCtx>) {
    tokio::spawn(async move {
        let Ok(mut ctrl_break) = tokio::signal::windows::ctrl_break() else {
            warn!("Failed to install signal handlers");
            return;
        };

        while ctrl_break.recv().await.is_some() {
            info!("Interruption signal received.");
            let _ = crate::handlers::cancel(&ctx).await;
        }
    });
}

fn cleanup_rendezvous(connection_file: &std::path::Path, endpoint: &str) {
    for path in rendezvous_artifacts(connection_file, endpoint) {
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to delete {}: {e}", path.display()),
        }
    }
}

// Named pipes have no filesystem artifact; the name disappears with the
// last closed handle.
#[cfg(unix)]
fn rendezvous_artifacts(connection_file: &std::path::Path, endpoint: &str) -> Vec<PathBuf> {
    vec![connection_file.to_path_buf(), PathBuf::from(endpoint)]
}

#[cfg(windows)]
fn rendezvous_artifacts(connection_file: &std::path::Path, _endpoint: &str) -> Vec<PathBuf> {
    vec![connection_file.to_path_buf()]
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
