// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background server over a UNIX-domain stream socket.
//!
//! The serve loop accepts connections until the shutdown event fires and
//! spawns one short-lived task per connection: authenticate the peer, read
//! one HTTP request, route it, respond, close. A handler error never takes
//! the server down.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::io::BufReader;
use tokio::net::UnixStream;
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use adaptor_core::AdaptorRunner;
use adaptor_ipc::http::{self, HttpResponse};
use adaptor_ipc::transport::unix;
use adaptor_ipc::{IpcError, SocketPathError};

use crate::env;
use crate::handlers::{self, IncomingRequest, ServeCtx};
use crate::log_buffer::LogBuffer;
use crate::worker::FutureRunner;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind socket at {path}: {source}")]
    Bind { path: PathBuf, source: IpcError },

    #[error(transparent)]
    SocketPath(#[from] SocketPathError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Server hosting the six lifecycle endpoints.
pub struct BackgroundServer {
    listener: tokio::net::UnixListener,
    endpoint: PathBuf,
    ctx: Arc<ServeCtx>,
}

impl BackgroundServer {
    /// Bind at `endpoint`, replacing a stale socket file.
    pub fn bind(
        endpoint: PathBuf,
        runner: AdaptorRunner,
        buffer: Option<Arc<dyn LogBuffer>>,
    ) -> Result<Self, ServerError> {
        let listener = unix::bind(&endpoint).map_err(|source| ServerError::Bind {
            path: endpoint.clone(),
            source,
        })?;

        Ok(Self {
            listener,
            endpoint,
            ctx: Arc::new(ServeCtx {
                runner,
                buffer,
                worker: FutureRunner::new(),
                shutdown: Arc::new(Notify::new()),
            }),
        })
    }

    pub fn endpoint(&self) -> &Path {
        &self.endpoint
    }

    /// The shutdown event. Setting it makes `serve` return.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.ctx.shutdown)
    }

    pub(crate) fn serve_ctx(&self) -> Arc<ServeCtx> {
        Arc::clone(&self.ctx)
    }

    /// Accept connections until the shutdown event fires, then drain
    /// outstanding handlers with a bounded grace period.
    pub async fn serve(self) {
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                result = self.listener.accept() => match result {
                    Ok((stream, _)) => {
                        let ctx = Arc::clone(&self.ctx);
                        connections.spawn(async move {
                            if let Err(e) = handle_connection(stream, &ctx).await {
                                log_connection_error(e);
                            }
                        });
                    }
                    Err(e) => error!("Accept error: {e}"),
                },
                _ = self.ctx.shutdown.notified() => break,
            }

            // Reap finished handlers so the set stays small
            while connections.try_join_next().is_some() {}
        }

        drain_connections(&mut connections).await;
    }
}

/// Join outstanding handlers within the shutdown grace period, then abort
/// whatever is left so responses in flight can flush without holding the
/// process open.
async fn drain_connections(connections: &mut JoinSet<()>) {
    let deadline = Instant::now() + env::shutdown_grace();
    while !connections.is_empty() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            warn!("{} connection(s) still open at shutdown, aborting", connections.len());
            break;
        }
        match tokio::time::timeout(remaining, connections.join_next()).await {
            Ok(Some(_)) => {}
            Ok(None) => break,
            Err(_) => {
                warn!("{} connection(s) still open at shutdown, aborting", connections.len());
                break;
            }
        }
    }
    connections.abort_all();
}

async fn handle_connection(stream: UnixStream, ctx: &ServeCtx) -> Result<(), IpcError> {
    let authenticated = match unix::peer_is_same_user(&stream) {
        Ok(ok) => ok,
        Err(e) => {
            error!("Failed to read peer credentials: {e}");
            let (_, mut writer) = stream.into_split();
            let _ = http::write_response(&mut writer, &HttpResponse::status(500)).await;
            return Ok(());
        }
    };

    let (reader, mut writer) = stream.into_split();
    if !authenticated {
        warn!("Rejected connection from a different OS user");
        let _ = http::write_response(&mut writer, &HttpResponse::status(401)).await;
        return Ok(());
    }

    let mut reader = BufReader::new(reader);
    let read_timeout = env::read_timeout();
    let request = match tokio::time::timeout(read_timeout, http::read_request(&mut reader)).await {
        Err(_) => return Err(IpcError::ReadTimeout(read_timeout)),
        Ok(Err(IpcError::Malformed(reason))) => {
            let _ = http::write_response(&mut writer, &HttpResponse::with_body(500, reason)).await;
            return Ok(());
        }
        Ok(Err(e)) => return Err(e),
        Ok(Ok(request)) => request,
    };

    debug!("Received request: {} {}", request.method, request.path);
    let response = handlers::route(ctx, IncomingRequest::from_http(request)).await;
    http::write_response(&mut writer, &response).await?;

    Ok(())
}

fn log_connection_error(e: IpcError) {
    match e {
        IpcError::PipeDisconnected => debug!("Client disconnected"),
        IpcError::ReadTimeout(_) => warn!("Connection read timeout"),
        _ => error!("Connection error: {e}"),
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
