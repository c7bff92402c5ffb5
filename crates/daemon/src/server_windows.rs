// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background server over a named pipe.
//!
//! Same shape as the UNIX server: one short-lived task per connection, a
//! shutdown event breaking the accept loop, bounded handler drain. Requests
//! arrive as length-prefixed JSON envelopes. Peer restriction comes from
//! pipe creation flags: remote clients are rejected and the first-instance
//! flag keeps other processes from squatting on the name.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::net::windows::named_pipe::NamedPipeServer;
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use adaptor_core::AdaptorRunner;
use adaptor_ipc::envelope::{self, RequestEnvelope, ResponseEnvelope};
use adaptor_ipc::transport::windows;
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
    pipe_name: String,
    instance: NamedPipeServer,
    ctx: Arc<ServeCtx>,
}

impl BackgroundServer {
    /// Claim `pipe_name` with the first pipe instance.
    pub fn bind(
        pipe_name: String,
        runner: AdaptorRunner,
        buffer: Option<Arc<dyn LogBuffer>>,
    ) -> Result<Self, ServerError> {
        let instance = windows::create_instance(&pipe_name, true).map_err(|source| {
            ServerError::Bind {
                path: PathBuf::from(&pipe_name),
                source,
            }
        })?;

        Ok(Self {
            pipe_name,
            instance,
            ctx: Arc::new(ServeCtx {
                runner,
                buffer,
                worker: FutureRunner::new(),
                shutdown: Arc::new(Notify::new()),
            }),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.pipe_name
    }

    /// The shutdown event. Setting it makes `serve` return.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.ctx.shutdown)
    }

    pub(crate) fn serve_ctx(&self) -> Arc<ServeCtx> {
        Arc::clone(&self.ctx)
    }

    /// Wait for client connections until the shutdown event fires. Each
    /// connected instance is handed to a handler task and replaced with a
    /// fresh instance, so a shutdown rendezvous connection always finds one.
    pub async fn serve(mut self) {
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                result = self.instance.connect() => match result {
                    Ok(()) => {
                        let next = match windows::create_instance(&self.pipe_name, false) {
                            Ok(instance) => instance,
                            Err(e) => {
                                error!("Failed to create pipe instance: {e}");
                                break;
                            }
                        };
                        let connected = std::mem::replace(&mut self.instance, next);
                        let ctx = Arc::clone(&self.ctx);
                        connections.spawn(async move {
                            if let Err(e) = handle_connection(connected, &ctx).await {
                                log_connection_error(e);
                            }
                        });
                    }
                    Err(e) => error!("Pipe connect error: {e}"),
                },
                _ = self.ctx.shutdown.notified() => break,
            }

            while connections.try_join_next().is_some() {}
        }

        drain_connections(&mut connections).await;
    }
}

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

async fn handle_connection(mut pipe: NamedPipeServer, ctx: &ServeCtx) -> Result<(), IpcError> {
    let read_timeout = env::read_timeout();
    let raw = match tokio::time::timeout(read_timeout, envelope::read_message(&mut pipe)).await {
        Err(_) => return Err(IpcError::ReadTimeout(read_timeout)),
        Ok(result) => result?,
    };

    let response = match decode_request(&raw) {
        Ok(request) => {
            debug!("Received request: {} {}", request.method, request.path);
            let http_response = handlers::route(ctx, request).await;
            ResponseEnvelope {
                status: http_response.status,
                body: http_response.body,
            }
        }
        Err(e) => ResponseEnvelope {
            status: 500,
            body: e.to_string(),
        },
    };

    let data = envelope::encode(&response)?;
    envelope::write_message(&mut pipe, &data).await?;
    let _ = pipe.disconnect();
    Ok(())
}

fn decode_request(raw: &[u8]) -> Result<IncomingRequest, IpcError> {
    let request: RequestEnvelope = envelope::decode(raw)?;
    IncomingRequest::from_envelope(request).map_err(IpcError::Json)
}

fn log_connection_error(e: IpcError) {
    match e {
        IpcError::PipeDisconnected => debug!("Client disconnected"),
        IpcError::ReadTimeout(_) => warn!("Connection read timeout"),
        _ => error!("Connection error: {e}"),
    }
}
