// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request router: maps (verb, path) to the six endpoint handlers.

use std::sync::Arc;

use tokio::sync::Notify;
use tracing::{debug, warn};

use adaptor_core::sentinels::output_indicates_failure;
use adaptor_core::{AdaptorRunner, AdaptorStatus, RunData};
use adaptor_ipc::envelope::RequestEnvelope;
use adaptor_ipc::http::{HttpRequest, HttpResponse};

use crate::log_buffer::LogBuffer;
use crate::model::{BufferedOutput, HeartbeatResponse};
use crate::worker::FutureRunner;

/// Shared server state for all request handlers.
pub(crate) struct ServeCtx {
    pub runner: AdaptorRunner,
    pub buffer: Option<Arc<dyn LogBuffer>>,
    pub worker: FutureRunner,
    pub shutdown: Arc<Notify>,
}

/// A request in transport-neutral form.
pub(crate) struct IncomingRequest {
    pub method: String,
    pub path: String,
    pub params: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl IncomingRequest {
    pub fn from_http(req: HttpRequest) -> Self {
        Self {
            method: req.method,
            path: req.path,
            params: req.query,
            body: req.body,
        }
    }

    /// Convert a named-pipe envelope; `params` holds a JSON-encoded map.
    pub fn from_envelope(envelope: RequestEnvelope) -> Result<Self, serde_json::Error> {
        let params = match &envelope.params {
            None => Vec::new(),
            Some(raw) => {
                let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(raw)?;
                map.into_iter()
                    .map(|(key, value)| {
                        let value = match value {
                            serde_json::Value::String(s) => s,
                            other => other.to_string(),
                        };
                        (key, value)
                    })
                    .collect()
            }
        };

        Ok(Self {
            method: envelope.method,
            path: envelope.path,
            params,
            body: envelope.body.map(String::into_bytes).unwrap_or_default(),
        })
    }

    fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Dispatch one request. Unknown path is 404; a known path with the wrong
/// verb is 405.
pub(crate) async fn route(ctx: &ServeCtx, req: IncomingRequest) -> HttpResponse {
    match (req.method.as_str(), req.path.as_str()) {
        ("PUT", "/start") => start(ctx).await,
        ("PUT", "/run") => run(ctx, &req.body).await,
        ("PUT", "/stop") => stop(ctx).await,
        ("PUT", "/cancel") => cancel(ctx).await,
        ("GET", "/heartbeat") => {
            let ack_id = req.param("ack_id").filter(|id| !id.is_empty());
            heartbeat(ctx, ack_id)
        }
        ("PUT", "/shutdown") => shutdown(ctx),
        (_, "/start" | "/run" | "/stop" | "/cancel" | "/heartbeat" | "/shutdown") => {
            HttpResponse::status(405)
        }
        _ => HttpResponse::status(404),
    }
}

async fn start(ctx: &ServeCtx) -> HttpResponse {
    let runner = ctx.runner.clone();
    submit_to_worker(ctx, async move {
        // Failures already carry the sentinel into the log buffer
        let _ = runner.start().await;
    })
    .await
}

async fn run(ctx: &ServeCtx, body: &[u8]) -> HttpResponse {
    let run_data: RunData = if body.is_empty() {
        RunData::new()
    } else {
        match serde_json::from_slice(body) {
            Ok(data) => data,
            Err(e) => return HttpResponse::with_body(500, format!("Failed to parse run data: {e}")),
        }
    };

    let runner = ctx.runner.clone();
    submit_to_worker(ctx, async move {
        let _ = runner.run(&run_data).await;
    })
    .await
}

async fn stop(ctx: &ServeCtx) -> HttpResponse {
    let runner = ctx.runner.clone();
    submit_to_worker(ctx, async move {
        // Cleanup must run even when stop fails
        let stopped = runner.stop().await;
        let _ = runner.cleanup().await;
        if stopped.is_ok() {
            debug!("Daemon background process stopped.");
        }
    })
    .await
}

/// Conditional cancel, shared with the backend's signal handler.
///
/// Cancels only interruptible work; the cancel task runs on its own
/// one-shot worker so it is never blocked behind the task it interrupts.
pub(crate) async fn cancel(ctx: &ServeCtx) -> HttpResponse {
    if !(ctx.worker.is_running() && ctx.runner.state().is_cancelable()) {
        return HttpResponse::ok("No action required");
    }

    let immediate = FutureRunner::new();
    let runner = ctx.runner.clone();
    if immediate
        .submit(async move {
            let _ = runner.cancel().await;
        })
        .is_err()
    {
        return HttpResponse::with_body(500, "Failed to submit cancel task".to_string());
    }
    immediate.wait_for_start().await;
    HttpResponse::status(200)
}

fn heartbeat(ctx: &ServeCtx, ack_id: Option<&str>) -> HttpResponse {
    let output = match &ctx.buffer {
        None => BufferedOutput::empty(),
        Some(buffer) => {
            if let Some(ack) = ack_id {
                if buffer.clear(ack) {
                    debug!("Received ACK for chunk: {ack}");
                } else {
                    warn!("Received ACK for old or invalid chunk: {ack}");
                }
            }
            match buffer.chunk() {
                Ok(chunk) => chunk,
                Err(e) => return HttpResponse::with_body(500, e.to_string()),
            }
        }
    };

    let failed = output_indicates_failure(&output.output);
    let status = if ctx.worker.is_running() {
        AdaptorStatus::Working
    } else {
        AdaptorStatus::Idle
    };
    let heartbeat = HeartbeatResponse {
        state: ctx.runner.state(),
        status,
        output,
        failed,
    };

    match serde_json::to_string(&heartbeat) {
        Ok(body) => HttpResponse::ok(body),
        Err(e) => HttpResponse::with_body(500, e.to_string()),
    }
}

fn shutdown(ctx: &ServeCtx) -> HttpResponse {
    ctx.shutdown.notify_one();
    HttpResponse::status(200)
}

/// Submit to the single worker slot: 400 while busy, 200 once the task has
/// observably started.
async fn submit_to_worker<F>(ctx: &ServeCtx, task: F) -> HttpResponse
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    if ctx.worker.submit(task).is_err() {
        return HttpResponse::status(400);
    }
    ctx.worker.wait_for_start().await;
    HttpResponse::status(200)
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
