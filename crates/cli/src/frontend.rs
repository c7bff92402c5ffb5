// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Frontend runner: drives the backend over its IPC endpoint.

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::{debug, error, info};

use adaptor_core::{AdaptorState, AdaptorStatus};
use adaptor_daemon::{BufferedOutput, HeartbeatResponse};
use adaptor_ipc::connection::{self, ConnectionError, ConnectionSettings};
use adaptor_ipc::http::HttpResponse;
#[cfg(unix)]
use adaptor_ipc::http::HttpRequest;
use adaptor_ipc::IpcError;

use crate::backend_process;
use crate::data::DataMap;
use crate::env;

/// Grace sleep between heartbeats once a cancel has been requested.
const CANCEL_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Cannot init a new backend process with an existing connection file at: {0}")]
    ConnectionFileExists(PathBuf),

    #[error("Failed to initialize backend process: {0}")]
    SpawnFailed(std::io::Error),

    #[error("Received unexpected HTTP status code {status}: {reason}")]
    Http { status: u16, reason: String },

    #[error("Request timed out after {0:?}")]
    RequestTimeout(Duration),

    /// The adaptor reported a failure; the message is the log chunk that
    /// carried the failure sentinel.
    #[error("{0}")]
    AdaptorFailed(String),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Ipc(#[from] IpcError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Client side of the daemon mode: spawns the backend, issues lifecycle
/// requests, and polls heartbeats until the requested state completes.
///
/// Clones share the cancel flag, so a signal task can cancel a wait loop
/// in flight.
#[derive(Clone)]
pub struct FrontendRunner {
    inner: Arc<Inner>,
}

struct Inner {
    connection_file: PathBuf,
    request_timeout: Duration,
    heartbeat_interval: Duration,
    canceled: CancelFlag,
    settings: Mutex<Option<ConnectionSettings>>,
}

impl FrontendRunner {
    pub fn new(connection_file: PathBuf) -> Self {
        Self::with_timing(connection_file, env::request_timeout(), env::heartbeat_interval())
    }

    pub fn with_timing(
        connection_file: PathBuf,
        request_timeout: Duration,
        heartbeat_interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                connection_file,
                request_timeout,
                heartbeat_interval,
                canceled: CancelFlag::default(),
                settings: Mutex::new(None),
            }),
        }
    }

    /// Spawn the backend process and verify the connection.
    ///
    /// Refuses to reuse an existing connection file: that either means a
    /// backend is already running, or a previous one did not shut down
    /// cleanly. The spawned child is detached; on a wait timeout, killing
    /// it is the caller's responsibility.
    pub async fn init(
        &self,
        init_data: &DataMap,
        path_mapping_data: &DataMap,
        reentry_exe: Option<PathBuf>,
    ) -> Result<(), ClientError> {
        if self.inner.connection_file.exists() {
            return Err(ClientError::ConnectionFileExists(
                self.inner.connection_file.clone(),
            ));
        }

        info!("Initializing backend process...");
        let child = backend_process::spawn_backend(
            reentry_exe,
            init_data,
            path_mapping_data,
            &self.inner.connection_file,
        )?;
        info!("Started backend process. PID: {}", child.id());

        if let Err(e) = connection::wait_for_file(
            &self.inner.connection_file,
            env::connect_wait_timeout(),
            env::poll_interval(),
        )
        .await
        {
            error!(
                "Backend process failed to write connection file in time at: {}",
                self.inner.connection_file.display()
            );
            return Err(e.into());
        }

        info!("Verifying connection to backend...");
        self.heartbeat(None).await?;
        info!("Connected successfully");
        Ok(())
    }

    /// Start the adaptor and wait for the transition to complete.
    pub async fn start(&self) -> Result<(), ClientError> {
        self.send_request("PUT", "/start", &[], None).await?;
        self.heartbeat_until_state_complete(AdaptorState::Start).await
    }

    /// Run one task and wait for it to complete.
    pub async fn run(&self, run_data: &DataMap) -> Result<(), ClientError> {
        let body = serde_json::to_vec(run_data)?;
        self.send_request("PUT", "/run", &[], Some(body)).await?;
        self.heartbeat_until_state_complete(AdaptorState::Run).await
    }

    /// Stop the adaptor. The backend chains stop and cleanup into one
    /// task, so this waits until cleanup has completed.
    pub async fn stop(&self) -> Result<(), ClientError> {
        self.send_request("PUT", "/stop", &[], None).await?;
        self.heartbeat_until_state_complete(AdaptorState::Cleanup).await
    }

    /// Request backend shutdown.
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        self.send_request("PUT", "/shutdown", &[], None).await?;
        Ok(())
    }

    /// Request cancellation of in-flight work and mark this frontend
    /// canceled so active wait loops wind down.
    pub async fn cancel(&self) -> Result<(), ClientError> {
        self.send_request("PUT", "/cancel", &[], None).await?;
        self.inner.canceled.set();
        Ok(())
    }

    async fn heartbeat(&self, ack_id: Option<&str>) -> Result<HeartbeatResponse, ClientError> {
        let params: Vec<(String, String)> = match ack_id {
            Some(id) => vec![("ack_id".to_string(), id.to_string())],
            None => Vec::new(),
        };
        let response = self.send_request("GET", "/heartbeat", &params, None).await?;
        Ok(serde_json::from_str(&response.body)?)
    }

    /// Poll heartbeats until the backend reaches `target` (or `Canceled`)
    /// and is idle, relaying buffered output and ACKing chunks along the
    /// way. A failure observed in any heartbeat surfaces as
    /// [`ClientError::AdaptorFailed`] once the wait completes.
    async fn heartbeat_until_state_complete(
        &self,
        target: AdaptorState,
    ) -> Result<(), ClientError> {
        let mut failure_message: Option<String> = None;
        let mut ack_id: Option<String> = None;

        loop {
            debug!("Sending heartbeat request...");
            let heartbeat = self.heartbeat(ack_id.as_deref()).await?;

            for line in heartbeat.output.output.lines() {
                relay_adaptor_output(line);
            }
            if heartbeat.failed {
                failure_message = Some(heartbeat.output.output.clone());
            }
            ack_id = Some(heartbeat.output.id.clone());

            if (heartbeat.state == target || heartbeat.state == AdaptorState::Canceled)
                && heartbeat.status == AdaptorStatus::Idle
            {
                break;
            }

            if self.inner.canceled.is_set() {
                // Canceled: small sleep to give the cancel time to take effect
                tokio::time::sleep(CANCEL_GRACE).await;
            } else {
                self.inner.canceled.wait(self.inner.heartbeat_interval).await;
            }
        }

        // One last heartbeat to ACK the previous output, if there was any
        if let Some(id) = ack_id.filter(|id| id.as_str() != BufferedOutput::EMPTY_ID) {
            debug!("ACKing last heartbeat...");
            self.heartbeat(Some(&id)).await?;
        }

        match failure_message {
            Some(message) => Err(ClientError::AdaptorFailed(message)),
            None => Ok(()),
        }
    }

    fn connection_settings(&self) -> Result<ConnectionSettings, ClientError> {
        let mut cached = self.inner.settings.lock();
        if let Some(settings) = cached.as_ref() {
            return Ok(settings.clone());
        }
        let settings = connection::load_connection_settings(&self.inner.connection_file)?;
        *cached = Some(settings.clone());
        Ok(settings)
    }

    #[cfg(unix)]
    async fn send_request(
        &self,
        method: &str,
        path: &str,
        params: &[(String, String)],
        body: Option<Vec<u8>>,
    ) -> Result<HttpResponse, ClientError> {
        use adaptor_ipc::http;
        use adaptor_ipc::transport::unix;

        let settings = self.connection_settings()?;
        let endpoint = PathBuf::from(&settings.endpoint);
        let timeout = self.inner.request_timeout;

        let stream = unix::connect(&endpoint, timeout).await?;
        let (reader, mut writer) = stream.into_split();

        let mut request = HttpRequest::new(method, path);
        request.query = params.to_vec();
        request.body = body.unwrap_or_default();

        tokio::time::timeout(timeout, http::write_request(&mut writer, &request))
            .await
            .map_err(|_| ClientError::RequestTimeout(timeout))??;

        let mut reader = tokio::io::BufReader::new(reader);
        let response = tokio::time::timeout(timeout, http::read_response(&mut reader))
            .await
            .map_err(|_| ClientError::RequestTimeout(timeout))??;

        check_status(path, response)
    }

    #[cfg(windows)]
    async fn send_request(
        &self,
        method: &str,
        path: &str,
        params: &[(String, String)],
        body: Option<Vec<u8>>,
    ) -> Result<HttpResponse, ClientError> {
        use adaptor_ipc::envelope::{self, RequestEnvelope, ResponseEnvelope};
        use adaptor_ipc::transport::windows;

        let settings = self.connection_settings()?;
        let timeout = self.inner.request_timeout;

        let params_json = if params.is_empty() {
            None
        } else {
            let map: serde_json::Map<String, serde_json::Value> = params
                .iter()
                .map(|(key, value)| (key.clone(), serde_json::Value::String(value.clone())))
                .collect();
            Some(serde_json::to_string(&map)?)
        };
        let body_json = match body {
            Some(bytes) => Some(String::from_utf8(bytes).map_err(|_| {
                IpcError::Malformed("request body is not UTF-8".to_string())
            })?),
            None => None,
        };
        let request = RequestEnvelope {
            method: method.to_string(),
            path: path.to_string(),
            body: body_json,
            params: params_json,
        };

        let mut pipe = windows::connect(&settings.endpoint, timeout).await?;
        let data = envelope::encode(&request)?;
        tokio::time::timeout(timeout, envelope::write_message(&mut pipe, &data))
            .await
            .map_err(|_| ClientError::RequestTimeout(timeout))??;

        let raw = tokio::time::timeout(timeout, envelope::read_message(&mut pipe))
            .await
            .map_err(|_| ClientError::RequestTimeout(timeout))??;
        let response: ResponseEnvelope = envelope::decode(&raw)?;

        check_status(
            path,
            HttpResponse {
                status: response.status,
                body: response.body,
            },
        )
    }
}

fn check_status(path: &str, response: HttpResponse) -> Result<HttpResponse, ClientError> {
    if (400..600).contains(&response.status) {
        let reason = response.reason().to_string();
        error!(
            "Failed to send {path} request: received unexpected HTTP status code {}: {reason}",
            response.status
        );
        return Err(ClientError::Http {
            status: response.status,
            reason,
        });
    }
    Ok(response)
}

/// Relay one line of buffered adaptor output to our stdout, untouched, so
/// sentinel lines stay parseable by an outer job runner.
fn relay_adaptor_output(line: &str) {
    let mut stdout = std::io::stdout().lock();
    let _ = writeln!(stdout, "{line}");
    let _ = stdout.flush();
}

#[derive(Default)]
struct CancelFlag {
    flag: AtomicBool,
    notify: Notify,
}

impl CancelFlag {
    fn set(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Sleep up to `timeout`, waking early on cancel. A set racing the
    /// registration at worst costs one extra interval; the wait loop
    /// re-checks the flag every iteration.
    async fn wait(&self, timeout: Duration) {
        if self.is_set() {
            return;
        }
        let _ = tokio::time::timeout(timeout, self.notify.notified()).await;
    }
}

#[cfg(test)]
#[path = "frontend_tests.rs"]
mod tests;
