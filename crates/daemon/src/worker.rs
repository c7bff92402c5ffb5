// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-slot worker for lifecycle tasks.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::task::JoinHandle;

const WAIT_FOR_START_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
#[error("Cannot submit new task while another task is running")]
pub struct WorkerBusy;

/// A worker holding at most one in-flight task.
///
/// Request handlers respond only after the submitted task has observably
/// started, so the next heartbeat is guaranteed to see `Working`.
#[derive(Default)]
pub struct FutureRunner {
    slot: Mutex<Option<Slot>>,
}

struct Slot {
    started: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl FutureRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` into the slot. Fails if the slot still holds a running
    /// task; a finished task is displaced.
    pub fn submit<F>(&self, task: F) -> Result<(), WorkerBusy>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.slot.lock();
        if let Some(current) = slot.as_ref() {
            if !current.handle.is_finished() {
                return Err(WorkerBusy);
            }
        }

        let started = Arc::new(AtomicBool::new(false));
        let handle = {
            let started = Arc::clone(&started);
            tokio::spawn(async move {
                started.store(true, Ordering::SeqCst);
                task.await;
            })
        };
        *slot = Some(Slot { started, handle });
        Ok(())
    }

    /// Whether the slot holds an unfinished task.
    pub fn is_running(&self) -> bool {
        self.slot
            .lock()
            .as_ref()
            .is_some_and(|slot| !slot.handle.is_finished())
    }

    /// Whether the most recently submitted task is running or done.
    pub fn has_started(&self) -> bool {
        self.slot
            .lock()
            .as_ref()
            .is_some_and(|slot| slot.started.load(Ordering::SeqCst) || slot.handle.is_finished())
    }

    /// Block until the submitted task has observably started.
    pub async fn wait_for_start(&self) {
        while !self.has_started() {
            tokio::time::sleep(WAIT_FOR_START_INTERVAL).await;
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
