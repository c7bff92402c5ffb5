// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle runner: drives an adaptor through its state machine.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error};

use crate::adaptor::{Adaptor, AdaptorError, RunData};
use crate::sentinels::OPENJD_FAIL_PREFIX;
use crate::state::AdaptorState;

/// Drives an adaptor through its lifecycle, tracking the current state.
///
/// The state transitions *before* the adaptor callback is dispatched, so a
/// failing callback leaves the state at the value set on entry. Failures are
/// logged with the failure sentinel and returned to the caller.
///
/// The runner itself is sequential; concurrency (the single worker slot and
/// the independent cancel worker) is the server's concern.
#[derive(Clone)]
pub struct AdaptorRunner {
    adaptor: Arc<dyn Adaptor>,
    state: Arc<Mutex<AdaptorState>>,
}

impl AdaptorRunner {
    pub fn new(adaptor: Arc<dyn Adaptor>) -> Self {
        Self {
            adaptor,
            state: Arc::new(Mutex::new(AdaptorState::NotStarted)),
        }
    }

    /// The current lifecycle state.
    pub fn state(&self) -> AdaptorState {
        *self.state.lock()
    }

    pub async fn start(&self) -> Result<(), AdaptorError> {
        debug!("Starting...");
        self.set_state(AdaptorState::Start);

        self.adaptor
            .on_start()
            .await
            .map_err(|e| fail(format!("Error encountered while starting adaptor: {e}"), e))
    }

    pub async fn run(&self, run_data: &RunData) -> Result<(), AdaptorError> {
        debug!("Running task");
        self.set_state(AdaptorState::Run);

        self.adaptor
            .on_run(run_data)
            .await
            .map_err(|e| fail(format!("Error encountered while running adaptor: {e}"), e))?;

        debug!("Task complete");
        Ok(())
    }

    pub async fn stop(&self) -> Result<(), AdaptorError> {
        debug!("Stopping...");
        self.set_state(AdaptorState::Stop);

        self.adaptor
            .on_stop()
            .await
            .map_err(|e| fail(format!("Error encountered while stopping adaptor: {e}"), e))
    }

    pub async fn cleanup(&self) -> Result<(), AdaptorError> {
        debug!("Cleaning up...");
        self.set_state(AdaptorState::Cleanup);

        self.adaptor
            .on_cleanup()
            .await
            .map_err(|e| fail(format!("Error encountered while cleaning up adaptor: {e}"), e))?;

        debug!("Cleanup complete");
        Ok(())
    }

    pub async fn cancel(&self) -> Result<(), AdaptorError> {
        debug!("Canceling...");
        self.set_state(AdaptorState::Canceled);

        self.adaptor
            .on_cancel()
            .await
            .map_err(|e| fail(format!("Error encountered while canceling the adaptor: {e}"), e))?;

        debug!("Cancel complete");
        Ok(())
    }

    fn set_state(&self, state: AdaptorState) {
        *self.state.lock() = state;
    }
}

/// Log the failure sentinel and hand the error back to the caller.
fn fail(reason: String, err: AdaptorError) -> AdaptorError {
    error!("{OPENJD_FAIL_PREFIX}{reason}");
    err
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
