// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Core types for the adaptor runtime.
//!
//! Defines the adaptor contract (five lifecycle callbacks), the lifecycle
//! state machine and the runner that drives it, the stdout sentinel
//! vocabulary shared with outer job runners, path mapping rules, and the
//! runtime configuration collaborator.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod adaptor;
mod config;
mod path_mapping;
mod runner;
pub mod sentinels;
mod state;

pub use adaptor::{Adaptor, AdaptorError, InitData, RunData};
pub use config::{ConfigError, RuntimeConfig};
pub use path_mapping::{map_path, rules_from_data, PathMappingRule};
pub use runner::AdaptorRunner;
pub use state::{AdaptorState, AdaptorStatus};
