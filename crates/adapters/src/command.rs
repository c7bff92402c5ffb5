// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-style adaptor.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use adaptor_core::{Adaptor, AdaptorError, InitData, PathMappingRule, RunData};

use crate::process::{LoggingSubprocess, ProcessError};

/// Adaptor wrapping a command-line application.
///
/// `init_data` fixes the executable and base arguments; each run appends
/// the run data's arguments and spawns the command as a managed subprocess.
/// Cancel kills the in-flight subprocess.
///
/// ```json
/// init_data: {"executable": "render", "arguments": ["--verbose"],
///             "startup_directory": "/scenes"}
/// run_data:  {"arguments": ["--frame", "1"]}
/// ```
#[derive(Debug)]
pub struct CommandAdaptor {
    executable: String,
    base_arguments: Vec<String>,
    startup_directory: Option<PathBuf>,
    path_mapping_rules: Vec<PathMappingRule>,
    cancel: CancellationToken,
}

impl CommandAdaptor {
    pub fn new(
        init_data: &InitData,
        path_mapping_rules: Vec<PathMappingRule>,
    ) -> Result<Self, AdaptorError> {
        let executable = init_data
            .get("executable")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                AdaptorError::Failed("init data is missing the 'executable' field".to_string())
            })?
            .to_string();

        Ok(Self {
            executable,
            base_arguments: string_list(init_data, "arguments")?,
            startup_directory: init_data
                .get("startup_directory")
                .and_then(|v| v.as_str())
                .map(PathBuf::from),
            path_mapping_rules,
            cancel: CancellationToken::new(),
        })
    }

    /// Apply path mapping rules to a path argument.
    pub fn map_path(&self, path: &str) -> String {
        adaptor_core::map_path(&self.path_mapping_rules, path)
    }
}

#[async_trait]
impl Adaptor for CommandAdaptor {
    async fn on_run(&self, run_data: &RunData) -> Result<(), AdaptorError> {
        let mut args = Vec::with_capacity(1 + self.base_arguments.len());
        args.push(self.executable.clone());
        args.extend(self.base_arguments.iter().cloned());
        args.extend(string_list(run_data, "arguments")?);

        let process = LoggingSubprocess::new(args, self.startup_directory.clone())
            .map_err(|e| AdaptorError::Failed(e.to_string()))?;

        match process.run(&self.cancel).await {
            Ok(()) => Ok(()),
            Err(ProcessError::Canceled) => Ok(()),
            Err(e) => Err(AdaptorError::Failed(e.to_string())),
        }
    }

    async fn on_cancel(&self) -> Result<(), AdaptorError> {
        self.cancel.cancel();
        Ok(())
    }
}

fn string_list(
    data: &serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> Result<Vec<String>, AdaptorError> {
    match data.get(key) {
        None => Ok(Vec::new()),
        Some(value) => {
            let items = value.as_array().ok_or_else(|| {
                AdaptorError::Failed(format!("'{key}' must be an array of strings"))
            })?;
            items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        AdaptorError::Failed(format!("'{key}' must be an array of strings"))
                    })
                })
                .collect()
        }
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
