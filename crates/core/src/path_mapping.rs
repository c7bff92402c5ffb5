// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Path mapping rules: pure prefix substitution over a rules list.

use serde::{Deserialize, Serialize};

/// A single source-to-destination path substitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathMappingRule {
    /// Path syntax of the source (`POSIX` or `WINDOWS`).
    #[serde(default)]
    pub source_path_format: String,
    pub source_path: String,
    pub destination_path: String,
}

impl PathMappingRule {
    /// Apply this rule to `path`, returning the mapped path if the rule's
    /// source prefix matched.
    pub fn apply(&self, path: &str) -> Option<String> {
        let rest = if self.source_path_format.eq_ignore_ascii_case("windows") {
            // Windows paths compare case-insensitively
            let lowered = path.to_ascii_lowercase();
            let prefix = self.source_path.to_ascii_lowercase();
            lowered.strip_prefix(&prefix)?;
            &path[self.source_path.len()..]
        } else {
            path.strip_prefix(&self.source_path)?
        };
        Some(format!("{}{}", self.destination_path, rest))
    }
}

/// Extract the `path_mapping_rules` list from `--path-mapping-rules` data.
pub fn rules_from_data(
    data: &serde_json::Map<String, serde_json::Value>,
) -> Result<Vec<PathMappingRule>, serde_json::Error> {
    match data.get("path_mapping_rules") {
        Some(value) => serde_json::from_value(value.clone()),
        None => Ok(Vec::new()),
    }
}

/// Apply the first matching rule, or return the path unchanged.
pub fn map_path(rules: &[PathMappingRule], path: &str) -> String {
    for rule in rules {
        if let Some(mapped) = rule.apply(path) {
            return mapped;
        }
    }
    path.to_string()
}

#[cfg(test)]
#[path = "path_mapping_tests.rs"]
mod tests;
