// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `--init-data`/`--run-data` argument loading: inline JSON or `file://`.

/// Parsed data argument: a JSON object.
pub type DataMap = serde_json::Map<String, serde_json::Value>;

const FILE_PREFIX: &str = "file://";

/// Parse a data argument. An empty string yields an empty map; a
/// `file://<path>` argument reads the JSON from that file.
pub fn parse_data(raw: &str) -> Result<DataMap, String> {
    if raw.is_empty() {
        return Ok(DataMap::new());
    }

    let contents = if let Some(path) = raw.strip_prefix(FILE_PREFIX) {
        std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to open data file '{path}': {e}"))?
    } else {
        raw.to_string()
    };

    let value: serde_json::Value = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to load data as JSON: {e}"))?;

    match value {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(format!(
            "Expected loaded data to be an object, but got {}",
            type_name(&other)
        )),
    }
}

fn type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[path = "data_tests.rs"]
mod tests;
