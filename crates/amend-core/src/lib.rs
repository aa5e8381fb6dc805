// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

use sha2::{Digest, Sha256};
use std::path::PathBuf;

pub const CRATE_NAME: &str = "amend-core";

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    Usage = 2,
    Validation = 3,
    DependencyFailure = 4,
    Internal = 10,
}

impl ExitCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Usage => "usage",
            Self::Validation => "validation",
            Self::DependencyFailure => "dependency_failure",
            Self::Internal => "internal",
        }
    }
}

pub const ENV_AMEND_LOG_LEVEL: &str = "AMEND_LOG_LEVEL";
pub const ENV_AMEND_DATA_DIR: &str = "AMEND_DATA_DIR";

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Resolve the directory that fetched source files and the archive database
/// live under. `AMEND_DATA_DIR` wins; otherwise `./data`.
#[must_use]
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(explicit) = std::env::var(ENV_AMEND_DATA_DIR) {
        let trimmed = explicit.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    PathBuf::from("data")
}

pub mod canonical {
    use serde::Serialize;
    use serde_json::{Map, Value};
    use sha2::{Digest, Sha256};

    /// Serialize with object keys sorted so equal values always hash equal.
    pub fn stable_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
        let raw = serde_json::to_value(value)?;
        let normalized = normalize_json_value(raw);
        serde_json::to_vec(&normalized)
    }

    #[must_use]
    pub fn stable_hash_hex(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        format!("{:x}", hasher.finalize())
    }

    fn normalize_json_value(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut sorted = Map::new();
                let mut entries: Vec<(String, Value)> = map
                    .into_iter()
                    .map(|(k, v)| (k, normalize_json_value(v)))
                    .collect();
                entries.sort_by(|a, b| a.0.cmp(&b.0));
                for (k, v) in entries {
                    sorted.insert(k, v);
                }
                Value::Object(sorted)
            }
            Value::Array(items) => {
                Value::Array(items.into_iter().map(normalize_json_value).collect())
            }
            other => other,
        }
    }
}
