// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MANIFEST_VERSION: &str = "1";

/// Timestamp handling for archive outputs. Tests and replay builds use
/// `DeterministicZero` so identical inputs produce identical artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampPolicy {
    DeterministicZero,
    WallClock,
}

impl Default for TimestampPolicy {
    fn default() -> Self {
        Self::DeterministicZero
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct SourceChecksum {
    pub file_name: String,
    pub sha256: String,
}

impl SourceChecksum {
    #[must_use]
    pub fn new(file_name: String, sha256: String) -> Self {
        Self { file_name, sha256 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct TableStats {
    pub row_count: u64,
}

impl TableStats {
    #[must_use]
    pub fn new(row_count: u64) -> Self {
        Self { row_count }
    }
}

/// Manifest of one archive assembly run: which source files went in (by
/// checksum), which tables came out (by row count), and under what
/// toolchain. Written as canonical JSON next to the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct ArchiveManifest {
    pub manifest_version: String,
    pub db_schema_version: String,
    pub sources: BTreeMap<String, SourceChecksum>,
    pub tables: BTreeMap<String, TableStats>,
    pub sqlite_sha256: String,
    #[serde(default)]
    pub toolchain: String,
    #[serde(default)]
    pub created_at: String,
}

impl ArchiveManifest {
    #[must_use]
    pub fn new(db_schema_version: String) -> Self {
        Self {
            manifest_version: MANIFEST_VERSION.to_string(),
            db_schema_version,
            sources: BTreeMap::new(),
            tables: BTreeMap::new(),
            sqlite_sha256: String::new(),
            toolchain: String::new(),
            created_at: String::new(),
        }
    }

    pub fn validate_strict(&self) -> Result<(), crate::ValidationError> {
        if self.manifest_version != MANIFEST_VERSION {
            return Err(crate::ValidationError(format!(
                "unsupported manifest version: {}",
                self.manifest_version
            )));
        }
        if self.sqlite_sha256.is_empty() {
            return Err(crate::ValidationError(
                "manifest is missing the sqlite checksum".to_string(),
            ));
        }
        if self.tables.is_empty() {
            return Err(crate::ValidationError(
                "manifest lists no tables".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_validation_rejects_empty_manifest() {
        let manifest = ArchiveManifest::new("2".to_string());
        assert!(manifest.validate_strict().is_err());
    }

    #[test]
    fn strict_validation_accepts_populated_manifest() {
        let mut manifest = ArchiveManifest::new("2".to_string());
        manifest.sqlite_sha256 = "deadbeef".to_string();
        manifest
            .tables
            .insert("necir_cso_2011".to_string(), TableStats::new(218));
        assert!(manifest.validate_strict().is_ok());
    }
}
