// SPDX-License-Identifier: Apache-2.0

use crate::sqlite::table_row_count;
use crate::IngestError;
use amend_core::{canonical, sha256_hex};
use amend_model::{ArchiveManifest, SourceChecksum, TableStats, TimestampPolicy};
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};

/// Tables populated directly from source files. The manifest counts only
/// these: analysis tables are filled by a later step and validated
/// against the archive as assembled.
pub const SOURCE_TABLES: &[&str] = &[
    "necir_cso_2011",
    "epa_ejscreen",
    "census_acs",
    "madep_enforcement",
    "eea_portal_cso",
];

/// Every table in the archive schema, source and derived.
pub const ARCHIVE_TABLES: &[&str] = &[
    "necir_cso_2011",
    "epa_ejscreen",
    "census_acs",
    "madep_enforcement",
    "eea_portal_cso",
    "geo_rollup",
    "indicator_rollup",
    "fit_summary",
];

/// Build the archive manifest: checksum every source file, count every
/// source table, checksum the database itself. Must run after the writing
/// connection has closed so the file on disk is the final artifact.
pub fn build_and_write_manifest(
    db_path: &Path,
    manifest_path: &Path,
    sources: &[(String, PathBuf)],
    timestamp_policy: TimestampPolicy,
    created_at_wall_clock: &str,
) -> Result<ArchiveManifest, IngestError> {
    let conn = Connection::open(db_path).map_err(|e| IngestError(e.to_string()))?;
    let schema_version: i64 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| IngestError(e.to_string()))?;

    let mut manifest = ArchiveManifest::new(schema_version.to_string());
    for (dataset, path) in sources {
        let bytes = fs::read(path)
            .map_err(|e| IngestError(format!("{dataset}: {}: {e}", path.display())))?;
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        manifest.sources.insert(
            dataset.clone(),
            SourceChecksum::new(file_name, sha256_hex(&bytes)),
        );
    }
    for table in SOURCE_TABLES {
        manifest
            .tables
            .insert((*table).to_string(), TableStats::new(table_row_count(&conn, table)?));
    }
    drop(conn);

    manifest.sqlite_sha256 =
        sha256_hex(&fs::read(db_path).map_err(|e| IngestError(e.to_string()))?);
    manifest.toolchain = option_env!("RUSTUP_TOOLCHAIN").unwrap_or("unknown").to_string();
    manifest.created_at = match timestamp_policy {
        TimestampPolicy::DeterministicZero => String::new(),
        TimestampPolicy::WallClock => created_at_wall_clock.to_string(),
    };

    let bytes = canonical::stable_json_bytes(&manifest).map_err(|e| IngestError(e.to_string()))?;
    fs::write(manifest_path, bytes).map_err(|e| IngestError(e.to_string()))?;
    Ok(manifest)
}
