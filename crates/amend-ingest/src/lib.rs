// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Dataset ingestion for the AMEND archive.
//!
//! Each source dataset has an independent build step (fetch → parse →
//! normalize); [`assemble_archive`] then writes every parsed dataset into
//! one SQLite database and emits a checksummed manifest. Steps are
//! idempotent: the same local source files always produce the same tables.

mod census;
mod eea_portal;
mod ejscreen;
mod enforcement;
mod fetch;
mod logging;
mod manifest;
mod necir_cso;
mod normalize;
mod penalty;
mod sqlite;

use amend_model::{ArchiveManifest, MatchReport, MunicipalityMatchPolicy, TimestampPolicy};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const CRATE_NAME: &str = "amend-ingest";

pub use census::{build_census, CensusBuild};
pub use eea_portal::{fetch_portal_incidents, parse_results_page, PortalBuild};
pub use ejscreen::{build_ejscreen, EjscreenBuild};
pub use enforcement::{
    build_enforcement, fetch_enforcement_pages, EnforcementBuild, ORDER_TYPES,
};
pub use fetch::FetchClient;
pub use logging::{BuildEvent, BuildLog, BuildStage};
pub use manifest::{build_and_write_manifest, ARCHIVE_TABLES, SOURCE_TABLES};
pub use necir_cso::{build_necir_cso, safe_float, NecirCsoBuild, NECIR_CSO_YEAR};
pub use normalize::{annotate_municipalities, extract_proper_nouns, TownIndex};
pub use penalty::extract_penalty;
pub use sqlite::{
    create_archive, finalize_archive, insert_block_group_profiles, insert_cso_outfalls,
    insert_enforcement_actions, insert_fit_summaries, insert_geo_rollup_rows,
    insert_indicator_rollup_rows, insert_meta, insert_portal_incidents, insert_towns,
    read_block_group_profiles, read_cso_outfalls, read_towns, table_row_count,
    SQLITE_SCHEMA_VERSION,
};

#[derive(Debug)]
pub struct IngestError(pub String);

impl Display for IngestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IngestError {}

/// Inputs for one archive assembly run. All paths are local files already
/// fetched by the per-dataset fetch steps; assembly itself never touches
/// the network.
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    pub db_path: PathBuf,
    pub manifest_path: PathBuf,
    pub necir_csv: PathBuf,
    pub ejscreen_csv: PathBuf,
    pub census_csv: PathBuf,
    /// (year, saved HTML page) pairs; empty to skip the dataset.
    pub enforcement_html: Vec<(u16, PathBuf)>,
    /// Saved portal API responses (one JSON page body per file); empty to
    /// skip the dataset.
    pub portal_json: Vec<PathBuf>,
    pub state_name: String,
    pub match_policy: MunicipalityMatchPolicy,
    pub timestamp_policy: TimestampPolicy,
    /// Wall-clock stamp recorded in the manifest under
    /// [`TimestampPolicy::WallClock`]; ignored otherwise. Supplied by the
    /// caller so this crate stays clock-free and replayable.
    pub created_at: String,
}

#[derive(Debug)]
pub struct AssembleResult {
    pub manifest: ArchiveManifest,
    pub sqlite_path: PathBuf,
    pub manifest_path: PathBuf,
    pub municipality_match_report: MatchReport,
    pub events: Vec<BuildEvent>,
}

/// Parse every local source dataset and write the unified archive.
///
/// The canonical municipality table loads first (it drives the record
/// normalizer); a failure in any dataset's parse aborts the whole
/// assembly with the dataset named in the error.
pub fn assemble_archive(opts: &AssembleOptions) -> Result<AssembleResult, IngestError> {
    let mut log = BuildLog::default();
    log.emit(
        BuildStage::Persist,
        "assemble.begin",
        [("db".to_string(), opts.db_path.display().to_string())].into(),
    );

    let census = build_census(&opts.census_csv)?;
    let towns_index = TownIndex::new(&census.towns, opts.match_policy.clone());

    let necir = build_necir_cso(&opts.necir_csv, &towns_index)?;
    let ejscreen = build_ejscreen(&opts.ejscreen_csv, &opts.state_name)?;

    let mut enforcement_pages = Vec::with_capacity(opts.enforcement_html.len());
    for (year, path) in &opts.enforcement_html {
        let html = std::fs::read_to_string(path)
            .map_err(|e| IngestError(format!("MADEP_enforcement: {}: {e}", path.display())))?;
        enforcement_pages.push((*year, html));
    }
    let enforcement = build_enforcement(&enforcement_pages, &towns_index)?;

    let mut incidents = Vec::new();
    for path in &opts.portal_json {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| IngestError(format!("EEADP_CSO: {}: {e}", path.display())))?;
        let body: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| IngestError(format!("EEADP_CSO: {}: {e}", path.display())))?;
        incidents.extend(parse_results_page(&body)?);
    }

    let mut conn = create_archive(&opts.db_path)?;
    insert_towns(&mut conn, &census.towns)?;
    insert_cso_outfalls(&mut conn, &necir.outfalls, &necir.canonical_municipalities)?;
    insert_block_group_profiles(&mut conn, &ejscreen.profiles)?;
    insert_enforcement_actions(&mut conn, &enforcement.actions)?;
    insert_portal_incidents(&mut conn, &incidents)?;
    insert_meta(
        &conn,
        "municipality_unmatched",
        &necir.match_report.unmatched.to_string(),
    )?;
    insert_meta(&conn, "ejscreen_rows_skipped", &ejscreen.skipped_rows.to_string())?;
    finalize_archive(&conn)?;
    drop(conn);
    log.emit(BuildStage::Persist, "assemble.tables.complete", Default::default());

    let mut sources = vec![
        ("Census_ACS".to_string(), opts.census_csv.clone()),
        ("NECIR_CSO".to_string(), opts.necir_csv.clone()),
        ("EPA_EJSCREEN".to_string(), opts.ejscreen_csv.clone()),
    ];
    for (year, path) in &opts.enforcement_html {
        sources.push((format!("MADEP_enforcement_{year}"), path.clone()));
    }
    for (i, path) in opts.portal_json.iter().enumerate() {
        sources.push((format!("EEADP_CSO_page_{i}"), path.clone()));
    }
    let manifest = build_and_write_manifest(
        &opts.db_path,
        &opts.manifest_path,
        &sources,
        opts.timestamp_policy,
        &opts.created_at,
    )?;
    log.emit(BuildStage::Finalize, "assemble.manifest.complete", Default::default());

    let mut events = Vec::new();
    events.extend_from_slice(census.log.events());
    events.extend_from_slice(necir.log.events());
    events.extend_from_slice(ejscreen.log.events());
    events.extend_from_slice(enforcement.log.events());
    events.extend_from_slice(log.events());

    Ok(AssembleResult {
        manifest,
        sqlite_path: opts.db_path.clone(),
        manifest_path: opts.manifest_path.clone(),
        municipality_match_report: necir.match_report,
        events,
    })
}
