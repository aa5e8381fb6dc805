// SPDX-License-Identifier: Apache-2.0

//! EEA data portal CSO incident ingestion. The portal's incident API pages
//! through results; an empty `results` array ends the walk.

use crate::fetch::FetchClient;
use crate::logging::{BuildLog, BuildStage};
use crate::IngestError;
use amend_model::PortalIncident;
use serde_json::Value;

/// Hard cap on pages walked, against a misbehaving endpoint that never
/// returns an empty page.
const MAX_PAGES: u32 = 500;

#[derive(Debug)]
pub struct PortalBuild {
    pub incidents: Vec<PortalIncident>,
    pub pages_fetched: u32,
    pub log: BuildLog,
}

/// Walk the incident API from page 0 until an empty page.
///
/// `base_url` already carries the fixed query parameters (page size,
/// reporter class, date window); this appends `pageNumber`.
pub fn fetch_portal_incidents(
    client: &FetchClient,
    base_url: &str,
) -> Result<PortalBuild, IngestError> {
    let mut log = BuildLog::default();
    let mut incidents = Vec::new();
    let mut pages_fetched = 0u32;

    for page in 0..MAX_PAGES {
        let sep = if base_url.contains('?') { '&' } else { '?' };
        let url = format!("{base_url}{sep}pageNumber={page}");
        log.emit(
            BuildStage::Fetch,
            "eea_portal.page",
            [("page".to_string(), page.to_string())].into(),
        );
        let body = client.get_json(&url)?;
        let results = parse_results_page(&body)?;
        pages_fetched += 1;
        if results.is_empty() {
            log.emit_count(BuildStage::Fetch, "eea_portal.incidents", incidents.len() as u64);
            return Ok(PortalBuild {
                incidents,
                pages_fetched,
                log,
            });
        }
        incidents.extend(results);
    }

    Err(IngestError(format!(
        "EEADP_CSO: exceeded {MAX_PAGES} pages without an empty page; aborting"
    )))
}

pub fn parse_results_page(body: &Value) -> Result<Vec<PortalIncident>, IngestError> {
    let results = body
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| IngestError("EEADP_CSO: response has no results array".to_string()))?;
    results
        .iter()
        .map(|row| {
            serde_json::from_value(row.clone())
                .map_err(|e| IngestError(format!("EEADP_CSO: bad incident row: {e}")))
        })
        .collect()
}
