// SPDX-License-Identifier: Apache-2.0

//! NECIR 2011 CSO survey ingestion: one CSV row per outfall, with
//! municipality, receiving water, coordinates, and annual discharge
//! volume/count. Numeric fields are best-effort: an unparseable figure
//! becomes `None` rather than failing the row.

use crate::logging::{BuildLog, BuildStage};
use crate::normalize::TownIndex;
use crate::IngestError;
use amend_model::{CsoOutfall, MatchReport};
use std::path::Path;

pub const NECIR_CSO_YEAR: u16 = 2011;

/// Result of one NECIR CSO build: parsed outfalls, canonical-name
/// resolutions per outfall (indexed alongside), and the match tally.
#[derive(Debug)]
pub struct NecirCsoBuild {
    pub outfalls: Vec<CsoOutfall>,
    pub canonical_municipalities: Vec<Option<String>>,
    pub match_report: MatchReport,
    pub log: BuildLog,
}

pub fn build_necir_cso(csv_path: &Path, towns: &TownIndex) -> Result<NecirCsoBuild, IngestError> {
    let mut log = BuildLog::default();
    log.emit(
        BuildStage::Parse,
        "necir_cso.parse.begin",
        [("path".to_string(), csv_path.display().to_string())].into(),
    );

    let mut reader = csv::Reader::from_path(csv_path)
        .map_err(|e| IngestError(format!("NECIR_CSO: {}: {e}", csv_path.display())))?;
    let headers = reader
        .headers()
        .map_err(|e| IngestError(format!("NECIR_CSO: header read failed: {e}")))?
        .clone();
    let col = |name: &str| headers.iter().position(|h| h == name);

    let idx_municipality = col("Municipality")
        .ok_or_else(|| IngestError("NECIR_CSO: missing Municipality column".to_string()))?;
    let idx_body = col("DischargesBody")
        .ok_or_else(|| IngestError("NECIR_CSO: missing DischargesBody column".to_string()))?;
    let idx_address = col("Nearest_Pipe_Address");
    let idx_lat = col("Latitude")
        .ok_or_else(|| IngestError("NECIR_CSO: missing Latitude column".to_string()))?;
    let idx_lon = col("Longitude")
        .ok_or_else(|| IngestError("NECIR_CSO: missing Longitude column".to_string()))?;
    let idx_vol = col("2011_Discharges_MGal")
        .ok_or_else(|| IngestError("NECIR_CSO: missing 2011_Discharges_MGal column".to_string()))?;
    let idx_n = col("2011_Discharge_N")
        .ok_or_else(|| IngestError("NECIR_CSO: missing 2011_Discharge_N column".to_string()))?;
    let idx_outfall = col("Outfall_ID");

    let mut outfalls = Vec::new();
    let mut canonical_municipalities = Vec::new();
    let mut match_report = MatchReport::default();

    for (row_i, record) in reader.records().enumerate() {
        let record =
            record.map_err(|e| IngestError(format!("NECIR_CSO: row {}: {e}", row_i + 2)))?;
        let field = |idx: usize| record.get(idx).unwrap_or_default().trim().to_string();
        let municipality_raw = field(idx_municipality);

        let outfall = CsoOutfall {
            outfall_id: idx_outfall
                .map(field)
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| format!("cso-{:03}", row_i + 1)),
            municipality_raw: municipality_raw.clone(),
            receiving_water: field(idx_body),
            nearest_pipe_address: idx_address.map(field).unwrap_or_default(),
            latitude: safe_float(&field(idx_lat)),
            longitude: safe_float(&field(idx_lon)),
            discharge_mgal: safe_float(&field(idx_vol)),
            discharge_count: safe_float(&field(idx_n)),
            year: NECIR_CSO_YEAR,
        };
        let canonical = towns
            .resolve(&municipality_raw, &mut match_report)
            .canonical()
            .map(ToString::to_string);
        outfalls.push(outfall);
        canonical_municipalities.push(canonical);
    }

    log.emit_count(BuildStage::Parse, "necir_cso.rows", outfalls.len() as u64);
    log.emit_count(
        BuildStage::Normalize,
        "necir_cso.municipality.unmatched",
        match_report.unmatched,
    );
    Ok(NecirCsoBuild {
        outfalls,
        canonical_municipalities,
        match_report,
        log,
    })
}

/// Parse a figure that may be empty, "N/A", or comma-grouped. Mirrors the
/// archive's safe-float treatment: failures are `None`, not errors.
#[must_use]
pub fn safe_float(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use amend_model::MunicipalityMatchPolicy;
    use amend_model::TownPopulation;
    use std::fs;
    use tempfile::tempdir;

    fn town_index() -> TownIndex {
        let towns = vec![
            TownPopulation::new("Boston", 667_137).expect("town"),
            TownPopulation::new("Chelsea", 39_690).expect("town"),
        ];
        TownIndex::new(&towns, MunicipalityMatchPolicy::default())
    }

    #[test]
    fn parses_rows_and_resolves_municipalities() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("necir.csv");
        fs::write(
            &path,
            "Municipality,DischargesBody,Nearest_Pipe_Address,Latitude,Longitude,2011_Discharges_MGal,2011_Discharge_N\n\
             City of Boston,Boston Harbor,1 Pipe Rd,42.35,-71.05,12.5,8\n\
             Chelsea,Chelsea Creek,,42.39,-71.03,N/A,3\n",
        )
        .expect("write csv");

        let build = build_necir_cso(&path, &town_index()).expect("build");
        assert_eq!(build.outfalls.len(), 2);
        assert_eq!(build.canonical_municipalities[0].as_deref(), Some("Boston"));
        assert_eq!(build.outfalls[0].discharge_mgal, Some(12.5));
        assert_eq!(build.outfalls[1].discharge_mgal, None);
        assert_eq!(build.outfalls[1].outfall_id, "cso-002");
        assert_eq!(build.match_report.exact + build.match_report.alias, 2);
    }

    #[test]
    fn missing_required_column_fails_with_dataset_name() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("necir.csv");
        fs::write(&path, "Municipality,Latitude\nBoston,42.3\n").expect("write csv");
        let err = build_necir_cso(&path, &town_index()).unwrap_err();
        assert!(err.0.contains("NECIR_CSO"));
    }

    #[test]
    fn safe_float_handles_separators_and_garbage() {
        assert_eq!(safe_float("1,234.5"), Some(1234.5));
        assert_eq!(safe_float(" 7 "), Some(7.0));
        assert_eq!(safe_float("N/A"), None);
        assert_eq!(safe_float(""), None);
    }
}
