// SPDX-License-Identifier: Apache-2.0

//! Census ACS municipal-subdivision ingestion. This table doubles as the
//! canonical municipality list for the record normalizer, so it loads
//! strictly: a bad row here would corrupt every downstream match.

use crate::logging::{BuildLog, BuildStage};
use crate::necir_cso::safe_float;
use crate::IngestError;
use amend_model::TownPopulation;
use std::path::Path;

#[derive(Debug)]
pub struct CensusBuild {
    pub towns: Vec<TownPopulation>,
    pub log: BuildLog,
}

pub fn build_census(csv_path: &Path) -> Result<CensusBuild, IngestError> {
    let mut log = BuildLog::default();
    log.emit(
        BuildStage::Parse,
        "census_acs.parse.begin",
        [("path".to_string(), csv_path.display().to_string())].into(),
    );

    let mut reader = csv::Reader::from_path(csv_path)
        .map_err(|e| IngestError(format!("Census_ACS: {}: {e}", csv_path.display())))?;
    let headers = reader
        .headers()
        .map_err(|e| IngestError(format!("Census_ACS: header read failed: {e}")))?
        .clone();
    let col = |name: &str| headers.iter().position(|h| h == name);

    let idx_name = col("Subdivision")
        .ok_or_else(|| IngestError("Census_ACS: missing Subdivision column".to_string()))?;
    let idx_pop = col("population_acs52014")
        .ok_or_else(|| IngestError("Census_ACS: missing population_acs52014 column".to_string()))?;
    let idx_income = col("per_capita_income_acs52014");

    let mut towns = Vec::new();
    for (row_i, record) in reader.records().enumerate() {
        let record =
            record.map_err(|e| IngestError(format!("Census_ACS: row {}: {e}", row_i + 2)))?;
        let field = |idx: usize| record.get(idx).unwrap_or_default().trim();
        let population = safe_float(field(idx_pop))
            .map(|v| v as u64)
            .ok_or_else(|| {
                IngestError(format!(
                    "Census_ACS: row {}: unparseable population {:?}",
                    row_i + 2,
                    field(idx_pop)
                ))
            })?;
        let mut town = TownPopulation::new(field(idx_name), population)
            .map_err(|e| IngestError(format!("Census_ACS: row {}: {e}", row_i + 2)))?;
        town.per_capita_income = idx_income.and_then(|idx| safe_float(field(idx)));
        towns.push(town);
    }

    if towns.is_empty() {
        return Err(IngestError(
            "Census_ACS: no municipality rows parsed; canonical table would be empty".to_string(),
        ));
    }
    log.emit_count(BuildStage::Parse, "census_acs.rows", towns.len() as u64);
    Ok(CensusBuild { towns, log })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn parses_towns_with_optional_income() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("census.csv");
        fs::write(
            &path,
            "population_acs52014,per_capita_income_acs52014,Subdivision\n\
             667137,35485,Boston\n\
             39690,,Chelsea\n",
        )
        .expect("write csv");
        let build = build_census(&path).expect("build");
        assert_eq!(build.towns.len(), 2);
        assert_eq!(build.towns[0].name, "Boston");
        assert_eq!(build.towns[0].per_capita_income, Some(35485.0));
        assert_eq!(build.towns[1].per_capita_income, None);
    }

    #[test]
    fn empty_table_is_an_error() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("census.csv");
        fs::write(&path, "population_acs52014,Subdivision\n").expect("write csv");
        assert!(build_census(&path).is_err());
    }

    #[test]
    fn unparseable_population_is_an_error() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("census.csv");
        fs::write(&path, "population_acs52014,Subdivision\nmany,Boston\n").expect("write csv");
        let err = build_census(&path).unwrap_err();
        assert!(err.0.contains("population"));
    }
}
