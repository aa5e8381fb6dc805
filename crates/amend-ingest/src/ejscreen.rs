// SPDX-License-Identifier: Apache-2.0

//! EPA EJSCREEN ingestion: per-block-group demographic indicators,
//! filtered to one state. The 2023 vintage's `PEOPCOLORPCT` column is
//! accepted as `MINORPCT` (the archive-standard name).

use crate::logging::{BuildLog, BuildStage};
use crate::necir_cso::safe_float;
use crate::IngestError;
use amend_model::{BlockGroupId, BlockGroupProfile, IndicatorValue};
use std::path::Path;

#[derive(Debug)]
pub struct EjscreenBuild {
    pub profiles: Vec<BlockGroupProfile>,
    /// Rows skipped for a missing/unparseable population or indicator.
    pub skipped_rows: u64,
    pub log: BuildLog,
}

pub fn build_ejscreen(csv_path: &Path, state_name: &str) -> Result<EjscreenBuild, IngestError> {
    let mut log = BuildLog::default();
    log.emit(
        BuildStage::Parse,
        "ejscreen.parse.begin",
        [
            ("path".to_string(), csv_path.display().to_string()),
            ("state".to_string(), state_name.to_string()),
        ]
        .into(),
    );

    let mut reader = csv::Reader::from_path(csv_path)
        .map_err(|e| IngestError(format!("EPA_EJSCREEN: {}: {e}", csv_path.display())))?;
    let headers = reader
        .headers()
        .map_err(|e| IngestError(format!("EPA_EJSCREEN: header read failed: {e}")))?
        .clone();
    let col = |name: &str| headers.iter().position(|h| h == name);

    let idx_id = col("ID")
        .ok_or_else(|| IngestError("EPA_EJSCREEN: missing ID column".to_string()))?;
    let idx_state = col("STATE_NAME")
        .ok_or_else(|| IngestError("EPA_EJSCREEN: missing STATE_NAME column".to_string()))?;
    let idx_pop = col("ACSTOTPOP")
        .ok_or_else(|| IngestError("EPA_EJSCREEN: missing ACSTOTPOP column".to_string()))?;
    let idx_minor = col("MINORPCT").or_else(|| col("PEOPCOLORPCT")).ok_or_else(|| {
        IngestError("EPA_EJSCREEN: missing MINORPCT/PEOPCOLORPCT column".to_string())
    })?;
    let idx_lowinc = col("LOWINCPCT")
        .ok_or_else(|| IngestError("EPA_EJSCREEN: missing LOWINCPCT column".to_string()))?;
    let idx_lingiso = col("LINGISOPCT")
        .ok_or_else(|| IngestError("EPA_EJSCREEN: missing LINGISOPCT column".to_string()))?;
    let idx_over64 = col("OVER64PCT")
        .ok_or_else(|| IngestError("EPA_EJSCREEN: missing OVER64PCT column".to_string()))?;

    let mut profiles = Vec::new();
    let mut skipped_rows = 0u64;
    for (row_i, record) in reader.records().enumerate() {
        let record =
            record.map_err(|e| IngestError(format!("EPA_EJSCREEN: row {}: {e}", row_i + 2)))?;
        let field = |idx: usize| record.get(idx).unwrap_or_default().trim();
        if field(idx_state) != state_name {
            continue;
        }

        let block_group = BlockGroupId::parse(field(idx_id))
            .map_err(|e| IngestError(format!("EPA_EJSCREEN: row {}: {e}", row_i + 2)))?;
        let Some(population) = safe_float(field(idx_pop)).map(|v| v as u64) else {
            skipped_rows += 1;
            continue;
        };
        let indicator = |idx: usize, name: &str| -> Result<Option<IndicatorValue>, IngestError> {
            match safe_float(field(idx)) {
                None => Ok(None),
                Some(raw) => IndicatorValue::parse(raw)
                    .map(Some)
                    .map_err(|e| IngestError(format!("EPA_EJSCREEN: row {} {name}: {e}", row_i + 2))),
            }
        };

        // Range violations are validation errors; absent values skip the row.
        let minor = indicator(idx_minor, "MINORPCT")?;
        let lowinc = indicator(idx_lowinc, "LOWINCPCT")?;
        let lingiso = indicator(idx_lingiso, "LINGISOPCT")?;
        let over64 = indicator(idx_over64, "OVER64PCT")?;
        let (Some(minority_pct), Some(low_income_pct), Some(linguistic_iso_pct), Some(over64_pct)) =
            (minor, lowinc, lingiso, over64)
        else {
            skipped_rows += 1;
            continue;
        };

        profiles.push(BlockGroupProfile {
            block_group,
            population,
            minority_pct,
            low_income_pct,
            linguistic_iso_pct,
            over64_pct,
        });
    }

    log.emit_count(BuildStage::Parse, "ejscreen.rows", profiles.len() as u64);
    log.emit_count(BuildStage::Parse, "ejscreen.rows.skipped", skipped_rows);
    Ok(EjscreenBuild {
        profiles,
        skipped_rows,
        log,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const HEADER: &str = "ID,STATE_NAME,ACSTOTPOP,MINORPCT,LOWINCPCT,LINGISOPCT,OVER64PCT\n";

    #[test]
    fn filters_to_state_and_parses_profiles() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("ejscreen.csv");
        fs::write(
            &path,
            format!(
                "{HEADER}\
                 250250001001,Massachusetts,1200,0.42,0.31,0.12,0.18\n\
                 090010001001,Connecticut,900,0.2,0.2,0.2,0.2\n\
                 250250001002,Massachusetts,800,0.15,,0.05,0.22\n"
            ),
        )
        .expect("write csv");

        let build = build_ejscreen(&path, "Massachusetts").expect("build");
        assert_eq!(build.profiles.len(), 1);
        assert_eq!(build.profiles[0].block_group.as_str(), "250250001001");
        assert_eq!(build.profiles[0].population, 1200);
        assert_eq!(build.skipped_rows, 1);
    }

    #[test]
    fn out_of_range_indicator_is_a_validation_error() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("ejscreen.csv");
        fs::write(
            &path,
            format!("{HEADER}250250001001,Massachusetts,1200,1.42,0.31,0.12,0.18\n"),
        )
        .expect("write csv");
        let err = build_ejscreen(&path, "Massachusetts").unwrap_err();
        assert!(err.0.contains("MINORPCT"));
        assert!(err.0.contains("[0,1]"));
    }

    #[test]
    fn people_of_color_header_is_accepted_as_minority_pct() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("ejscreen2023.csv");
        fs::write(
            &path,
            "ID,STATE_NAME,ACSTOTPOP,PEOPCOLORPCT,LOWINCPCT,LINGISOPCT,OVER64PCT\n\
             250250001001,Massachusetts,1000,0.5,0.4,0.3,0.2\n",
        )
        .expect("write csv");
        let build = build_ejscreen(&path, "Massachusetts").expect("build");
        assert_eq!(build.profiles[0].minority_pct.get(), 0.5);
    }
}
