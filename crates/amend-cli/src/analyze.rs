// SPDX-License-Identifier: Apache-2.0

//! The analysis step: spatial joins, population-weighted rollups, and the
//! power-law regression fits, reading from and writing back to the
//! assembled archive.

use amend_geo::{
    assign_points, load_feature_collection, rollup_indicators, rollup_magnitudes, GeoFeature,
    Point,
};
use amend_ingest::{
    insert_fit_summaries, insert_geo_rollup_rows, insert_indicator_rollup_rows, insert_meta,
    read_block_group_profiles, read_cso_outfalls,
};
use amend_model::{
    AssignmentReport, BlockGroupProfile, FitSummary, GeoLevel, GeoUnitId, IndicatorKind,
};
use amend_stats::{fit_power_law, FitInput, FitOptions};
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Indicators the correlation analysis fits, as in the source archive.
const FIT_INDICATORS: [IndicatorKind; 3] = [
    IndicatorKind::MinorityPct,
    IndicatorKind::LowIncomePct,
    IndicatorKind::LinguisticIsoPct,
];

pub struct AnalyzeArgs {
    pub db: PathBuf,
    pub blockgroups_geojson: PathBuf,
    pub towns_geojson: PathBuf,
    pub watersheds_geojson: PathBuf,
    pub facts_out: PathBuf,
    pub export_dir: Option<PathBuf>,
    pub seed: u64,
}

pub fn run_analyze(args: &AnalyzeArgs) -> Result<(), String> {
    let mut conn = Connection::open(&args.db).map_err(|e| e.to_string())?;

    let outfalls = read_cso_outfalls(&conn).map_err(|e| e.to_string())?;
    let profiles = read_block_group_profiles(&conn).map_err(|e| e.to_string())?;

    let blockgroups =
        load_feature_collection(&args.blockgroups_geojson, "GEOID").map_err(|e| e.to_string())?;
    let towns =
        load_feature_collection(&args.towns_geojson, "TOWN").map_err(|e| e.to_string())?;
    let watersheds =
        load_feature_collection(&args.watersheds_geojson, "NAME").map_err(|e| e.to_string())?;

    // Outfall points -> block groups.
    let mut outfall_report = AssignmentReport::default();
    let points: Vec<Option<Point>> = outfalls
        .iter()
        .map(|(o, _)| o.location().map(|(lon, lat)| Point::new(lon, lat)))
        .collect();
    let outfall_bg: Vec<Option<GeoUnitId>> = assign_points(&points, &blockgroups, &mut outfall_report)
        .into_iter()
        .map(|a| a.unit_id)
        .collect();
    tracing::info!(
        total = outfall_report.total_observations(),
        assigned = outfall_report.assigned,
        unmatched = outfall_report.unmatched,
        missing = outfall_report.missing_coordinates,
        "outfall block-group assignment"
    );

    // Block-group centroids -> parent municipality and watershed.
    let mut centroid_report = AssignmentReport::default();
    let bg_centroids: Vec<Option<Point>> = profiles
        .iter()
        .map(|p| centroid_of(&blockgroups, p))
        .collect();
    let bg_town: Vec<Option<GeoUnitId>> = assign_points(&bg_centroids, &towns, &mut centroid_report)
        .into_iter()
        .map(|a| a.unit_id)
        .collect();
    let bg_watershed: Vec<Option<GeoUnitId>> =
        assign_points(&bg_centroids, &watersheds, &mut centroid_report)
            .into_iter()
            .map(|a| a.unit_id)
            .collect();

    // Discharge rollups per level. Municipality and watershed totals go
    // through the outfall's block group, as the source analysis does.
    let bg_index: BTreeMap<&str, usize> = profiles
        .iter()
        .enumerate()
        .map(|(i, p)| (p.block_group.as_str(), i))
        .collect();
    let outfall_town: Vec<Option<GeoUnitId>> =
        reassign_via_block_group(&outfall_bg, &bg_index, &bg_town);
    let outfall_watershed: Vec<Option<GeoUnitId>> =
        reassign_via_block_group(&outfall_bg, &bg_index, &bg_watershed);

    let volumes: Vec<Option<f64>> = outfalls.iter().map(|(o, _)| o.discharge_mgal).collect();
    let counts: Vec<Option<f64>> = outfalls.iter().map(|(o, _)| o.discharge_count).collect();

    for (level, assignment) in [
        (GeoLevel::BlockGroup, &outfall_bg),
        (GeoLevel::Municipality, &outfall_town),
        (GeoLevel::Watershed, &outfall_watershed),
    ] {
        let rollup = rollup_magnitudes(assignment, &volumes, &counts);
        let rows: Vec<(String, f64, f64)> = rollup
            .iter()
            .map(|(unit, m)| (unit.as_str().to_string(), m.volume_mgal, m.event_count))
            .collect();
        insert_geo_rollup_rows(&mut conn, level, &rows).map_err(|e| e.to_string())?;
    }

    // Indicator rollups: raw values at block-group level, population-
    // weighted means at the coarser levels.
    let populations: Vec<u64> = profiles.iter().map(|p| p.population).collect();
    let mut indicator_rows: Vec<(String, IndicatorKind, f64, u64)> = Vec::new();
    for p in &profiles {
        for kind in IndicatorKind::ALL {
            indicator_rows.push((
                p.block_group.as_str().to_string(),
                kind,
                p.indicator(kind).get(),
                p.population,
            ));
        }
    }
    insert_indicator_rollup_rows(&mut conn, GeoLevel::BlockGroup, &indicator_rows)
        .map_err(|e| e.to_string())?;

    let mut watershed_indicator: BTreeMap<(GeoUnitId, IndicatorKind), f64> = BTreeMap::new();
    let mut watershed_population: BTreeMap<GeoUnitId, u64> = BTreeMap::new();
    for (level, membership) in [
        (GeoLevel::Municipality, &bg_town),
        (GeoLevel::Watershed, &bg_watershed),
    ] {
        let mut rows: Vec<(String, IndicatorKind, f64, u64)> = Vec::new();
        for kind in IndicatorKind::ALL {
            let values: Vec<f64> = profiles.iter().map(|p| p.indicator(kind).get()).collect();
            let rolled = rollup_indicators(
                membership,
                kind,
                &values,
                &populations,
                &mut centroid_report,
            );
            for row in rolled {
                if level == GeoLevel::Watershed {
                    watershed_indicator.insert((row.unit_id.clone(), kind), row.value);
                    watershed_population.insert(row.unit_id.clone(), row.population);
                }
                rows.push((
                    row.unit_id.as_str().to_string(),
                    row.indicator,
                    row.value,
                    row.population,
                ));
            }
        }
        insert_indicator_rollup_rows(&mut conn, level, &rows).map_err(|e| e.to_string())?;
    }
    insert_meta(
        &conn,
        "analysis_outfalls_unmatched",
        &outfall_report.unmatched.to_string(),
    )
    .map_err(|e| e.to_string())?;
    insert_meta(
        &conn,
        "analysis_outfalls_missing_coordinates",
        &outfall_report.missing_coordinates.to_string(),
    )
    .map_err(|e| e.to_string())?;

    // Regression: watershed-level indicator vs total discharge volume,
    // weighted by watershed population.
    let watershed_volume: BTreeMap<GeoUnitId, f64> =
        rollup_magnitudes(&outfall_watershed, &volumes, &counts)
            .into_iter()
            .map(|(unit, m)| (unit, m.volume_mgal))
            .collect();

    let mut fits: Vec<FitSummary> = Vec::new();
    let mut fact_lines: Vec<String> = Vec::new();
    for kind in FIT_INDICATORS {
        let mut rows: Vec<(f64, f64, f64)> = Vec::new();
        for (unit, &population) in &watershed_population {
            let Some(&x) = watershed_indicator.get(&(unit.clone(), kind)) else {
                continue;
            };
            let y = watershed_volume.get(unit).copied().unwrap_or(0.0);
            rows.push((x, y, population as f64));
        }
        let input = match FitInput::from_rows(&rows) {
            Ok(input) => input,
            Err(e) => {
                tracing::warn!(indicator = %kind, error = %e, "skipping regression fit");
                continue;
            }
        };
        let opts = FitOptions {
            seed: args.seed,
            ..FitOptions::default()
        };
        let fit = fit_power_law(&input, kind, &opts).map_err(|e| e.to_string())?;
        if !fit.converged {
            tracing::warn!(
                indicator = %kind,
                divergences = fit.diagnostics.divergences,
                rhat = fit.diagnostics.rhat_beta,
                "regression fit did not converge; reported as unreliable"
            );
        }
        fact_lines.push(fit.fact_line());
        fits.push(fit);
    }
    insert_fit_summaries(&mut conn, &fits).map_err(|e| e.to_string())?;

    fs::write(&args.facts_out, fact_lines.join("\n") + "\n").map_err(|e| e.to_string())?;

    if let Some(export_dir) = &args.export_dir {
        fs::create_dir_all(export_dir).map_err(|e| e.to_string())?;
        export_table_csv(
            &conn,
            "SELECT level, unit_id, volume_mgal, event_count FROM geo_rollup ORDER BY level, unit_id",
            &["level", "unit_id", "volume_mgal", "event_count"],
            &export_dir.join("geo_rollup.csv"),
        )?;
        export_table_csv(
            &conn,
            "SELECT level, unit_id, indicator, value, population FROM indicator_rollup ORDER BY level, unit_id, indicator",
            &["level", "unit_id", "indicator", "value", "population"],
            &export_dir.join("indicator_rollup.csv"),
        )?;
        export_table_csv(
            &conn,
            "SELECT indicator, beta_median, beta_low90, beta_high90, doubling_median, doubling_low90, doubling_high90, converged FROM fit_summary ORDER BY indicator",
            &[
                "indicator",
                "beta_median",
                "beta_low90",
                "beta_high90",
                "doubling_median",
                "doubling_low90",
                "doubling_high90",
                "converged",
            ],
            &export_dir.join("fit_summary.csv"),
        )?;
    }

    println!(
        "analyze: OK outfalls={} block_groups={} fits={}",
        outfalls.len(),
        profiles.len(),
        fits.len()
    );
    Ok(())
}

fn centroid_of(blockgroups: &[GeoFeature], profile: &BlockGroupProfile) -> Option<Point> {
    blockgroups
        .iter()
        .find(|f| f.unit_id.as_str() == profile.block_group.as_str())
        .and_then(|f| f.geometry.centroid())
}

/// Map an outfall's block-group assignment to that block group's parent
/// unit. Outfalls whose block group carries no profile row stay
/// unassigned at the coarser level.
fn reassign_via_block_group(
    outfall_bg: &[Option<GeoUnitId>],
    bg_index: &BTreeMap<&str, usize>,
    bg_parent: &[Option<GeoUnitId>],
) -> Vec<Option<GeoUnitId>> {
    outfall_bg
        .iter()
        .map(|bg| {
            bg.as_ref()
                .and_then(|unit| bg_index.get(unit.as_str()))
                .and_then(|&i| bg_parent[i].clone())
        })
        .collect()
}

fn export_table_csv(
    conn: &Connection,
    sql: &str,
    headers: &[&str],
    out: &Path,
) -> Result<(), String> {
    let mut writer = csv::Writer::from_path(out).map_err(|e| e.to_string())?;
    writer.write_record(headers).map_err(|e| e.to_string())?;
    let mut stmt = conn.prepare(sql).map_err(|e| e.to_string())?;
    let n_cols = headers.len();
    let mut rows = stmt.query([]).map_err(|e| e.to_string())?;
    while let Some(row) = rows.next().map_err(|e| e.to_string())? {
        let mut record = Vec::with_capacity(n_cols);
        for i in 0..n_cols {
            let value: rusqlite::types::Value = row.get(i).map_err(|e| e.to_string())?;
            record.push(match value {
                rusqlite::types::Value::Null => String::new(),
                rusqlite::types::Value::Integer(v) => v.to_string(),
                rusqlite::types::Value::Real(v) => v.to_string(),
                rusqlite::types::Value::Text(v) => v,
                rusqlite::types::Value::Blob(_) => String::new(),
            });
        }
        writer.write_record(&record).map_err(|e| e.to_string())?;
    }
    writer.flush().map_err(|e| e.to_string())
}
