// SPDX-License-Identifier: Apache-2.0

use crate::IngestError;
use amend_model::{
    BlockGroupId, BlockGroupProfile, CsoOutfall, EnforcementAction, FitSummary, GeoLevel,
    IndicatorKind, IndicatorValue, PenaltyConfidence, PortalIncident, TownPopulation,
};
use rusqlite::{params, Connection};
use std::fs;
use std::path::Path;

pub const SQLITE_SCHEMA_VERSION: i64 = 2;

/// Create a fresh archive database with the full schema. Any existing file
/// is replaced; assembly is a whole-archive rebuild, never an incremental
/// update.
pub fn create_archive(path: &Path) -> Result<Connection, IngestError> {
    if path.exists() {
        fs::remove_file(path).map_err(|e| IngestError(e.to_string()))?;
    }
    let conn = Connection::open(path).map_err(|e| IngestError(e.to_string()))?;
    conn.execute_batch(
        "
        PRAGMA journal_mode=WAL;
        PRAGMA synchronous=OFF;
        PRAGMA temp_store=MEMORY;
        PRAGMA cache_size=-32000;
        CREATE TABLE necir_cso_2011 (
          outfall_id TEXT PRIMARY KEY,
          municipality TEXT NOT NULL,
          municipality_canonical TEXT,
          receiving_water TEXT NOT NULL,
          nearest_pipe_address TEXT NOT NULL,
          latitude REAL,
          longitude REAL,
          discharge_mgal REAL,
          discharge_count REAL,
          year INTEGER NOT NULL
        ) WITHOUT ROWID;
        CREATE TABLE epa_ejscreen (
          block_group TEXT PRIMARY KEY,
          population INTEGER NOT NULL,
          minorpct REAL NOT NULL,
          lowincpct REAL NOT NULL,
          lingisopct REAL NOT NULL,
          over64pct REAL NOT NULL
        ) WITHOUT ROWID;
        CREATE TABLE census_acs (
          municipality TEXT PRIMARY KEY,
          population INTEGER NOT NULL,
          per_capita_income REAL
        ) WITHOUT ROWID;
        CREATE TABLE madep_enforcement (
          id INTEGER PRIMARY KEY,
          year INTEGER NOT NULL,
          date TEXT NOT NULL,
          text TEXT NOT NULL,
          penalty_dollars REAL,
          penalty_confidence TEXT NOT NULL,
          order_types TEXT NOT NULL,
          municipalities TEXT NOT NULL
        );
        CREATE TABLE eea_portal_cso (
          incident_id INTEGER PRIMARY KEY,
          municipality TEXT NOT NULL,
          water_body TEXT NOT NULL,
          incident_date TEXT NOT NULL,
          volume_gallons REAL,
          reporter_class TEXT NOT NULL,
          year INTEGER
        ) WITHOUT ROWID;
        CREATE TABLE geo_rollup (
          level TEXT NOT NULL,
          unit_id TEXT NOT NULL,
          volume_mgal REAL NOT NULL,
          event_count REAL NOT NULL,
          PRIMARY KEY (level, unit_id)
        ) WITHOUT ROWID;
        CREATE TABLE indicator_rollup (
          level TEXT NOT NULL,
          unit_id TEXT NOT NULL,
          indicator TEXT NOT NULL,
          value REAL NOT NULL,
          population INTEGER NOT NULL,
          PRIMARY KEY (level, unit_id, indicator)
        ) WITHOUT ROWID;
        CREATE TABLE fit_summary (
          indicator TEXT PRIMARY KEY,
          alpha_median REAL NOT NULL,
          sigma_median REAL NOT NULL,
          beta_median REAL NOT NULL,
          beta_low90 REAL NOT NULL,
          beta_high90 REAL NOT NULL,
          doubling_median REAL NOT NULL,
          doubling_low90 REAL NOT NULL,
          doubling_high90 REAL NOT NULL,
          converged INTEGER NOT NULL,
          divergences INTEGER NOT NULL,
          acceptance_rate REAL NOT NULL,
          rhat_beta REAL NOT NULL
        ) WITHOUT ROWID;
        CREATE TABLE archive_meta (
          k TEXT PRIMARY KEY,
          v TEXT NOT NULL
        ) WITHOUT ROWID;
        ",
    )
    .map_err(|e| IngestError(e.to_string()))?;
    conn.execute_batch(&format!("PRAGMA user_version={SQLITE_SCHEMA_VERSION};"))
        .map_err(|e| IngestError(e.to_string()))?;
    conn.execute(
        "INSERT INTO archive_meta (k, v) VALUES ('schema_version', ?1)",
        params![SQLITE_SCHEMA_VERSION.to_string()],
    )
    .map_err(|e| IngestError(e.to_string()))?;
    Ok(conn)
}

pub fn insert_meta(conn: &Connection, key: &str, value: &str) -> Result<(), IngestError> {
    conn.execute(
        "INSERT OR REPLACE INTO archive_meta (k, v) VALUES (?1, ?2)",
        params![key, value],
    )
    .map_err(|e| IngestError(e.to_string()))?;
    Ok(())
}

pub fn insert_cso_outfalls(
    conn: &mut Connection,
    outfalls: &[CsoOutfall],
    canonical: &[Option<String>],
) -> Result<(), IngestError> {
    let tx = conn.transaction().map_err(|e| IngestError(e.to_string()))?;
    {
        let mut stmt = tx
            .prepare(
                "INSERT INTO necir_cso_2011 (
                   outfall_id, municipality, municipality_canonical, receiving_water,
                   nearest_pipe_address, latitude, longitude, discharge_mgal,
                   discharge_count, year
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )
            .map_err(|e| IngestError(e.to_string()))?;
        for (i, o) in outfalls.iter().enumerate() {
            stmt.execute(params![
                o.outfall_id,
                o.municipality_raw,
                canonical.get(i).cloned().flatten(),
                o.receiving_water,
                o.nearest_pipe_address,
                o.latitude,
                o.longitude,
                o.discharge_mgal,
                o.discharge_count,
                o.year,
            ])
            .map_err(|e| IngestError(e.to_string()))?;
        }
    }
    tx.commit().map_err(|e| IngestError(e.to_string()))
}

pub fn insert_block_group_profiles(
    conn: &mut Connection,
    profiles: &[BlockGroupProfile],
) -> Result<(), IngestError> {
    let tx = conn.transaction().map_err(|e| IngestError(e.to_string()))?;
    {
        let mut stmt = tx
            .prepare(
                "INSERT INTO epa_ejscreen (
                   block_group, population, minorpct, lowincpct, lingisopct, over64pct
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .map_err(|e| IngestError(e.to_string()))?;
        for p in profiles {
            stmt.execute(params![
                p.block_group.as_str(),
                p.population as i64,
                p.minority_pct.get(),
                p.low_income_pct.get(),
                p.linguistic_iso_pct.get(),
                p.over64_pct.get(),
            ])
            .map_err(|e| IngestError(e.to_string()))?;
        }
    }
    tx.commit().map_err(|e| IngestError(e.to_string()))
}

pub fn insert_towns(conn: &mut Connection, towns: &[TownPopulation]) -> Result<(), IngestError> {
    let tx = conn.transaction().map_err(|e| IngestError(e.to_string()))?;
    {
        let mut stmt = tx
            .prepare(
                "INSERT INTO census_acs (municipality, population, per_capita_income)
                 VALUES (?1, ?2, ?3)",
            )
            .map_err(|e| IngestError(e.to_string()))?;
        for t in towns {
            stmt.execute(params![t.name, t.population as i64, t.per_capita_income])
                .map_err(|e| IngestError(e.to_string()))?;
        }
    }
    tx.commit().map_err(|e| IngestError(e.to_string()))
}

pub fn insert_enforcement_actions(
    conn: &mut Connection,
    actions: &[EnforcementAction],
) -> Result<(), IngestError> {
    let tx = conn.transaction().map_err(|e| IngestError(e.to_string()))?;
    {
        let mut stmt = tx
            .prepare(
                "INSERT INTO madep_enforcement (
                   id, year, date, text, penalty_dollars, penalty_confidence,
                   order_types, municipalities
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )
            .map_err(|e| IngestError(e.to_string()))?;
        for (i, a) in actions.iter().enumerate() {
            let confidence = match a.penalty_confidence {
                PenaltyConfidence::Single => "single",
                PenaltyConfidence::Ambiguous => "ambiguous",
                PenaltyConfidence::None => "none",
            };
            let order_types = serde_json::to_string(&a.order_types)
                .map_err(|e| IngestError(e.to_string()))?;
            let municipalities = serde_json::to_string(&a.municipalities)
                .map_err(|e| IngestError(e.to_string()))?;
            stmt.execute(params![
                (i + 1) as i64,
                a.year,
                a.date,
                a.text,
                a.penalty_dollars,
                confidence,
                order_types,
                municipalities,
            ])
            .map_err(|e| IngestError(e.to_string()))?;
        }
    }
    tx.commit().map_err(|e| IngestError(e.to_string()))
}

pub fn insert_portal_incidents(
    conn: &mut Connection,
    incidents: &[PortalIncident],
) -> Result<(), IngestError> {
    let tx = conn.transaction().map_err(|e| IngestError(e.to_string()))?;
    {
        let mut stmt = tx
            .prepare(
                "INSERT OR REPLACE INTO eea_portal_cso (
                   incident_id, municipality, water_body, incident_date,
                   volume_gallons, reporter_class, year
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .map_err(|e| IngestError(e.to_string()))?;
        for inc in incidents {
            stmt.execute(params![
                inc.incident_id,
                inc.municipality,
                inc.water_body,
                inc.incident_date,
                inc.volume_gallons,
                inc.reporter_class,
                inc.year(),
            ])
            .map_err(|e| IngestError(e.to_string()))?;
        }
    }
    tx.commit().map_err(|e| IngestError(e.to_string()))
}

pub fn insert_geo_rollup_rows(
    conn: &mut Connection,
    level: GeoLevel,
    rows: &[(String, f64, f64)],
) -> Result<(), IngestError> {
    let tx = conn.transaction().map_err(|e| IngestError(e.to_string()))?;
    {
        let mut stmt = tx
            .prepare(
                "INSERT OR REPLACE INTO geo_rollup (level, unit_id, volume_mgal, event_count)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .map_err(|e| IngestError(e.to_string()))?;
        for (unit_id, volume, count) in rows {
            stmt.execute(params![level.as_str(), unit_id, volume, count])
                .map_err(|e| IngestError(e.to_string()))?;
        }
    }
    tx.commit().map_err(|e| IngestError(e.to_string()))
}

pub fn insert_indicator_rollup_rows(
    conn: &mut Connection,
    level: GeoLevel,
    rows: &[(String, IndicatorKind, f64, u64)],
) -> Result<(), IngestError> {
    let tx = conn.transaction().map_err(|e| IngestError(e.to_string()))?;
    {
        let mut stmt = tx
            .prepare(
                "INSERT OR REPLACE INTO indicator_rollup (level, unit_id, indicator, value, population)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .map_err(|e| IngestError(e.to_string()))?;
        for (unit_id, indicator, value, population) in rows {
            stmt.execute(params![
                level.as_str(),
                unit_id,
                indicator.column(),
                value,
                *population as i64
            ])
            .map_err(|e| IngestError(e.to_string()))?;
        }
    }
    tx.commit().map_err(|e| IngestError(e.to_string()))
}

pub fn insert_fit_summaries(
    conn: &mut Connection,
    fits: &[FitSummary],
) -> Result<(), IngestError> {
    let tx = conn.transaction().map_err(|e| IngestError(e.to_string()))?;
    {
        let mut stmt = tx
            .prepare(
                "INSERT OR REPLACE INTO fit_summary (
                   indicator, alpha_median, sigma_median, beta_median, beta_low90,
                   beta_high90, doubling_median, doubling_low90, doubling_high90,
                   converged, divergences, acceptance_rate, rhat_beta
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            )
            .map_err(|e| IngestError(e.to_string()))?;
        for f in fits {
            stmt.execute(params![
                f.indicator.column(),
                f.alpha_median,
                f.sigma_median,
                f.beta_median,
                f.beta_low90,
                f.beta_high90,
                f.doubling_median,
                f.doubling_low90,
                f.doubling_high90,
                i64::from(f.converged),
                f.diagnostics.divergences as i64,
                f.diagnostics.acceptance_rate,
                f.diagnostics.rhat_beta,
            ])
            .map_err(|e| IngestError(e.to_string()))?;
        }
    }
    tx.commit().map_err(|e| IngestError(e.to_string()))
}

/// Post-load indexes plus ANALYZE, after all tables are populated.
pub fn finalize_archive(conn: &Connection) -> Result<(), IngestError> {
    conn.execute_batch(
        "
        CREATE INDEX idx_necir_cso_municipality ON necir_cso_2011(municipality_canonical);
        CREATE INDEX idx_enforcement_year ON madep_enforcement(year);
        CREATE INDEX idx_portal_year ON eea_portal_cso(year);
        CREATE INDEX idx_geo_rollup_level ON geo_rollup(level);
        CREATE INDEX idx_indicator_rollup_level ON indicator_rollup(level, indicator);
        ANALYZE;
        ",
    )
    .map_err(|e| IngestError(e.to_string()))
}

pub fn table_row_count(conn: &Connection, table: &str) -> Result<u64, IngestError> {
    let sql = format!("SELECT COUNT(*) FROM {table}");
    let count: i64 = conn
        .query_row(&sql, [], |row| row.get(0))
        .map_err(|e| IngestError(format!("{table}: {e}")))?;
    Ok(count as u64)
}

pub fn read_cso_outfalls(
    conn: &Connection,
) -> Result<Vec<(CsoOutfall, Option<String>)>, IngestError> {
    let mut stmt = conn
        .prepare(
            "SELECT outfall_id, municipality, municipality_canonical, receiving_water,
                    nearest_pipe_address, latitude, longitude, discharge_mgal,
                    discharge_count, year
             FROM necir_cso_2011 ORDER BY outfall_id",
        )
        .map_err(|e| IngestError(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                CsoOutfall {
                    outfall_id: row.get(0)?,
                    municipality_raw: row.get(1)?,
                    receiving_water: row.get(3)?,
                    nearest_pipe_address: row.get(4)?,
                    latitude: row.get(5)?,
                    longitude: row.get(6)?,
                    discharge_mgal: row.get(7)?,
                    discharge_count: row.get(8)?,
                    year: row.get::<_, i64>(9)? as u16,
                },
                row.get::<_, Option<String>>(2)?,
            ))
        })
        .map_err(|e| IngestError(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| IngestError(e.to_string()))?;
    Ok(rows)
}

pub fn read_block_group_profiles(
    conn: &Connection,
) -> Result<Vec<BlockGroupProfile>, IngestError> {
    let mut stmt = conn
        .prepare(
            "SELECT block_group, population, minorpct, lowincpct, lingisopct, over64pct
             FROM epa_ejscreen ORDER BY block_group",
        )
        .map_err(|e| IngestError(e.to_string()))?;
    let raw = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, f64>(5)?,
            ))
        })
        .map_err(|e| IngestError(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| IngestError(e.to_string()))?;

    raw.into_iter()
        .map(|(id, pop, minor, lowinc, lingiso, over64)| {
            Ok(BlockGroupProfile {
                block_group: BlockGroupId::parse(&id)
                    .map_err(|e| IngestError(format!("epa_ejscreen: {e}")))?,
                population: pop as u64,
                minority_pct: IndicatorValue::parse(minor)
                    .map_err(|e| IngestError(format!("epa_ejscreen: {e}")))?,
                low_income_pct: IndicatorValue::parse(lowinc)
                    .map_err(|e| IngestError(format!("epa_ejscreen: {e}")))?,
                linguistic_iso_pct: IndicatorValue::parse(lingiso)
                    .map_err(|e| IngestError(format!("epa_ejscreen: {e}")))?,
                over64_pct: IndicatorValue::parse(over64)
                    .map_err(|e| IngestError(format!("epa_ejscreen: {e}")))?,
            })
        })
        .collect()
}

pub fn read_towns(conn: &Connection) -> Result<Vec<TownPopulation>, IngestError> {
    let mut stmt = conn
        .prepare(
            "SELECT municipality, population, per_capita_income
             FROM census_acs ORDER BY municipality",
        )
        .map_err(|e| IngestError(e.to_string()))?;
    let raw = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, Option<f64>>(2)?,
            ))
        })
        .map_err(|e| IngestError(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| IngestError(e.to_string()))?;

    raw.into_iter()
        .map(|(name, pop, income)| {
            let mut town = TownPopulation::new(&name, pop as u64)
                .map_err(|e| IngestError(format!("census_acs: {e}")))?;
            town.per_capita_income = income;
            Ok(town)
        })
        .collect()
}
