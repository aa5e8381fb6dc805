// SPDX-License-Identifier: Apache-2.0

use amend_model::{AssignmentReport, GeoUnitId, IndicatorKind};
use std::collections::BTreeMap;

/// Per-unit magnitude totals for one aggregation level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MagnitudeRollup {
    pub volume_mgal: f64,
    pub event_count: f64,
}

/// Sum magnitudes per assigned unit. Unassigned observations (unit `None`)
/// are skipped here; the assignment step has already tallied them.
#[must_use]
pub fn rollup_magnitudes(
    assignments: &[Option<GeoUnitId>],
    volumes: &[Option<f64>],
    counts: &[Option<f64>],
) -> BTreeMap<GeoUnitId, MagnitudeRollup> {
    let mut out: BTreeMap<GeoUnitId, MagnitudeRollup> = BTreeMap::new();
    for (i, unit) in assignments.iter().enumerate() {
        let Some(unit) = unit else { continue };
        let entry = out.entry(unit.clone()).or_default();
        if let Some(v) = volumes.get(i).copied().flatten() {
            entry.volume_mgal += v;
        }
        if let Some(c) = counts.get(i).copied().flatten() {
            entry.event_count += c;
        }
    }
    out
}

/// Population-weighted mean: `sum(v_i * pop_i) / sum(pop_i)`.
///
/// Returns `None` when the total population is zero (the caller logs and
/// skips the group rather than dividing by zero). Invariant under uniform
/// scaling of all populations.
#[must_use]
pub fn weighted_mean(values: &[f64], populations: &[u64]) -> Option<f64> {
    let mut num = 0.0;
    let mut denom = 0.0;
    for (v, &p) in values.iter().zip(populations) {
        num += v * p as f64;
        denom += p as f64;
    }
    if denom == 0.0 {
        return None;
    }
    Some(num / denom)
}

/// One row of the indicator rollup table.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRollupRow {
    pub unit_id: GeoUnitId,
    pub indicator: IndicatorKind,
    pub value: f64,
    pub population: u64,
}

/// Aggregate block-group indicator values to a coarser geography.
///
/// `membership` maps each block group's index to its parent unit (as
/// produced by centroid assignment); groups whose parent is `None` were
/// already tallied unmatched. Recomputing over the same inputs yields the
/// same rows: grouping and output order are both by `BTreeMap` key.
#[must_use]
pub fn rollup_indicators(
    membership: &[Option<GeoUnitId>],
    indicator: IndicatorKind,
    values: &[f64],
    populations: &[u64],
    report: &mut AssignmentReport,
) -> Vec<IndicatorRollupRow> {
    let mut grouped: BTreeMap<GeoUnitId, (Vec<f64>, Vec<u64>)> = BTreeMap::new();
    for (i, parent) in membership.iter().enumerate() {
        let Some(parent) = parent else { continue };
        let entry = grouped.entry(parent.clone()).or_default();
        entry.0.push(values[i]);
        entry.1.push(populations[i]);
    }

    let mut out = Vec::with_capacity(grouped.len());
    for (unit_id, (vals, pops)) in grouped {
        match weighted_mean(&vals, &pops) {
            Some(value) => out.push(IndicatorRollupRow {
                unit_id,
                indicator,
                value,
                population: pops.iter().sum(),
            }),
            None => report.zero_population_groups += 1,
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(s: &str) -> GeoUnitId {
        GeoUnitId::parse(s).expect("unit id")
    }

    #[test]
    fn magnitudes_sum_per_unit() {
        let assignments = vec![Some(unit("A")), Some(unit("B")), Some(unit("A")), None];
        let volumes = vec![Some(1.0), Some(2.0), Some(3.5), Some(99.0)];
        let counts = vec![Some(2.0), None, Some(1.0), Some(99.0)];
        let rollup = rollup_magnitudes(&assignments, &volumes, &counts);
        assert_eq!(rollup[&unit("A")].volume_mgal, 4.5);
        assert_eq!(rollup[&unit("A")].event_count, 3.0);
        assert_eq!(rollup[&unit("B")].volume_mgal, 2.0);
        assert!(!rollup.contains_key(&unit("C")));
    }

    #[test]
    fn weighted_mean_matches_hand_computation() {
        let got = weighted_mean(&[0.2, 0.6], &[1000, 3000]).expect("mean");
        assert!((got - 0.5).abs() < 1e-12);
    }

    #[test]
    fn weighted_mean_is_scale_invariant() {
        let values = [0.1, 0.4, 0.9];
        let pops = [120, 4500, 830];
        let doubled: Vec<u64> = pops.iter().map(|p| p * 2).collect();
        let a = weighted_mean(&values, &pops).expect("mean");
        let b = weighted_mean(&values, &doubled).expect("mean");
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn zero_population_yields_none() {
        assert_eq!(weighted_mean(&[0.5], &[0]), None);
    }

    #[test]
    fn indicator_rollup_is_idempotent() {
        let membership = vec![Some(unit("W1")), Some(unit("W1")), Some(unit("W2")), None];
        let values = vec![0.2, 0.4, 0.8, 0.9];
        let pops = vec![100, 300, 500, 700];
        let mut r1 = AssignmentReport::default();
        let mut r2 = AssignmentReport::default();
        let first = rollup_indicators(
            &membership,
            IndicatorKind::MinorityPct,
            &values,
            &pops,
            &mut r1,
        );
        let second = rollup_indicators(
            &membership,
            IndicatorKind::MinorityPct,
            &values,
            &pops,
            &mut r2,
        );
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert!((first[0].value - 0.35).abs() < 1e-12);
    }

    #[test]
    fn zero_population_group_is_skipped_and_tallied() {
        let membership = vec![Some(unit("W1"))];
        let mut report = AssignmentReport::default();
        let rows = rollup_indicators(
            &membership,
            IndicatorKind::LowIncomePct,
            &[0.3],
            &[0],
            &mut report,
        );
        assert!(rows.is_empty());
        assert_eq!(report.zero_population_groups, 1);
    }
}
