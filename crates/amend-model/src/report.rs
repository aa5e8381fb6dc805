// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

/// Tally of spatial-assignment outcomes for one aggregation level.
///
/// Assignment failures are counted and kept alongside partial results;
/// they never abort the build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct AssignmentReport {
    pub assigned: u64,
    /// Points inside no polygon, assigned to the nearest within threshold.
    pub nearest_fallback: u64,
    /// Points inside more than one polygon (resolved first-match by unit id).
    pub multiple_containment: u64,
    /// Points inside no polygon and beyond the nearest-fallback threshold.
    pub unmatched: u64,
    /// Observations with no usable coordinates, excluded from assignment.
    pub missing_coordinates: u64,
    /// Rollup groups skipped because their total population was zero.
    pub zero_population_groups: u64,
}

impl AssignmentReport {
    #[must_use]
    pub fn total_observations(&self) -> u64 {
        self.assigned + self.unmatched + self.missing_coordinates
    }
}
