// SPDX-License-Identifier: Apache-2.0

use crate::geography::{BlockGroupId, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Environmental-justice indicators carried per census block group.
///
/// Column names follow the archive-standard EJSCREEN vocabulary; the 2023
/// `PEOPCOLORPCT` column is normalized to `MINORPCT` at ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum IndicatorKind {
    MinorityPct,
    LowIncomePct,
    LinguisticIsoPct,
    Over64Pct,
}

impl IndicatorKind {
    pub const ALL: [Self; 4] = [
        Self::MinorityPct,
        Self::LowIncomePct,
        Self::LinguisticIsoPct,
        Self::Over64Pct,
    ];

    /// Source column name in the EJSCREEN export.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::MinorityPct => "MINORPCT",
            Self::LowIncomePct => "LOWINCPCT",
            Self::LinguisticIsoPct => "LINGISOPCT",
            Self::Over64Pct => "OVER64PCT",
        }
    }

    pub fn parse_column(raw: &str) -> Result<Self, ValidationError> {
        match raw {
            "MINORPCT" | "PEOPCOLORPCT" => Ok(Self::MinorityPct),
            "LOWINCPCT" => Ok(Self::LowIncomePct),
            "LINGISOPCT" => Ok(Self::LinguisticIsoPct),
            "OVER64PCT" => Ok(Self::Over64Pct),
            other => Err(ValidationError(format!("unknown indicator column: {other}"))),
        }
    }
}

impl Display for IndicatorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

/// A fraction-of-population indicator value, invariant: finite and in [0,1].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
#[non_exhaustive]
pub struct IndicatorValue(f64);

impl IndicatorValue {
    pub fn parse(raw: f64) -> Result<Self, ValidationError> {
        if !raw.is_finite() {
            return Err(ValidationError(format!(
                "indicator value must be finite, got {raw}"
            )));
        }
        if !(0.0..=1.0).contains(&raw) {
            return Err(ValidationError(format!(
                "indicator value must lie in [0,1], got {raw}"
            )));
        }
        Ok(Self(raw))
    }

    #[must_use]
    pub const fn get(self) -> f64 {
        self.0
    }
}

/// Per-block-group demographic profile from one EJSCREEN vintage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockGroupProfile {
    pub block_group: BlockGroupId,
    pub population: u64,
    pub minority_pct: IndicatorValue,
    pub low_income_pct: IndicatorValue,
    pub linguistic_iso_pct: IndicatorValue,
    pub over64_pct: IndicatorValue,
}

impl BlockGroupProfile {
    #[must_use]
    pub fn indicator(&self, kind: IndicatorKind) -> IndicatorValue {
        match kind {
            IndicatorKind::MinorityPct => self.minority_pct,
            IndicatorKind::LowIncomePct => self.low_income_pct,
            IndicatorKind::LinguisticIsoPct => self.linguistic_iso_pct,
            IndicatorKind::Over64Pct => self.over64_pct,
        }
    }
}
