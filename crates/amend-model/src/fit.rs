// SPDX-License-Identifier: Apache-2.0

use crate::indicator::IndicatorKind;
use serde::{Deserialize, Serialize};

/// Sampler diagnostics attached to every fit, converged or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FitDiagnostics {
    pub divergences: u64,
    pub acceptance_rate: f64,
    pub rhat_beta: f64,
    /// Input rows excluded from the likelihood (zero indicator, missing
    /// outcome, nonpositive weight).
    pub excluded_rows: u64,
}

/// Posterior summary of one power-law regression fit.
///
/// `doubling_*` summarize 2^β, the multiplicative change in outcome per
/// doubling of the indicator. A fit that fails diagnostics is still
/// reported, with `converged: false`; callers must not treat its point
/// estimates as reliable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FitSummary {
    pub indicator: IndicatorKind,
    pub alpha_median: f64,
    pub sigma_median: f64,
    pub beta_median: f64,
    pub beta_low90: f64,
    pub beta_high90: f64,
    pub doubling_median: f64,
    pub doubling_low90: f64,
    pub doubling_high90: f64,
    pub converged: bool,
    pub diagnostics: FitDiagnostics,
}

impl FitSummary {
    /// Fact-file line in the source archive's `key: value` format.
    #[must_use]
    pub fn fact_line(&self) -> String {
        format!(
            "depend_cso_{}: {:.1} times (90% credible interval {:.1} to {:.1} times){}",
            self.indicator.column(),
            self.doubling_median,
            self.doubling_low90,
            self.doubling_high90,
            if self.converged { "" } else { " [UNRELIABLE: fit did not converge]" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(converged: bool) -> FitSummary {
        FitSummary {
            indicator: IndicatorKind::LinguisticIsoPct,
            alpha_median: 120.0,
            sigma_median: 0.8,
            beta_median: 1.2,
            beta_low90: 0.4,
            beta_high90: 2.1,
            doubling_median: 2.3,
            doubling_low90: 1.3,
            doubling_high90: 4.3,
            converged,
            diagnostics: FitDiagnostics {
                divergences: 0,
                acceptance_rate: 0.8,
                rhat_beta: 1.01,
                excluded_rows: 0,
            },
        }
    }

    #[test]
    fn fact_line_flags_unreliable_fits() {
        assert!(!summary(true).fact_line().contains("UNRELIABLE"));
        assert!(summary(false).fact_line().contains("UNRELIABLE"));
    }
}
