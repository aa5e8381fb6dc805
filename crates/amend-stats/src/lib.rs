// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Population-weighted power-law regression for the AMEND archive.
//!
//! Fits `y ~ Normal(alpha * x^beta, sigma * sd(y) * sqrt(1/p))` with
//! half-normal priors on `alpha` and `sigma` and a `Normal(0,4)` prior on
//! `beta`, by Hamiltonian Monte Carlo over the unconstrained
//! `(ln alpha, beta, ln sigma)` parameterization. The headline statistic
//! is the 90% central credible interval of `2^beta`: the multiplicative
//! change in outcome per doubling of the indicator.

mod diagnostics;
mod model;
mod sampler;

use amend_model::{FitDiagnostics, FitSummary, IndicatorKind};
use std::fmt::{Display, Formatter};

pub use diagnostics::{quantile, split_rhat};
pub use model::PowerLawPosterior;
pub use sampler::{ChainResult, HmcOptions};

pub const CRATE_NAME: &str = "amend-stats";

#[derive(Debug)]
pub struct StatsError(pub String);

impl Display for StatsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for StatsError {}

/// Cleaned regression input. Rows with nonpositive or non-finite indicator,
/// negative or non-finite outcome, or nonpositive weight are excluded and
/// counted, mirroring the archive's treatment of unusable source rows.
#[derive(Debug, Clone)]
pub struct FitInput {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub p: Vec<f64>,
    pub excluded_rows: u64,
}

impl FitInput {
    pub fn from_rows(rows: &[(f64, f64, f64)]) -> Result<Self, StatsError> {
        let mut x = Vec::with_capacity(rows.len());
        let mut y = Vec::with_capacity(rows.len());
        let mut p = Vec::with_capacity(rows.len());
        let mut excluded_rows = 0u64;
        for &(xi, yi, pi) in rows {
            let usable = xi.is_finite()
                && xi > 0.0
                && yi.is_finite()
                && yi >= 0.0
                && pi.is_finite()
                && pi > 0.0;
            if usable {
                x.push(xi);
                y.push(yi);
                p.push(pi);
            } else {
                excluded_rows += 1;
            }
        }
        if x.len() < 3 {
            return Err(StatsError(format!(
                "regression needs at least 3 usable rows, got {} ({} excluded)",
                x.len(),
                excluded_rows
            )));
        }
        // Normalize weights to mean 1, as the source system feeds p/mean(p).
        let mean_p = p.iter().sum::<f64>() / p.len() as f64;
        for w in &mut p {
            *w /= mean_p;
        }
        Ok(Self {
            x,
            y,
            p,
            excluded_rows,
        })
    }
}

/// Sampling configuration. Defaults match the archive's analysis runs;
/// the seed makes reruns reproducible.
#[derive(Debug, Clone)]
pub struct FitOptions {
    pub chains: usize,
    pub warmup: usize,
    pub samples: usize,
    pub step_size: f64,
    pub leapfrog_steps: usize,
    pub seed: u64,
    pub max_divergences: u64,
    pub max_rhat: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            chains: 4,
            warmup: 500,
            samples: 1000,
            step_size: 0.02,
            leapfrog_steps: 25,
            seed: 20_110_717,
            max_divergences: 10,
            max_rhat: 1.05,
        }
    }
}

/// Fit the power-law model and summarize the posterior.
///
/// A fit that fails diagnostics is returned with `converged: false`; it is
/// never an error, and never a silent point estimate.
pub fn fit_power_law(
    input: &FitInput,
    indicator: IndicatorKind,
    opts: &FitOptions,
) -> Result<FitSummary, StatsError> {
    if opts.chains < 2 {
        return Err(StatsError(
            "fit requires at least 2 chains for split-Rhat".to_string(),
        ));
    }
    let sd_y = sample_sd(&input.y);
    if sd_y == 0.0 {
        return Err(StatsError(
            "outcome values are constant; power-law fit is undefined".to_string(),
        ));
    }
    let z: Vec<f64> = input.y.iter().map(|v| v / sd_y).collect();
    let posterior = PowerLawPosterior::new(&input.x, &z, &input.p)?;

    let hmc = HmcOptions {
        warmup: opts.warmup,
        samples: opts.samples,
        step_size: opts.step_size,
        leapfrog_steps: opts.leapfrog_steps,
    };
    let mut chains = Vec::with_capacity(opts.chains);
    for chain in 0..opts.chains {
        let chain_seed = opts
            .seed
            .wrapping_add((chain as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
        chains.push(sampler::run_chain(&posterior, &hmc, chain_seed));
    }

    let beta_chains: Vec<Vec<f64>> = chains.iter().map(|c| c.beta.clone()).collect();
    let rhat_beta = split_rhat(&beta_chains);
    let divergences: u64 = chains.iter().map(|c| c.divergences).sum();
    let accepted: u64 = chains.iter().map(|c| c.accepted).sum();
    let transitions: u64 = chains.iter().map(|c| c.transitions).sum();
    let acceptance_rate = accepted as f64 / transitions as f64;

    let mut beta: Vec<f64> = Vec::with_capacity(opts.chains * opts.samples);
    let mut alpha: Vec<f64> = Vec::with_capacity(opts.chains * opts.samples);
    let mut sigma: Vec<f64> = Vec::with_capacity(opts.chains * opts.samples);
    for c in &chains {
        beta.extend_from_slice(&c.beta);
        // Posterior alpha is on the standardized scale; undo it.
        alpha.extend(c.alpha.iter().map(|a| a * sd_y));
        sigma.extend_from_slice(&c.sigma);
    }
    let doubling: Vec<f64> = beta.iter().map(|b| 2f64.powf(*b)).collect();

    let converged = divergences <= opts.max_divergences
        && rhat_beta.is_finite()
        && rhat_beta < opts.max_rhat
        && acceptance_rate >= 0.2;

    Ok(FitSummary {
        indicator,
        alpha_median: quantile(&alpha, 0.5),
        sigma_median: quantile(&sigma, 0.5),
        beta_median: quantile(&beta, 0.5),
        beta_low90: quantile(&beta, 0.05),
        beta_high90: quantile(&beta, 0.95),
        doubling_median: quantile(&doubling, 0.5),
        doubling_low90: quantile(&doubling, 0.05),
        doubling_high90: quantile(&doubling, 0.95),
        converged,
        diagnostics: FitDiagnostics {
            divergences,
            acceptance_rate,
            rhat_beta,
            excluded_rows: input.excluded_rows,
        },
    })
}

/// Sample standard deviation (n-1 denominator, as Stan's `sd`).
#[must_use]
pub fn sample_sd(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_input_excludes_unusable_rows() {
        let rows = vec![
            (0.1, 100.0, 1000.0),
            (0.0, 50.0, 500.0),   // zero indicator
            (0.2, -1.0, 500.0),   // negative outcome
            (0.3, 200.0, 0.0),    // zero weight
            (0.2, 150.0, 2000.0),
            (0.4, 400.0, 1500.0),
        ];
        let input = FitInput::from_rows(&rows).expect("input");
        assert_eq!(input.x.len(), 3);
        assert_eq!(input.excluded_rows, 3);
        let mean_p = input.p.iter().sum::<f64>() / input.p.len() as f64;
        assert!((mean_p - 1.0).abs() < 1e-12);
    }

    #[test]
    fn fit_input_needs_three_usable_rows() {
        let rows = vec![(0.1, 100.0, 1000.0), (0.2, 150.0, 2000.0)];
        assert!(FitInput::from_rows(&rows).is_err());
    }

    #[test]
    fn sample_sd_matches_hand_computation() {
        let sd = sample_sd(&[100.0, 150.0, 400.0]);
        assert!((sd - 160.727).abs() < 1e-3);
    }

    #[test]
    fn constant_outcome_is_rejected() {
        let rows = vec![
            (0.1, 5.0, 10.0),
            (0.2, 5.0, 10.0),
            (0.4, 5.0, 10.0),
        ];
        let input = FitInput::from_rows(&rows).expect("input");
        assert!(fit_power_law(&input, IndicatorKind::MinorityPct, &FitOptions::default()).is_err());
    }
}
