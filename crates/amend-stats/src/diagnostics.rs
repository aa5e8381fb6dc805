// SPDX-License-Identifier: Apache-2.0

/// Linear-interpolated quantile of an unsorted sample.
#[must_use]
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = pos - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}

/// Split-R-hat over per-chain draws (Gelman-Rubin with halved chains).
/// Values near 1 indicate the chains mixed; returns NaN when there is not
/// enough data to split.
#[must_use]
pub fn split_rhat(chains: &[Vec<f64>]) -> f64 {
    let mut sequences: Vec<&[f64]> = Vec::with_capacity(chains.len() * 2);
    let min_len = chains.iter().map(|c| c.len()).min().unwrap_or(0);
    let half = min_len / 2;
    if half < 2 || chains.len() < 2 {
        return f64::NAN;
    }
    for chain in chains {
        sequences.push(&chain[..half]);
        sequences.push(&chain[half..2 * half]);
    }

    let m = sequences.len() as f64;
    let n = half as f64;
    let means: Vec<f64> = sequences
        .iter()
        .map(|s| s.iter().sum::<f64>() / n)
        .collect();
    let grand_mean = means.iter().sum::<f64>() / m;
    let b = n / (m - 1.0)
        * means
            .iter()
            .map(|mu| (mu - grand_mean).powi(2))
            .sum::<f64>();
    let w = sequences
        .iter()
        .zip(&means)
        .map(|(s, mu)| s.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / (n - 1.0))
        .sum::<f64>()
        / m;
    if w == 0.0 {
        return f64::NAN;
    }
    let var_hat = (n - 1.0) / n * w + b / n;
    (var_hat / w).sqrt()
}
