use amend_model::IndicatorKind;
use amend_stats::{fit_power_law, FitInput, FitOptions};

fn watershed_rows() -> Vec<(f64, f64, f64)> {
    vec![
        (0.1, 100.0, 1000.0),
        (0.2, 150.0, 2000.0),
        (0.4, 400.0, 1500.0),
    ]
}

#[test]
fn three_watershed_fit_recovers_a_positive_exponent() {
    let input = FitInput::from_rows(&watershed_rows()).expect("input");
    let fit = fit_power_law(&input, IndicatorKind::LinguisticIsoPct, &FitOptions::default())
        .expect("fit");

    assert!(fit.beta_median > 0.0, "beta median {}", fit.beta_median);
    // The 90% interval must exclude implausible extremes.
    assert!(fit.beta_low90 > -5.0, "beta low90 {}", fit.beta_low90);
    assert!(fit.beta_high90 < 5.0, "beta high90 {}", fit.beta_high90);
    assert!(fit.beta_low90 <= fit.beta_median && fit.beta_median <= fit.beta_high90);
}

#[test]
fn scale_parameters_are_nonnegative() {
    let input = FitInput::from_rows(&watershed_rows()).expect("input");
    let fit = fit_power_law(&input, IndicatorKind::MinorityPct, &FitOptions::default())
        .expect("fit");
    assert!(fit.alpha_median >= 0.0);
    assert!(fit.sigma_median >= 0.0);
}

#[test]
fn doubling_interval_is_two_to_the_beta_interval() {
    let input = FitInput::from_rows(&watershed_rows()).expect("input");
    let fit = fit_power_law(&input, IndicatorKind::LowIncomePct, &FitOptions::default())
        .expect("fit");
    assert!((fit.doubling_median - 2f64.powf(fit.beta_median)).abs() < 1e-9);
    assert!(fit.doubling_low90 <= fit.doubling_median);
    assert!(fit.doubling_median <= fit.doubling_high90);
    assert!(fit.doubling_low90 > 0.0);
}

#[test]
fn seeded_fit_is_reproducible() {
    let input = FitInput::from_rows(&watershed_rows()).expect("input");
    let opts = FitOptions::default();
    let a = fit_power_law(&input, IndicatorKind::MinorityPct, &opts).expect("fit");
    let b = fit_power_law(&input, IndicatorKind::MinorityPct, &opts).expect("fit");
    assert_eq!(a.beta_median, b.beta_median);
    assert_eq!(a.beta_low90, b.beta_low90);
    assert_eq!(a.beta_high90, b.beta_high90);
    assert_eq!(a.diagnostics.divergences, b.diagnostics.divergences);
}

#[test]
fn well_behaved_fit_reports_convergence_diagnostics() {
    let input = FitInput::from_rows(&watershed_rows()).expect("input");
    let fit = fit_power_law(&input, IndicatorKind::LinguisticIsoPct, &FitOptions::default())
        .expect("fit");
    assert!(fit.diagnostics.acceptance_rate > 0.0);
    assert!(fit.diagnostics.rhat_beta.is_finite());
    assert_eq!(fit.diagnostics.excluded_rows, 0);
}
