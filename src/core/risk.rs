use super::aggregate::{MONTHS_PER_YEAR, rank_index};
use super::engine::SimulationPath;
use super::types::{RiskPathPoint, SimulationConfig};

/// Adverse-path risk figures. `max_drawdown` and `worst_one_year_return`
/// are fractions; the summary converts the drawdown to percent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiskReport {
    pub max_drawdown: f64,
    pub worst_one_year_return: f64,
    pub risk_path: Vec<RiskPathPoint>,
}

/// The path at the 10th percentile of terminal wealth, not the absolute worst.
pub fn representative_adverse_path(paths: &[SimulationPath]) -> Option<&SimulationPath> {
    if paths.is_empty() {
        return None;
    }
    let mut order = (0..paths.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| paths[a].terminal_wealth().total_cmp(&paths[b].terminal_wealth()));
    Some(&paths[order[rank_index(paths.len(), 0.10)]])
}

pub fn analyze_risk(config: &SimulationConfig, paths: &[SimulationPath]) -> RiskReport {
    let Some(path) = representative_adverse_path(paths) else {
        return RiskReport::default();
    };

    RiskReport {
        max_drawdown: max_drawdown(&path.wealth),
        worst_one_year_return: worst_trailing_year_return(&path.wealth),
        risk_path: yearly_risk_path(config, &path.wealth),
    }
}

fn drawdown(peak: f64, value: f64) -> f64 {
    if peak > 0.0 { (peak - value) / peak } else { 0.0 }
}

pub fn max_drawdown(wealth: &[f64]) -> f64 {
    let Some(&first) = wealth.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut worst = 0.0_f64;
    for &value in wealth {
        peak = peak.max(value);
        worst = worst.max(drawdown(peak, value));
    }
    worst
}

/// Minimum return over any 12-month window; never positive.
pub fn worst_trailing_year_return(wealth: &[f64]) -> f64 {
    wealth
        .windows(MONTHS_PER_YEAR + 1)
        .filter(|w| w[0] > 0.0)
        .map(|w| (w[MONTHS_PER_YEAR] - w[0]) / w[0])
        .fold(0.0, f64::min)
}

fn yearly_risk_path(config: &SimulationConfig, wealth: &[f64]) -> Vec<RiskPathPoint> {
    let mut peak = wealth.first().copied().unwrap_or(0.0);
    (0..=config.time_horizon_years)
        .filter_map(|year| {
            let value = *wealth.get(year as usize * MONTHS_PER_YEAR)?;
            peak = peak.max(value);
            Some(RiskPathPoint {
                year: config.calendar_year(year),
                value,
                peak,
                drawdown: drawdown(peak, value),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::defaults::default_config;
    use proptest::collection::vec;
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn path_from(wealth: Vec<f64>) -> SimulationPath {
        let len = wealth.len();
        SimulationPath {
            wealth,
            withdrawals: vec![0.0; len],
            savings: vec![0.0; len],
        }
    }

    fn flat_path(value: f64, months: usize) -> SimulationPath {
        path_from(vec![value; months + 1])
    }

    #[test]
    fn drawdown_measures_fall_from_running_peak() {
        let wealth = [100.0, 120.0, 90.0, 130.0, 65.0, 140.0];
        assert_approx(max_drawdown(&wealth), 0.5);
    }

    #[test]
    fn drawdown_is_zero_for_monotone_growth_and_zero_peak() {
        assert_approx(max_drawdown(&[1.0, 2.0, 3.0]), 0.0);
        assert_approx(max_drawdown(&[0.0, 0.0, 0.0]), 0.0);
        assert_approx(max_drawdown(&[]), 0.0);
    }

    #[test]
    fn trailing_year_return_skips_zero_bases() {
        let mut wealth = vec![100.0; 25];
        wealth[12] = 80.0;
        wealth[24] = 40.0;
        assert_approx(worst_trailing_year_return(&wealth), -0.5);

        let ruined = vec![0.0; 25];
        assert_approx(worst_trailing_year_return(&ruined), 0.0);
    }

    #[test]
    fn trailing_year_return_never_reports_positive() {
        let wealth = (0..=36).map(|m| 100.0 + m as f64).collect::<Vec<_>>();
        assert_approx(worst_trailing_year_return(&wealth), 0.0);
        assert_approx(worst_trailing_year_return(&wealth[..5]), 0.0);
    }

    #[test]
    fn picks_path_at_tenth_percentile_of_terminal_wealth() {
        let paths = (0..20)
            .rev()
            .map(|i| flat_path(i as f64 * 10.0, 12))
            .collect::<Vec<_>>();
        let chosen = representative_adverse_path(&paths).map(|p| p.terminal_wealth());
        assert_eq!(chosen, Some(20.0));
        assert!(representative_adverse_path(&[]).is_none());
    }

    #[test]
    fn risk_path_samples_yearly_with_running_peak() {
        let mut config = default_config(2030);
        config.time_horizon_years = 3;
        let mut wealth = vec![100.0; 37];
        wealth[12] = 150.0;
        wealth[24] = 75.0;
        wealth[36] = 120.0;
        let report = analyze_risk(&config, &[path_from(wealth)]);

        let years = report.risk_path.iter().map(|p| p.year).collect::<Vec<_>>();
        assert_eq!(years, vec![2030, 2031, 2032, 2033]);
        let peaks = report.risk_path.iter().map(|p| p.peak).collect::<Vec<_>>();
        assert_eq!(peaks, vec![100.0, 150.0, 150.0, 150.0]);
        assert_approx(report.risk_path[2].drawdown, 0.5);
        assert_approx(report.risk_path[3].drawdown, 0.2);
        assert_approx(report.max_drawdown, 0.5);
        assert_approx(report.worst_one_year_return, -0.5);
    }

    #[test]
    fn reports_compare_by_value_including_risk_path() {
        let config = default_config(2030);
        let paths = vec![flat_path(100.0, 360), flat_path(50.0, 360)];
        let first = analyze_risk(&config, &paths);
        assert_eq!(first, analyze_risk(&config, &paths));
        assert_eq!(first.risk_path.len(), 31);
        assert_ne!(first, RiskReport::default());
    }

    #[test]
    fn empty_ensemble_reports_nothing() {
        let report = analyze_risk(&default_config(2030), &[]);
        assert_eq!(report, RiskReport::default());
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_drawdown_is_a_fraction(values in vec(0u32..1_000_000, 1..200)) {
            let wealth = values.iter().map(|v| *v as f64).collect::<Vec<_>>();
            let dd = max_drawdown(&wealth);
            prop_assert!((0.0..=1.0).contains(&dd));
            let worst = worst_trailing_year_return(&wealth);
            prop_assert!((-1.0..=0.0).contains(&worst));
        }
    }
}
