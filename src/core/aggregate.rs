use super::engine::SimulationPath;
use super::types::{SimulationConfig, SimulationYearResult};

pub(crate) const MONTHS_PER_YEAR: usize = 12;

/// Nearest-rank index `floor(n × p)`, clamped into the slice.
pub(crate) fn rank_index(len: usize, p: f64) -> usize {
    ((len as f64 * p).floor() as usize).min(len.saturating_sub(1))
}

pub(crate) fn sorted(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(|a, b| a.total_cmp(b));
    values
}

pub fn yearly_results(config: &SimulationConfig, paths: &[SimulationPath]) -> Vec<SimulationYearResult> {
    if paths.is_empty() {
        return Vec::new();
    }

    (0..=config.time_horizon_years)
        .map(|year| {
            let month = year as usize * MONTHS_PER_YEAR;
            let values = sorted(paths.iter().map(|p| p.wealth[month]).collect());
            let at = |p: f64| values[rank_index(values.len(), p)];
            let deflator = config.deflator(year);

            let (median_withdrawal, median_savings) = if year == 0 {
                (0.0, 0.0)
            } else {
                (
                    median_yearly_sum(paths, year, |p| &p.withdrawals),
                    median_yearly_sum(paths, year, |p| &p.savings),
                )
            };

            SimulationYearResult {
                year: config.calendar_year(year),
                worst_case: values[0],
                p10: at(0.10),
                p25: at(0.25),
                p50: at(0.50),
                p75: at(0.75),
                p90: at(0.90),
                worst_case_real: values[0] / deflator,
                p10_real: at(0.10) / deflator,
                p25_real: at(0.25) / deflator,
                p50_real: at(0.50) / deflator,
                p75_real: at(0.75) / deflator,
                p90_real: at(0.90) / deflator,
                median_withdrawal,
                median_savings,
            }
        })
        .collect()
}

/// Median across iterations of the twelve monthly values that lead up to
/// the `year` checkpoint.
fn median_yearly_sum<F>(paths: &[SimulationPath], year: u32, series: F) -> f64
where
    F: Fn(&SimulationPath) -> &Vec<f64>,
{
    let first = (year as usize - 1) * MONTHS_PER_YEAR + 1;
    let last = year as usize * MONTHS_PER_YEAR;
    let sums = sorted(
        paths
            .iter()
            .map(|p| series(p)[first..=last].iter().sum::<f64>())
            .collect(),
    );
    sums[rank_index(sums.len(), 0.5)]
}
