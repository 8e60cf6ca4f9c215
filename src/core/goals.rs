use super::aggregate::{MONTHS_PER_YEAR, rank_index, sorted};
use super::engine::SimulationPath;
use super::types::{Goal, GoalResult, SimulationConfig};

pub fn evaluate_goals(config: &SimulationConfig, paths: &[SimulationPath]) -> Vec<GoalResult> {
    config
        .goals
        .iter()
        .map(|goal| evaluate_goal(config, goal, paths))
        .collect()
}

/// Wealth is measured in today's money at the goal's checkpoint. Goals past
/// the horizon read the final month but still deflate by the goal year.
fn evaluate_goal(config: &SimulationConfig, goal: &Goal, paths: &[SimulationPath]) -> GoalResult {
    let years_elapsed = i64::from(goal.target_year) - i64::from(config.start_year);
    if years_elapsed < 0 || paths.is_empty() {
        return GoalResult {
            goal_id: goal.id.clone(),
            probability: 0.0,
            expected_amount: 0.0,
            shortfall: 0.0,
        };
    }

    let years_elapsed =
        u32::try_from(years_elapsed.min(i64::from(i32::MAX))).unwrap_or(u32::MAX);
    let month = (years_elapsed as usize)
        .saturating_mul(MONTHS_PER_YEAR)
        .min(config.total_months());
    let deflator = config.deflator(years_elapsed);
    let real_wealth = sorted(paths.iter().map(|p| p.wealth[month] / deflator).collect());

    let reached = real_wealth
        .iter()
        .filter(|w| **w >= goal.target_amount)
        .count();
    let p10 = real_wealth[rank_index(real_wealth.len(), 0.10)];

    GoalResult {
        goal_id: goal.id.clone(),
        probability: reached as f64 / paths.len() as f64 * 100.0,
        expected_amount: real_wealth[rank_index(real_wealth.len(), 0.50)],
        shortfall: (goal.target_amount - p10).max(0.0),
    }
}
