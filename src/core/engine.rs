use rayon::prelude::*;

use super::aggregate::yearly_results;
use super::cashflow::{CashFlowScheduler, WithdrawalState};
use super::error::EngineError;
use super::goals::evaluate_goals;
use super::params::{BASE_CORRELATION, portfolio_parameters, stressed_parameters};
use super::risk::analyze_risk;
use super::sampling::{ShockSampler, derive_seed};
use super::types::{
    AssetClass, PortfolioParameters, SimulationConfig, SimulationResult, SimulationSummary,
    StressScenario, ValidationStats,
};

const DT: f64 = 1.0 / 12.0;
pub const FAILING_PATH_SAMPLE_LIMIT: usize = 50;
const DIRECT_JUMP_SUM_LIMIT: u64 = 30;

/// Month-by-month record of one iteration. Index 0 is the starting point,
/// so every vector holds `horizon × 12 + 1` entries.
#[derive(Debug, Clone)]
pub struct SimulationPath {
    pub wealth: Vec<f64>,
    pub withdrawals: Vec<f64>,
    pub savings: Vec<f64>,
}

impl SimulationPath {
    pub fn terminal_wealth(&self) -> f64 {
        self.wealth.last().copied().unwrap_or(0.0)
    }
}

pub struct PathSimulator<'a> {
    config: &'a SimulationConfig,
    scheduler: CashFlowScheduler<'a>,
    baseline: PortfolioParameters,
    stressed: Option<PortfolioParameters>,
    crisis_months: (usize, usize),
}

impl<'a> PathSimulator<'a> {
    pub fn new(
        config: &'a SimulationConfig,
        baseline: PortfolioParameters,
        stressed: Option<PortfolioParameters>,
    ) -> Self {
        Self {
            config,
            scheduler: CashFlowScheduler::new(config),
            baseline,
            stressed,
            crisis_months: config.crisis_months(),
        }
    }

    /// Compared against the 1-based month index: a window starting at 0
    /// covers months 1 to `end - 1`.
    fn parameters_for(&self, month: usize) -> &PortfolioParameters {
        let (start, end) = self.crisis_months;
        match &self.stressed {
            Some(stressed) if (start..end).contains(&month) => stressed,
            _ => &self.baseline,
        }
    }

    pub(crate) fn simulate(&self, sampler: &mut ShockSampler) -> SimulationPath {
        let months = self.config.total_months();
        let mut path = SimulationPath {
            wealth: Vec::with_capacity(months + 1),
            withdrawals: Vec::with_capacity(months + 1),
            savings: Vec::with_capacity(months + 1),
        };
        path.wealth.push(self.config.initial_wealth);
        path.withdrawals.push(0.0);
        path.savings.push(0.0);

        let mut wealth = self.config.initial_wealth;
        let mut state = WithdrawalState::default();

        for month in 1..=months {
            let params = self.parameters_for(month);
            wealth *= step_log_return(params, sampler).exp();

            let (after_flows, flow) = self.scheduler.apply(month, wealth, &mut state);
            wealth = after_flows.max(0.0);

            path.wealth.push(wealth);
            path.withdrawals.push(flow.withdrawal);
            path.savings.push(flow.savings);
        }

        path
    }
}

fn step_log_return(params: &PortfolioParameters, sampler: &mut ShockSampler) -> f64 {
    let jumps = sampler.poisson(params.lambda * DT);
    let jump_impact = jump_impact(params, jumps, sampler);
    let diffusion = params.sigma * DT.sqrt() * sampler.standard_normal();
    params.compensated_drift(DT) + diffusion + jump_impact
}

/// Sum of `jumps` log-jump sizes. Past `DIRECT_JUMP_SUM_LIMIT` the sum is
/// drawn in one go as `N(k·m, √k·s)`.
fn jump_impact(params: &PortfolioParameters, jumps: u64, sampler: &mut ShockSampler) -> f64 {
    if jumps > DIRECT_JUMP_SUM_LIMIT {
        let k = jumps as f64;
        return sampler.normal(k * params.jump_mean, k.sqrt() * params.jump_sd);
    }
    (0..jumps)
        .map(|_| sampler.normal(params.jump_mean, params.jump_sd))
        .sum()
}

pub fn run_simulation(
    assets: &[AssetClass],
    config: &SimulationConfig,
    scenario: StressScenario,
    iterations: u32,
) -> Result<SimulationResult, EngineError> {
    run_simulation_seeded(assets, config, scenario, iterations, rand::random())
}

pub fn run_simulation_seeded(
    assets: &[AssetClass],
    config: &SimulationConfig,
    scenario: StressScenario,
    iterations: u32,
    seed: u64,
) -> Result<SimulationResult, EngineError> {
    validate_inputs(assets, config, iterations)?;

    let baseline = portfolio_parameters(assets, BASE_CORRELATION);
    let stressed = stressed_parameters(assets, scenario);
    let simulator = PathSimulator::new(config, baseline, stressed);

    tracing::debug!(
        iterations,
        months = config.total_months(),
        scenario = scenario.label(),
        mu = baseline.mu,
        sigma = baseline.sigma,
        lambda = baseline.lambda,
        "running wealth simulation"
    );

    let paths = simulate_paths(&simulator, iterations, seed);
    let validation_stats = ValidationStats {
        effective_return: baseline.mu,
        effective_volatility: baseline.sigma,
        assumed_correlation: BASE_CORRELATION,
        jump_frequency: baseline.lambda,
        start_net_flow_monthly: CashFlowScheduler::new(config).start_net_flow_monthly(),
    };
    let result = summarize(config, &paths, validation_stats);

    tracing::debug!(
        success_probability = result.summary.success_probability,
        median_terminal_wealth = result.summary.median_terminal_wealth,
        "wealth simulation finished"
    );
    Ok(result)
}

/// Runs every iteration to completion before returning; aggregation only
/// ever sees the full ensemble.
pub fn simulate_paths(
    simulator: &PathSimulator<'_>,
    iterations: u32,
    seed: u64,
) -> Vec<SimulationPath> {
    (0..iterations)
        .into_par_iter()
        .map(|iteration| {
            let mut sampler = ShockSampler::new(derive_seed(seed, iteration));
            simulator.simulate(&mut sampler)
        })
        .collect()
}

fn summarize(
    config: &SimulationConfig,
    paths: &[SimulationPath],
    validation_stats: ValidationStats,
) -> SimulationResult {
    let (yearly_results, (risk, goal_results)) = rayon::join(
        || yearly_results(config, paths),
        || {
            rayon::join(
                || analyze_risk(config, paths),
                || evaluate_goals(config, paths),
            )
        },
    );

    let survivors = paths.iter().filter(|p| p.terminal_wealth() > 0.0).count();
    let median_terminal_wealth = yearly_results.last().map(|y| y.p50).unwrap_or(0.0);
    let summary = SimulationSummary {
        success_probability: survivors as f64 / paths.len() as f64 * 100.0,
        median_terminal_wealth,
        median_terminal_wealth_real: median_terminal_wealth
            / config.deflator(config.time_horizon_years),
        worst_drawdown_pct: risk.max_drawdown * 100.0,
        worst_one_year_return: risk.worst_one_year_return,
        configured_withdrawal_rate: config.withdrawal_rate * 100.0,
    };

    let failing_paths_sample = paths
        .iter()
        .filter(|p| p.terminal_wealth() <= 0.0)
        .take(FAILING_PATH_SAMPLE_LIMIT)
        .map(|p| p.wealth.clone())
        .collect();

    SimulationResult {
        yearly_results,
        summary,
        risk_path: risk.risk_path,
        failing_paths_sample,
        goal_results,
        validation_stats,
    }
}

fn validate_inputs(
    assets: &[AssetClass],
    config: &SimulationConfig,
    iterations: u32,
) -> Result<(), EngineError> {
    if iterations == 0 {
        return Err(EngineError::NoIterations);
    }
    if config.time_horizon_years == 0 {
        return Err(EngineError::EmptyHorizon);
    }
    if assets.is_empty() {
        return Err(EngineError::EmptyAssetMix);
    }

    for (idx, asset) in assets.iter().enumerate() {
        for (name, value) in [
            ("weight", asset.weight),
            ("expectedReturn", asset.expected_return),
            ("volatility", asset.volatility),
            ("jumpIntensity", asset.jump_intensity),
            ("jumpMean", asset.jump_mean),
            ("jumpSd", asset.jump_sd),
        ] {
            require_finite(&format!("assets[{idx}].{name}"), value)?;
        }
    }
    if assets.iter().all(|a| a.weight == 0.0) {
        return Err(EngineError::ZeroWeight);
    }

    require_finite("initialWealth", config.initial_wealth)?;
    if config.initial_wealth < 0.0 {
        return Err(EngineError::NegativeAmount {
            field: "initialWealth".to_string(),
        });
    }
    require_finite("savingsRate", config.savings_rate)?;
    require_finite("withdrawalRate", config.withdrawal_rate)?;
    require_rate("inflationRate", config.inflation_rate)?;

    for (idx, source) in config.income_sources.iter().enumerate() {
        require_finite(&format!("incomeSources[{idx}].amount"), source.amount)?;
        require_rate(&format!("incomeSources[{idx}].growthRate"), source.growth_rate)?;
        if let (Some(start), Some(end)) = (source.start_year, source.end_year) {
            if end < start {
                return Err(EngineError::InvalidIncomeWindow {
                    name: source.name.clone(),
                    start,
                    end,
                });
            }
        }
    }
    for (idx, goal) in config.goals.iter().enumerate() {
        require_finite(&format!("goals[{idx}].targetAmount"), goal.target_amount)?;
    }

    Ok(())
}

fn require_finite(field: &str, value: f64) -> Result<(), EngineError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(EngineError::NonFinite {
            field: field.to_string(),
        })
    }
}

fn require_rate(field: &str, value: f64) -> Result<(), EngineError> {
    require_finite(field, value)?;
    if value <= -1.0 {
        return Err(EngineError::InvalidRate {
            field: field.to_string(),
            value,
        });
    }
    Ok(())
}
