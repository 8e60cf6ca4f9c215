mod aggregate;
mod cashflow;
mod defaults;
mod engine;
mod error;
mod goals;
mod params;
mod risk;
mod sampling;
mod types;

pub use defaults::{DEFAULT_ITERATIONS, default_assets, default_config};
pub use engine::{FAILING_PATH_SAMPLE_LIMIT, run_simulation, run_simulation_seeded};
pub use error::EngineError;
pub use params::{BASE_CORRELATION, portfolio_parameters, stress_assets, stressed_parameters};
pub use types::{
    AssetCategory, AssetClass, Goal, GoalResult, IncomeFrequency, IncomeSource,
    PortfolioParameters, RiskPathPoint, SimulationConfig, SimulationResult, SimulationSummary,
    SimulationYearResult, StressScenario, ValidationStats, WithdrawalStrategy,
};
