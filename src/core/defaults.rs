use super::types::{
    AssetCategory, AssetClass, IncomeFrequency, IncomeSource, SimulationConfig, WithdrawalStrategy,
};

pub const DEFAULT_ITERATIONS: u32 = 500;

pub fn default_assets() -> Vec<AssetClass> {
    vec![
        AssetClass {
            category: AssetCategory::UsEquity,
            weight: 75.0,
            expected_return: 0.08,
            volatility: 0.15,
            jump_intensity: 0.1,
            jump_mean: -0.20,
            jump_sd: 0.10,
        },
        AssetClass {
            category: AssetCategory::IntlEquity,
            weight: 0.0,
            expected_return: 0.07,
            volatility: 0.18,
            jump_intensity: 0.15,
            jump_mean: -0.25,
            jump_sd: 0.12,
        },
        AssetClass {
            category: AssetCategory::FixedIncome,
            weight: 25.0,
            expected_return: 0.04,
            volatility: 0.05,
            jump_intensity: 0.05,
            jump_mean: -0.05,
            jump_sd: 0.02,
        },
        AssetClass {
            category: AssetCategory::RealEstate,
            weight: 0.0,
            expected_return: 0.09,
            volatility: 0.12,
            jump_intensity: 0.08,
            jump_mean: -0.30,
            jump_sd: 0.15,
        },
        AssetClass {
            category: AssetCategory::PrivateEquity,
            weight: 0.0,
            expected_return: 0.11,
            volatility: 0.22,
            jump_intensity: 0.1,
            jump_mean: -0.15,
            jump_sd: 0.20,
        },
        AssetClass {
            category: AssetCategory::Crypto,
            weight: 0.0,
            expected_return: 0.15,
            volatility: 0.80,
            jump_intensity: 0.5,
            jump_mean: -0.40,
            jump_sd: 0.40,
        },
    ]
}

pub fn default_config(start_year: i32) -> SimulationConfig {
    SimulationConfig {
        initial_wealth: 150_000.0,
        income_sources: vec![IncomeSource {
            id: "1".to_string(),
            name: "Salary".to_string(),
            amount: 120_000.0,
            frequency: IncomeFrequency::Yearly,
            growth_rate: 0.03,
            start_year: Some(start_year),
            end_year: None,
            stops_at_retirement: true,
        }],
        goals: Vec::new(),
        savings_rate: 20.0,
        retirement_delay_years: 0,
        time_horizon_years: 30,
        withdrawal_rate: 0.04,
        withdrawal_strategy: WithdrawalStrategy::FixedReal,
        inflation_rate: 0.025,
        start_year,
        crisis_start_year: Some(0),
        crisis_duration: Some(3),
    }
}
