use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum AssetCategory {
    #[serde(rename = "US Equity", alias = "usEquity", alias = "us-equity")]
    UsEquity,
    #[serde(rename = "Intl Equity", alias = "intlEquity", alias = "intl-equity")]
    IntlEquity,
    #[serde(rename = "Fixed Income", alias = "fixedIncome", alias = "fixed-income")]
    FixedIncome,
    #[serde(rename = "Real Estate", alias = "realEstate", alias = "real-estate")]
    RealEstate,
    #[serde(
        rename = "Private Equity",
        alias = "privateEquity",
        alias = "private-equity"
    )]
    PrivateEquity,
    #[serde(rename = "Crypto/Alts", alias = "crypto", alias = "Crypto")]
    Crypto,
}

impl AssetCategory {
    pub fn is_equity_like(self) -> bool {
        matches!(
            self,
            AssetCategory::UsEquity | AssetCategory::IntlEquity | AssetCategory::PrivateEquity
        )
    }

    pub fn is_fixed_income(self) -> bool {
        self == AssetCategory::FixedIncome
    }

    pub fn is_crypto(self) -> bool {
        self == AssetCategory::Crypto
    }
}

/// One asset class of the allocation. `weight` is a percentage; the return,
/// volatility and jump figures are annual.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetClass {
    pub category: AssetCategory,
    pub weight: f64,
    pub expected_return: f64,
    pub volatility: f64,
    pub jump_intensity: f64,
    pub jump_mean: f64,
    pub jump_sd: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum IncomeFrequency {
    Yearly,
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeSource {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub amount: f64,
    pub frequency: IncomeFrequency,
    #[serde(default)]
    pub growth_rate: f64,
    #[serde(default)]
    pub start_year: Option<i32>,
    #[serde(default)]
    pub end_year: Option<i32>,
    #[serde(default)]
    pub stops_at_retirement: bool,
}

/// A wealth target expressed in today's purchasing power.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub target_amount: f64,
    pub target_year: i32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum WithdrawalStrategy {
    #[serde(alias = "FIXED_REAL", alias = "fixed-real", alias = "fixedReal")]
    FixedReal,
    #[serde(
        alias = "PERCENT_PORTFOLIO",
        alias = "percent-of-portfolio",
        alias = "percentOfPortfolio"
    )]
    PercentOfPortfolio,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub enum StressScenario {
    #[default]
    #[serde(alias = "NONE", alias = "none")]
    None,
    #[serde(alias = "GFC_2008", alias = "gfc-2008", alias = "2008 Financial Crisis")]
    Gfc2008,
    #[serde(
        alias = "INFLATION_SHOCK",
        alias = "inflation-shock",
        alias = "Hyperinflation Shock"
    )]
    InflationShock,
    #[serde(alias = "TECH_BUBBLE", alias = "tech-bubble", alias = "Tech Bubble Burst")]
    TechBubble,
}

impl StressScenario {
    pub const ALL: [StressScenario; 4] = [
        StressScenario::None,
        StressScenario::Gfc2008,
        StressScenario::InflationShock,
        StressScenario::TechBubble,
    ];

    pub fn label(self) -> &'static str {
        match self {
            StressScenario::None => "None",
            StressScenario::Gfc2008 => "2008 Financial Crisis",
            StressScenario::InflationShock => "Hyperinflation Shock",
            StressScenario::TechBubble => "Tech Bubble Burst",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationConfig {
    pub initial_wealth: f64,
    #[serde(default)]
    pub income_sources: Vec<IncomeSource>,
    #[serde(default)]
    pub goals: Vec<Goal>,
    pub savings_rate: f64,
    pub retirement_delay_years: u32,
    pub time_horizon_years: u32,
    pub withdrawal_rate: f64,
    pub withdrawal_strategy: WithdrawalStrategy,
    pub inflation_rate: f64,
    pub start_year: i32,
    #[serde(default)]
    pub crisis_start_year: Option<u32>,
    #[serde(default)]
    pub crisis_duration: Option<u32>,
}

pub(crate) const DEFAULT_CRISIS_DURATION_YEARS: u32 = 3;

impl SimulationConfig {
    pub fn total_months(&self) -> usize {
        self.time_horizon_years as usize * 12
    }

    pub fn retirement_start_month(&self) -> usize {
        self.retirement_delay_years as usize * 12
    }

    /// Half-open month range `[start, end)` during which stressed parameters apply.
    pub fn crisis_months(&self) -> (usize, usize) {
        let start = self.crisis_start_year.unwrap_or(0) as usize * 12;
        let duration = self
            .crisis_duration
            .unwrap_or(DEFAULT_CRISIS_DURATION_YEARS) as usize;
        (start, start + duration * 12)
    }

    pub fn calendar_year(&self, year_offset: u32) -> i32 {
        let offset = i32::try_from(year_offset).unwrap_or(i32::MAX);
        self.start_year.saturating_add(offset)
    }

    pub fn deflator(&self, years: u32) -> f64 {
        (1.0 + self.inflation_rate).powi(years as i32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioParameters {
    pub mu: f64,
    pub sigma: f64,
    pub variance: f64,
    pub lambda: f64,
    pub jump_mean: f64,
    pub jump_sd: f64,
}

impl PortfolioParameters {
    /// Expected relative jump size `exp(m + s²/2) - 1`.
    pub fn jump_compensator(&self) -> f64 {
        (self.jump_mean + 0.5 * self.jump_sd * self.jump_sd).exp() - 1.0
    }

    /// Log drift over `dt` with the Itô and jump compensation terms removed.
    pub fn compensated_drift(&self, dt: f64) -> f64 {
        (self.mu - self.lambda * self.jump_compensator() - 0.5 * self.variance) * dt
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationYearResult {
    pub year: i32,
    pub worst_case: f64,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub worst_case_real: f64,
    pub p10_real: f64,
    pub p25_real: f64,
    pub p50_real: f64,
    pub p75_real: f64,
    pub p90_real: f64,
    pub median_withdrawal: f64,
    pub median_savings: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalResult {
    pub goal_id: String,
    pub probability: f64,
    pub expected_amount: f64,
    pub shortfall: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskPathPoint {
    pub year: i32,
    pub value: f64,
    pub peak: f64,
    pub drawdown: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationStats {
    pub effective_return: f64,
    pub effective_volatility: f64,
    pub assumed_correlation: f64,
    pub jump_frequency: f64,
    pub start_net_flow_monthly: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSummary {
    pub success_probability: f64,
    pub median_terminal_wealth: f64,
    pub median_terminal_wealth_real: f64,
    pub worst_drawdown_pct: f64,
    pub worst_one_year_return: f64,
    pub configured_withdrawal_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub yearly_results: Vec<SimulationYearResult>,
    pub summary: SimulationSummary,
    pub risk_path: Vec<RiskPathPoint>,
    pub failing_paths_sample: Vec<Vec<f64>>,
    pub goal_results: Vec<GoalResult>,
    pub validation_stats: ValidationStats,
}
