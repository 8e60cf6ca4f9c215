use super::types::{IncomeFrequency, IncomeSource, SimulationConfig, WithdrawalStrategy};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Phase {
    Accumulation,
    Retirement,
}

/// Cash moved in or out of the portfolio during one simulated month.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct MonthlyFlow {
    pub savings: f64,
    pub retirement_income: f64,
    pub withdrawal: f64,
}

/// Per-path memory of the withdrawal policy.
#[derive(Debug, Default)]
pub struct WithdrawalState {
    fixed_real_baseline: Option<f64>,
}

impl WithdrawalState {
    pub fn fixed_real_baseline(&self) -> Option<f64> {
        self.fixed_real_baseline
    }
}

pub struct CashFlowScheduler<'a> {
    config: &'a SimulationConfig,
    retirement_start_month: usize,
}

impl<'a> CashFlowScheduler<'a> {
    pub fn new(config: &'a SimulationConfig) -> Self {
        Self {
            config,
            retirement_start_month: config.retirement_start_month(),
        }
    }

    /// Months are 1-based; month `retirement_delay_years × 12` is still accumulation.
    pub fn phase(&self, month: usize) -> Phase {
        if month <= self.retirement_start_month {
            Phase::Accumulation
        } else {
            Phase::Retirement
        }
    }

    pub fn annual_income(&self, year_offset: u32, retired: bool) -> f64 {
        let calendar_year = self.config.calendar_year(year_offset);
        self.config
            .income_sources
            .iter()
            .map(|source| source_annual_income(source, calendar_year, year_offset, retired))
            .sum()
    }

    pub fn monthly_savings(&self, year_offset: u32) -> f64 {
        self.annual_income(year_offset, false) * (self.config.savings_rate / 100.0) / 12.0
    }

    /// Locks in the fixed-real baseline in the first retirement month. An
    /// immediate retirement uses the initial wealth; a delayed one uses the
    /// balance after that month's return and retirement income.
    fn capture_baseline(&self, month: usize, wealth: f64, state: &mut WithdrawalState) {
        if self.config.withdrawal_strategy != WithdrawalStrategy::FixedReal
            || month != self.retirement_start_month + 1
        {
            return;
        }
        let reference = if self.retirement_start_month == 0 {
            self.config.initial_wealth
        } else {
            wealth
        };
        state.fixed_real_baseline = Some(reference * self.config.withdrawal_rate);
    }

    /// Applies this month's contribution or withdrawal to post-return wealth.
    pub fn apply(
        &self,
        month: usize,
        wealth: f64,
        state: &mut WithdrawalState,
    ) -> (f64, MonthlyFlow) {
        let year_offset = year_offset(month);

        match self.phase(month) {
            Phase::Accumulation => {
                let savings = self.monthly_savings(year_offset);
                (
                    wealth + savings,
                    MonthlyFlow {
                        savings,
                        ..MonthlyFlow::default()
                    },
                )
            }
            Phase::Retirement => {
                let solvent = wealth > 0.0;
                let retirement_income = self.annual_income(year_offset, true) / 12.0;
                let mut wealth = wealth + retirement_income;

                let planned = if solvent {
                    self.capture_baseline(month, wealth, state);
                    self.planned_withdrawal(month, wealth, state)
                } else {
                    0.0
                };
                let withdrawal = planned.min(wealth).max(0.0);
                wealth -= withdrawal;

                (
                    wealth,
                    MonthlyFlow {
                        savings: 0.0,
                        retirement_income,
                        withdrawal,
                    },
                )
            }
        }
    }

    fn planned_withdrawal(&self, month: usize, wealth: f64, state: &WithdrawalState) -> f64 {
        match self.config.withdrawal_strategy {
            WithdrawalStrategy::PercentOfPortfolio => wealth * self.config.withdrawal_rate / 12.0,
            WithdrawalStrategy::FixedReal => {
                let baseline = state.fixed_real_baseline.unwrap_or(0.0);
                let years_since_retirement = month.saturating_sub(self.retirement_start_month + 1) / 12;
                baseline * (1.0 + self.config.inflation_rate).powi(years_since_retirement as i32)
                    / 12.0
            }
        }
    }

    /// Net monthly flow in the first simulated month, ignoring market moves:
    /// the savings contribution, or the initial fixed-rate draw when
    /// retirement is immediate.
    pub fn start_net_flow_monthly(&self) -> f64 {
        match self.phase(1) {
            Phase::Accumulation => self.monthly_savings(0),
            Phase::Retirement => -(self.config.initial_wealth * self.config.withdrawal_rate / 12.0),
        }
    }
}

pub fn year_offset(month: usize) -> u32 {
    (month.saturating_sub(1) / 12) as u32
}

fn source_annual_income(
    source: &IncomeSource,
    calendar_year: i32,
    year_offset: u32,
    retired: bool,
) -> f64 {
    if retired && source.stops_at_retirement {
        return 0.0;
    }
    if source.start_year.is_some_and(|start| calendar_year < start) {
        return 0.0;
    }
    if source.end_year.is_some_and(|end| calendar_year > end) {
        return 0.0;
    }

    let base_annual = match source.frequency {
        IncomeFrequency::Monthly => source.amount * 12.0,
        IncomeFrequency::Yearly => source.amount,
    };
    base_annual * (1.0 + source.growth_rate).powi(year_offset as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::defaults::default_config;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn salary(amount: f64) -> IncomeSource {
        IncomeSource {
            id: "salary".to_string(),
            name: "Salary".to_string(),
            amount,
            frequency: IncomeFrequency::Yearly,
            growth_rate: 0.0,
            start_year: None,
            end_year: None,
            stops_at_retirement: true,
        }
    }

    fn pension(amount: f64, start_year: i32) -> IncomeSource {
        IncomeSource {
            id: "pension".to_string(),
            name: "Pension".to_string(),
            amount,
            frequency: IncomeFrequency::Monthly,
            growth_rate: 0.0,
            start_year: Some(start_year),
            end_year: None,
            stops_at_retirement: false,
        }
    }

    fn sample_config() -> SimulationConfig {
        let mut config = default_config(2025);
        config.income_sources = vec![salary(120_000.0)];
        config.retirement_delay_years = 2;
        config.inflation_rate = 0.02;
        config
    }

    #[test]
    fn phase_boundary_sits_at_retirement_checkpoint() {
        let config = sample_config();
        let scheduler = CashFlowScheduler::new(&config);
        assert_eq!(scheduler.phase(1), Phase::Accumulation);
        assert_eq!(scheduler.phase(24), Phase::Accumulation);
        assert_eq!(scheduler.phase(25), Phase::Retirement);

        let mut immediate = sample_config();
        immediate.retirement_delay_years = 0;
        let scheduler = CashFlowScheduler::new(&immediate);
        assert_eq!(scheduler.phase(1), Phase::Retirement);
    }

    #[test]
    fn year_offset_groups_twelve_months() {
        assert_eq!(year_offset(1), 0);
        assert_eq!(year_offset(12), 0);
        assert_eq!(year_offset(13), 1);
        assert_eq!(year_offset(24), 1);
        assert_eq!(year_offset(25), 2);
    }

    #[test]
    fn income_compounds_from_simulation_start() {
        let mut config = sample_config();
        config.income_sources[0].growth_rate = 0.03;
        let scheduler = CashFlowScheduler::new(&config);
        assert_approx(scheduler.annual_income(0, false), 120_000.0);
        assert_approx(scheduler.annual_income(2, false), 120_000.0 * 1.03 * 1.03);
    }

    #[test]
    fn income_respects_calendar_bounds_and_retirement_flag() {
        let mut config = sample_config();
        config.income_sources[0].end_year = Some(2026);
        config.income_sources.push(pension(1_000.0, 2027));
        let scheduler = CashFlowScheduler::new(&config);

        assert_approx(scheduler.annual_income(0, false), 120_000.0);
        assert_approx(scheduler.annual_income(1, false), 120_000.0);
        assert_approx(scheduler.annual_income(2, false), 12_000.0);
        assert_approx(scheduler.annual_income(1, true), 0.0);
        assert_approx(scheduler.annual_income(5, true), 12_000.0);
    }

    #[test]
    fn accumulation_adds_savings_share_of_income() {
        let config = sample_config();
        let scheduler = CashFlowScheduler::new(&config);
        let mut state = WithdrawalState::default();

        let (wealth, flow) = scheduler.apply(1, 100_000.0, &mut state);
        // 120k × 20% / 12
        assert_approx(flow.savings, 2_000.0);
        assert_approx(flow.withdrawal, 0.0);
        assert_approx(wealth, 102_000.0);
    }

    #[test]
    fn fixed_real_captures_initial_wealth_when_retiring_immediately() {
        let mut config = sample_config();
        config.retirement_delay_years = 0;
        config.income_sources.clear();
        let scheduler = CashFlowScheduler::new(&config);
        let mut state = WithdrawalState::default();

        // The market may have moved; the baseline still comes from the initial wealth.
        let (wealth, flow) = scheduler.apply(1, 140_000.0, &mut state);
        assert_approx(
            state.fixed_real_baseline().expect("baseline captured"),
            150_000.0 * 0.04,
        );
        assert_approx(flow.withdrawal, 500.0);
        assert_approx(wealth, 139_500.0);
    }

    #[test]
    fn fixed_real_captures_post_return_wealth_at_delayed_retirement() {
        let config = sample_config();
        let scheduler = CashFlowScheduler::new(&config);
        let mut state = WithdrawalState::default();

        scheduler.apply(24, 400_000.0, &mut state);
        assert!(state.fixed_real_baseline().is_none());

        let (_, first) = scheduler.apply(25, 480_000.0, &mut state);
        let baseline = 480_000.0 * 0.04;
        assert_approx(
            state.fixed_real_baseline().expect("baseline captured"),
            baseline,
        );
        assert_approx(first.withdrawal, baseline / 12.0);

        // Later balances no longer move the baseline.
        let (_, last_of_year) = scheduler.apply(36, 300_000.0, &mut state);
        assert_approx(last_of_year.withdrawal, baseline / 12.0);
        let (_, next_year) = scheduler.apply(37, 300_000.0, &mut state);
        assert_approx(next_year.withdrawal, baseline * 1.02 / 12.0);
    }

    #[test]
    fn delayed_baseline_includes_first_month_retirement_income() {
        let mut config = sample_config();
        config.income_sources.push(pension(1_000.0, 2025));
        let scheduler = CashFlowScheduler::new(&config);
        let mut state = WithdrawalState::default();

        let (wealth, flow) = scheduler.apply(25, 470_000.0, &mut state);
        let baseline = 471_000.0 * 0.04;
        assert_approx(
            state.fixed_real_baseline().expect("baseline captured"),
            baseline,
        );
        assert_approx(flow.withdrawal, baseline / 12.0);
        assert_approx(wealth, 471_000.0 - baseline / 12.0);
    }

    #[test]
    fn insolvent_first_retirement_month_leaves_baseline_unset() {
        let config = sample_config();
        let scheduler = CashFlowScheduler::new(&config);
        let mut state = WithdrawalState::default();

        let (_, flow) = scheduler.apply(25, 0.0, &mut state);
        assert!(state.fixed_real_baseline().is_none());
        assert_approx(flow.withdrawal, 0.0);
    }

    #[test]
    fn percent_of_portfolio_tracks_live_wealth() {
        let mut config = sample_config();
        config.retirement_delay_years = 0;
        config.withdrawal_strategy = WithdrawalStrategy::PercentOfPortfolio;
        config.income_sources.clear();
        let scheduler = CashFlowScheduler::new(&config);
        let mut state = WithdrawalState::default();

        let (wealth, flow) = scheduler.apply(1, 120_000.0, &mut state);
        assert_approx(flow.withdrawal, 400.0);
        assert_approx(wealth, 119_600.0);

        let (_, flow) = scheduler.apply(2, 60_000.0, &mut state);
        assert_approx(flow.withdrawal, 200.0);
    }

    #[test]
    fn retirement_income_is_added_before_withdrawal() {
        let mut config = sample_config();
        config.retirement_delay_years = 0;
        config.income_sources.push(pension(1_000.0, 2025));
        let scheduler = CashFlowScheduler::new(&config);
        let mut state = WithdrawalState::default();

        let (wealth, flow) = scheduler.apply(1, 150_000.0, &mut state);
        assert_approx(flow.retirement_income, 1_000.0);
        assert_approx(flow.withdrawal, 500.0);
        assert_approx(wealth, 150_500.0);
    }

    #[test]
    fn ruined_path_skips_withdrawal_but_keeps_income() {
        let mut config = sample_config();
        config.retirement_delay_years = 0;
        config.income_sources.push(pension(300.0, 2025));
        let scheduler = CashFlowScheduler::new(&config);
        let mut state = WithdrawalState::default();
        scheduler.apply(1, 150_000.0, &mut state);

        let (wealth, flow) = scheduler.apply(5, 0.0, &mut state);
        assert_approx(flow.withdrawal, 0.0);
        assert_approx(wealth, 300.0);
    }

    #[test]
    fn withdrawal_never_exceeds_available_wealth() {
        let mut config = sample_config();
        config.retirement_delay_years = 0;
        config.income_sources.clear();
        let scheduler = CashFlowScheduler::new(&config);
        let mut state = WithdrawalState::default();
        scheduler.apply(1, 150_000.0, &mut state);

        let (wealth, flow) = scheduler.apply(3, 120.0, &mut state);
        assert_approx(flow.withdrawal, 120.0);
        assert_approx(wealth, 0.0);
    }

    #[test]
    fn start_net_flow_reports_savings_or_drawdown() {
        let config = sample_config();
        assert_approx(CashFlowScheduler::new(&config).start_net_flow_monthly(), 2_000.0);

        let mut retired = sample_config();
        retired.retirement_delay_years = 0;
        assert_approx(CashFlowScheduler::new(&retired).start_net_flow_monthly(), -500.0);
    }

    #[test]
    fn start_net_flow_ignores_income_and_strategy_when_retired() {
        let mut config = sample_config();
        config.retirement_delay_years = 0;
        config.withdrawal_strategy = WithdrawalStrategy::PercentOfPortfolio;
        config.income_sources.push(pension(1_000.0, 2025));
        assert_approx(CashFlowScheduler::new(&config).start_net_flow_monthly(), -500.0);
    }
}
