use super::types::{AssetClass, PortfolioParameters, StressScenario};

pub const BASE_CORRELATION: f64 = 0.3;

/// Shocked asset mix used inside the crisis window.
#[derive(Debug, Clone)]
pub struct StressAdjustment {
    pub assets: Vec<AssetClass>,
    pub correlation: f64,
}

/// Collapses the asset mix into one set of portfolio parameters. Jump
/// parameters are pooled by weight rather than simulated per asset.
pub fn portfolio_parameters(assets: &[AssetClass], correlation: f64) -> PortfolioParameters {
    let mut mu = 0.0;
    let mut lambda = 0.0;
    let mut jump_mean = 0.0;
    let mut jump_sd = 0.0;

    for asset in assets {
        let w = asset.weight / 100.0;
        mu += w * asset.expected_return;
        lambda += w * asset.jump_intensity;
        jump_mean += w * asset.jump_mean;
        jump_sd += w * asset.jump_sd;
    }

    let mut variance = 0.0;
    for (i, a) in assets.iter().enumerate() {
        for (j, b) in assets.iter().enumerate() {
            let rho = if i == j { 1.0 } else { correlation };
            variance += (a.weight / 100.0) * (b.weight / 100.0) * a.volatility * b.volatility * rho;
        }
    }
    // Negative correlations can push rounding below zero.
    let variance = variance.max(0.0);

    PortfolioParameters {
        mu,
        sigma: variance.sqrt(),
        variance,
        lambda,
        jump_mean,
        jump_sd,
    }
}

pub fn scenario_correlation(scenario: StressScenario) -> f64 {
    match scenario {
        StressScenario::None => BASE_CORRELATION,
        StressScenario::Gfc2008 => 0.8,
        StressScenario::InflationShock => 0.6,
        StressScenario::TechBubble => 0.4,
    }
}

pub fn stress_assets(assets: &[AssetClass], scenario: StressScenario) -> StressAdjustment {
    let assets = assets
        .iter()
        .map(|asset| {
            let mut shocked = asset.clone();
            match scenario {
                StressScenario::None => {}
                StressScenario::Gfc2008 => {
                    shocked.volatility *= 1.5;
                    shocked.jump_intensity *= 3.0;
                    shocked.expected_return -= 0.05;
                }
                StressScenario::InflationShock => {
                    if shocked.category.is_fixed_income() {
                        shocked.expected_return -= 0.06;
                        shocked.volatility *= 2.0;
                    }
                    shocked.expected_return -= 0.03;
                }
                StressScenario::TechBubble => {
                    if shocked.category.is_equity_like() || shocked.category.is_crypto() {
                        shocked.volatility *= 2.0;
                        shocked.jump_mean = -0.5;
                    }
                }
            }
            shocked
        })
        .collect();

    StressAdjustment {
        assets,
        correlation: scenario_correlation(scenario),
    }
}

/// Parameters for the crisis window, `None` when no scenario is selected.
pub fn stressed_parameters(
    assets: &[AssetClass],
    scenario: StressScenario,
) -> Option<PortfolioParameters> {
    if scenario == StressScenario::None {
        return None;
    }
    let adjustment = stress_assets(assets, scenario);
    Some(portfolio_parameters(
        &adjustment.assets,
        adjustment.correlation,
    ))
}
