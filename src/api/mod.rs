mod ledger;

use axum::{
    Router,
    extract::{Json, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

pub use ledger::{RunLedger, RunTicket};

use crate::core::{
    AssetClass, DEFAULT_ITERATIONS, EngineError, Goal, IncomeSource, SimulationConfig,
    SimulationResult, StressScenario, WithdrawalStrategy, default_assets, default_config,
    run_simulation_seeded,
};

pub const MAX_API_ITERATIONS: u32 = 50_000;
const SUPERSEDED_MESSAGE: &str = "superseded by a newer simulation request";

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
enum ApiWithdrawalStrategy {
    #[serde(alias = "fixedReal", alias = "fixed_real", alias = "FIXED_REAL")]
    FixedReal,
    #[serde(
        alias = "percentOfPortfolio",
        alias = "percent_of_portfolio",
        alias = "percent-portfolio",
        alias = "PERCENT_PORTFOLIO"
    )]
    PercentOfPortfolio,
}

impl From<ApiWithdrawalStrategy> for WithdrawalStrategy {
    fn from(value: ApiWithdrawalStrategy) -> Self {
        match value {
            ApiWithdrawalStrategy::FixedReal => WithdrawalStrategy::FixedReal,
            ApiWithdrawalStrategy::PercentOfPortfolio => WithdrawalStrategy::PercentOfPortfolio,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
enum ApiStressScenario {
    #[serde(alias = "NONE", alias = "None")]
    None,
    #[serde(
        rename = "gfc-2008",
        alias = "gfc2008",
        alias = "GFC_2008",
        alias = "2008 Financial Crisis"
    )]
    Gfc2008,
    #[serde(
        alias = "inflationShock",
        alias = "INFLATION_SHOCK",
        alias = "Hyperinflation Shock"
    )]
    InflationShock,
    #[serde(
        alias = "techBubble",
        alias = "TECH_BUBBLE",
        alias = "Tech Bubble Burst"
    )]
    TechBubble,
}

impl From<ApiStressScenario> for StressScenario {
    fn from(value: ApiStressScenario) -> Self {
        match value {
            ApiStressScenario::None => StressScenario::None,
            ApiStressScenario::Gfc2008 => StressScenario::Gfc2008,
            ApiStressScenario::InflationShock => StressScenario::InflationShock,
            ApiStressScenario::TechBubble => StressScenario::TechBubble,
        }
    }
}

impl From<StressScenario> for ApiStressScenario {
    fn from(value: StressScenario) -> Self {
        match value {
            StressScenario::None => ApiStressScenario::None,
            StressScenario::Gfc2008 => ApiStressScenario::Gfc2008,
            StressScenario::InflationShock => ApiStressScenario::InflationShock,
            StressScenario::TechBubble => ApiStressScenario::TechBubble,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    initial_wealth: Option<f64>,
    savings_rate: Option<f64>,
    retirement_delay_years: Option<u32>,
    time_horizon_years: Option<u32>,
    withdrawal_rate: Option<f64>,
    withdrawal_strategy: Option<ApiWithdrawalStrategy>,
    inflation_rate: Option<f64>,
    start_year: Option<i32>,
    crisis_start_year: Option<u32>,
    crisis_duration: Option<u32>,

    income_sources: Option<Vec<IncomeSource>>,
    goals: Option<Vec<Goal>>,
    assets: Option<Vec<AssetClass>>,

    scenario: Option<ApiStressScenario>,
    iterations: Option<u32>,
    seed: Option<u64>,
    client_id: Option<String>,
}

#[derive(Debug)]
struct ApiRequest {
    config: SimulationConfig,
    assets: Vec<AssetClass>,
    scenario: StressScenario,
    iterations: u32,
    seed: Option<u64>,
    client_id: Option<String>,
}

/// A saved scenario as written by a persistence layer: plain config and
/// asset data, with the stress scenario optional.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedScenario {
    pub config: SimulationConfig,
    pub assets: Vec<AssetClass>,
    #[serde(default)]
    pub scenario: StressScenario,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateResponse {
    pub iterations: u32,
    pub seed: u64,
    #[serde(flatten)]
    pub result: SimulationResult,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScenarioInfo {
    id: ApiStressScenario,
    label: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DefaultsResponse {
    config: SimulationConfig,
    assets: Vec<AssetClass>,
    iterations: u32,
    max_iterations: u32,
    scenarios: Vec<ScenarioInfo>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Clone, Debug, Default)]
struct AppState {
    ledger: RunLedger,
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route("/api/defaults", get(defaults_handler))
        .fallback(not_found_handler)
        .with_state(AppState::default());

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "wealthcast HTTP API listening");
    tracing::info!("local access: http://127.0.0.1:{port}/api/defaults");

    axum::serve(listener, app).await
}

/// Runs a saved scenario outside the HTTP surface. A missing seed draws a
/// fresh one, which is echoed in the response.
pub fn simulate_saved_scenario(
    saved: &SavedScenario,
    iterations: u32,
    seed: Option<u64>,
) -> Result<SimulateResponse, EngineError> {
    let seed = seed.unwrap_or_else(rand::random);
    let result = run_simulation_seeded(
        &saved.assets,
        &saved.config,
        saved.scenario,
        iterations,
        seed,
    )?;
    Ok(SimulateResponse {
        iterations,
        seed,
        result,
    })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn defaults_handler() -> Response {
    json_response(StatusCode::OK, defaults_response())
}

async fn simulate_get_handler(
    State(state): State<AppState>,
    Query(payload): Query<SimulatePayload>,
) -> Response {
    simulate_handler_impl(&state.ledger, payload).await
}

async fn simulate_post_handler(
    State(state): State<AppState>,
    Json(payload): Json<SimulatePayload>,
) -> Response {
    simulate_handler_impl(&state.ledger, payload).await
}

async fn simulate_handler_impl(ledger: &RunLedger, payload: SimulatePayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    let ticket = ledger.begin(request.client_id.as_deref());
    let seed = request.seed.unwrap_or_else(rand::random);
    let iterations = request.iterations;
    let outcome = tokio::task::spawn_blocking(move || {
        run_simulation_seeded(
            &request.assets,
            &request.config,
            request.scenario,
            request.iterations,
            seed,
        )
    })
    .await;

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, "simulation task failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "simulation task failed");
        }
    };

    finish_run(
        ledger,
        &ticket,
        result.map(|result| SimulateResponse {
            iterations,
            seed,
            result,
        }),
    )
}

/// Publishes a finished run unless a newer run for the same client started
/// while it was in flight. Either way the run is settled in the ledger.
fn finish_run(
    ledger: &RunLedger,
    ticket: &RunTicket,
    outcome: Result<SimulateResponse, EngineError>,
) -> Response {
    if !ledger.finish(ticket) {
        tracing::info!(
            client_id = ticket.client_id().unwrap_or_default(),
            generation = ticket.generation(),
            "discarding superseded simulation"
        );
        return error_response(StatusCode::CONFLICT, SUPERSEDED_MESSAGE);
    }

    match outcome {
        Ok(response) => {
            tracing::info!(
                iterations = response.iterations,
                seed = response.seed,
                success_probability = response.result.summary.success_probability,
                "simulation complete"
            );
            json_response(StatusCode::OK, response)
        }
        Err(e) => {
            tracing::info!(error = %e, "rejected simulation request");
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
    }
}

fn with_cache_control(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)).into_response())
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn defaults_response() -> DefaultsResponse {
    DefaultsResponse {
        config: default_config(current_year()),
        assets: default_assets(),
        iterations: DEFAULT_ITERATIONS,
        max_iterations: MAX_API_ITERATIONS,
        scenarios: StressScenario::ALL
            .iter()
            .map(|s| ScenarioInfo {
                id: (*s).into(),
                label: s.label(),
            })
            .collect(),
    }
}

fn current_year() -> i32 {
    chrono::Local::now().year()
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: SimulatePayload) -> Result<ApiRequest, String> {
    let start_year = payload.start_year.unwrap_or_else(current_year);
    let mut config = default_config(start_year);

    if let Some(v) = payload.initial_wealth {
        config.initial_wealth = v;
    }
    if let Some(v) = payload.savings_rate {
        config.savings_rate = v;
    }
    if let Some(v) = payload.retirement_delay_years {
        config.retirement_delay_years = v;
    }
    if let Some(v) = payload.time_horizon_years {
        config.time_horizon_years = v;
    }
    if let Some(v) = payload.withdrawal_rate {
        config.withdrawal_rate = v;
    }
    if let Some(v) = payload.withdrawal_strategy {
        config.withdrawal_strategy = v.into();
    }
    if let Some(v) = payload.inflation_rate {
        config.inflation_rate = v;
    }
    if let Some(v) = payload.crisis_start_year {
        config.crisis_start_year = Some(v);
    }
    if let Some(v) = payload.crisis_duration {
        config.crisis_duration = Some(v);
    }
    if let Some(v) = payload.income_sources {
        config.income_sources = v;
    }
    if let Some(v) = payload.goals {
        config.goals = v;
    }

    let iterations = payload.iterations.unwrap_or(DEFAULT_ITERATIONS);
    if iterations == 0 {
        return Err("iterations must be positive".to_string());
    }
    if iterations > MAX_API_ITERATIONS {
        return Err(format!("iterations must be <= {MAX_API_ITERATIONS}"));
    }
    if config.time_horizon_years == 0 {
        return Err("timeHorizonYears must be >= 1".to_string());
    }
    if !(0.0..=100.0).contains(&config.savings_rate) {
        return Err("savingsRate must be between 0 and 100".to_string());
    }
    if !(0.0..=1.0).contains(&config.withdrawal_rate) {
        return Err("withdrawalRate must be between 0 and 1".to_string());
    }
    if let Some(client_id) = &payload.client_id {
        if client_id.trim().is_empty() {
            return Err("clientId must not be blank".to_string());
        }
    }

    Ok(ApiRequest {
        config,
        assets: payload.assets.unwrap_or_else(default_assets),
        scenario: payload.scenario.map(Into::into).unwrap_or_default(),
        iterations,
        seed: payload.seed,
        client_id: payload.client_id,
    })
}
