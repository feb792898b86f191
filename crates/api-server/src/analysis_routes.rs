use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use competitive_ranking::RankingEngine;
use risk_simulator::RiskSimulator;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use treasury_core::{
    AnalysisError, ComparisonEntity, RankingResult, SimulationParameters, SimulationResult, Subject,
};

use crate::config::ServerConfig;
use crate::context::{render_context, ContextInput, DerivedMetrics, MarketSnapshot};
use crate::treasuries::{comparison_entities, TreasuryProfile};
use crate::{ApiResponse, AppError, AppState};

/// Per-request overrides of the configured simulation defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimulationOptions {
    pub annual_volatility: Option<f64>,
    pub horizon_days: Option<u32>,
    pub path_count: Option<usize>,
    pub floor_price: Option<f64>,
    #[serde(default)]
    pub thresholds: Vec<f64>,
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct RankRequest {
    pub name: Option<String>,
    pub holdings: f64,
    pub unit_count: f64,
    /// Replaces the configured table for this request.
    pub comparison_table: Option<Vec<ComparisonEntity>>,
}

#[derive(Debug, Deserialize)]
pub struct SimulateRequest {
    pub initial_price: f64,
    pub holdings: f64,
    #[serde(flatten)]
    pub options: SimulationOptions,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisRequest {
    pub name: Option<String>,
    pub holdings: f64,
    pub unit_count: f64,
    pub market: MarketSnapshot,
    pub comparison_table: Option<Vec<TreasuryProfile>>,
    #[serde(default)]
    pub skip_simulation: bool,
    #[serde(flatten)]
    pub simulation: SimulationOptions,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub subject: Subject,
    pub market: MarketSnapshot,
    pub derived: DerivedMetrics,
    pub ranking: RankingResult,
    pub simulation: Option<SimulationResult>,
    pub context: String,
    pub generated_at: DateTime<Utc>,
}

pub fn analysis_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/treasuries", get(get_treasuries))
        .route("/api/rank", post(rank_subject))
        .route("/api/simulate", post(run_simulation))
        .route("/api/analysis", post(run_analysis))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "treasury-analyst",
        "version": env!("CARGO_PKG_VERSION"),
        "capabilities": ["competitive_ranking", "risk_simulation", "prompt_context"],
    }))
}

async fn get_treasuries(
    State(state): State<AppState>,
) -> Json<ApiResponse<Vec<TreasuryProfile>>> {
    Json(ApiResponse::success(state.comparison_table.as_ref().clone()))
}

async fn rank_subject(
    State(state): State<AppState>,
    Json(req): Json<RankRequest>,
) -> Result<Json<ApiResponse<RankingResult>>, AppError> {
    let subject = build_subject(&state.config, req.name, req.holdings, req.unit_count)?;
    let table = match req.comparison_table {
        Some(table) => table,
        None => comparison_entities(&state.comparison_table)?,
    };

    let ranking = RankingEngine::new().rank(&subject, &table)?;
    tracing::info!(
        "Ranked {} #{} of {}",
        subject.name,
        ranking.subject_rank,
        ranking.total_entities
    );

    Ok(Json(ApiResponse::success(ranking)))
}

async fn run_simulation(
    State(state): State<AppState>,
    Json(req): Json<SimulateRequest>,
) -> Result<Json<ApiResponse<SimulationResult>>, AppError> {
    let result = simulate(&state.config, req.initial_price, req.holdings, req.options).await?;
    Ok(Json(ApiResponse::success(result)))
}

async fn run_analysis(
    State(state): State<AppState>,
    Json(req): Json<AnalysisRequest>,
) -> Result<Json<ApiResponse<AnalysisResponse>>, AppError> {
    let subject = build_subject(&state.config, req.name, req.holdings, req.unit_count)?;
    tracing::info!("Analysis requested for {}", subject.name);

    let profiles = req
        .comparison_table
        .unwrap_or_else(|| state.comparison_table.as_ref().clone());
    let table = comparison_entities(&profiles)?;
    let ranking = RankingEngine::new().rank(&subject, &table)?;

    let simulation = if req.skip_simulation {
        None
    } else {
        Some(simulate(&state.config, req.market.btc_price, subject.holdings, req.simulation).await?)
    };

    let generated_at = Utc::now();
    let context = render_context(&ContextInput {
        as_of: generated_at,
        market: &req.market,
        subject: &subject,
        ranking: &ranking,
        simulation: simulation.as_ref(),
        profiles: &profiles,
    });

    Ok(Json(ApiResponse::success(AnalysisResponse {
        derived: DerivedMetrics::compute(&subject, req.market.btc_price),
        subject,
        market: req.market,
        ranking,
        simulation,
        context,
        generated_at,
    })))
}

fn build_subject(
    config: &ServerConfig,
    name: Option<String>,
    holdings: f64,
    unit_count: f64,
) -> Result<Subject, AnalysisError> {
    let name = name.unwrap_or_else(|| config.subject_name.clone());
    Subject::named(name, holdings, unit_count)
}

/// Resolve request options against config defaults and enforce the step cap.
fn build_simulation(
    config: &ServerConfig,
    initial_price: f64,
    holdings: f64,
    options: &SimulationOptions,
) -> Result<(SimulationParameters, RiskSimulator), AnalysisError> {
    let params = SimulationParameters::new(
        initial_price,
        holdings,
        options.annual_volatility.unwrap_or(config.annual_volatility),
    )?
    .with_horizon_days(options.horizon_days.unwrap_or(config.simulation_horizon_days))
    .with_path_count(options.path_count.unwrap_or(config.simulation_paths))
    .with_floor_price(options.floor_price.unwrap_or(config.floor_price));
    params.validate()?;

    match params.total_steps() {
        Some(steps) if steps <= config.max_simulation_steps => {}
        steps => {
            return Err(AnalysisError::InvalidParameter(format!(
                "path_count x horizon_days = {} exceeds the limit of {}",
                steps.map_or_else(
                    || format!("{} x {}", params.path_count, params.horizon_days),
                    |s| s.to_string()
                ),
                config.max_simulation_steps
            )));
        }
    }

    let simulator = match options.seed.or(config.simulation_seed) {
        Some(seed) => RiskSimulator::seeded(seed),
        None => RiskSimulator::new(),
    };
    Ok((params, simulator))
}

/// Runs on the blocking pool; rayon fans the paths out from there.
async fn simulate(
    config: &ServerConfig,
    initial_price: f64,
    holdings: f64,
    options: SimulationOptions,
) -> Result<SimulationResult, AppError> {
    let (params, simulator) = build_simulation(config, initial_price, holdings, &options)?;
    let thresholds = options.thresholds;

    let result =
        tokio::task::spawn_blocking(move || simulator.simulate(&params, &thresholds)).await??;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_simulation_uses_config_defaults() {
        let config = ServerConfig {
            simulation_paths: 500,
            simulation_horizon_days: 30,
            simulation_seed: Some(9),
            ..ServerConfig::default()
        };
        let (params, simulator) =
            build_simulation(&config, 100.0, 2.0, &SimulationOptions::default()).unwrap();

        assert_eq!(params.path_count, 500);
        assert_eq!(params.horizon_days, 30);
        assert_eq!(params.annual_volatility, 0.8);
        assert_eq!(simulator.seed(), Some(9));
    }

    #[test]
    fn test_build_simulation_request_overrides_win() {
        let config = ServerConfig::default();
        let options = SimulationOptions {
            annual_volatility: Some(0.3),
            horizon_days: Some(10),
            path_count: Some(50),
            floor_price: Some(1.0),
            thresholds: vec![],
            seed: Some(4),
        };
        let (params, simulator) = build_simulation(&config, 100.0, 2.0, &options).unwrap();

        assert_eq!(params.annual_volatility, 0.3);
        assert_eq!(params.horizon_days, 10);
        assert_eq!(params.path_count, 50);
        assert_eq!(params.floor_price, 1.0);
        assert_eq!(simulator.seed(), Some(4));
    }

    #[test]
    fn test_build_simulation_enforces_step_cap() {
        let config = ServerConfig {
            max_simulation_steps: 1_000,
            ..ServerConfig::default()
        };
        let options = SimulationOptions {
            path_count: Some(100),
            horizon_days: Some(11),
            ..SimulationOptions::default()
        };
        let err = build_simulation(&config, 100.0, 1.0, &options).unwrap_err();
        assert!(err.to_string().contains("exceeds the limit"));
    }

    #[test]
    fn test_build_simulation_rejects_overflowing_step_count() {
        let config = ServerConfig::default();
        let options = SimulationOptions {
            path_count: Some(1 << 40),
            horizon_days: Some(1 << 24),
            ..SimulationOptions::default()
        };
        let err = build_simulation(&config, 100.0, 1.0, &options).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidParameter(_)));
        assert!(err.to_string().contains("exceeds the limit"));
    }

    #[test]
    fn test_build_subject_falls_back_to_configured_name() {
        let config = ServerConfig {
            subject_name: "BLGV".to_string(),
            ..ServerConfig::default()
        };
        let subject = build_subject(&config, None, 40.0, 100.0).unwrap();
        assert_eq!(subject.name, "BLGV");

        let named = build_subject(&config, Some("ACME".to_string()), 1.0, 1.0).unwrap();
        assert_eq!(named.name, "ACME");
    }
}
