pub mod analysis_routes;
pub mod config;
pub mod context;
pub mod treasuries;

#[cfg(test)]
mod routes_tests;

use std::sync::Arc;

use anyhow::Result;
use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use treasury_core::AnalysisError;

use config::ServerConfig;
use treasuries::TreasuryProfile;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub comparison_table: Arc<Vec<TreasuryProfile>>,
}

impl AppState {
    pub fn new(config: ServerConfig, comparison_table: Vec<TreasuryProfile>) -> Self {
        Self {
            config: Arc::new(config),
            comparison_table: Arc::new(comparison_table),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Handler error. Validation failures from the engines become 400s,
/// everything else a 500.
pub struct AppError(anyhow::Error);

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.0.downcast_ref::<AnalysisError>() {
            Some(err) => {
                tracing::warn!("Rejected request: {}", err);
                StatusCode::BAD_REQUEST
            }
            None => {
                tracing::error!("Request failed: {:#}", self.0);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (
            status,
            Json(json!({
                "success": false,
                "error": self.0.to_string(),
            })),
        )
            .into_response()
    }
}

pub fn build_router(state: AppState) -> Result<Router> {
    let origins = state
        .config
        .cors_origins
        .iter()
        .map(|o| HeaderValue::from_str(o))
        .collect::<Result<Vec<_>, _>>()?;

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Ok(Router::new()
        .merge(analysis_routes::analysis_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

pub fn init_tracing() {
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(filter()).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter()).init();
    }
}

pub async fn run_server() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    std::panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
        tracing::error!("PANIC: {info}");
    }));

    tracing::info!("Starting treasury analyst API");

    let config = ServerConfig::from_env()?;
    tracing::info!("Configuration loaded and validated");
    tracing::info!(
        "  Simulation defaults: {} paths x {} days, volatility {:.0}%",
        config.simulation_paths,
        config.simulation_horizon_days,
        config.annual_volatility * 100.0
    );
    tracing::info!("  Max simulation steps: {}", config.max_simulation_steps);
    if let Some(seed) = config.simulation_seed {
        tracing::warn!("  Fixed simulation seed {} (responses are reproducible)", seed);
    }

    let comparison_table = treasuries::load_comparison_table(config.comparison_table_path.as_deref())?;
    let addr = config.bind_address();
    let app = build_router(AppState::new(config, comparison_table))?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
