use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::config::ServerConfig;
use crate::treasuries::fallback_table;
use crate::{build_router, AppState};

/// Helper: router with a small, seeded simulation default.
fn test_app() -> Router {
    let config = ServerConfig {
        subject_name: "BLGV".to_string(),
        simulation_paths: 200,
        simulation_horizon_days: 30,
        simulation_seed: Some(42),
        max_simulation_steps: 100_000,
        ..ServerConfig::default()
    };
    build_router(AppState::new(config, fallback_table())).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn post_json(uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(test_app(), request).await
}

async fn get(uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(test_app(), request).await
}

#[tokio::test]
async fn test_health_reports_healthy() {
    let (status, body) = get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "treasury-analyst");
}

#[tokio::test]
async fn test_treasuries_lists_configured_table() {
    let (status, body) = get("/api/treasuries").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"].as_array().unwrap().len(), 8);
    assert_eq!(body["data"][0]["symbol"], "MSTR");
}

#[tokio::test]
async fn test_rank_with_request_table() {
    let (status, body) = post_json(
        "/api/rank",
        json!({
            "holdings": 7.0,
            "unit_count": 1.0,
            "comparison_table": [
                {"name": "A", "per_unit_metric": 10.0},
                {"name": "B", "per_unit_metric": 5.0}
            ]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["subject_rank"], 2);
    assert_eq!(body["data"]["total_entities"], 3);
    assert_eq!(body["data"]["leader_name"], "A");
}

#[tokio::test]
async fn test_rank_defaults_to_configured_table() {
    let (status, body) = post_json(
        "/api/rank",
        json!({"holdings": 40.77, "unit_count": 250000.0}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["subject_rank"], 3);
    assert_eq!(body["data"]["total_entities"], 9);
    assert_eq!(body["data"]["standings"][2]["name"], "BLGV");
    assert_eq!(body["data"]["standings"][2]["is_subject"], true);
}

#[tokio::test]
async fn test_rank_zero_unit_count_is_not_an_error() {
    let (status, body) = post_json(
        "/api/rank",
        json!({"holdings": 40.77, "unit_count": 0.0}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["subject_metric"], 0.0);
    assert_eq!(body["data"]["subject_rank"], 9);
}

#[tokio::test]
async fn test_rank_negative_unit_count_is_bad_request() {
    let (status, body) = post_json(
        "/api/rank",
        json!({"holdings": 1.0, "unit_count": -10.0}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("Invalid input"));
}

#[tokio::test]
async fn test_rank_entity_without_metric_is_rejected() {
    let (status, _) = post_json(
        "/api/rank",
        json!({
            "holdings": 1.0,
            "unit_count": 1.0,
            "comparison_table": [{"name": "A"}]
        }),
    )
    .await;

    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_rank_subject_named_like_a_peer_is_bad_request() {
    let (status, body) = post_json(
        "/api/rank",
        json!({"name": "Tesla", "holdings": 1.0, "unit_count": 1.0}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("clashes"));
}

#[tokio::test]
async fn test_analysis_subject_named_like_a_peer_is_bad_request() {
    let (status, body) = post_json(
        "/api/analysis",
        json!({
            "name": "Peer",
            "holdings": 5.0,
            "unit_count": 1000.0,
            "market": {"btc_price": 60000.0},
            "skip_simulation": true,
            "comparison_table": [
                {"company": "Peer", "symbol": "PEER", "btc_holdings": 100.0, "btc_per_share": 0.001}
            ]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_simulate_uses_seeded_defaults() {
    let body = json!({"initial_price": 100000.0, "holdings": 40.77, "thresholds": [50000.0]});
    let (status, first) = post_json("/api/simulate", body.clone()).await;
    let (_, second) = post_json("/api/simulate", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["data"]["path_count"], 200);
    assert_eq!(first["data"]["horizon_days"], 30);
    assert!(first["data"].get("terminal_prices").is_none());
    assert_eq!(first["data"]["threshold_breaches"][0]["threshold"], 50000.0);
    assert_eq!(first, second);

    let p_loss = first["data"]["probability_of_loss"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&p_loss));
}

#[tokio::test]
async fn test_simulate_rejects_work_above_cap() {
    let (status, body) = post_json(
        "/api/simulate",
        json!({"initial_price": 100.0, "holdings": 1.0, "path_count": 10000, "horizon_days": 365}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("exceeds the limit"));
}

#[tokio::test]
async fn test_simulate_rejects_overflowing_work() {
    let (status, body) = post_json(
        "/api/simulate",
        json!({
            "initial_price": 100.0,
            "holdings": 1.0,
            "path_count": 1u64 << 40,
            "horizon_days": 1u32 << 24
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("exceeds the limit"));
}

#[tokio::test]
async fn test_simulate_rejects_bad_volatility() {
    let (status, body) = post_json(
        "/api/simulate",
        json!({"initial_price": 100.0, "holdings": 1.0, "annual_volatility": -0.5}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Invalid parameter"));
}

#[tokio::test]
async fn test_analysis_combines_ranking_simulation_and_context() {
    let (status, body) = post_json(
        "/api/analysis",
        json!({
            "holdings": 40.77,
            "unit_count": 250000.0,
            "market": {"btc_price": 98500.0, "dominance": 55.0, "fear_greed_index": 50},
            "thresholds": [75000.0]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["subject"]["name"], "BLGV");
    assert_eq!(data["ranking"]["subject_rank"], 3);
    assert_eq!(data["simulation"]["path_count"], 200);
    assert!((data["derived"]["total_btc_value"].as_f64().unwrap() - 40.77 * 98500.0).abs() < 1e-6);

    let context = data["context"].as_str().unwrap();
    assert!(context.contains("BLGV ranks #3 of 9"));
    assert!(context.contains("Probability BTC < $75,000"));
}

#[tokio::test]
async fn test_analysis_can_skip_simulation() {
    let (status, body) = post_json(
        "/api/analysis",
        json!({
            "name": "ACME",
            "holdings": 5.0,
            "unit_count": 1000.0,
            "market": {"btc_price": 60000.0},
            "skip_simulation": true,
            "comparison_table": [
                {"company": "Peer", "symbol": "PEER", "btc_holdings": 100.0, "btc_per_share": 0.001}
            ]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["simulation"].is_null());
    assert_eq!(body["data"]["ranking"]["leader_name"], "ACME");
    assert!(!body["data"]["context"].as_str().unwrap().contains("RISK SIMULATION"));
}

#[tokio::test]
async fn test_cors_allows_configured_origin() {
    let request = Request::builder()
        .uri("/health")
        .header("origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = test_app().oneshot(request).await.unwrap();

    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost:3000")
    );
}
