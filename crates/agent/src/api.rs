//! HTTP API for health checks and Prometheus metrics

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use gas_anomaly::{EngineMetrics, Quantity, TransactionHandler};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<TransactionHandler>,
    pub metrics: EngineMetrics,
}

impl AppState {
    pub fn new(handler: Arc<TransactionHandler>, metrics: EngineMetrics) -> Self {
        Self { handler, metrics }
    }
}

#[derive(Debug, Serialize)]
pub struct QuotaStatus {
    pub capacity: u64,
    pub consumed: u64,
    pub remaining: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "healthy" or "quota_exhausted"
    pub status: &'static str,
    pub quota: QuotaStatus,
    pub keys_gas_used: usize,
    pub keys_gas_price: usize,
    pub last_check_timestamp: i64,
}

/// Health check response, the agent stays live after its quota is spent
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let quota = state.handler.quota();
    let status = if quota.is_exhausted() {
        "quota_exhausted"
    } else {
        "healthy"
    };

    let health = HealthResponse {
        status,
        quota: QuotaStatus {
            capacity: quota.capacity(),
            consumed: quota.consumed(),
            remaining: quota.remaining(),
        },
        keys_gas_used: state.handler.store(Quantity::GasUsed).len(),
        keys_gas_price: state.handler.store(Quantity::GasPrice).len(),
        last_check_timestamp: chrono::Utc::now().timestamp(),
    };

    (StatusCode::OK, Json(health))
}

/// Prometheus metrics endpoint
async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state
        .metrics
        .set_quota_remaining(state.handler.quota().remaining());

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            Vec::new(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use gas_anomaly::{Classifier, InMemoryReceipts, Quota, StoreConfig};
    use tower::ServiceExt;

    fn setup_test_app(quota: u64) -> (Router, Arc<AppState>) {
        let handler = TransactionHandler::new(
            StoreConfig::default(),
            Classifier::default(),
            Arc::new(Quota::new(quota)),
            Arc::new(InMemoryReceipts::new()),
        );
        let state = Arc::new(AppState::new(Arc::new(handler), EngineMetrics::new()));
        (create_router(state.clone()), state)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_healthz_reports_quota() {
        let (app, _state) = setup_test_app(5);

        let (status, body) = get_json(app, "/healthz").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["quota"]["capacity"], 5);
        assert_eq!(body["quota"]["remaining"], 5);
        assert_eq!(body["keys_gas_used"], 0);
    }

    #[tokio::test]
    async fn test_healthz_when_quota_exhausted() {
        let (app, state) = setup_test_app(1);
        assert!(state.handler.quota().try_acquire());

        let (status, body) = get_json(app, "/healthz").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "quota_exhausted");
        assert_eq!(body["quota"]["remaining"], 0);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let (app, _state) = setup_test_app(5);

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("gas_anomaly_quota_remaining"));
    }

    #[tokio::test]
    async fn test_serve_fails_when_port_taken() {
        let (_app, state) = setup_test_app(5);
        let taken = tokio::net::TcpListener::bind("0.0.0.0:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        assert!(serve(port, state).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (app, _state) = setup_test_app(5);

        let response = app
            .oneshot(Request::builder().uri("/unknown").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
