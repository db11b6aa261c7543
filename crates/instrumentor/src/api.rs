//! HTTP API for health checks, Prometheus metrics and evaluation results

use crate::reconciler::Reconciler;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use instrumentor_lib::{
    health::{ComponentStatus, HealthRegistry},
    observability::EnablementMetrics,
    reader::ClusterSnapshot,
    PodWorkload, WorkloadKind,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: EnablementMetrics,
    pub reconciler: Arc<Reconciler>,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        metrics: EnablementMetrics,
        reconciler: Arc<Reconciler>,
    ) -> Self {
        Self {
            health_registry,
            metrics,
            reconciler,
        }
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        // stale results are still served
        ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 once the first pass completed
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %err, "Failed to encode metrics");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string());
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Latest evaluation of every workload
async fn list_workloads(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.reconciler.evaluations())
}

async fn get_workload(
    State(state): State<Arc<AppState>>,
    Path((namespace, kind, name)): Path<(String, String, String)>,
) -> Response {
    let kind: WorkloadKind = match kind.parse() {
        Ok(kind) => kind,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, err.to_string()),
    };
    let workload = PodWorkload::new(namespace, kind, name);

    match state.reconciler.evaluation(&workload) {
        Some(evaluation) => Json(evaluation).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("workload {workload} not found"),
        ),
    }
}

/// Evaluates the posted snapshot against the service's distro catalog
async fn evaluate(
    State(state): State<Arc<AppState>>,
    Json(snapshot): Json<ClusterSnapshot>,
) -> impl IntoResponse {
    Json(state.reconciler.evaluate_detached(&snapshot))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/workloads", get(list_workloads))
        .route("/api/v1/workloads/:namespace/:kind/:name", get(get_workload))
        .route("/api/v1/evaluate", post(evaluate))
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
