//! HTTP API for predictions, health checks and Prometheus metrics

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use inference_lib::{
    process_batch, validate_reading, PipelineState, ScoringEngine, ServiceCounters,
    ServiceMetrics, StreamPipeline, TelemetryReading,
};
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

const SERVICE_NAME: &str = "failure-inference";

/// Shared application state
pub struct AppState {
    pub engine: Arc<ScoringEngine>,
    pub counters: Arc<ServiceCounters>,
    pub pipeline: Arc<StreamPipeline>,
    pub metrics: ServiceMetrics,
    pub config: crate::config::ServiceConfig,
}

#[derive(Debug, Deserialize)]
struct BatchRequest {
    #[serde(default)]
    readings: Vec<Value>,
}

/// Liveness check - reports counters alongside basic service identity
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.counters.snapshot();

    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "model_loaded": state.engine.model_loaded(),
        "messages_processed": snapshot.messages_processed,
        "alerts_generated": snapshot.alerts_generated,
        "input_topic": state.config.input_topic,
    }))
}

/// Readiness check - 200 only once the stream pipeline is consuming
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let pipeline_state = state.pipeline.state();
    let ready = pipeline_state == PipelineState::Running;

    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(json!({
            "ready": ready,
            "pipeline": pipeline_state.as_str(),
        })),
    )
}

/// Operational statistics for dashboards and debugging
async fn stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.counters.snapshot();

    Json(json!({
        "messages_processed": snapshot.messages_processed,
        "alerts_generated": snapshot.alerts_generated,
        "alert_rate_percent": snapshot.alert_rate_percent(),
        "model_loaded": state.engine.model_loaded(),
        "model_path": state.config.model_path,
        "kafka_brokers": state.config.kafka_brokers,
        "consumer_group": state.config.consumer_group,
        "pipeline": state.pipeline.state().as_str(),
    }))
}

/// Score a single reading after strict validation
async fn predict(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> impl IntoResponse {
    let errors = validate_reading(&payload);
    if !errors.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Validation failed",
                "details": errors,
            })),
        );
    }

    let reading = TelemetryReading::from_json(&payload);
    let result = state.engine.score(&reading);

    (StatusCode::OK, Json(json!(result)))
}

/// Score up to 100 readings, isolating per-item failures
async fn predict_batch(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchRequest>,
) -> impl IntoResponse {
    match process_batch(&state.engine, &request.readings) {
        Ok(response) => {
            state.metrics.add_batch_readings(response.total as u64);
            (StatusCode::OK, Json(json!(response)))
        }
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": e.to_string() })),
        ),
    }
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            e.to_string().into_bytes(),
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
        .route("/predict", post(predict))
        .route("/predict/batch", post(predict_batch))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/stats", get(stats))
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
