//! API route definitions.

use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::api::state::AppState;
use crate::detect::service::{LogRecord, MODEL_VERSION};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict))
        .route("/health", get(health))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PredictRequest {
    #[serde(default)]
    service_name: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Score a single log record. Validation failures never reach the engine
/// and never touch the vocabulary.
async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    let request_id = Uuid::new_v4();

    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!(%request_id, "Malformed prediction request: {rejection}");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": rejection.body_text() })),
            )
                .into_response();
        }
    };

    let message = match require_field(request.message, "message") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let service = match require_field(request.service_name, "serviceName") {
        Ok(value) => value,
        Err(response) => return response,
    };

    info!(
        %request_id,
        service = %service,
        message_len = message.chars().count(),
        "Scoring log record"
    );

    let record = LogRecord { service, message };
    match state.scoring.predict(&record) {
        Ok(prediction) => {
            info!(
                %request_id,
                is_anomaly = prediction.is_anomaly,
                score = prediction.score,
                latency_ms = started.elapsed().as_secs_f64() * 1000.0,
                "Prediction complete"
            );
            (StatusCode::OK, Json(prediction)).into_response()
        }
        Err(e) => {
            error!(%request_id, "Prediction failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string(), "modelVersion": MODEL_VERSION })),
            )
                .into_response()
        }
    }
}

fn require_field(field: Option<String>, name: &str) -> Result<String, Response> {
    match field {
        Some(value) if !value.is_empty() => Ok(value),
        _ => {
            warn!(field = name, "Rejected prediction request with missing field");
            Err((
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": format!("Field '{name}' is required and must be a non-empty string")
                })),
            )
                .into_response())
        }
    }
}

/// Health check: verifies the loaded model can score a fixed probe vector.
async fn health(State(state): State<AppState>) -> Response {
    match state.scoring.health_check() {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "up",
                "modelVersion": MODEL_VERSION,
                "modelLoaded": true
            })),
        )
            .into_response(),
        Err(e) => {
            error!("Health check failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "down",
                    "error": e.to_string(),
                    "modelVersion": MODEL_VERSION
                })),
            )
                .into_response()
        }
    }
}

async fn index() -> Json<Value> {
    Json(json!({
        "service": "ML Anomaly Detection Service",
        "status": "running",
        "version": MODEL_VERSION
    }))
}
