use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use service_core::error::AppError;

/// Liveness probe. Reports whether a generation credential is present
/// without failing on its absence.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "bta-ai-service",
        "version": env!("CARGO_PKG_VERSION"),
        "generation_configured": state.text_provider.is_some(),
    }))
}

/// Readiness probe. Not ready while no generation provider is configured,
/// since every analysis request would fail with a configuration error.
pub async fn readiness_check(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    if state.text_provider.is_some() {
        Ok(StatusCode::OK)
    } else {
        tracing::warn!("Readiness check failed: generation provider not configured");
        Err(AppError::ServiceUnavailable)
    }
}
