use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use gallery_shared::errors::{AppError, AppResult};
use gallery_shared::types::api::{HealthCheck, HealthResponse};

use crate::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let name = format!("storage:{}", state.storage.backend());
    let check = match state.storage.ping().await {
        Ok(()) => HealthCheck::healthy(name),
        Err(e) => {
            tracing::warn!(error = %e, "storage health check failed");
            HealthCheck::unhealthy(name, e.to_string())
        }
    };

    Json(HealthResponse::from_checks("gallery-api", env!("CARGO_PKG_VERSION"), vec![check]))
}

/// GET /metrics - Prometheus text exposition
pub async fn metrics(State(state): State<Arc<AppState>>) -> AppResult<String> {
    state
        .metrics_handle
        .as_ref()
        .map(|handle| handle.render())
        .ok_or_else(|| AppError::not_found("metrics recorder not installed"))
}
