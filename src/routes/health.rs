use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub accelerator_available: bool,
    pub device_name: String,
    pub version: String,
}

/// GET /api/health — database reachability plus the inference device.
///
/// Always answers 200; an unreachable database shows up as `"degraded"` and an
/// unreachable inference service as no accelerator.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_ok = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health check: database unreachable");
            false
        }
    };

    let (accelerator_available, device_name) = match state.device.device_info().await {
        Ok(info) => (info.accelerator_available, info.device_name),
        Err(e) => {
            tracing::warn!(error = %e, "Health check: inference service unreachable");
            (false, "unavailable".to_string())
        }
    };

    Json(HealthResponse {
        status: if db_ok { "ok" } else { "degraded" }.to_string(),
        accelerator_available,
        device_name,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
