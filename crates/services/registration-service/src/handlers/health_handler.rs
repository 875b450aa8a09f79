//! Health check handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub pending_registrations: usize,
    /// Absent when users are kept in memory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

/// Create health routes.
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/", get(health_check))
}

/// Health check endpoint - verifies database connectivity when one is configured.
pub async fn health_check(State(state): State<AppState>) -> Response {
    let database = match &state.database {
        Some(db) => Some(match db.ping().await {
            Ok(()) => "healthy".to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Database health check failed");
                "unhealthy".to_string()
            }
        }),
        None => None,
    };

    let all_healthy = database.as_deref().map_or(true, |s| s == "healthy");

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" }.to_string(),
        pending_registrations: state.registration.pending_count(),
        database,
    };

    if all_healthy {
        (StatusCode::OK, Json(response)).into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response)).into_response()
    }
}
