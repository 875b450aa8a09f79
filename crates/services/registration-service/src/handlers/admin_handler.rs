//! Operational endpoints.

use axum::{extract::State, response::Json, routing::post, Router};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Result of a manual cleanup run.
#[derive(Debug, Serialize, Deserialize)]
pub struct CleanupResponse {
    pub success: bool,
    pub message: String,
    pub removed_registrations: usize,
    pub removed_codes: usize,
    pub pending_registrations: usize,
}

/// Create admin routes
pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/cleanup", post(trigger_cleanup))
}

/// Run the expiry sweep now and report what it removed
pub async fn trigger_cleanup(State(state): State<AppState>) -> Json<CleanupResponse> {
    let report = state.registration.trigger_sweep();

    Json(CleanupResponse {
        success: true,
        message: "Cleanup completed".to_string(),
        removed_registrations: report.removed_registrations,
        removed_codes: report.removed_codes,
        pending_registrations: state.registration.pending_count(),
    })
}
