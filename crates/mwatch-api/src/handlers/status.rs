//! Detection status.

use axum::extract::State;
use axum::Json;

use mwatch_models::DetectionSummary;

use crate::state::AppState;

/// Current detection summary.
pub async fn status(State(state): State<AppState>) -> Json<DetectionSummary> {
    Json(state.status.snapshot())
}
