//! Delivery counter routes.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use pushgate_common::error::AppError;
use pushgate_common::stats::StatSnapshot;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/stat/app", get(app_stat).delete(reset_stat))
}

/// GET /api/stat/app: Current success/failure counters.
async fn app_stat(State(state): State<AppState>) -> Result<Json<StatSnapshot>, AppError> {
    let snapshot = state.stats().snapshot().await?;
    Ok(Json(snapshot))
}

/// DELETE /api/stat/app: Zero every counter.
async fn reset_stat(State(state): State<AppState>) -> Result<Json<StatSnapshot>, AppError> {
    state.stats().reset().await?;
    tracing::info!("Delivery counters reset");
    let snapshot = state.stats().snapshot().await?;
    Ok(Json(snapshot))
}
