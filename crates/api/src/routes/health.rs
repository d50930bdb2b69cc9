//! Health check endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use pushgate_common::types::Platform;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let dispatcher = &state.dispatcher;
    Json(json!({
        "status": "ok",
        "service": "pushgate-api",
        "version": env!("CARGO_PKG_VERSION"),
        "platforms": {
            "ios": dispatcher.is_enabled(Platform::Ios),
            "android": dispatcher.is_enabled(Platform::Android),
        },
        "queue": {
            "pending": dispatcher.queue().len(),
            "capacity": dispatcher.queue().capacity(),
        }
    }))
}
