//! Notification intake routes.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;

use pushgate_common::error::AppError;
use pushgate_common::types::{PushNotification, RequestPush};
use pushgate_engine::{DispatchError, DispatchReport, Rejection};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/push", post(push_notification))
        .route("/api/push/single", post(push_single))
}

#[derive(Debug, Serialize)]
pub struct PushResponse {
    pub success: &'static str,
    /// Tokens accepted for delivery.
    pub counts: usize,
    pub rejected: Vec<Rejection>,
    /// Notifications dropped because their platform is disabled.
    pub skipped: usize,
    /// Per-notification outcomes, only in sync mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<DispatchReport>>,
}

/// POST /api/push: Accept a batch of notifications.
///
/// Invalid notifications are listed under `rejected` without failing the
/// request; only an empty batch is an error.
async fn push_notification(
    State(state): State<AppState>,
    Json(request): Json<RequestPush>,
) -> Result<Json<PushResponse>, AppError> {
    if request.notifications.is_empty() {
        return Err(AppError::Validation(
            "Request contains no notifications".to_string(),
        ));
    }

    let response = if state.config.sync {
        let (summary, reports) = state.dispatcher.send_notifications(request).await;
        PushResponse {
            success: "ok",
            counts: summary.counts,
            rejected: summary.rejected,
            skipped: summary.skipped,
            logs: Some(reports),
        }
    } else {
        let summary = state.dispatcher.queue_notifications(request).await;
        PushResponse {
            success: "ok",
            counts: summary.counts,
            rejected: summary.rejected,
            skipped: summary.skipped,
            logs: None,
        }
    };

    tracing::debug!(
        counts = response.counts,
        rejected = response.rejected.len(),
        "Push request accepted"
    );
    Ok(Json(response))
}

/// POST /api/push/single: Deliver one notification and wait for its outcome.
///
/// Bypasses the queue. A validation failure is a 400, a disabled platform a
/// 503.
async fn push_single(
    State(state): State<AppState>,
    Json(notification): Json<PushNotification>,
) -> Result<Json<DispatchReport>, AppError> {
    let report = state
        .dispatcher
        .send_now(notification)
        .await
        .map_err(dispatch_error)?;
    Ok(Json(report))
}

fn dispatch_error(e: DispatchError) -> AppError {
    match e {
        DispatchError::Validation(_) => AppError::Validation(e.to_string()),
        DispatchError::PlatformDisabled(_) => AppError::PlatformDisabled(e.to_string()),
    }
}
