//! Push log: one structured record per per-token delivery attempt.

use pushgate_common::types::{FailureReason, PushNotification};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushStatus {
    Succeeded,
    Failed,
}

impl std::fmt::Display for PushStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PushStatus::Succeeded => write!(f, "succeeded-push"),
            PushStatus::Failed => write!(f, "failed-push"),
        }
    }
}

/// Record the outcome of delivering `notification` to `token`.
pub fn log_push(
    status: PushStatus,
    token: &str,
    notification: &PushNotification,
    error: Option<&FailureReason>,
) {
    let summary = notification.summary();
    match status {
        PushStatus::Succeeded => tracing::info!(
            status = %status,
            platform = %notification.platform,
            token,
            message = %summary,
            "Push delivered"
        ),
        PushStatus::Failed => tracing::error!(
            status = %status,
            platform = %notification.platform,
            token,
            message = %summary,
            error = %error.map(|e| e.to_string()).unwrap_or_default(),
            permanent = error.is_some_and(FailureReason::is_permanent),
            "Push failed"
        ),
    }
}
