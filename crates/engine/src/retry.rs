//! Retry controller. Resubmits only the tokens that failed, up to a bounded
//! number of extra attempts.

use pushgate_common::types::{DeliveryResults, PushNotification};
use pushgate_notifier::PushSender;

/// Outcome of a notification after all attempts.
#[derive(Debug, Clone, Default)]
pub struct RetryReport {
    /// Each token's outcome on the last attempt it took part in.
    pub results: DeliveryResults,
    /// Whether the final attempt still had failing tokens.
    pub had_error: bool,
    /// Number of sender invocations, at least 1.
    pub attempts: u32,
}

/// Resolve the retry ceiling for a notification.
///
/// A requested value strictly between 0 and the platform ceiling is used as
/// is; anything else falls back to the ceiling.
pub fn resolve_max_retry(requested: u32, ceiling: u32) -> u32 {
    if requested > 0 && requested < ceiling {
        requested
    } else {
        ceiling
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryController {
    max_retry: u32,
}

impl RetryController {
    pub fn new(requested: u32, ceiling: u32) -> Self {
        Self {
            max_retry: resolve_max_retry(requested, ceiling),
        }
    }

    pub fn max_retry(&self) -> u32 {
        self.max_retry
    }

    /// Run `sender` over the notification until no token fails or the retry
    /// budget is spent. At most `max_retry + 1` sender invocations happen.
    pub async fn run(&self, sender: &dyn PushSender, mut notification: PushNotification) -> RetryReport {
        let mut results = DeliveryResults::new();
        let mut attempt = 0u32;

        loop {
            let report = sender.send(&notification).await;
            let had_error = report.had_error();
            results.extend(report.outcomes);

            if !had_error || attempt >= self.max_retry {
                return RetryReport {
                    results,
                    had_error,
                    attempts: attempt + 1,
                };
            }

            attempt += 1;
            tracing::debug!(
                platform = %notification.platform,
                attempt,
                max_retry = self.max_retry,
                failed = report.failed_tokens.len(),
                "Retrying failed tokens"
            );
            notification.tokens = report.failed_tokens;
        }
    }
}
