//! Request validation. Rejects malformed notifications before they reach
//! the dispatch queue.

use thiserror::Error;

use pushgate_common::types::{MAX_ANDROID_TOKENS, MAX_TIME_TO_LIVE, Platform, PushNotification};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("the message must specify at least one registration ID")]
    EmptyTokens,

    #[error("the token must not be empty")]
    EmptyToken,

    #[error("the message may specify at most 1000 registration IDs")]
    TooManyTokens,

    #[error("the message's TimeToLive field must be an integer between 0 and 2419200 (4 weeks)")]
    TimeToLiveOutOfRange,
}

/// Check a notification, stopping at the first failure.
pub fn validate(notification: &PushNotification) -> Result<(), ValidationError> {
    let result = check(notification);
    if let Err(ref e) = result {
        tracing::debug!(
            platform = %notification.platform,
            tokens = notification.tokens.len(),
            error = %e,
            "Rejected notification"
        );
    }
    result
}

fn check(notification: &PushNotification) -> Result<(), ValidationError> {
    if notification.tokens.is_empty() {
        return Err(ValidationError::EmptyTokens);
    }

    if notification.tokens.len() == 1 && notification.tokens[0].is_empty() {
        return Err(ValidationError::EmptyToken);
    }

    if notification.platform == Platform::Android {
        if notification.tokens.len() > MAX_ANDROID_TOKENS {
            return Err(ValidationError::TooManyTokens);
        }

        if notification
            .time_to_live
            .is_some_and(|ttl| ttl > MAX_TIME_TO_LIVE)
        {
            return Err(ValidationError::TimeToLiveOutOfRange);
        }
    }

    Ok(())
}
