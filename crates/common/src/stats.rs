//! Delivery statistics.
//!
//! Workers report every accepted token and every per-token delivery result to
//! a [`StatStore`]. Two engines are available: an in-process store built on
//! atomics, and a Redis store that keeps counters across restarts and shares
//! them between gateway instances.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::Serialize;

use crate::error::AppError;
use crate::types::Platform;

pub const TOTAL_COUNT_KEY: &str = "pushgate-total-count";
pub const IOS_SUCCESS_KEY: &str = "pushgate-ios-success-count";
pub const IOS_ERROR_KEY: &str = "pushgate-ios-error-count";
pub const ANDROID_SUCCESS_KEY: &str = "pushgate-android-success-count";
pub const ANDROID_ERROR_KEY: &str = "pushgate-android-error-count";

/// Success and error counters for one platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlatformStat {
    pub push_success: i64,
    pub push_error: i64,
}

/// Point-in-time view of all counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatSnapshot {
    pub total_count: i64,
    pub ios: PlatformStat,
    pub android: PlatformStat,
}

/// Counter sink shared by every worker.
///
/// Increments never fail from the caller's point of view; a backend that can
/// fail logs the error instead.
#[async_trait]
pub trait StatStore: Send + Sync {
    async fn add_total(&self, count: i64);
    async fn add_ios_success(&self, count: i64);
    async fn add_ios_error(&self, count: i64);
    async fn add_android_success(&self, count: i64);
    async fn add_android_error(&self, count: i64);

    async fn snapshot(&self) -> Result<StatSnapshot, AppError>;

    /// Zero every counter. Not used by the dispatch path.
    async fn reset(&self) -> Result<(), AppError>;

    async fn add_error(&self, platform: Platform, count: i64) {
        match platform {
            Platform::Ios => self.add_ios_error(count).await,
            Platform::Android => self.add_android_error(count).await,
        }
    }
}

/// In-process counters.
#[derive(Debug, Default)]
pub struct MemoryStatStore {
    total: AtomicI64,
    ios_success: AtomicI64,
    ios_error: AtomicI64,
    android_success: AtomicI64,
    android_error: AtomicI64,
}

impl MemoryStatStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatStore for MemoryStatStore {
    async fn add_total(&self, count: i64) {
        self.total.fetch_add(count, Ordering::Relaxed);
    }

    async fn add_ios_success(&self, count: i64) {
        self.ios_success.fetch_add(count, Ordering::Relaxed);
    }

    async fn add_ios_error(&self, count: i64) {
        self.ios_error.fetch_add(count, Ordering::Relaxed);
    }

    async fn add_android_success(&self, count: i64) {
        self.android_success.fetch_add(count, Ordering::Relaxed);
    }

    async fn add_android_error(&self, count: i64) {
        self.android_error.fetch_add(count, Ordering::Relaxed);
    }

    async fn snapshot(&self) -> Result<StatSnapshot, AppError> {
        Ok(StatSnapshot {
            total_count: self.total.load(Ordering::Relaxed),
            ios: PlatformStat {
                push_success: self.ios_success.load(Ordering::Relaxed),
                push_error: self.ios_error.load(Ordering::Relaxed),
            },
            android: PlatformStat {
                push_success: self.android_success.load(Ordering::Relaxed),
                push_error: self.android_error.load(Ordering::Relaxed),
            },
        })
    }

    async fn reset(&self) -> Result<(), AppError> {
        for counter in [
            &self.total,
            &self.ios_success,
            &self.ios_error,
            &self.android_success,
            &self.android_error,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        Ok(())
    }
}

/// Redis-backed counters using `INCRBY`, which is atomic server-side.
#[derive(Clone)]
pub struct RedisStatStore {
    redis: ConnectionManager,
}

impl RedisStatStore {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    async fn incr(&self, key: &'static str, count: i64) {
        let mut conn = self.redis.clone();
        if let Err(e) = conn.incr::<_, _, i64>(key, count).await {
            tracing::error!(key, count, error = %e, "Failed to increment stat counter");
        }
    }
}

#[async_trait]
impl StatStore for RedisStatStore {
    async fn add_total(&self, count: i64) {
        self.incr(TOTAL_COUNT_KEY, count).await;
    }

    async fn add_ios_success(&self, count: i64) {
        self.incr(IOS_SUCCESS_KEY, count).await;
    }

    async fn add_ios_error(&self, count: i64) {
        self.incr(IOS_ERROR_KEY, count).await;
    }

    async fn add_android_success(&self, count: i64) {
        self.incr(ANDROID_SUCCESS_KEY, count).await;
    }

    async fn add_android_error(&self, count: i64) {
        self.incr(ANDROID_ERROR_KEY, count).await;
    }

    async fn snapshot(&self) -> Result<StatSnapshot, AppError> {
        let mut conn = self.redis.clone();
        let values: Vec<Option<i64>> = redis::cmd("MGET")
            .arg(TOTAL_COUNT_KEY)
            .arg(IOS_SUCCESS_KEY)
            .arg(IOS_ERROR_KEY)
            .arg(ANDROID_SUCCESS_KEY)
            .arg(ANDROID_ERROR_KEY)
            .query_async(&mut conn)
            .await?;

        let get = |i: usize| values.get(i).copied().flatten().unwrap_or(0);

        Ok(StatSnapshot {
            total_count: get(0),
            ios: PlatformStat {
                push_success: get(1),
                push_error: get(2),
            },
            android: PlatformStat {
                push_success: get(3),
                push_error: get(4),
            },
        })
    }

    async fn reset(&self) -> Result<(), AppError> {
        let mut conn = self.redis.clone();
        let _: () = redis::cmd("MSET")
            .arg(TOTAL_COUNT_KEY)
            .arg(0)
            .arg(IOS_SUCCESS_KEY)
            .arg(0)
            .arg(IOS_ERROR_KEY)
            .arg(0)
            .arg(ANDROID_SUCCESS_KEY)
            .arg(0)
            .arg(ANDROID_ERROR_KEY)
            .arg(0)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}
