//! Integration tests for the dispatch pipeline.
//!
//! Exercises the real iOS/Android senders, retry controller, queue and
//! worker pool against scripted provider clients. No network access needed.
//!
//! ```bash
//! cargo test -p pushgate-engine --test integration -- --nocapture
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, Semaphore};

use pushgate_common::config::AppConfig;
use pushgate_common::stats::{MemoryStatStore, StatSnapshot, StatStore};
use pushgate_common::types::{
    DeliveryOutcome, FailureReason, Platform, PushNotification, RequestPush,
};
use pushgate_engine::{DispatchError, Dispatcher};
use pushgate_notifier::android::AndroidSender;
use pushgate_notifier::apns::{ApnsClient, ApnsNotification, ApnsResponse};
use pushgate_notifier::error::TransportError;
use pushgate_notifier::gcm::{GcmClient, GcmMessage, GcmResponse};
use pushgate_notifier::ios::IosSender;
use pushgate_notifier::{ProviderPayload, PushSender, SendReport, SenderRegistry};

// ============================================================
// Scripted provider clients
// ============================================================

/// Rejects each listed token a fixed number of times, then accepts it.
#[derive(Default)]
struct ScriptedApns {
    rejections: Mutex<HashMap<String, u32>>,
    pushed: Mutex<Vec<String>>,
}

impl ScriptedApns {
    fn rejecting(token: &str, times: u32) -> Self {
        let apns = Self::default();
        apns.rejections
            .lock()
            .unwrap()
            .insert(token.to_string(), times);
        apns
    }
}

#[async_trait]
impl ApnsClient for ScriptedApns {
    async fn push(&self, notification: &ApnsNotification) -> Result<ApnsResponse, TransportError> {
        self.pushed
            .lock()
            .unwrap()
            .push(notification.device_token.clone());

        let mut rejections = self.rejections.lock().unwrap();
        match rejections.get_mut(&notification.device_token) {
            Some(left) if *left > 0 => {
                *left -= 1;
                Ok(ApnsResponse {
                    status_code: 400,
                    apns_id: None,
                    reason: Some("BadDeviceToken".to_string()),
                })
            }
            _ => Ok(ApnsResponse {
                status_code: 200,
                ..Default::default()
            }),
        }
    }
}

/// Every batch call fails at the transport level.
#[derive(Default)]
struct UnreachableGcm {
    calls: Mutex<u32>,
}

#[async_trait]
impl GcmClient for UnreachableGcm {
    async fn send(&self, _api_key: &str, _message: &GcmMessage) -> Result<GcmResponse, TransportError> {
        *self.calls.lock().unwrap() += 1;
        Err(TransportError::Request("connection refused".to_string()))
    }
}

/// Android sender that blocks inside `send` until released.
struct GatedSender {
    started: Notify,
    gate: Semaphore,
    stats: Arc<dyn StatStore>,
}

#[async_trait]
impl PushSender for GatedSender {
    fn platform(&self) -> Platform {
        Platform::Android
    }

    fn build_payload(&self, notification: &PushNotification) -> ProviderPayload {
        ProviderPayload::Gcm(GcmMessage {
            registration_ids: notification.tokens.clone(),
            ..Default::default()
        })
    }

    async fn send(&self, notification: &PushNotification) -> SendReport {
        self.started.notify_one();
        self.gate.acquire().await.unwrap().forget();
        succeed_all(&self.stats, notification).await
    }
}

/// Android sender that panics on any notification carrying the token `boom`.
struct PanickySender {
    stats: Arc<dyn StatStore>,
}

#[async_trait]
impl PushSender for PanickySender {
    fn platform(&self) -> Platform {
        Platform::Android
    }

    fn build_payload(&self, notification: &PushNotification) -> ProviderPayload {
        ProviderPayload::Gcm(GcmMessage {
            registration_ids: notification.tokens.clone(),
            ..Default::default()
        })
    }

    async fn send(&self, notification: &PushNotification) -> SendReport {
        if notification.tokens.iter().any(|t| t == "boom") {
            panic!("provider exploded");
        }
        succeed_all(&self.stats, notification).await
    }
}

/// iOS sender that records a success for the first token, then panics.
struct HalfwayPanicSender {
    stats: Arc<dyn StatStore>,
}

#[async_trait]
impl PushSender for HalfwayPanicSender {
    fn platform(&self) -> Platform {
        Platform::Ios
    }

    fn build_payload(&self, notification: &PushNotification) -> ProviderPayload {
        ProviderPayload::Apns(IosSender::build_notification(notification))
    }

    async fn send(&self, _notification: &PushNotification) -> SendReport {
        self.stats.add_ios_success(1).await;
        panic!("connection reset mid-batch");
    }
}

async fn succeed_all(stats: &Arc<dyn StatStore>, notification: &PushNotification) -> SendReport {
    stats
        .add_android_success(notification.tokens.len() as i64)
        .await;
    SendReport {
        outcomes: notification
            .tokens
            .iter()
            .map(|t| (t.clone(), DeliveryOutcome::Success))
            .collect(),
        failed_tokens: Vec::new(),
    }
}

// ============================================================
// Helpers
// ============================================================

fn test_config(worker_num: usize, queue_num: usize) -> AppConfig {
    let mut config = AppConfig {
        worker_num,
        queue_num,
        ..Default::default()
    };
    config.ios.enabled = true;
    config.ios.key_path = "unused.p12".to_string();
    config.ios.max_retry = 2;
    config.android.enabled = true;
    config.android.api_key = "server-key".to_string();
    config.android.max_retry = 2;
    config
}

fn notification(platform: Platform, tokens: &[&str]) -> PushNotification {
    PushNotification {
        tokens: tokens.iter().map(|t| t.to_string()).collect(),
        platform,
        message: "Welcome".to_string(),
        ..Default::default()
    }
}

fn ios_dispatcher(
    config: AppConfig,
    apns: Arc<ScriptedApns>,
) -> (Dispatcher, Arc<MemoryStatStore>) {
    let stats = Arc::new(MemoryStatStore::new());
    let mut registry = SenderRegistry::new();
    registry.register(Arc::new(IosSender::new(apns, stats.clone())));
    (
        Dispatcher::new(Arc::new(config), registry, stats.clone()),
        stats,
    )
}

async fn wait_for_snapshot<F>(stats: &MemoryStatStore, done: F) -> StatSnapshot
where
    F: Fn(&StatSnapshot) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let snap = stats.snapshot().await.unwrap();
            if done(&snap) {
                return snap;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("stats did not reach the expected state")
}

// ============================================================
// End-to-end delivery
// ============================================================

#[tokio::test]
async fn test_ios_all_tokens_accepted() {
    let apns = Arc::new(ScriptedApns::default());
    let (dispatcher, stats) = ios_dispatcher(test_config(1, 8), apns.clone());

    let report = dispatcher
        .send_now(notification(Platform::Ios, &["t1", "t2", "t3"]))
        .await
        .unwrap();

    assert!(!report.had_error);
    assert_eq!(report.attempts, 1);
    assert_eq!(report.results.len(), 3);
    assert!(report.results.values().all(DeliveryOutcome::is_success));

    let snap = stats.snapshot().await.unwrap();
    assert_eq!(snap.total_count, 3);
    assert_eq!(snap.ios.push_success, 3);
    assert_eq!(snap.ios.push_error, 0);
    assert_eq!(apns.pushed.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_ios_rejected_token_recovers_on_retry() {
    let apns = Arc::new(ScriptedApns::rejecting("t2", 1));
    let (dispatcher, stats) = ios_dispatcher(test_config(1, 8), apns.clone());

    let report = dispatcher
        .send_now(notification(Platform::Ios, &["t1", "t2", "t3"]))
        .await
        .unwrap();

    assert!(!report.had_error);
    assert_eq!(report.attempts, 2);
    assert_eq!(report.results["t2"], DeliveryOutcome::Success);

    let snap = stats.snapshot().await.unwrap();
    assert_eq!(snap.ios.push_success, 3);
    assert_eq!(snap.ios.push_error, 1);

    // Only t2 goes out a second time.
    assert_eq!(
        *apns.pushed.lock().unwrap(),
        vec!["t1", "t2", "t3", "t2"]
    );
}

#[tokio::test]
async fn test_android_transport_failure_exhausts_retries() {
    let gcm = Arc::new(UnreachableGcm::default());
    let stats = Arc::new(MemoryStatStore::new());
    let mut registry = SenderRegistry::new();
    registry.register(Arc::new(AndroidSender::new(
        gcm.clone(),
        stats.clone(),
        "server-key".to_string(),
    )));
    let dispatcher = Dispatcher::new(Arc::new(test_config(1, 8)), registry, stats.clone());

    let mut req = notification(Platform::Android, &["a1", "a2"]);
    req.retry = 0;
    let report = dispatcher.send_now(req).await.unwrap();

    assert!(report.had_error);
    assert_eq!(report.attempts, 3);
    assert_eq!(*gcm.calls.lock().unwrap(), 3);
    for token in ["a1", "a2"] {
        assert!(matches!(
            &report.results[token],
            DeliveryOutcome::Failure {
                reason: FailureReason::Transport(_)
            }
        ));
    }

    let snap = stats.snapshot().await.unwrap();
    assert_eq!(snap.android.push_error, 3);
    assert_eq!(snap.android.push_success, 0);
}

#[tokio::test]
async fn test_queued_notifications_are_delivered_by_workers() {
    let apns = Arc::new(ScriptedApns::default());
    let (dispatcher, stats) = ios_dispatcher(test_config(3, 16), apns);
    let pool = dispatcher.start_workers();
    assert_eq!(pool.len(), 3);

    let summary = dispatcher
        .queue_notifications(RequestPush {
            notifications: vec![
                notification(Platform::Ios, &["a", "b"]),
                notification(Platform::Ios, &["c"]),
                notification(Platform::Ios, &["d", "e", "f"]),
            ],
        })
        .await;
    assert_eq!(summary.counts, 6);
    assert!(summary.rejected.is_empty());

    let snap = wait_for_snapshot(&stats, |s| s.ios.push_success == 6).await;
    assert_eq!(snap.total_count, 6);
    assert_eq!(snap.ios.push_error, 0);

    pool.shutdown();
}

// ============================================================
// Intake
// ============================================================

#[tokio::test]
async fn test_intake_rejects_invalid_and_skips_disabled() {
    let apns = Arc::new(ScriptedApns::default());
    let (dispatcher, stats) = ios_dispatcher(test_config(1, 8), apns);

    let mut too_long = notification(Platform::Android, &["x"]);
    too_long.time_to_live = Some(2_419_201);

    let summary = dispatcher
        .queue_notifications(RequestPush {
            notifications: vec![
                notification(Platform::Ios, &[]),
                notification(Platform::Ios, &["ok-1", "ok-2"]),
                notification(Platform::Ios, &[""]),
                too_long,
                // Android is not registered with this dispatcher.
                notification(Platform::Android, &["skipped"]),
            ],
        })
        .await;

    assert_eq!(summary.counts, 2);
    assert_eq!(summary.skipped, 1);
    let rejected: Vec<usize> = summary.rejected.iter().map(|r| r.index).collect();
    assert_eq!(rejected, vec![0, 2, 3]);

    assert_eq!(dispatcher.queue().len(), 1);
    assert_eq!(stats.snapshot().await.unwrap().total_count, 2);
}

#[tokio::test]
async fn test_send_now_rejects_before_delivery() {
    let apns = Arc::new(ScriptedApns::default());
    let (dispatcher, stats) = ios_dispatcher(test_config(1, 8), apns.clone());

    let err = dispatcher
        .send_now(notification(Platform::Ios, &[]))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Validation(_)));

    let err = dispatcher
        .send_now(notification(Platform::Android, &["a"]))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::PlatformDisabled(Platform::Android)));

    assert!(apns.pushed.lock().unwrap().is_empty());
    assert_eq!(stats.snapshot().await.unwrap().total_count, 0);
}

#[tokio::test]
async fn test_send_notifications_returns_reports_in_order() {
    let apns = Arc::new(ScriptedApns::rejecting("bad", u32::MAX));
    let (dispatcher, _stats) = ios_dispatcher(test_config(1, 8), apns);

    let (summary, reports) = dispatcher
        .send_notifications(RequestPush {
            notifications: vec![
                notification(Platform::Ios, &["good"]),
                notification(Platform::Ios, &["bad"]),
            ],
        })
        .await;

    assert_eq!(summary.counts, 2);
    assert_eq!(reports.len(), 2);
    assert!(!reports[0].had_error);
    assert!(reports[1].had_error);
    assert_eq!(reports[1].attempts, 3);
    assert_eq!(
        reports[1].results["bad"],
        DeliveryOutcome::failure(FailureReason::BadDeviceToken)
    );
}

// ============================================================
// Backpressure and isolation
// ============================================================

#[tokio::test]
async fn test_full_queue_blocks_intake_until_worker_frees_slot() {
    let stats = Arc::new(MemoryStatStore::new());
    let sender = Arc::new(GatedSender {
        started: Notify::new(),
        gate: Semaphore::new(0),
        stats: stats.clone(),
    });
    let mut registry = SenderRegistry::new();
    registry.register(sender.clone());
    let dispatcher = Dispatcher::new(Arc::new(test_config(1, 1)), registry, stats.clone());
    let pool = dispatcher.start_workers();

    let request = |token: &str| RequestPush {
        notifications: vec![notification(Platform::Android, &[token])],
    };

    // The single worker takes the first notification and blocks in send.
    dispatcher.queue_notifications(request("first")).await;
    tokio::time::timeout(Duration::from_secs(1), sender.started.notified())
        .await
        .expect("worker should pick up the first notification");

    // The second fills the only queue slot.
    dispatcher.queue_notifications(request("second")).await;
    assert_eq!(dispatcher.queue().len(), 1);

    // The third has nowhere to go.
    let third = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move { dispatcher.queue_notifications(request("third")).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!third.is_finished(), "intake should wait while the queue is full");

    sender.gate.add_permits(3);
    let summary = tokio::time::timeout(Duration::from_secs(1), third)
        .await
        .expect("intake should resume once a slot frees")
        .unwrap();
    assert_eq!(summary.counts, 1);

    let snap = wait_for_snapshot(&stats, |s| s.android.push_success == 3).await;
    assert_eq!(snap.total_count, 3);

    pool.shutdown();
}

#[tokio::test]
async fn test_panicking_delivery_does_not_stop_worker() {
    let stats = Arc::new(MemoryStatStore::new());
    let mut registry = SenderRegistry::new();
    registry.register(Arc::new(PanickySender {
        stats: stats.clone(),
    }));
    let dispatcher = Dispatcher::new(Arc::new(test_config(1, 8)), registry, stats.clone());
    let pool = dispatcher.start_workers();

    dispatcher
        .queue_notifications(RequestPush {
            notifications: vec![
                notification(Platform::Android, &["boom", "also-lost"]),
                notification(Platform::Android, &["survivor"]),
            ],
        })
        .await;

    let snap = wait_for_snapshot(&stats, |s| {
        s.android.push_success == 1 && s.android.push_error == 2
    })
    .await;
    assert_eq!(snap.total_count, 3);

    pool.shutdown();
}

#[tokio::test]
async fn test_panic_after_partial_success_counts_every_token_as_error() {
    let stats = Arc::new(MemoryStatStore::new());
    let mut registry = SenderRegistry::new();
    registry.register(Arc::new(HalfwayPanicSender {
        stats: stats.clone(),
    }));
    let dispatcher = Dispatcher::new(Arc::new(test_config(1, 8)), registry, stats.clone());
    let pool = dispatcher.start_workers();

    dispatcher
        .queue_notifications(RequestPush {
            notifications: vec![notification(Platform::Ios, &["t1", "t2", "t3"])],
        })
        .await;

    // The success recorded before the panic stays; all three tokens are
    // also counted as errors because their outcomes were lost.
    let snap = wait_for_snapshot(&stats, |s| s.ios.push_error == 3).await;
    assert_eq!(snap.total_count, 3);
    assert_eq!(snap.ios.push_success, 1);

    pool.shutdown();
}

#[tokio::test]
async fn test_dropped_intake_counts_only_enqueued_notifications() {
    let apns = Arc::new(ScriptedApns::default());
    // No workers: the single slot fills and intake stalls on the second item.
    let (dispatcher, stats) = ios_dispatcher(test_config(1, 1), apns);

    let intake = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            dispatcher
                .queue_notifications(RequestPush {
                    notifications: vec![
                        notification(Platform::Ios, &["a", "b"]),
                        notification(Platform::Ios, &["c", "d", "e"]),
                    ],
                })
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!intake.is_finished(), "intake should wait for a free slot");
    assert_eq!(stats.snapshot().await.unwrap().total_count, 2);

    intake.abort();
    let _ = intake.await;

    assert_eq!(dispatcher.queue().len(), 1);
    assert_eq!(stats.snapshot().await.unwrap().total_count, 2);
}
