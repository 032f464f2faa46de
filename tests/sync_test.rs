// Synchronization layer behaviour
//
// Resource tests run on paused time with scripted fetchers so retry
// backoff and refresh intervals elapse instantly and deterministically.
// StatusSync is exercised end to end against a mockito server.

use mockito::Server;
use pulsewatch::client::{
    CredentialSlot, HealthResponse, HealthStatus, StatusService, Transport,
};
use pulsewatch::config::{ClientConfig, SyncSettings};
use pulsewatch::errors::{ApiError, ErrorKind};
use pulsewatch::storage::MemoryStore;
use pulsewatch::sync::{
    ApiStatus, HostSignals, Resource, ResourceHandle, ResourceKey, StatusSync, SyncOptions,
    SyncPhase,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Fetcher whose outcome depends on the zero-based call number
struct Script {
    calls: Arc<AtomicUsize>,
}

impl Script {
    fn resource<T, F>(options: SyncOptions, signals: HostSignals, delay: Duration, outcome: F) -> (Resource<T>, Self)
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(usize) -> Result<T, ApiError> + Send + Sync + 'static,
    {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let resource = Resource::new("/api/health", options, signals, move || {
            let result = outcome(counter.fetch_add(1, Ordering::SeqCst));
            async move {
                if !delay.is_zero() {
                    sleep(delay).await;
                }
                result
            }
        });
        (resource, Script { calls })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn healthy(version: &str) -> HealthResponse {
    HealthResponse {
        status: HealthStatus::Healthy,
        version: version.to_string(),
        timestamp: None,
    }
}

fn fast_retries() -> SyncOptions {
    SyncOptions::default().with_retries(3, Duration::from_millis(5_000))
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_revalidations_share_one_request() {
    let (resource, script) = Script::resource(
        SyncOptions::default(),
        HostSignals::new(),
        Duration::from_millis(100),
        |_| Ok(healthy("1.0.0")),
    );

    let (a, b) = tokio::join!(resource.revalidate(), resource.revalidate());

    assert_eq!(script.calls(), 1);
    assert_eq!(a.data, b.data);
    assert_eq!(a.phase, SyncPhase::SettledSuccess);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_settle_error() {
    let (resource, script) =
        Script::resource::<HealthResponse, _>(fast_retries(), HostSignals::new(), Duration::ZERO, |_| {
            Err(ApiError::network())
        });

    let started = Instant::now();
    let snapshot = resource.revalidate().await;

    // First attempt plus three retries, 5 s apart
    assert_eq!(script.calls(), 4);
    assert!(started.elapsed() >= Duration::from_millis(15_000));
    assert_eq!(snapshot.phase, SyncPhase::SettledError);
    assert_eq!(snapshot.error.map(|e| e.kind), Some(ErrorKind::Network));
    assert!(!snapshot.is_loading);
    assert!(!resource.entry().in_flight);
}

#[tokio::test(start_paused = true)]
async fn test_failure_keeps_last_good_data() {
    let (resource, script) = Script::resource(fast_retries(), HostSignals::new(), Duration::ZERO, |n| {
        if n == 0 {
            Ok(healthy("1.2.0"))
        } else {
            Err(ApiError::timeout())
        }
    });

    let first = resource.revalidate().await;
    assert_eq!(ApiStatus::from_snapshot(&first), ApiStatus::Online);
    let fetched_at = first.last_fetched_at;

    let second = resource.revalidate().await;
    assert_eq!(script.calls(), 5);
    assert!(second.is_error());
    assert_eq!(second.error.as_ref().map(|e| e.kind), Some(ErrorKind::Timeout));
    assert_eq!(second.data.as_ref().map(|h| h.version.as_str()), Some("1.2.0"));
    assert_eq!(second.last_fetched_at, fetched_at);
    assert_eq!(ApiStatus::from_snapshot(&second), ApiStatus::Offline);
}

#[tokio::test(start_paused = true)]
async fn test_retry_counter_resets_between_cycles() {
    let (resource, script) = Script::resource(fast_retries(), HostSignals::new(), Duration::ZERO, |n| {
        if n == 2 {
            Ok(healthy("2.0.0"))
        } else {
            Err(ApiError::network())
        }
    });

    let recovered = resource.revalidate().await;
    assert_eq!(script.calls(), 3);
    assert_eq!(recovered.phase, SyncPhase::SettledSuccess);
    assert_eq!(resource.entry().retries, 0);

    // A fresh cycle gets the full retry budget again
    let failed = resource.revalidate().await;
    assert_eq!(script.calls(), 7);
    assert_eq!(failed.phase, SyncPhase::SettledError);
    assert_eq!(resource.entry().retries, 0);
}

#[tokio::test(start_paused = true)]
async fn test_disabled_retry_on_error_fails_fast() {
    let mut options = fast_retries();
    options.retry_on_error = false;
    let (resource, script) =
        Script::resource::<u32, _>(options, HostSignals::new(), Duration::ZERO, |_| Err(ApiError::timeout()));

    resource.revalidate().await;
    assert_eq!(script.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_interval_runs_while_subscribed() {
    let options = SyncOptions::default().with_refresh_interval(Duration::from_secs(30));
    let (resource, script) =
        Script::resource(options, HostSignals::new(), Duration::ZERO, |n| Ok(n as u32));

    let mut subscription = resource.subscribe();
    let first = subscription.settled().await;
    assert_eq!(first.data, Some(0));
    assert_eq!(script.calls(), 1);

    sleep(Duration::from_millis(30_010)).await;
    assert_eq!(script.calls(), 2);

    sleep(Duration::from_secs(30)).await;
    assert_eq!(script.calls(), 3);
    assert_eq!(subscription.current().data, Some(2));

    drop(subscription);
    sleep(Duration::from_secs(120)).await;
    assert_eq!(script.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_subscribe_fetches_only_when_idle() {
    let (resource, script) =
        Script::resource(SyncOptions::default(), HostSignals::new(), Duration::ZERO, |_| Ok(1u8));

    let mut first = resource.subscribe();
    first.settled().await;

    let second = resource.subscribe();
    sleep(Duration::from_millis(10)).await;

    assert_eq!(script.calls(), 1);
    assert_eq!(second.current().data, Some(1));
}

#[tokio::test(start_paused = true)]
async fn test_focus_triggers_revalidation() {
    let signals = HostSignals::new();
    let (resource, script) =
        Script::resource(SyncOptions::default(), signals.clone(), Duration::ZERO, |n| Ok(n as u32));

    let mut subscription = resource.subscribe();
    subscription.settled().await;
    assert_eq!(signals.listener_count(), 1);

    signals.focus();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(script.calls(), 2);

    signals.reconnect();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(script.calls(), 3);

    drop(subscription);
    sleep(Duration::from_millis(10)).await;
    assert_eq!(signals.listener_count(), 0);

    signals.focus();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(script.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_focus_ignored_when_disabled() {
    let signals = HostSignals::new();
    let options = SyncOptions::static_resource(&SyncSettings::default());
    let (resource, script) = Script::resource(options, signals.clone(), Duration::ZERO, |_| Ok(()));

    let mut subscription = resource.subscribe();
    subscription.settled().await;

    signals.focus();
    signals.reconnect();
    sleep(Duration::from_secs(60)).await;
    assert_eq!(script.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unsubscribe_leaves_in_flight_fetch_running() {
    let (resource, script) =
        Script::resource(SyncOptions::default(), HostSignals::new(), Duration::from_secs(1), |_| Ok(7u32));

    let subscription = resource.subscribe();
    assert!(subscription.current().is_loading);
    subscription.unsubscribe();

    sleep(Duration::from_secs(2)).await;
    assert_eq!(script.calls(), 1);
    assert_eq!(resource.snapshot().data, Some(7));
    assert_eq!(resource.phase(), SyncPhase::SettledSuccess);
}

#[tokio::test(start_paused = true)]
async fn test_observers_see_loading_then_settled() {
    let (resource, _script) =
        Script::resource(SyncOptions::default(), HostSignals::new(), Duration::from_millis(50), |_| Ok(3u32));

    let mut subscription = resource.subscribe();
    let loading = subscription.current();
    assert!(loading.is_loading);
    assert!(loading.data.is_none());
    assert!(resource.entry().is_initial_load());

    // The loading state was published after subscribing, so it is seen first
    let first = subscription.changed().await.unwrap();
    assert!(first.is_loading);

    let settled = subscription.changed().await.unwrap();
    assert!(!settled.is_loading);
    assert_eq!(settled.data, Some(3));
}

fn status_sync(base_url: &str) -> StatusSync {
    let config = ClientConfig {
        base_url: base_url.to_string(),
        timeout_seconds: 5,
    };
    let transport = Transport::new(&config, CredentialSlot::new(Arc::new(MemoryStore::new()))).unwrap();
    let settings = SyncSettings {
        refresh_interval_ms: 0,
        retry_count: 1,
        retry_interval_ms: 10,
        revalidate_on_focus: true,
    };
    StatusSync::new(StatusService::new(transport), &settings)
}

#[tokio::test]
async fn test_status_sync_revalidate_all() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/health")
        .with_status(200)
        .with_body(r#"{"status":"healthy","version":"1.2.0"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/api/ready")
        .with_status(200)
        .with_body(r#"{"status":"ready","checks":{"database":true,"cache":false}}"#)
        .create_async()
        .await;
    let live = server
        .mock("GET", "/api/live")
        .with_status(500)
        .with_body(r#"{"detail":"liveness probe crashed"}"#)
        .expect(2)
        .create_async()
        .await;
    server
        .mock("GET", "/api/config")
        .with_status(200)
        .with_body(r#"{"environment":"production","features":{"notifications":true}}"#)
        .create_async()
        .await;

    let sync = status_sync(&server.url());
    assert_eq!(sync.phase(ResourceKey::Health), SyncPhase::Idle);
    assert!(!sync.feature_enabled("notifications"));

    let errors = sync.revalidate_all().await;

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, ResourceKey::Liveness);
    assert_eq!(errors[0].1.message, "liveness probe crashed");
    live.assert_async().await;

    assert_eq!(sync.phase(ResourceKey::Health), SyncPhase::SettledSuccess);
    assert_eq!(sync.phase(ResourceKey::Liveness), SyncPhase::SettledError);
    assert_eq!(
        sync.readiness().snapshot().data.map(|r| r.checks.failing()),
        Some(vec!["cache"])
    );
    assert!(sync.feature_enabled("notifications"));
    assert!(!sync.feature_enabled("beta"));
    assert_eq!(
        ApiStatus::from_snapshot(&sync.health().snapshot()),
        ApiStatus::Online
    );
}

#[tokio::test]
async fn test_status_sync_config_is_not_polled() {
    let sync = status_sync("http://localhost:8000");
    let config = sync.config().options();

    assert!(config.refresh_interval.is_none());
    assert!(!config.revalidate_on_focus);
    assert!(!config.revalidate_on_reconnect);
    assert_eq!(sync.handle(ResourceKey::Config).cache_key(), "/api/config");
    assert_eq!(sync.keys(), ResourceKey::ALL.to_vec());
}
