// Per-key revalidating resource
//
// One Resource owns the cache entry for one logical key and drives its
// state machine: Idle -> Loading -> Settled-Success | Settled-Error, with
// bounded retries inside Loading. At most one fetch cycle runs per key;
// the `in_flight` flag is checked and set inside the entry lock, and the
// lock is never held across an await.

use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::entry::{CacheEntry, Snapshot, SyncPhase};
use super::options::SyncOptions;
use super::signals::{HostEvent, HostSignals};
use crate::errors::ApiError;

type Fetcher<T> = Box<dyn Fn() -> BoxFuture<'static, Result<T, ApiError>> + Send + Sync>;

struct Shared<T> {
    key: String,
    options: SyncOptions,
    fetcher: Fetcher<T>,
    entry: Mutex<CacheEntry<T>>,
    updates: watch::Sender<Snapshot<T>>,
    signals: HostSignals,
}

impl<T: Clone> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, CacheEntry<T>> {
        // A poisoned entry still holds consistent data: every mutation is a
        // plain field assignment with no await or fallible call in between
        self.entry.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, entry: &CacheEntry<T>) {
        self.updates.send_replace(entry.snapshot());
    }

    fn settle_success(&self, data: T) {
        let mut entry = self.lock();
        let recovered = entry.error.is_some();

        entry.data = Some(data);
        entry.error = None;
        entry.is_loading = false;
        entry.in_flight = false;
        entry.last_fetched_at = Some(chrono::Utc::now());
        entry.phase = SyncPhase::SettledSuccess;
        entry.retries = 0;
        self.publish(&entry);

        if recovered {
            info!(key = %self.key, "Resource recovered");
        } else {
            debug!(key = %self.key, "Resource refreshed");
        }
    }

    fn settle_error(&self, err: ApiError) {
        let mut entry = self.lock();
        let attempts = entry.retries + 1;

        entry.error = Some(err.clone());
        entry.is_loading = false;
        entry.in_flight = false;
        entry.phase = SyncPhase::SettledError;
        entry.retries = 0;
        self.publish(&entry);

        error!(
            key = %self.key,
            attempts,
            kept_data = entry.data.is_some(),
            "Fetch failed: {}",
            err
        );
    }

    /// Returns true when another attempt should be made
    fn record_failure(&self, err: &ApiError) -> bool {
        let mut entry = self.lock();
        if !err.is_retryable() || entry.retries >= self.options.retry_budget() {
            return false;
        }

        entry.retries += 1;
        warn!(
            key = %self.key,
            attempt = entry.retries,
            of = self.options.retry_count,
            "Fetch failed, retrying in {:?}: {}",
            self.options.retry_interval,
            err
        );
        true
    }
}

/// One fetch cycle: first attempt plus up to `retry_count` retries
async fn run_cycle<T: Clone + Send + Sync + 'static>(shared: Arc<Shared<T>>) {
    loop {
        let attempt = AssertUnwindSafe((shared.fetcher)()).catch_unwind().await;
        let result = attempt.unwrap_or_else(|_| Err(ApiError::client("Fetcher panicked")));

        match result {
            Ok(data) => {
                shared.settle_success(data);
                return;
            }
            Err(err) => {
                if !shared.record_failure(&err) {
                    shared.settle_error(err);
                    return;
                }
                time::sleep(shared.options.retry_interval).await;
            }
        }
    }
}

/// Cached, deduplicated, self-revalidating view of one remote resource
pub struct Resource<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Resource<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Resource<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new<F, Fut>(
        key: impl Into<String>,
        options: SyncOptions,
        signals: HostSignals,
        fetch: F,
    ) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let key = key.into();
        let entry = CacheEntry::new(key.clone());
        let (updates, _rx) = watch::channel(entry.snapshot());

        Self {
            shared: Arc::new(Shared {
                key,
                options,
                fetcher: Box::new(move || fetch().boxed()),
                entry: Mutex::new(entry),
                updates,
                signals,
            }),
        }
    }

    pub fn key(&self) -> &str {
        &self.shared.key
    }

    pub fn options(&self) -> &SyncOptions {
        &self.shared.options
    }

    pub fn snapshot(&self) -> Snapshot<T> {
        self.shared.lock().snapshot()
    }

    pub fn entry(&self) -> CacheEntry<T> {
        self.shared.lock().clone()
    }

    pub fn phase(&self) -> SyncPhase {
        self.shared.lock().phase
    }

    /// Start a fetch cycle unless one is already running
    ///
    /// Returns false when the call attached to an in-flight cycle.
    pub fn trigger(&self) -> bool {
        self.start().0
    }

    /// Force a re-fetch and wait for the cycle to settle
    ///
    /// Called while a cycle is outstanding, this waits for that cycle
    /// instead of issuing a second request.
    pub async fn revalidate(&self) -> Snapshot<T> {
        let (_, mut rx) = self.start();
        let settled = rx.wait_for(|s| !s.is_loading).await.map(|s| s.clone());
        settled.unwrap_or_else(|_| self.snapshot())
    }

    /// Overwrite cached data locally without fetching
    pub fn mutate(&self, data: T) {
        let mut entry = self.shared.lock();
        entry.data = Some(data);
        entry.error = None;
        if !entry.in_flight {
            entry.phase = SyncPhase::SettledSuccess;
        }
        self.shared.publish(&entry);
    }

    /// Register an observer
    ///
    /// The first observer of a never-fetched key starts the initial fetch.
    /// Each subscription runs its own refresh timer and host-event listener
    /// until it is dropped; fetches already in flight are left to finish.
    pub fn subscribe(&self) -> Subscription<T> {
        let receiver = self.shared.updates.subscribe();
        let options = &self.shared.options;
        let mut tasks = Vec::new();

        if let Some(period) = options.refresh_interval {
            let resource = self.clone();
            tasks.push(tokio::spawn(async move {
                let mut ticker = time::interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    debug!(key = %resource.key(), "Refresh interval elapsed");
                    resource.trigger();
                }
            }));
        }

        if options.revalidate_on_focus || options.revalidate_on_reconnect {
            // Subscribe before spawning so no event fired after this call is missed
            let events = self.shared.signals.subscribe();
            tasks.push(tokio::spawn(listen_host_events(self.clone(), events)));
        }

        if self.phase() == SyncPhase::Idle {
            self.trigger();
        }

        Subscription {
            resource: self.clone(),
            receiver,
            tasks,
        }
    }

    fn start(&self) -> (bool, watch::Receiver<Snapshot<T>>) {
        let mut entry = self.shared.lock();
        let rx = self.shared.updates.subscribe();

        if entry.in_flight {
            debug!(key = %self.shared.key, "Fetch already in flight, attaching");
            return (false, rx);
        }

        entry.in_flight = true;
        entry.is_loading = true;
        entry.phase = SyncPhase::Loading;
        entry.retries = 0;
        self.shared.publish(&entry);
        drop(entry);

        debug!(key = %self.shared.key, "Starting fetch cycle");
        tokio::spawn(run_cycle(Arc::clone(&self.shared)));
        (true, rx)
    }
}

async fn listen_host_events<T>(resource: Resource<T>, mut events: broadcast::Receiver<HostEvent>)
where
    T: Clone + Send + Sync + 'static,
{
    let options = resource.options().clone();
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(key = %resource.key(), skipped, "Host event listener lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => return,
        };

        let wanted = match event {
            HostEvent::Focus => options.revalidate_on_focus,
            HostEvent::Reconnect => options.revalidate_on_reconnect,
        };
        if wanted {
            debug!(key = %resource.key(), ?event, "Revalidating on host event");
            resource.trigger();
        }
    }
}

/// Observer registration for one resource
///
/// Dropping it (or calling `unsubscribe`) stops this observer's refresh
/// timer and host-event listener.
pub struct Subscription<T> {
    resource: Resource<T>,
    receiver: watch::Receiver<Snapshot<T>>,
    tasks: Vec<JoinHandle<()>>,
}

impl<T> Subscription<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn resource(&self) -> &Resource<T> {
        &self.resource
    }

    pub fn current(&self) -> Snapshot<T> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next state change; None once the resource is gone
    pub async fn changed(&mut self) -> Option<Snapshot<T>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Wait until the key is in a settled phase
    pub async fn settled(&mut self) -> Snapshot<T> {
        let settled = self
            .receiver
            .wait_for(|s| s.phase.is_settled())
            .await
            .map(|s| s.clone());
        settled.unwrap_or_else(|_| self.resource.snapshot())
    }

    pub async fn revalidate(&self) -> Snapshot<T> {
        self.resource.revalidate().await
    }

    pub fn unsubscribe(self) {}
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
