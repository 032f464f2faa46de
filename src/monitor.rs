// API status monitor
//
// Follows the health resource and turns headline status transitions into
// notifications. An outage posts a sticky error that is dismissed again
// when the API comes back.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::client::{ConfigResponse, HealthResponse, LivenessResponse, ReadinessResponse};
use crate::errors::ApiError;
use crate::notifications::{NewNotification, NotificationManager};
use crate::sync::{ApiStatus, Resource, StatusSync, Subscription};

/// Notification to post for a status transition, if any
pub fn transition_notification(
    previous: ApiStatus,
    next: ApiStatus,
    error: Option<&ApiError>,
) -> Option<NewNotification> {
    match (previous, next) {
        (prev, ApiStatus::Offline) if prev != ApiStatus::Offline => {
            let message = error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "The API is not responding".to_string());
            Some(NewNotification::error("API unreachable").message(message).sticky())
        }
        (ApiStatus::Offline, ApiStatus::Online) | (ApiStatus::Degraded, ApiStatus::Online) => {
            Some(NewNotification::success("API back online"))
        }
        (prev, ApiStatus::Degraded) if prev != ApiStatus::Degraded => Some(
            NewNotification::warning("API degraded")
                .message("The health check reports an unhealthy status"),
        ),
        _ => None,
    }
}

pub struct StatusMonitor {
    status: watch::Receiver<ApiStatus>,
    task: JoinHandle<()>,
    _readiness: Option<Subscription<ReadinessResponse>>,
    _liveness: Option<Subscription<LivenessResponse>>,
    _config: Option<Subscription<ConfigResponse>>,
}

impl StatusMonitor {
    /// Observe every status resource and report health transitions
    pub fn start(sync: &StatusSync, notifications: NotificationManager) -> Self {
        let mut monitor = Self::for_health(sync.health().clone(), notifications);
        monitor._readiness = Some(sync.readiness().subscribe());
        monitor._liveness = Some(sync.liveness().subscribe());
        monitor._config = Some(sync.config().subscribe());
        monitor
    }

    /// Observe only the given health resource
    pub fn for_health(health: Resource<HealthResponse>, notifications: NotificationManager) -> Self {
        let mut subscription = health.subscribe();
        let initial = ApiStatus::from_snapshot(&subscription.current());
        let (status_tx, status) = watch::channel(initial);

        let task = tokio::spawn(async move {
            let mut current = initial;
            let mut outage: Option<String> = None;

            while let Some(snapshot) = subscription.changed().await {
                if !snapshot.is_settled() {
                    continue;
                }

                let next = ApiStatus::from_snapshot(&snapshot);
                if next == current {
                    continue;
                }

                match next {
                    ApiStatus::Offline => warn!(from = %current, "API went offline"),
                    _ => info!(from = %current, to = %next, "API status changed"),
                }

                if next != ApiStatus::Offline {
                    if let Some(id) = outage.take() {
                        notifications.remove(&id);
                    }
                }

                if let Some(notification) =
                    transition_notification(current, next, snapshot.error.as_ref())
                {
                    let id = notifications.add(notification);
                    if next == ApiStatus::Offline {
                        outage = Some(id);
                    }
                }

                current = next;
                status_tx.send_replace(next);
            }
        });

        Self {
            status,
            task,
            _readiness: None,
            _liveness: None,
            _config: None,
        }
    }

    pub fn status(&self) -> ApiStatus {
        *self.status.borrow()
    }

    /// Observe headline status changes
    pub fn watch(&self) -> watch::Receiver<ApiStatus> {
        self.status.clone()
    }
}

impl Drop for StatusMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}
