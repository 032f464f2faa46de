// Transient notification queue
//
// Notifications live in insertion order until they are dismissed or their
// expiry timer fires. Each timer is tracked by notification id so a manual
// dismissal cancels it; removal is idempotent, so a timer that still fires
// for an id that is already gone does nothing.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use uuid::Uuid;

use crate::config::NotificationSettings;

/// Lifetime used when neither the notification nor the settings specify one
pub const DEFAULT_DURATION_MS: i64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    pub fn label(&self) -> &'static str {
        match self {
            NotificationKind::Info => "info",
            NotificationKind::Success => "success",
            NotificationKind::Warning => "warning",
            NotificationKind::Error => "error",
        }
    }
}

/// A visible notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Effective lifetime in milliseconds; <= 0 never expires
    pub duration_ms: i64,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn expires(&self) -> bool {
        self.duration_ms > 0
    }
}

/// A notification before it has been given an id
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: Option<String>,
    pub duration_ms: Option<i64>,
}

impl NewNotification {
    pub fn new(kind: NotificationKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: None,
            duration_ms: None,
        }
    }

    pub fn info(title: impl Into<String>) -> Self {
        Self::new(NotificationKind::Info, title)
    }

    pub fn success(title: impl Into<String>) -> Self {
        Self::new(NotificationKind::Success, title)
    }

    pub fn warning(title: impl Into<String>) -> Self {
        Self::new(NotificationKind::Warning, title)
    }

    pub fn error(title: impl Into<String>) -> Self {
        Self::new(NotificationKind::Error, title)
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn duration_ms(mut self, duration_ms: i64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Keep visible until dismissed
    pub fn sticky(self) -> Self {
        self.duration_ms(0)
    }
}

struct Inner {
    list: Mutex<Vec<Notification>>,
    timers: DashMap<String, AbortHandle>,
    updates: watch::Sender<Vec<Notification>>,
    default_duration_ms: i64,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Vec<Notification>> {
        self.list.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn remove(&self, id: &str) -> bool {
        if let Some((_, timer)) = self.timers.remove(id) {
            timer.abort();
        }

        let mut list = self.lock();
        let before = list.len();
        list.retain(|n| n.id != id);
        let removed = list.len() != before;
        if removed {
            self.updates.send_replace(list.clone());
        }
        removed
    }

    fn abort_all(&self) {
        for timer in self.timers.iter() {
            timer.value().abort();
        }
        self.timers.clear();
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.abort_all();
    }
}

/// Owner of the visible notification list
#[derive(Clone)]
pub struct NotificationManager {
    inner: Arc<Inner>,
}

impl Default for NotificationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationManager {
    pub fn new() -> Self {
        Self::with_default_duration(DEFAULT_DURATION_MS)
    }

    pub fn from_settings(settings: &NotificationSettings) -> Self {
        Self::with_default_duration(settings.default_duration_ms)
    }

    pub fn with_default_duration(default_duration_ms: i64) -> Self {
        let (updates, _rx) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(Inner {
                list: Mutex::new(Vec::new()),
                timers: DashMap::new(),
                updates,
                default_duration_ms,
            }),
        }
    }

    /// Append a notification and schedule its expiry; returns the new id
    ///
    /// Must be called within a Tokio runtime when the notification expires.
    pub fn add(&self, new: NewNotification) -> String {
        let id = format!("ntf_{}", Uuid::new_v4().simple());
        let duration_ms = new.duration_ms.unwrap_or(self.inner.default_duration_ms);

        let notification = Notification {
            id: id.clone(),
            kind: new.kind,
            title: new.title,
            message: new.message,
            duration_ms,
            created_at: Utc::now(),
        };

        tracing::debug!(id = %id, kind = notification.kind.label(), duration_ms, "Notification added");

        {
            let mut list = self.inner.lock();
            list.push(notification);
            self.inner.updates.send_replace(list.clone());
        }

        if duration_ms > 0 {
            let weak: Weak<Inner> = Arc::downgrade(&self.inner);
            let timer_id = id.clone();
            let delay = Duration::from_millis(duration_ms as u64);

            let task = tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Some(inner) = weak.upgrade() {
                    inner.timers.remove(&timer_id);
                    if inner.remove(&timer_id) {
                        tracing::debug!(id = %timer_id, "Notification expired");
                    }
                }
            });
            self.inner.timers.insert(id.clone(), task.abort_handle());
        }

        id
    }

    /// Dismiss a notification; unknown ids are ignored
    pub fn remove(&self, id: &str) -> bool {
        self.inner.remove(id)
    }

    /// Dismiss everything and cancel all pending expiries
    pub fn clear(&self) {
        self.inner.abort_all();
        let mut list = self.inner.lock();
        list.clear();
        self.inner.updates.send_replace(Vec::new());
    }

    /// Visible notifications in insertion order
    pub fn list(&self) -> Vec<Notification> {
        self.inner.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Expiry timers still outstanding
    pub fn pending_timers(&self) -> usize {
        self.inner.timers.len()
    }

    /// Observe list changes
    pub fn subscribe(&self) -> watch::Receiver<Vec<Notification>> {
        self.inner.updates.subscribe()
    }
}
