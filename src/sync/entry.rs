// Cached per-key state

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::ApiError;

/// Lifecycle of one resource key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// Never fetched
    Idle,
    /// A fetch cycle (first attempt or retry backoff) is outstanding
    Loading,
    SettledSuccess,
    SettledError,
}

impl SyncPhase {
    pub fn is_settled(&self) -> bool {
        matches!(self, SyncPhase::SettledSuccess | SyncPhase::SettledError)
    }
}

/// Full cache record for one key
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub key: String,
    pub data: Option<T>,
    pub error: Option<ApiError>,
    pub is_loading: bool,
    pub in_flight: bool,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub phase: SyncPhase,
    /// Retries consumed by the current cycle; 0 outside a cycle
    pub retries: u32,
}

impl<T> CacheEntry<T> {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            data: None,
            error: None,
            is_loading: false,
            in_flight: false,
            last_fetched_at: None,
            phase: SyncPhase::Idle,
            retries: 0,
        }
    }

    /// Loading with nothing cached yet
    pub fn is_initial_load(&self) -> bool {
        self.is_loading && self.data.is_none()
    }
}

impl<T: Clone> CacheEntry<T> {
    pub fn snapshot(&self) -> Snapshot<T> {
        Snapshot {
            data: self.data.clone(),
            error: self.error.clone(),
            is_loading: self.is_loading,
            phase: self.phase,
            last_fetched_at: self.last_fetched_at,
        }
    }
}

/// What a consumer sees for a key
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub data: Option<T>,
    pub error: Option<ApiError>,
    pub is_loading: bool,
    pub phase: SyncPhase,
    pub last_fetched_at: Option<DateTime<Utc>>,
}

impl<T> Snapshot<T> {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_settled(&self) -> bool {
        self.phase.is_settled()
    }
}
