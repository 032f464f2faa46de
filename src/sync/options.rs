// Revalidation options

use std::time::Duration;

use crate::config::SyncSettings;

/// Per-resource revalidation and retry policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Timed refresh period while observed; None disables it
    pub refresh_interval: Option<Duration>,
    /// Retries after the first failed attempt of a cycle
    pub retry_count: u32,
    pub retry_interval: Duration,
    pub revalidate_on_focus: bool,
    pub revalidate_on_reconnect: bool,
    pub retry_on_error: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            refresh_interval: None,
            retry_count: 3,
            retry_interval: Duration::from_millis(5_000),
            revalidate_on_focus: true,
            revalidate_on_reconnect: true,
            retry_on_error: true,
        }
    }
}

impl SyncOptions {
    /// Options for continuously polled status probes
    pub fn polling(settings: &SyncSettings) -> Self {
        Self {
            refresh_interval: (settings.refresh_interval_ms > 0)
                .then(|| Duration::from_millis(settings.refresh_interval_ms)),
            retry_count: settings.retry_count,
            retry_interval: Duration::from_millis(settings.retry_interval_ms),
            revalidate_on_focus: settings.revalidate_on_focus,
            revalidate_on_reconnect: true,
            retry_on_error: true,
        }
    }

    /// Options for data that only changes on deploy (server configuration)
    pub fn static_resource(settings: &SyncSettings) -> Self {
        Self {
            refresh_interval: None,
            revalidate_on_focus: false,
            revalidate_on_reconnect: false,
            ..Self::polling(settings)
        }
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = (!interval.is_zero()).then_some(interval);
        self
    }

    pub fn with_retries(mut self, count: u32, interval: Duration) -> Self {
        self.retry_count = count;
        self.retry_interval = interval;
        self
    }

    /// Retries allowed for one cycle
    pub fn retry_budget(&self) -> u32 {
        if self.retry_on_error {
            self.retry_count
        } else {
            0
        }
    }
}
