// Configuration structs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Base URL used when neither the config file nor the environment sets one
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client settings
    #[serde(default)]
    pub client: ClientConfig,

    /// Polling and retry policy for the status resources
    #[serde(default)]
    pub sync: SyncSettings,

    #[serde(default)]
    pub notifications: NotificationSettings,

    #[serde(default = "default_app_name")]
    pub app_name: String,

    #[serde(default = "default_app_version")]
    pub app_version: String,

    /// Force debug-level logging
    #[serde(default)]
    pub debug: bool,

    /// Directory holding preferences.json (default: ~/.pulsewatch)
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            sync: SyncSettings::default(),
            notifications: NotificationSettings::default(),
            app_name: default_app_name(),
            app_version: default_app_version(),
            debug: false,
            storage_dir: default_storage_dir(),
        }
    }
}

impl Config {
    /// Path of the persisted preference file
    pub fn preferences_path(&self) -> PathBuf {
        self.storage_dir.join("preferences.json")
    }
}

fn default_app_name() -> String {
    "Pulsewatch".to_string()
}

fn default_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_storage_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".pulsewatch")
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL every request path is appended to
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Revalidation policy shared by the status resources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Refresh period for health/ready/live; 0 disables timed refresh
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,

    /// Retries after the first failed attempt of a fetch cycle
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    #[serde(default = "default_true")]
    pub revalidate_on_focus: bool,
}

fn default_refresh_interval_ms() -> u64 {
    30_000
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_interval_ms() -> u64 {
    5_000
}

fn default_true() -> bool {
    true
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval_ms(),
            retry_count: default_retry_count(),
            retry_interval_ms: default_retry_interval_ms(),
            revalidate_on_focus: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// Lifetime of a notification that does not set its own (<= 0 never expires)
    #[serde(default = "default_duration_ms")]
    pub default_duration_ms: i64,
}

fn default_duration_ms() -> i64 {
    5_000
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            default_duration_ms: default_duration_ms(),
        }
    }
}
