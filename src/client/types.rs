// Response types for the status endpoints
//
// Decoding is lenient: extra fields are ignored, unknown status strings map
// to `Unknown`, and a missing version decodes as an empty string.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    #[serde(other)]
    Unknown,
}

/// GET /api/health
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyStatus {
    Ready,
    NotReady,
    #[serde(other)]
    Unknown,
}

/// Dependency checks reported by the readiness probe
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessChecks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_api: Option<bool>,
}

impl ReadinessChecks {
    /// Names of checks that reported false
    pub fn failing(&self) -> Vec<&'static str> {
        [
            ("database", self.database),
            ("cache", self.cache),
            ("external_api", self.external_api),
        ]
        .into_iter()
        .filter(|(_, v)| *v == Some(false))
        .map(|(name, _)| name)
        .collect()
    }
}

/// GET /api/ready
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub status: ReadyStatus,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub checks: ReadinessChecks,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl ReadinessResponse {
    pub fn is_ready(&self) -> bool {
        self.status == ReadyStatus::Ready
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiveStatus {
    Alive,
    #[serde(other)]
    Unknown,
}

/// GET /api/live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivenessResponse {
    pub status: LiveStatus,
    /// Seconds since the server started
    #[serde(default)]
    pub uptime: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// GET /api/config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigResponse {
    pub environment: String,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub features: BTreeMap<String, bool>,
    #[serde(default)]
    pub version: String,
}

impl ConfigResponse {
    /// Unknown flags read as disabled
    pub fn is_feature_enabled(&self, name: &str) -> bool {
        self.features.get(name).copied().unwrap_or(false)
    }
}
