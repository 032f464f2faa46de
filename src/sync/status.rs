// The four status resources
//
// StatusSync owns one typed Resource per endpoint and an explicit
// key -> handle map for operations that do not care about the payload type.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::entry::{Snapshot, SyncPhase};
use super::options::SyncOptions;
use super::resource::Resource;
use super::signals::HostSignals;
use crate::client::{
    ConfigResponse, HealthResponse, LivenessResponse, ReadinessResponse, StatusService,
    CONFIG_PATH, HEALTH_PATH, LIVE_PATH, READY_PATH,
};
use crate::config::SyncSettings;
use crate::errors::ApiError;

/// Logical resource keys, one per status endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKey {
    Health,
    Readiness,
    Liveness,
    Config,
}

impl ResourceKey {
    pub const ALL: [ResourceKey; 4] = [
        ResourceKey::Health,
        ResourceKey::Readiness,
        ResourceKey::Liveness,
        ResourceKey::Config,
    ];

    /// Endpoint path; doubles as the cache key
    pub fn path(&self) -> &'static str {
        match self {
            ResourceKey::Health => HEALTH_PATH,
            ResourceKey::Readiness => READY_PATH,
            ResourceKey::Liveness => LIVE_PATH,
            ResourceKey::Config => CONFIG_PATH,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ResourceKey::Health => "health",
            ResourceKey::Readiness => "ready",
            ResourceKey::Liveness => "live",
            ResourceKey::Config => "config",
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResourceKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "health" => Ok(ResourceKey::Health),
            "ready" | "readiness" => Ok(ResourceKey::Readiness),
            "live" | "liveness" => Ok(ResourceKey::Liveness),
            "config" => Ok(ResourceKey::Config),
            other => Err(format!(
                "unknown resource '{}' (expected health, ready, live or config)",
                other
            )),
        }
    }
}

/// Payload-agnostic view of a resource
#[async_trait]
pub trait ResourceHandle: Send + Sync {
    fn cache_key(&self) -> &str;

    fn current_phase(&self) -> SyncPhase;

    fn current_error(&self) -> Option<ApiError>;

    fn last_fetched_at(&self) -> Option<DateTime<Utc>>;

    /// Fire-and-forget revalidation; false if it attached to a running fetch
    fn revalidate_in_background(&self) -> bool;

    /// Revalidate and report the settled error, if any
    async fn refresh(&self) -> Result<(), ApiError>;
}

#[async_trait]
impl<T> ResourceHandle for Resource<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn cache_key(&self) -> &str {
        self.key()
    }

    fn current_phase(&self) -> SyncPhase {
        self.phase()
    }

    fn current_error(&self) -> Option<ApiError> {
        self.snapshot().error
    }

    fn last_fetched_at(&self) -> Option<DateTime<Utc>> {
        self.snapshot().last_fetched_at
    }

    fn revalidate_in_background(&self) -> bool {
        self.trigger()
    }

    async fn refresh(&self) -> Result<(), ApiError> {
        match self.revalidate().await.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Synchronization layer for the status endpoints
pub struct StatusSync {
    signals: HostSignals,
    health: Resource<HealthResponse>,
    readiness: Resource<ReadinessResponse>,
    liveness: Resource<LivenessResponse>,
    config: Resource<ConfigResponse>,
    handles: HashMap<ResourceKey, Arc<dyn ResourceHandle>>,
}

impl StatusSync {
    pub fn new(service: StatusService, settings: &SyncSettings) -> Self {
        Self::with_signals(service, settings, HostSignals::new())
    }

    pub fn with_signals(service: StatusService, settings: &SyncSettings, signals: HostSignals) -> Self {
        let polling = SyncOptions::polling(settings);
        let static_resource = SyncOptions::static_resource(settings);

        let svc = service.clone();
        let health = Resource::new(HEALTH_PATH, polling.clone(), signals.clone(), move || {
            let svc = svc.clone();
            async move { svc.health().await }
        });

        let svc = service.clone();
        let readiness = Resource::new(READY_PATH, polling.clone(), signals.clone(), move || {
            let svc = svc.clone();
            async move { svc.readiness().await }
        });

        let svc = service.clone();
        let liveness = Resource::new(LIVE_PATH, polling, signals.clone(), move || {
            let svc = svc.clone();
            async move { svc.liveness().await }
        });

        let svc = service;
        let config = Resource::new(CONFIG_PATH, static_resource, signals.clone(), move || {
            let svc = svc.clone();
            async move { svc.config().await }
        });

        let mut handles: HashMap<ResourceKey, Arc<dyn ResourceHandle>> = HashMap::new();
        handles.insert(ResourceKey::Health, Arc::new(health.clone()));
        handles.insert(ResourceKey::Readiness, Arc::new(readiness.clone()));
        handles.insert(ResourceKey::Liveness, Arc::new(liveness.clone()));
        handles.insert(ResourceKey::Config, Arc::new(config.clone()));

        Self {
            signals,
            health,
            readiness,
            liveness,
            config,
            handles,
        }
    }

    pub fn signals(&self) -> &HostSignals {
        &self.signals
    }

    pub fn health(&self) -> &Resource<HealthResponse> {
        &self.health
    }

    pub fn readiness(&self) -> &Resource<ReadinessResponse> {
        &self.readiness
    }

    pub fn liveness(&self) -> &Resource<LivenessResponse> {
        &self.liveness
    }

    pub fn config(&self) -> &Resource<ConfigResponse> {
        &self.config
    }

    pub fn keys(&self) -> Vec<ResourceKey> {
        let mut keys: Vec<_> = self.handles.keys().copied().collect();
        keys.sort();
        keys
    }

    pub fn handle(&self, key: ResourceKey) -> Arc<dyn ResourceHandle> {
        // Every key is inserted in the constructor
        Arc::clone(&self.handles[&key])
    }

    pub fn phase(&self, key: ResourceKey) -> SyncPhase {
        self.handles[&key].current_phase()
    }

    /// Start a background revalidation of one key
    pub fn revalidate(&self, key: ResourceKey) -> bool {
        self.handles[&key].revalidate_in_background()
    }

    /// Revalidate every key concurrently and collect the settled errors
    pub async fn revalidate_all(&self) -> Vec<(ResourceKey, ApiError)> {
        let keys = self.keys();
        let results = futures::future::join_all(keys.iter().map(|key| {
            let handle = self.handle(*key);
            async move { handle.refresh().await }
        }))
        .await;

        keys.into_iter()
            .zip(results)
            .filter_map(|(key, result)| result.err().map(|err| (key, err)))
            .collect()
    }

    /// Feature flag from the cached server configuration (false until loaded)
    pub fn feature_enabled(&self, name: &str) -> bool {
        self.config
            .snapshot()
            .data
            .map(|config| config.is_feature_enabled(name))
            .unwrap_or(false)
    }
}

/// Headline API state derived from the health resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiStatus {
    Checking,
    Online,
    Degraded,
    Offline,
}

impl ApiStatus {
    pub fn from_snapshot(snapshot: &Snapshot<HealthResponse>) -> Self {
        if snapshot.is_error() {
            return ApiStatus::Offline;
        }
        match &snapshot.data {
            Some(health) if health.is_healthy() => ApiStatus::Online,
            Some(_) => ApiStatus::Degraded,
            None => ApiStatus::Checking,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ApiStatus::Checking => "Checking API status...",
            ApiStatus::Online => "API Online",
            ApiStatus::Degraded => "API Degraded",
            ApiStatus::Offline => "API Offline",
        }
    }
}

impl fmt::Display for ApiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
