// Typed accessors for the status endpoints

use std::collections::BTreeMap;

use super::transport::Transport;
use super::types::{ConfigResponse, HealthResponse, LivenessResponse, ReadinessResponse};
use crate::errors::ApiError;

pub const HEALTH_PATH: &str = "/api/health";
pub const READY_PATH: &str = "/api/ready";
pub const LIVE_PATH: &str = "/api/live";
pub const CONFIG_PATH: &str = "/api/config";

/// Read-only client for the four status endpoints
#[derive(Clone)]
pub struct StatusService {
    transport: Transport,
}

impl StatusService {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub async fn health(&self) -> Result<HealthResponse, ApiError> {
        self.transport.get(HEALTH_PATH).await
    }

    pub async fn readiness(&self) -> Result<ReadinessResponse, ApiError> {
        self.transport.get(READY_PATH).await
    }

    pub async fn liveness(&self) -> Result<LivenessResponse, ApiError> {
        self.transport.get(LIVE_PATH).await
    }

    pub async fn config(&self) -> Result<ConfigResponse, ApiError> {
        self.transport.get(CONFIG_PATH).await
    }

    pub async fn environment(&self) -> Result<String, ApiError> {
        Ok(self.config().await?.environment)
    }

    pub async fn features(&self) -> Result<BTreeMap<String, bool>, ApiError> {
        Ok(self.config().await?.features)
    }

    pub async fn is_feature_enabled(&self, name: &str) -> Result<bool, ApiError> {
        Ok(self.config().await?.is_feature_enabled(name))
    }
}
