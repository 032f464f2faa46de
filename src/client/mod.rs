// HTTP client for the status API
//
// Transport issues single requests and normalizes failures; StatusService
// maps the four status endpoints onto typed responses.

mod credentials;
mod service;
mod transport;
pub mod types;

pub use credentials::CredentialSlot;
pub use service::{StatusService, CONFIG_PATH, HEALTH_PATH, LIVE_PATH, READY_PATH};
pub use transport::Transport;
pub use types::{
    ConfigResponse, HealthResponse, HealthStatus, LiveStatus, LivenessResponse, ReadinessChecks,
    ReadinessResponse, ReadyStatus,
};
