// Pulsewatch - Status monitoring client for the service API
// Library exports

pub mod client; // Transport and typed status endpoints
pub mod config;
pub mod errors;
pub mod monitor; // Health transitions -> notifications
pub mod notifications;
pub mod storage; // Persisted preferences (theme, credential)
pub mod sync; // Cached, deduplicated, retrying resources
pub mod theme;
