// Transport and StatusService against live HTTP servers
//
// mockito covers status codes and bodies; raw TcpListeners cover
// refused connections and servers that never answer.

use mockito::{Matcher, Server};
use pulsewatch::client::{CredentialSlot, HealthStatus, StatusService, Transport};
use pulsewatch::config::ClientConfig;
use pulsewatch::errors::{ErrorKind, GENERIC_ERROR_MESSAGE};
use pulsewatch::storage::{MemoryStore, PreferenceStore, AUTH_TOKEN_KEY};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

fn transport_with(base_url: &str, timeout_seconds: u64, store: Arc<dyn PreferenceStore>) -> Transport {
    let config = ClientConfig {
        base_url: base_url.to_string(),
        timeout_seconds,
    };
    Transport::new(&config, CredentialSlot::new(store)).unwrap()
}

fn transport(base_url: &str) -> Transport {
    transport_with(base_url, 30, Arc::new(MemoryStore::new()))
}

#[tokio::test]
async fn test_health_decodes() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/health")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status":"healthy","version":"1.2.0","timestamp":"2024-01-01T00:00:00Z"}"#)
        .create_async()
        .await;

    let service = StatusService::new(transport(&server.url()));
    let health = service.health().await.unwrap();

    assert_eq!(health.status, HealthStatus::Healthy);
    assert_eq!(health.version, "1.2.0");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_bearer_header_sent_when_stored() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/live")
        .match_header("authorization", "Bearer secret-token")
        .with_status(200)
        .with_body(r#"{"status":"alive","uptime":12.5}"#)
        .create_async()
        .await;

    let store: Arc<dyn PreferenceStore> = Arc::new(MemoryStore::with_value(AUTH_TOKEN_KEY, "secret-token"));
    let service = StatusService::new(transport_with(&server.url(), 30, store));

    let live = service.liveness().await.unwrap();
    assert_eq!(live.uptime, 12.5);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_no_bearer_header_without_credential() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/health")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body(r#"{"status":"healthy"}"#)
        .create_async()
        .await;

    let t = transport(&server.url());
    t.set_credential("temporary");
    t.clear_credential();

    let health: Value = t.get("/api/health").await.unwrap();
    assert_eq!(health["status"], "healthy");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_structured_error_body() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/config")
        .with_status(403)
        .with_header("content-type", "application/json")
        .with_body(r#"{"detail":"Not allowed","code":"forbidden"}"#)
        .create_async()
        .await;

    let service = StatusService::new(transport(&server.url()));
    let err = service.config().await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Http);
    assert_eq!(err.status, Some(403));
    assert_eq!(err.message, "Not allowed");
    assert_eq!(err.code.as_deref(), Some("forbidden"));
    assert_eq!(err.details, Some(json!({"detail": "Not allowed", "code": "forbidden"})));
}

#[tokio::test]
async fn test_bare_status_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/ready")
        .with_status(503)
        .create_async()
        .await;

    let service = StatusService::new(transport(&server.url()));
    let err = service.readiness().await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Http);
    assert_eq!(err.status, Some(503));
    assert_eq!(err.message, GENERIC_ERROR_MESSAGE);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_undecodable_success_body() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/health")
        .with_status(200)
        .with_body("<html>proxy login</html>")
        .create_async()
        .await;

    let service = StatusService::new(transport(&server.url()));
    let err = service.health().await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Decode);
    assert_eq!(err.status, Some(200));
}

#[tokio::test]
async fn test_post_sends_json_body() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/acknowledge")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({"incident": 42})))
        .with_status(204)
        .create_async()
        .await;

    let t = transport(&server.url());
    let _: () = t.post("/api/acknowledge", Some(&json!({"incident": 42}))).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_feature_flags() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/config")
        .with_status(200)
        .with_body(r#"{"environment":"staging","debug":false,"features":{"dark_mode":true,"beta":false}}"#)
        .expect_at_least(1)
        .create_async()
        .await;

    let service = StatusService::new(transport(&server.url()));
    assert_eq!(service.environment().await.unwrap(), "staging");
    assert!(service.is_feature_enabled("dark_mode").await.unwrap());
    assert!(!service.is_feature_enabled("beta").await.unwrap());
    assert!(!service.is_feature_enabled("unknown").await.unwrap());
}

#[tokio::test]
async fn test_refused_connection_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let service = StatusService::new(transport(&format!("http://{}", addr)));
    let err = service.health().await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Network);
    assert!(err.status.is_none());
    assert!(err.is_connectivity());
}

#[tokio::test]
async fn test_silent_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // Accept and hold connections without ever answering
    let holder = tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            open.push(socket);
        }
    });

    let t = transport_with(&format!("http://{}", addr), 1, Arc::new(MemoryStore::new()));
    let err = t.get::<Value>("/api/health").await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Timeout);
    assert!(err.is_retryable());
    holder.abort();
}
