// Uniform API error and user-facing error messages
//
// Every failure on the way to the status API (no response, timeout,
// non-2xx status, undecodable body) is converted into a single ApiError
// before any consumer sees it. The CLI-facing formatters at the bottom
// turn technical failures into actionable hints.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Message used when the server answered with an error status we cannot explain
pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Message used when the request never reached the server
pub const NETWORK_ERROR_MESSAGE: &str = "Network error - please check your connection";

/// Message used when the request exceeded its timeout
pub const TIMEOUT_ERROR_MESSAGE: &str = "Request timed out - please check your connection";

/// Failure taxonomy for API requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No response reached us (connection refused, DNS, reset)
    Network,
    /// The request exceeded its deadline
    Timeout,
    /// The server responded with a non-2xx status
    Http,
    /// A 2xx response whose body did not match the expected shape
    Decode,
    /// Misuse on our side (bad URL, unserializable body)
    Client,
}

impl ErrorKind {
    /// Stable machine-readable code used when the server does not provide one
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Network => "network_error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Http => "http_error",
            ErrorKind::Decode => "decode_error",
            ErrorKind::Client => "client_error",
        }
    }
}

/// The single error shape surfaced to every consumer
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{message}{}", .status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ApiError {
    fn with_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            code: Some(kind.code().to_string()),
            details: None,
        }
    }

    /// Request never produced a response
    pub fn network() -> Self {
        Self::with_kind(ErrorKind::Network, NETWORK_ERROR_MESSAGE)
    }

    /// Request exceeded its timeout
    pub fn timeout() -> Self {
        Self::with_kind(ErrorKind::Timeout, TIMEOUT_ERROR_MESSAGE)
    }

    /// Local misuse, e.g. a path that cannot be joined onto the base URL
    pub fn client(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Client, message)
    }

    /// A successful status whose body could not be decoded
    pub fn decode(status: u16, reason: impl fmt::Display) -> Self {
        let mut err = Self::with_kind(
            ErrorKind::Decode,
            format!("Failed to decode response body: {}", reason),
        );
        err.status = Some(status);
        err
    }

    /// Normalize a non-2xx response into the uniform shape
    ///
    /// A structured JSON body contributes its `detail` (or `message`) as the
    /// message and is kept whole in `details`. Anything else falls back to
    /// the generic message with the status populated.
    pub fn from_http_response(status: u16, body: &[u8]) -> Self {
        let mut err = Self::with_kind(ErrorKind::Http, GENERIC_ERROR_MESSAGE);
        err.status = Some(status);

        if body.iter().all(|b| b.is_ascii_whitespace()) {
            return err;
        }

        match serde_json::from_slice::<Value>(body) {
            Ok(json) => {
                if let Some(message) = structured_message(&json) {
                    err.message = message;
                }
                if let Some(code) = structured_code(&json) {
                    err.code = Some(code);
                }
                err.details = Some(json);
            }
            Err(_) => {
                err.details = Some(Value::String(String::from_utf8_lossy(body).into_owned()));
            }
        }

        err
    }

    /// Whether the sync layer may retry after this error
    pub fn is_retryable(&self) -> bool {
        !matches!(self.kind, ErrorKind::Client)
    }

    /// Whether the error means the server was never reached
    pub fn is_connectivity(&self) -> bool {
        matches!(self.kind, ErrorKind::Network | ErrorKind::Timeout)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::timeout()
        } else if e.is_builder() {
            ApiError::client(format!("Invalid request: {}", e))
        } else if let Some(status) = e.status() {
            ApiError::from_http_response(status.as_u16(), &[])
        } else {
            ApiError::network()
        }
    }
}

/// Pull a human-readable message out of an error body
///
/// Handles `{"detail": "..."}`, validation arrays
/// `{"detail": [{"msg": "..."}, ...]}` and `{"message": "..."}`.
fn structured_message(json: &Value) -> Option<String> {
    let obj = json.as_object()?;

    match obj.get("detail") {
        Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
        Some(Value::Array(items)) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if !msgs.is_empty() {
                return Some(msgs.join("; "));
            }
        }
        _ => {}
    }

    obj.get("message")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn structured_code(json: &Value) -> Option<String> {
    let obj = json.as_object()?;
    ["code", "type"]
        .iter()
        .find_map(|field| obj.get(*field).and_then(Value::as_str))
        .map(str::to_string)
}

/// Format an unreachable-API error with helpful suggestions
pub fn api_unreachable_error(base_url: &str) -> String {
    format!(
        "Could not reach the status API at {}\n\n\
        \x1b[1;33mPossible causes:\x1b[0m\n\
        • API server is not running\n\
        • Wrong base URL\n\
        • Network or firewall issue\n\n\
        \x1b[1;32mTry:\x1b[0m\n\
        1. Check the configured base URL:\n\
           \x1b[36mpulsewatch config\x1b[0m\n\n\
        2. Override it for one run:\n\
           \x1b[36mPULSEWATCH_API_URL=http://host:port pulsewatch check\x1b[0m\n\n\
        3. Probe the server directly:\n\
           \x1b[36mcurl {}/api/health\x1b[0m",
        base_url, base_url
    )
}

/// Format a config parse error with helpful suggestions
pub fn config_parse_error(error: &str) -> String {
    format!(
        "Failed to parse config file\n\n\
        \x1b[1;33mError:\x1b[0m {}\n\n\
        \x1b[1;32mTry:\x1b[0m\n\
        1. Check config file syntax:\n\
           \x1b[36mcat ~/.pulsewatch/config.toml\x1b[0m\n\n\
        2. Backup and start from defaults:\n\
           \x1b[36mmv ~/.pulsewatch/config.toml ~/.pulsewatch/config.toml.backup\x1b[0m",
        error
    )
}

/// Wrap a generic error with suggestions
pub fn wrap_error_with_suggestion(error: impl fmt::Display, suggestion: &str) -> String {
    format!(
        "{}\n\n\
        \x1b[1;33mSuggestion:\x1b[0m {}",
        error, suggestion
    )
}
