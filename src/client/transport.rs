// HTTP transport for the status API
//
// Issues single requests against the configured base URL, attaches the
// bearer credential when one is stored, and converts every failure into
// the uniform ApiError. No retries happen here; the sync layer owns that.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::credentials::CredentialSlot;
use crate::config::ClientConfig;
use crate::errors::ApiError;

/// Thin HTTP client with uniform error normalization
#[derive(Clone)]
pub struct Transport {
    client: Client,
    base_url: String,
    credentials: CredentialSlot,
}

impl Transport {
    /// Build a transport from client settings
    pub fn new(config: &ClientConfig, credentials: CredentialSlot) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &CredentialSlot {
        &self.credentials
    }

    /// Store a bearer token used by subsequent requests
    pub fn set_credential(&self, token: &str) {
        self.credentials.set(token);
    }

    /// Forget the bearer token
    pub fn clear_credential(&self) {
        self.credentials.clear();
    }

    /// Issue one request and decode the body as `T`
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url_for(path)?;
        debug!(method = %method, url = %url, "Sending request");

        let mut request = self.client.request(method.clone(), &url);
        if let Some(token) = self.credentials.token() {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            let err = ApiError::from(e);
            warn!(method = %method, url = %url, kind = ?err.kind, "Request failed: {}", err);
            err
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(ApiError::from)?;

        if !status.is_success() {
            let err = ApiError::from_http_response(status.as_u16(), &bytes);
            warn!(method = %method, url = %url, status = status.as_u16(), "Request rejected: {}", err.message);
            return Err(err);
        }

        // Empty success bodies decode as null so `()` and Option<T> callers work
        let payload: &[u8] = if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            b"null"
        } else {
            &bytes
        };

        serde_json::from_slice(payload).map_err(|e| ApiError::decode(status.as_u16(), e))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request::<T, ()>(Method::GET, path, None).await
    }

    pub async fn post<T, B>(&self, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::POST, path, body).await
    }

    pub async fn put<T, B>(&self, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::PUT, path, body).await
    }

    pub async fn patch<T, B>(&self, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::PATCH, path, body).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request::<T, ()>(Method::DELETE, path, None).await
    }

    fn url_for(&self, path: &str) -> Result<String, ApiError> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Err(ApiError::client(format!(
                "Expected a path relative to the base URL, got '{}'",
                path
            )));
        }

        let url = if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        };

        reqwest::Url::parse(&url)
            .map(|u| u.to_string())
            .map_err(|e| ApiError::client(format!("Invalid request URL '{}': {}", url, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn transport(base_url: &str) -> Transport {
        let config = ClientConfig {
            base_url: base_url.to_string(),
            timeout_seconds: 30,
        };
        Transport::new(&config, CredentialSlot::new(Arc::new(MemoryStore::new()))).unwrap()
    }

    #[test]
    fn test_url_joining() {
        let t = transport("http://localhost:8000/");
        assert_eq!(t.base_url(), "http://localhost:8000");
        assert_eq!(t.url_for("/api/health").unwrap(), "http://localhost:8000/api/health");
        assert_eq!(t.url_for("api/ready").unwrap(), "http://localhost:8000/api/ready");
    }

    #[test]
    fn test_absolute_path_rejected() {
        let t = transport("http://localhost:8000");
        let err = t.url_for("http://evil.example.com/x").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Client);
        assert!(!err.is_retryable());
    }
}
