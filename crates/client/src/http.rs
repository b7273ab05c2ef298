//! HTTP client wrapper
//!
//! A thin layer over `reqwest` that resolves paths against a base URL,
//! injects default and auth headers, enforces a per-request timeout and
//! logs every exchange. It never retries.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use plumbline_common::{ApiError, ApiResponse, HarnessConfig, HttpMethod};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::transport::Transport;

#[derive(Debug, Clone)]
struct Settings {
    timeout_ms: u64,
    auth_token: Option<String>,
    api_key: Option<String>,
}

/// HTTP client bound to one base URL. Settings are per instance and can
/// be changed at runtime through a shared reference.
#[derive(Debug)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    settings: RwLock<Settings>,
}

impl HttpClient {
    /// Create a client with its own connection pool.
    pub fn new(base_url: impl Into<String>, timeout_ms: u64) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, timeout_ms)
    }

    /// Create a client over an existing connection pool.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            settings: RwLock::new(Settings {
                timeout_ms,
                auth_token: None,
                api_key: None,
            }),
        }
    }

    /// Create a client from the harness configuration, carrying over the
    /// API key and initial auth token.
    pub fn from_config(client: reqwest::Client, config: &HarnessConfig) -> Self {
        let http = Self::with_client(client, &config.base_url, config.timeout_ms);
        {
            let mut settings = http.settings.write();
            settings.api_key = config.api_key.clone();
            settings.auth_token = config.auth_token.clone();
        }
        http
    }

    pub fn with_api_key(self, key: impl Into<String>) -> Self {
        self.settings.write().api_key = Some(key.into());
        self
    }

    pub fn set_timeout(&self, timeout_ms: u64) {
        self.settings.write().timeout_ms = timeout_ms;
    }

    /// Current request timeout in milliseconds
    pub fn timeout(&self) -> u64 {
        self.settings.read().timeout_ms
    }

    pub fn set_auth_token(&self, token: impl Into<String>) {
        self.settings.write().auth_token = Some(token.into());
    }

    pub fn remove_auth_token(&self) {
        self.settings.write().auth_token = None;
    }

    pub fn has_auth_token(&self) -> bool {
        self.settings.read().auth_token.is_some()
    }

    /// Resolve a path against the base URL.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn headers(&self, settings: &Settings) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Ok(agent) = HeaderValue::from_str(&plumbline_common::user_agent()) {
            headers.insert(USER_AGENT, agent);
        }
        if let Some(key) = &settings.api_key {
            if let Ok(value) = HeaderValue::from_str(key) {
                headers.insert("x-api-key", value);
            }
        }
        if let Some(token) = &settings.auth_token {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}")) {
                headers.insert(AUTHORIZATION, value);
            }
        }
        headers
    }

    /// Send one request and capture the response.
    pub async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
    ) -> Result<ApiResponse, ApiError> {
        let settings = self.settings.read().clone();
        let url = self.url_for(path);
        let headers = self.headers(&settings);

        info!("🔄 {} {}", method, url);
        debug!(
            method = %method,
            url = %url,
            headers = ?masked(&headers),
            body = ?body,
            "request"
        );

        let mut request = self
            .client
            .request(to_reqwest(method), &url)
            .headers(headers)
            .timeout(Duration::from_millis(settings.timeout_ms));
        if let Some(body) = body {
            request = request.json(body);
        }

        let result = match request.send().await {
            Ok(resp) => capture(resp, settings.timeout_ms).await,
            Err(e) => Err(classify(&e, settings.timeout_ms)),
        };

        match result {
            Ok(response) if response.is_success() => {
                info!("✅ {} {}", response.status, response.status_text);
                debug!(
                    status = response.status,
                    headers = ?response.headers,
                    body = %response.data,
                    "response"
                );
                Ok(response)
            }
            Ok(response) => {
                let err = ApiError::from_status(response.status, response.status_text, response.data);
                error!("❌ {} {}", response.status, err.message);
                Err(err)
            }
            Err(err) => {
                error!("❌ Network Error {}", err.message);
                Err(err)
            }
        }
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
    ) -> Result<ApiResponse, ApiError> {
        self.send(method, path, body).await
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}

async fn capture(resp: reqwest::Response, timeout_ms: u64) -> Result<ApiResponse, ApiError> {
    let status = resp.status();
    let status_text = status.canonical_reason().unwrap_or_default().to_string();
    let headers: BTreeMap<String, String> = resp
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_ascii_lowercase(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    let bytes = resp.bytes().await.map_err(|e| classify(&e, timeout_ms))?;

    Ok(ApiResponse {
        data: parse_body(&bytes),
        status: status.as_u16(),
        status_text,
        headers,
    })
}

/// Empty bodies become `null`; bodies that are not JSON are kept as a
/// JSON string.
pub fn parse_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

fn classify(e: &reqwest::Error, timeout_ms: u64) -> ApiError {
    if e.is_timeout() {
        ApiError::timeout(timeout_ms)
    } else {
        ApiError::transport(e.to_string())
    }
}

fn to_reqwest(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

fn masked(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            let shown = if name == AUTHORIZATION {
                "Bearer ***".to_string()
            } else {
                String::from_utf8_lossy(value.as_bytes()).into_owned()
            };
            (name.as_str().to_string(), shown)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url_joining() {
        let client = HttpClient::new("http://api.test/", 1000);
        assert_eq!(client.url_for("/posts/1"), "http://api.test/posts/1");
        assert_eq!(client.url_for("posts"), "http://api.test/posts");
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(b""), Value::Null);
        assert_eq!(parse_body(b"  \n"), Value::Null);
        assert_eq!(parse_body(br#"{"id":1}"#), json!({"id": 1}));
        assert_eq!(parse_body(b"<html>"), json!("<html>"));
    }

    #[test]
    fn test_auth_token_lifecycle() {
        let client = HttpClient::new("http://api.test", 1000);
        assert!(!client.has_auth_token());
        client.set_auth_token("secret");
        assert!(client.has_auth_token());
        let headers = client.headers(&client.settings.read());
        assert_eq!(headers[AUTHORIZATION], "Bearer secret");
        assert_eq!(masked(&headers)["authorization"], "Bearer ***");
        client.remove_auth_token();
        assert!(!client.has_auth_token());
    }

    #[test]
    fn test_timeout_is_mutable() {
        let client = HttpClient::new("http://api.test", 30_000);
        client.set_timeout(5000);
        assert_eq!(client.timeout(), 5000);
    }

    #[test]
    fn test_from_config_carries_credentials() {
        let config = HarnessConfig {
            api_key: Some("key".into()),
            auth_token: Some("tok".into()),
            ..Default::default()
        };
        let client = HttpClient::from_config(reqwest::Client::new(), &config);
        assert!(client.has_auth_token());
        let headers = client.headers(&client.settings.read());
        assert_eq!(headers["x-api-key"], "key");
        assert_eq!(headers[USER_AGENT], plumbline_common::user_agent().as_str());
    }
}
