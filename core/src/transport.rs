//! The seam between `ApiClient` and the network.
//!
//! `HttpTransport` is the production implementation over a pooled
//! `reqwest::Client`. Tests substitute their own `Transport`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};
use tracing::debug;

use crate::cfg::AuthConfig;

/// Cap on connections to one host, in flight or idle. Every request goes
/// to the configured base URL, so this also bounds requests in flight.
pub const MAX_CONNECTIONS_PER_HOST: usize = 5;

/// One HTTP request against the API.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Endpoint relative to the base URL, without a leading slash.
    pub path: String,
    /// Absolute URL.
    pub url: String,
    /// JSON body, if any.
    pub body: Option<Value>,
    /// Query parameters.
    pub query: Vec<(String, String)>,
}

/// Status, headers and raw body of a response.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers as received.
    pub headers: Vec<(String, String)>,
    /// Body text.
    pub body: String,
}

impl RawResponse {
    /// Response with a JSON body.
    pub fn json(status: u16, body: &Value) -> Self {
        Self { status, headers: Vec::new(), body: body.to_string() }
    }

    /// Add a header.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as JSON; non-JSON text becomes `{"message": text}`, empty becomes `{}`.
    pub fn parsed_body(&self) -> Value {
        if let Ok(v) = serde_json::from_str::<Value>(&self.body) {
            return v;
        }
        if self.body.trim().is_empty() {
            json!({})
        } else {
            json!({ "message": self.body })
        }
    }
}

/// Failure below the HTTP layer.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// No response within the configured timeout.
    #[error("request timed out")]
    Timeout,
    /// Could not connect or send.
    #[error("{0}")]
    Connect(String),
    /// Anything else.
    #[error("{0}")]
    Other(String),
}

/// Sends one request and returns the raw response.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform a single attempt. Retries are the caller's business.
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError>;

    /// Release pooled connections. The transport may be reused afterwards.
    async fn close(&self) {}
}

/// reqwest-backed transport with a lazily built connection pool.
pub struct HttpTransport {
    config: Arc<AuthConfig>,
    client: Mutex<Option<reqwest::Client>>,
    permits: Arc<Semaphore>,
}

impl HttpTransport {
    /// Transport for `config`. No connection is made until the first request.
    pub fn new(config: Arc<AuthConfig>) -> Self {
        Self { config, client: Mutex::new(None), permits: Arc::new(Semaphore::new(MAX_CONNECTIONS_PER_HOST)) }
    }

    async fn client(&self) -> Result<reqwest::Client, TransportError> {
        let mut slot = self.client.lock().await;
        if let Some(c) = slot.as_ref() {
            return Ok(c.clone());
        }

        let mut headers = HeaderMap::new();
        for (name, value) in self.config.headers() {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::Other(format!("invalid header name {name}: {e}")))?;
            let value = HeaderValue::from_str(&value)
                .map_err(|e| TransportError::Other(format!("invalid header {name}: {e}")))?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(self.config.timeout_secs()))
            .pool_max_idle_per_host(MAX_CONNECTIONS_PER_HOST)
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;
        debug!(base_url = self.config.base_url(), "http pool opened");
        *slot = Some(client.clone());
        Ok(client)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| TransportError::Other("transport closed".to_string()))?;
        let client = self.client().await?;

        let mut builder = client.request(request.method.clone(), &request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let body = response.text().await.map_err(classify)?;
        Ok(RawResponse { status, headers, body })
    }

    async fn close(&self) {
        if self.client.lock().await.take().is_some() {
            debug!("http pool closed");
        }
    }
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() || e.is_request() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Other(e.to_string())
    }
}
