//! Cronlytic REST client.
//!
//! One logical request runs up to `max_retries + 1` attempts. Transient
//! failures (timeouts, connection errors, unmapped API errors) back off for
//! `retry_delay * 2^attempt` seconds between attempts; every other error kind
//! is returned after the first attempt.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde_json::{json, Value};
use tokio::time::{sleep, Instant};
use tracing::{debug, error, warn};

use crate::cfg::AuthConfig;
use crate::error::{CronlyticError, Result};
use crate::job::JobSpec;
use crate::transport::{ApiRequest, HttpTransport, Transport, TransportError};

/// API client generic over its transport.
pub struct ApiClient<T = HttpTransport> {
    config: Arc<AuthConfig>,
    transport: T,
}

impl ApiClient<HttpTransport> {
    /// Client over the reqwest transport.
    pub fn new(config: AuthConfig) -> Self {
        let config = Arc::new(config);
        let transport = HttpTransport::new(Arc::clone(&config));
        Self { config, transport }
    }
}

impl<T: Transport> ApiClient<T> {
    /// Client over a caller-supplied transport.
    pub fn with_transport(config: AuthConfig, transport: T) -> Self {
        Self { config: Arc::new(config), transport }
    }

    /// Active configuration.
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Release pooled connections.
    pub async fn close(&self) {
        self.transport.close().await;
    }

    fn url_for(&self, endpoint: &str) -> String {
        format!("{}/{}", self.config.base_url(), endpoint.trim_start_matches('/'))
    }

    /// Execute one logical request with retries. 2xx bodies are returned as parsed.
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
        query: &[(&str, &str)],
    ) -> Result<Value> {
        let path = endpoint.trim_start_matches('/').to_string();
        let request = ApiRequest {
            method,
            url: self.url_for(&path),
            path,
            body,
            query: query.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        };

        let max_retries = self.config.max_retries();
        let mut attempt: u32 = 0;
        loop {
            debug!(method = %request.method, url = %request.url, attempt = attempt + 1, "api request");

            let err = match self.transport.send(&request).await {
                Ok(resp) if resp.is_success() => return Ok(resp.parsed_body()),
                Ok(resp) => CronlyticError::from_status(
                    resp.status,
                    &resp.parsed_body(),
                    &request.path,
                    resp.header("retry-after"),
                ),
                Err(TransportError::Timeout) => CronlyticError::Timeout {
                    message: format!("Request timeout after {}s", self.config.timeout_secs()),
                },
                Err(TransportError::Connect(e)) => CronlyticError::Connection {
                    message: format!("Connection failed: {e}"),
                },
                Err(TransportError::Other(e)) => CronlyticError::api(format!("Unexpected error: {e}")),
            };

            if !err.is_retryable() || attempt >= max_retries {
                error!(
                    method = %request.method,
                    url = %request.url,
                    attempts = attempt + 1,
                    kind = err.kind_name(),
                    "api request failed: {}",
                    err.message()
                );
                return Err(err);
            }

            let delay = backoff(self.config.retry_delay(), attempt);
            warn!(
                url = %request.url,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                kind = err.kind_name(),
                "retrying api request"
            );
            sleep(delay).await;
            attempt += 1;
        }
    }

    /// `GET /ping`
    pub async fn ping(&self) -> Result<Value> {
        self.request(Method::GET, "ping", None, &[]).await
    }

    /// `POST /jobs`
    pub async fn create_job(&self, job: &JobSpec) -> Result<Value> {
        self.request(Method::POST, "jobs", Some(job_body(job)?), &[]).await
    }

    /// `GET /jobs`. Non-array responses yield an empty list.
    pub async fn list_jobs(&self) -> Result<Vec<Value>> {
        match self.request(Method::GET, "jobs", None, &[]).await? {
            Value::Array(jobs) => Ok(jobs),
            _ => Ok(Vec::new()),
        }
    }

    /// `GET /jobs/{id}`
    pub async fn get_job(&self, job_id: &str) -> Result<Value> {
        self.request(Method::GET, &format!("jobs/{job_id}"), None, &[]).await
    }

    /// `PUT /jobs/{id}`
    pub async fn update_job(&self, job_id: &str, job: &JobSpec) -> Result<Value> {
        self.request(Method::PUT, &format!("jobs/{job_id}"), Some(job_body(job)?), &[]).await
    }

    /// `DELETE /jobs/{id}`
    pub async fn delete_job(&self, job_id: &str) -> Result<Value> {
        self.request(Method::DELETE, &format!("jobs/{job_id}"), None, &[]).await
    }

    /// `POST /jobs/{id}/pause`
    pub async fn pause_job(&self, job_id: &str) -> Result<Value> {
        self.request(Method::POST, &format!("jobs/{job_id}/pause"), None, &[]).await
    }

    /// `POST /jobs/{id}/resume`
    pub async fn resume_job(&self, job_id: &str) -> Result<Value> {
        self.request(Method::POST, &format!("jobs/{job_id}/resume"), None, &[]).await
    }

    /// `GET /jobs/{id}/logs`, typically `{job, logs}`.
    pub async fn get_job_logs(&self, job_id: &str) -> Result<Value> {
        self.request(Method::GET, &format!("jobs/{job_id}/logs"), None, &[]).await
    }

    /// Time a ping. Never fails; errors become the unhealthy shape.
    pub async fn health_check(&self) -> Value {
        let start = Instant::now();
        match self.ping().await {
            Ok(api_response) => {
                let ms = (start.elapsed().as_secs_f64() * 100_000.0).round() / 100.0;
                json!({
                    "status": "healthy",
                    "api_response": api_response,
                    "response_time_ms": ms,
                    "base_url": self.config.base_url(),
                    "connected": true,
                })
            }
            Err(e) => json!({
                "status": "unhealthy",
                "error": e.message(),
                "error_type": e.kind_name(),
                "base_url": self.config.base_url(),
                "connected": false,
            }),
        }
    }
}

fn job_body(job: &JobSpec) -> Result<Value> {
    serde_json::to_value(job).map_err(|e| CronlyticError::api(format!("Unexpected error: {e}")))
}

/// Delay before retry number `attempt + 1`.
pub fn backoff(retry_delay: f64, attempt: u32) -> Duration {
    let secs = retry_delay * 2f64.powi(attempt as i32);
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::RawResponse;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    type Reply = std::result::Result<RawResponse, TransportError>;

    /// Replays scripted replies; repeats the last one when the script runs out.
    struct Scripted {
        replies: Mutex<VecDeque<Reply>>,
        sent: Mutex<Vec<(ApiRequest, Instant)>>,
    }

    impl Scripted {
        fn new(replies: Vec<Reply>) -> Self {
            Self { replies: Mutex::new(replies.into()), sent: Mutex::new(Vec::new()) }
        }

        fn calls(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn send(&self, request: &ApiRequest) -> Reply {
            self.sent.lock().unwrap().push((request.clone(), Instant::now()));
            let mut q = self.replies.lock().unwrap();
            if q.len() > 1 {
                q.pop_front().unwrap()
            } else {
                q.front().cloned().unwrap()
            }
        }
    }

    fn client(max_retries: u32, replies: Vec<Reply>) -> ApiClient<Scripted> {
        let cfg = AuthConfig::new("key", "user", "https://api.test/prog/", 30, max_retries, 1.0).unwrap();
        ApiClient::with_transport(cfg, Scripted::new(replies))
    }

    fn ok(body: Value) -> Reply {
        Ok(RawResponse::json(200, &body))
    }

    #[tokio::test]
    async fn joins_base_url_and_endpoint() {
        let c = client(0, vec![ok(json!({"status": "ok"}))]);
        c.request(Method::GET, "/jobs/abc", None, &[("limit", "5")]).await.unwrap();
        let sent = c.transport().sent.lock().unwrap();
        assert_eq!(sent[0].0.url, "https://api.test/prog/jobs/abc");
        assert_eq!(sent[0].0.path, "jobs/abc");
        assert_eq!(sent[0].0.query, vec![("limit".to_string(), "5".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn timeouts_use_full_budget_with_exponential_backoff() {
        let c = client(3, vec![Err(TransportError::Timeout)]);
        let start = Instant::now();
        let err = c.ping().await.unwrap_err();

        assert_eq!(err.kind_name(), "TimeoutError");
        assert_eq!(err.message(), "Request timeout after 30s");
        assert_eq!(c.transport().calls(), 4);

        let sent = c.transport().sent.lock().unwrap();
        let gaps: Vec<u64> = sent.windows(2).map(|w| (w[1].1 - w[0].1).as_secs()).collect();
        assert_eq!(gaps, vec![1, 2, 4]);
        assert_eq!(start.elapsed().as_secs(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn connection_failure_recovers_on_retry() {
        let c = client(2, vec![Err(TransportError::Connect("refused".into())), ok(json!({"pong": true}))]);
        assert_eq!(c.ping().await.unwrap(), json!({"pong": true}));
        assert_eq!(c.transport().calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn connection_error_message() {
        let c = client(0, vec![Err(TransportError::Connect("refused".into()))]);
        let err = c.ping().await.unwrap_err();
        assert_eq!(err.message(), "Connection failed: refused");
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_statuses_make_one_attempt() {
        for status in [401u16, 403, 404, 422, 429] {
            let c = client(3, vec![Ok(RawResponse::json(status, &json!({"detail": "no"})))]);
            let err = c.get_job("job-1").await.unwrap_err();
            assert_eq!(c.transport().calls(), 1, "status {status}: {err:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_reads_retry_after_header() {
        let reply = Ok(RawResponse::json(429, &json!({})).with_header("Retry-After", "12"));
        let c = client(3, vec![reply]);
        let err = c.list_jobs().await.unwrap_err();
        assert_eq!(err.details(), json!({"retry_after": 12}));
    }

    #[tokio::test(start_paused = true)]
    async fn server_errors_retry_then_surface_intact() {
        let c = client(1, vec![Ok(RawResponse::json(503, &json!({"detail": "maintenance"})))]);
        let err = c.list_jobs().await.unwrap_err();
        assert_eq!(c.transport().calls(), 2);
        assert_eq!(err.message(), "maintenance");
        assert_eq!(err.details()["status_code"], 503);
    }

    #[tokio::test]
    async fn not_found_names_the_job() {
        let c = client(3, vec![Ok(RawResponse::json(404, &json!({})))]);
        let err = c.pause_job("job-42").await.unwrap_err();
        assert_eq!(err.details(), json!({"resource_type": "job", "resource_id": "job-42"}));
    }

    #[tokio::test]
    async fn list_jobs_tolerates_non_array() {
        let c = client(0, vec![ok(json!({"unexpected": true}))]);
        assert!(c.list_jobs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_sends_validated_body() {
        let spec = crate::validate::validate_complete_job_data(&json!({
            "name": "daily-sync", "url": "https://example.com/webhook", "method": "post",
            "headers": {}, "body": "", "cron_expression": "0 2 * * *",
        }))
        .unwrap();
        let c = client(0, vec![ok(json!({"id": "job-1"}))]);
        c.create_job(&spec).await.unwrap();
        let sent = c.transport().sent.lock().unwrap();
        assert_eq!(sent[0].0.method, Method::POST);
        assert_eq!(sent[0].0.body.as_ref().unwrap()["method"], "POST");
    }

    #[tokio::test(start_paused = true)]
    async fn health_check_never_fails() {
        let c = client(0, vec![Ok(RawResponse::json(401, &json!({"detail": "Invalid API key"})))]);
        let h = c.health_check().await;
        assert_eq!(h["status"], "unhealthy");
        assert_eq!(h["connected"], false);
        assert_eq!(h["error_type"], "AuthenticationError");
        assert_eq!(h["error"], "Invalid API key");

        let c = client(0, vec![ok(json!({"status": "ok"}))]);
        let h = c.health_check().await;
        assert_eq!(h["status"], "healthy");
        assert_eq!(h["base_url"], "https://api.test/prog");
    }

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff(0.5, 0), Duration::from_millis(500));
        assert_eq!(backoff(0.5, 3), Duration::from_secs(4));
    }
}
