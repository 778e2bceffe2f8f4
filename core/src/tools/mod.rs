//! MCP tool handlers.
//!
//! Every handler runs through [`envelope`], so callers always get a
//! `{success, ...}` object back and never an error or a panic.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::client::ApiClient;
use crate::error::CronlyticError;
use crate::monitor::PerformanceMonitor;
use crate::transport::{HttpTransport, Transport};

mod control;
mod defs;
mod health;
mod jobs;
mod perf;

pub use control::{get_job_logs, pause_job, resume_job};
pub use defs::{tool_definitions, TOOL_NAMES};
pub use health::health_check;
pub use jobs::{create_job, delete_job, get_job, list_jobs, update_job};
pub use perf::get_performance_report;

/// Run a handler body and fold any failure into the uniform envelope.
pub async fn envelope<F>(tool: &str, body: F) -> Value
where
    F: Future<Output = anyhow::Result<Value>>,
{
    match AssertUnwindSafe(body).catch_unwind().await {
        Ok(Ok(v)) => v,
        Ok(Err(e)) => failure(tool, &e),
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "handler panicked".to_string());
            error!(tool, %message, "tool panicked");
            json!({ "success": false, "error": "Unexpected Error", "message": message })
        }
    }
}

fn failure(tool: &str, err: &anyhow::Error) -> Value {
    match err.downcast_ref::<CronlyticError>() {
        Some(e @ CronlyticError::Validation { field, value, .. }) => {
            warn!(tool, %field, "validation failed: {e}");
            json!({
                "success": false,
                "error": "Validation Error",
                "message": e.to_string(),
                "field": field,
                "value": value,
            })
        }
        Some(e) => {
            error!(tool, kind = e.kind_name(), "api error: {}", e.message());
            json!({
                "success": false,
                "error": e.kind_name(),
                "message": e.message(),
                "details": e.details(),
            })
        }
        None => {
            error!(tool, "unexpected error: {err:#}");
            json!({ "success": false, "error": "Unexpected Error", "message": format!("{err:#}") })
        }
    }
}

/// Tool dispatcher bound to one client and one monitor.
pub struct Tools<T: Transport = HttpTransport> {
    client: Arc<ApiClient<T>>,
    monitor: Arc<PerformanceMonitor>,
}

impl<T: Transport> Tools<T> {
    /// Dispatcher over shared client and monitor.
    pub fn new(client: Arc<ApiClient<T>>, monitor: Arc<PerformanceMonitor>) -> Self {
        Self { client, monitor }
    }

    /// The shared client.
    pub fn client(&self) -> &ApiClient<T> {
        &self.client
    }

    /// Run tool `name`; `None` when no such tool exists.
    pub async fn call(&self, name: &str, args: &Value) -> Option<Value> {
        let client = self.client.as_ref();
        let start = Instant::now();
        let result = match name {
            "health_check" => health_check(client).await,
            "create_job" => create_job(client, args).await,
            "list_jobs" => list_jobs(client, args).await,
            "get_job" => get_job(client, args).await,
            "update_job" => update_job(client, args).await,
            "delete_job" => delete_job(client, args).await,
            "pause_job" => pause_job(client, args).await,
            "resume_job" => resume_job(client, args).await,
            "get_job_logs" => get_job_logs(client, args).await,
            "get_performance_report" => get_performance_report(&self.monitor, args),
            _ => return None,
        };
        let elapsed = start.elapsed();
        let success = result.get("success").and_then(Value::as_bool).unwrap_or(true);
        if name != "get_performance_report" {
            self.monitor.record(name, elapsed, success);
        }
        info!(tool = name, success, elapsed_ms = elapsed.as_millis() as u64, "tool finished");
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn validation_errors_carry_field_and_value() {
        let v = envelope("t", async { Err(anyhow::Error::from(CronlyticError::validation("name", "bad", "x y"))) }).await;
        assert_eq!(v["success"], false);
        assert_eq!(v["error"], "Validation Error");
        assert_eq!(v["field"], "name");
        assert_eq!(v["value"], "x y");
        assert_eq!(v["message"], "Validation error for field 'name': bad");
    }

    #[tokio::test]
    async fn taxonomy_errors_carry_kind_and_details() {
        let err = CronlyticError::RateLimit { message: "slow down".into(), retry_after: Some(5) };
        let v = envelope("t", async move { Err(anyhow::Error::from(err)) }).await;
        assert_eq!(v["error"], "RateLimitError");
        assert_eq!(v["details"], json!({"retry_after": 5}));
    }

    #[tokio::test]
    async fn other_errors_and_panics_are_unexpected() {
        let v = envelope("t", async { Err(anyhow::anyhow!("boom")) }).await;
        assert_eq!(v, json!({"success": false, "error": "Unexpected Error", "message": "boom"}));

        let v = envelope("t", async {
            if true {
                panic!("kaboom");
            }
            Ok(json!({}))
        })
        .await;
        assert_eq!(v["error"], "Unexpected Error");
        assert_eq!(v["message"], "kaboom");
    }
}
