use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cronlytic_core::cfg::AuthConfig;
use cronlytic_core::monitor::PerformanceMonitor;
use cronlytic_core::tools::{self, Tools};
use cronlytic_core::transport::{ApiRequest, RawResponse, Transport, TransportError};
use cronlytic_core::{format, resources, ApiClient};
use reqwest::Method;
use serde_json::{json, Value};

/// Answers by `(method, path)`; unrouted requests get a 404.
#[derive(Default)]
struct Routes {
    replies: HashMap<(Method, String), RawResponse>,
    ping_delay: Duration,
    sent: Mutex<Vec<ApiRequest>>,
}

impl Routes {
    fn on(mut self, method: Method, path: &str, status: u16, body: Value) -> Self {
        self.replies.insert((method, path.to_string()), RawResponse::json(status, &body));
        self
    }

    fn sent(&self) -> Vec<(Method, String)> {
        self.sent.lock().unwrap().iter().map(|r| (r.method.clone(), r.path.clone())).collect()
    }
}

#[async_trait]
impl Transport for Routes {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
        self.sent.lock().unwrap().push(request.clone());
        if request.path == "ping" && !self.ping_delay.is_zero() {
            tokio::time::sleep(self.ping_delay).await;
        }
        Ok(self
            .replies
            .get(&(request.method.clone(), request.path.clone()))
            .cloned()
            .unwrap_or_else(|| RawResponse::json(404, &json!({"detail": "Not found"}))))
    }
}

fn client(routes: Routes) -> ApiClient<Routes> {
    let cfg = AuthConfig::new("key", "user", "https://api.test/prog", 30, 0, 1.0).unwrap();
    ApiClient::with_transport(cfg, routes)
}

fn job(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "name": format!("job-{id}"),
        "url": "https://example.com/hook",
        "method": "GET",
        "cron_expression": "*/5 * * * *",
        "status": status,
        "next_run_at": "2025-01-01T00:05:00Z",
    })
}

#[tokio::test]
async fn create_job_validates_then_posts() {
    let created = json!({
        "id": "abc-123",
        "name": "nightly-report",
        "url": "https://example.com/run",
        "method": "POST",
        "cron_expression": "0 2 * * *",
        "status": "pending",
        "next_run_at": "2025-01-02T02:00:00Z",
    });
    let c = client(Routes::default().on(Method::POST, "jobs", 200, created));
    let out = tools::create_job(
        &c,
        &json!({
            "name": "nightly-report",
            "url": "https://example.com/run",
            "method": "post",
            "headers": {"Authorization": "Bearer t"},
            "body": "{\"x\":1}",
            "cron_expression": "0  2 * * *",
        }),
    )
    .await;

    assert_eq!(out["success"], true);
    assert_eq!(out["message"], "Job 'nightly-report' created successfully");
    assert_eq!(out["next_run"], "2025-01-02T02:00:00Z");

    let sent = c.transport().sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let body = sent[0].body.as_ref().unwrap();
    assert_eq!(body["method"], "POST");
    assert_eq!(body["cron_expression"], "0 2 * * *");
    assert_eq!(body["headers"]["Authorization"], "Bearer t");
}

#[tokio::test]
async fn invalid_name_never_reaches_the_network() {
    let c = client(Routes::default());
    let out = tools::create_job(
        &c,
        &json!({
            "name": "my job!",
            "url": "https://example.com",
            "method": "GET",
            "headers": {},
            "body": "",
            "cron_expression": "* * * * *",
        }),
    )
    .await;

    assert_eq!(out["success"], false);
    assert_eq!(out["error"], "Validation Error");
    assert_eq!(out["field"], "name");
    assert!(c.transport().sent().is_empty());
}

#[tokio::test]
async fn update_job_puts_full_config_with_defaults() {
    let mut updated = job("abc", "active");
    updated["name"] = json!("hourly-sync");
    updated["cron_expression"] = json!("0 * * * *");
    let c = client(Routes::default().on(Method::PUT, "jobs/abc", 200, updated));
    let out = tools::update_job(
        &c,
        &json!({
            "job_id": "abc",
            "name": "hourly-sync",
            "url": "https://example.com/sync",
            "cron_expression": "0 * * * *",
        }),
    )
    .await;

    assert_eq!(out["success"], true);
    assert_eq!(out["message"], "Job 'hourly-sync' updated successfully");
    assert_eq!(out["changes_applied"], true);
    assert_eq!(out["next_run"], "2025-01-01T00:05:00Z");
    assert_eq!(out["job"]["id"], "abc");

    assert_eq!(c.transport().sent(), [(Method::PUT, "jobs/abc".to_string())]);
    let sent = c.transport().sent.lock().unwrap();
    let body = sent[0].body.as_ref().unwrap();
    assert!(body.get("job_id").is_none());
    assert_eq!(body["method"], "GET");
    assert_eq!(body["headers"], json!({}));
    assert_eq!(body["body"], "");
    assert_eq!(body["url"], "https://example.com/sync");
}

#[tokio::test]
async fn pause_then_resume_hit_their_endpoints() {
    let c = client(
        Routes::default()
            .on(Method::POST, "jobs/abc/pause", 200, job("abc", "paused"))
            .on(Method::POST, "jobs/abc/resume", 200, job("abc", "active")),
    );

    let paused = tools::pause_job(&c, &json!({"job_id": "abc"})).await;
    assert_eq!(paused["success"], true);
    assert_eq!(paused["message"], "Job 'job-abc' has been paused");
    assert_eq!(paused["status"], "paused");
    assert!(paused.get("next_run").is_none());

    let resumed = tools::resume_job(&c, &json!({"job_id": "abc"})).await;
    assert_eq!(resumed["success"], true);
    assert_eq!(resumed["message"], "Job 'job-abc' has been resumed");
    assert_eq!(resumed["status"], "active");
    assert_eq!(resumed["next_run"], "2025-01-01T00:05:00Z");

    assert_eq!(
        c.transport().sent(),
        [
            (Method::POST, "jobs/abc/pause".to_string()),
            (Method::POST, "jobs/abc/resume".to_string()),
        ]
    );
    assert!(c.transport().sent.lock().unwrap().iter().all(|r| r.body.is_none()));
}

#[tokio::test]
async fn delete_without_confirm_sends_nothing() {
    let c = client(Routes::default().on(Method::DELETE, "jobs/abc", 200, json!({})));
    let out = tools::delete_job(&c, &json!({"job_id": "abc"})).await;

    assert_eq!(out["success"], false);
    assert_eq!(out["error"], "Confirmation Required");
    assert_eq!(out["job_id"], "abc");
    assert!(c.transport().sent().is_empty());
}

#[tokio::test]
async fn delete_with_confirm_looks_up_name_then_deletes() {
    let c = client(
        Routes::default()
            .on(Method::GET, "jobs/abc", 200, job("abc", "pending"))
            .on(Method::DELETE, "jobs/abc", 200, json!({"deleted_at": "2025-01-01T00:00:00Z"})),
    );
    let out = tools::delete_job(&c, &json!({"job_id": "abc", "confirm": true})).await;

    assert_eq!(out["success"], true);
    assert_eq!(out["message"], "Job 'job-abc' has been permanently deleted");
    assert_eq!(out["deletion_timestamp"], "2025-01-01T00:00:00Z");
    assert_eq!(
        c.transport().sent(),
        vec![(Method::GET, "jobs/abc".to_string()), (Method::DELETE, "jobs/abc".to_string())]
    );
}

#[tokio::test]
async fn missing_job_maps_to_not_found() {
    let c = client(Routes::default());
    let out = tools::get_job(&c, &json!({"job_id": "nope"})).await;
    assert_eq!(out["success"], false);
    assert_eq!(out["error"], "NotFoundError");
    assert_eq!(out["details"]["resource_id"], "nope");
    assert_eq!(c.transport().sent().len(), 1);
}

fn logs_fixture(n: usize) -> Value {
    let logs: Vec<Value> = (0..n)
        .map(|i| json!({"status": if i % 5 == 0 { "failed" } else { "success" }, "response_code": 200}))
        .collect();
    json!({"job": {"id": "abc", "name": "nightly", "status": "pending"}, "logs": logs})
}

#[tokio::test]
async fn log_limit_out_of_range_falls_back_to_default() {
    let c = client(Routes::default().on(Method::GET, "jobs/abc/logs", 200, logs_fixture(50)));
    let out = tools::get_job_logs(&c, &json!({"job_id": "abc", "limit": 150})).await;

    assert_eq!(out["summary"]["total_logs_returned"], 20);
    assert_eq!(out["summary"]["limited"], true);
    assert_eq!(out["summary"]["limit_applied"], 20);
    assert_eq!(out["logs"].as_array().unwrap().len(), 20);
}

#[tokio::test]
async fn log_limit_truncates_and_reports() {
    let c = client(Routes::default().on(Method::GET, "jobs/abc/logs", 200, logs_fixture(50)));
    let out = tools::get_job_logs(&c, &json!({"job_id": "abc", "limit": 10})).await;

    assert_eq!(out["success"], true);
    assert_eq!(out["summary"]["total_logs_returned"], 10);
    assert_eq!(out["summary"]["limited"], true);
    assert_eq!(out["summary"]["limit_applied"], 10);
    assert_eq!(out["summary"]["status_breakdown"], json!({"failed": 2, "success": 8}));
    assert_eq!(out["message"], "Retrieved 10 log entries for job 'nightly'");
}

#[tokio::test]
async fn list_jobs_filters_paused_and_limits() {
    let jobs = json!([job("a", "pending"), job("b", "paused"), job("c", "pending"), job("d", "pending")]);
    let c = client(Routes::default().on(Method::GET, "jobs", 200, jobs));

    let out = tools::list_jobs(&c, &json!({"include_paused": false, "limit": 2})).await;
    assert_eq!(out["summary"]["total_count"], 2);
    assert_eq!(out["summary"]["limited"], true);
    assert_eq!(out["summary"]["limit_applied"], 2);
    assert_eq!(out["message"], "Found 2 jobs");

    let out = tools::list_jobs(&c, &json!({})).await;
    assert_eq!(out["summary"]["total_count"], 4);
    assert_eq!(out["summary"]["status_breakdown"], json!({"paused": 1, "pending": 3}));
    assert_eq!(out["summary"]["limited"], false);
    assert!(out["summary"]["limit_applied"].is_null());
}

#[tokio::test(start_paused = true)]
async fn healthy_empty_account() {
    let routes = Routes { ping_delay: Duration::from_millis(50), ..Routes::default() }
        .on(Method::GET, "ping", 200, json!({"status": "ok"}))
        .on(Method::GET, "jobs", 200, json!([]));
    let c = client(routes);
    let out = tools::health_check(&c).await;

    assert_eq!(out["status"], "healthy");
    assert_eq!(out["connectivity"], true);
    assert_eq!(out["authentication"], true);
    assert_eq!(out["details"]["performance"], "excellent");
    assert_eq!(out["details"]["job_count"], 0);
    let ms = out["response_time_ms"].as_f64().unwrap();
    assert!((50.0..200.0).contains(&ms), "{ms}");
    assert_eq!(
        out["recommendations"][0],
        "No jobs found. You can create your first job using the create_job tool."
    );
}

#[tokio::test]
async fn bad_credentials_are_unhealthy() {
    let c = client(Routes::default().on(Method::GET, "ping", 401, json!({"detail": "Invalid API key"})));
    let out = tools::health_check(&c).await;

    assert_eq!(out["status"], "unhealthy");
    assert_eq!(out["authentication"], false);
    assert_eq!(out["details"]["error_type"], "AuthenticationError");
    assert_eq!(out["errors"][0], "Cronlytic API error: Invalid API key");
    assert_eq!(out["recommendations"][0], "Check that your API key and User ID are correct");
    assert_eq!(c.transport().sent().len(), 1);
}

#[tokio::test]
async fn dispatcher_records_calls_and_renders() {
    let monitor = Arc::new(PerformanceMonitor::new());
    let c = Arc::new(client(Routes::default().on(Method::GET, "jobs", 200, json!([job("a", "pending")]))));
    let tools = Tools::new(c, monitor.clone());

    let out = tools.call("list_jobs", &json!({})).await.unwrap();
    assert!(format::render("list_jobs", &out).contains("### 1. job-a 🟢"));
    assert!(tools.call("get_job", &json!({"job_id": 7})).await.unwrap()["error"] == "Validation Error");
    assert!(tools.call("no_such_tool", &json!({})).await.is_none());

    let report = tools.call("get_performance_report", &json!({"format": "summary"})).await.unwrap();
    assert_eq!(report["summary"]["total_operations"], 2);
    assert_eq!(report["summary"]["total_errors"], 1);
}

#[tokio::test]
async fn resources_project_job_state() {
    let c = client(
        Routes::default()
            .on(Method::GET, "jobs", 200, json!([job("abc", "pending")]))
            .on(Method::GET, "jobs/abc", 200, job("abc", "pending")),
    );
    let listed = resources::list_resources(&c).await;
    let uris: Vec<&str> = listed.iter().filter_map(|r| r["uri"].as_str()).collect();
    assert_eq!(
        uris,
        ["cronlytic://jobs", "cronlytic://job/abc", "cronlytic://job/abc/logs", "cronlytic://templates/cron"]
    );

    let read = resources::read_resource(&c, "cronlytic://job/abc").await.unwrap();
    let doc: Value = serde_json::from_str(read["text"].as_str().unwrap()).unwrap();
    assert_eq!(doc["computed"]["is_active"], true);
    assert_eq!(doc["computed"]["schedule_description"], "Every 5 minutes");

    assert!(resources::read_resource(&c, "http://elsewhere").await.is_err());
}
