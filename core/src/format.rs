//! Markdown renderers for tool envelopes, as shown to the assistant.

use std::fmt::Write as _;

use serde_json::Value;

const OK: &str = "✅";
const FAIL: &str = "❌";
const WARN: &str = "⚠️";

/// Render the envelope returned by `tool` as markdown.
pub fn render(tool: &str, result: &Value) -> String {
    match tool {
        "health_check" => health(result),
        "create_job" => job_result(result, "Job Creation"),
        "get_job" => job_result(result, "Job Details"),
        "update_job" => job_result(result, "Job Update"),
        "pause_job" => job_result(result, "Job Pause"),
        "resume_job" => job_result(result, "Job Resume"),
        "list_jobs" => job_list(result),
        "delete_job" => deletion(result),
        "get_job_logs" => logs(result),
        "get_performance_report" => performance(result),
        _ => pretty(result),
    }
}

fn pretty(v: &Value) -> String {
    serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
}

fn text<'a>(v: &'a Value, key: &str, fallback: &'a str) -> &'a str {
    v.get(key).and_then(Value::as_str).unwrap_or(fallback)
}

/// Scalar for display; strings unquoted, missing as `N/A`.
fn show(v: Option<&Value>) -> String {
    match v {
        None | Some(Value::Null) => "N/A".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn check(flag: Option<&Value>) -> &'static str {
    if flag.and_then(Value::as_bool).unwrap_or(false) {
        OK
    } else {
        FAIL
    }
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn is_success(result: &Value) -> bool {
    result.get("success").and_then(Value::as_bool).unwrap_or(false)
}

fn job_status_icon(status: &str) -> &'static str {
    match status {
        "pending" => "🟢",
        "paused" => "⏸️",
        _ => "🔵",
    }
}

fn run_status_icon(status: &str) -> &'static str {
    match status {
        "success" => OK,
        "failed" => FAIL,
        "running" => "🔄",
        _ => "🔵",
    }
}

/// Error message, validation field/value and details block for a failed envelope.
fn failure(out: &mut String, result: &Value, fallback: &str) {
    let _ = writeln!(out, "{FAIL} **Error:** {}\n", text(result, "message", fallback));
    if let (Some(field), Some(value)) = (result.get("field").and_then(Value::as_str), result.get("value")) {
        if !value.is_null() {
            let _ = writeln!(out, "## Validation Error\n- **Field:** {field}\n- **Value:** {}\n", show(Some(value)));
        }
    }
    if let Some(details) = result.get("details").filter(|d| d.as_object().is_some_and(|m| !m.is_empty())) {
        let _ = writeln!(out, "## Error Details\n```json\n{}\n```\n", pretty(details));
    }
}

fn breakdown(out: &mut String, heading: &str, counts: Option<&Value>, icon: fn(&str) -> &'static str) {
    let Some(counts) = counts.and_then(Value::as_object).filter(|m| !m.is_empty()) else {
        return;
    };
    let _ = writeln!(out, "## {heading}");
    for (status, n) in counts {
        let _ = writeln!(out, "- {} **{}:** {n}", icon(status), title_case(status));
    }
    out.push('\n');
}

fn health(result: &Value) -> String {
    let mut out = String::from("# Cronlytic API Health Check\n\n");
    let _ = writeln!(out, "**Status:** {}", text(result, "summary", "Unknown"));
    let _ = writeln!(out, "**Timestamp:** {}", text(result, "timestamp", "Unknown"));
    let _ = writeln!(out, "**Response Time:** {} ms\n", show(result.get("response_time_ms")));
    let _ = writeln!(out, "## Connection Details");
    let _ = writeln!(out, "- **Base URL:** {}", text(result, "base_url", "Unknown"));
    let _ = writeln!(out, "- **Connectivity:** {}", check(result.get("connectivity")));
    let _ = writeln!(out, "- **Authentication:** {}\n", check(result.get("authentication")));

    let details = &result["details"];
    if let Some(count) = details.get("job_count") {
        let _ = writeln!(out, "## Job Information\n- **Job Count:** {count}");
        let _ = writeln!(out, "- **Can List Jobs:** {}\n", check(details.get("can_list_jobs")));
    }
    if let Some(rating) = details.get("performance").and_then(Value::as_str) {
        let _ = writeln!(out, "## Performance\n- **Performance Rating:** {}\n", title_case(rating));
    }
    if let Some(errors) = result["errors"].as_array().filter(|a| !a.is_empty()) {
        out.push_str("## Errors\n\n");
        for e in errors {
            let _ = writeln!(out, "- {FAIL} {}", show(Some(e)));
        }
        out.push('\n');
    }
    if let Some(recs) = result["recommendations"].as_array().filter(|a| !a.is_empty()) {
        out.push_str("## Recommendations\n\n");
        for r in recs {
            let _ = writeln!(out, "- 💡 {}", show(Some(r)));
        }
        out.push('\n');
    }
    out
}

fn job_result(result: &Value, operation: &str) -> String {
    let mut out = format!("# {operation} Result\n\n");
    if !is_success(result) {
        failure(&mut out, result, "Operation failed");
        return out;
    }
    let _ = writeln!(out, "{OK} **Success:** {}\n", text(result, "message", "Operation completed"));
    let Some(job) = result.get("job").filter(|j| j.is_object()) else {
        return out;
    };

    let _ = writeln!(out, "## Job Details");
    for (label, key) in [("ID", "id"), ("Name", "name"), ("URL", "url"), ("Method", "method")] {
        let _ = writeln!(out, "- **{label}:** {}", show(job.get(key)));
    }
    let _ = writeln!(out, "- **Cron Expression:** `{}`", show(job.get("cron_expression")));
    let _ = writeln!(out, "- **Status:** {}\n", show(job.get("status")));

    let next_run = job
        .get("next_run_at")
        .filter(|v| !v.is_null())
        .or_else(|| result.get("next_run").filter(|v| !v.is_null()));
    if next_run.is_some() {
        let _ = writeln!(out, "## Schedule\n- **Next Run:** {}\n", show(next_run));
    }
    if let Some(headers) = job.get("headers").and_then(Value::as_object).filter(|h| !h.is_empty()) {
        out.push_str("## Headers\n");
        for (k, v) in headers {
            let _ = writeln!(out, "- **{k}:** {}", show(Some(v)));
        }
        out.push('\n');
    }
    if let Some(body) = job.get("body").and_then(Value::as_str).filter(|b| !b.is_empty()) {
        let _ = writeln!(out, "## Request Body\n```\n{body}\n```\n");
    }
    out
}

fn job_list(result: &Value) -> String {
    let mut out = String::from("# Job List\n\n");
    if !is_success(result) {
        failure(&mut out, result, "Failed to list jobs");
        return out;
    }
    let summary = &result["summary"];
    let total = summary["total_count"].as_u64().unwrap_or(0);
    let _ = writeln!(out, "{OK} **Found {total} job{}**\n", if total == 1 { "" } else { "s" });
    breakdown(&mut out, "Status Summary", summary.get("status_breakdown"), job_status_icon);
    if summary["limited"].as_bool().unwrap_or(false) {
        let _ = writeln!(out, "{WARN} *Results limited to {} jobs*\n", show(summary.get("limit_applied")));
    }

    let jobs = result["jobs"].as_array().map(Vec::as_slice).unwrap_or_default();
    if jobs.is_empty() {
        out.push_str("## No Jobs Found\n\nYou haven't created any cron jobs yet. Use the `create_job` tool to get started!\n");
        return out;
    }
    out.push_str("## Jobs\n\n");
    for (i, job) in jobs.iter().enumerate() {
        let status = text(job, "status", "unknown");
        let _ = writeln!(out, "### {}. {} {}", i + 1, text(job, "name", "Unnamed Job"), job_status_icon(status));
        let _ = writeln!(out, "- **ID:** {}", show(job.get("id")));
        let _ = writeln!(out, "- **URL:** {}", show(job.get("url")));
        let _ = writeln!(out, "- **Method:** {}", show(job.get("method")));
        let _ = writeln!(out, "- **Cron:** `{}`", show(job.get("cron_expression")));
        let _ = writeln!(out, "- **Status:** {status}");
        if let Some(next) = job.get("next_run_at").filter(|v| !v.is_null()) {
            let _ = writeln!(out, "- **Next Run:** {}", show(Some(next)));
        }
        out.push('\n');
    }
    out
}

fn deletion(result: &Value) -> String {
    let mut out = String::from("# Job Deletion Result\n\n");
    if is_success(result) {
        let _ = writeln!(out, "{OK} **Success:** {}\n", text(result, "message", "Job deleted successfully"));
        if let Some(id) = result.get("job_id").and_then(Value::as_str) {
            let deleted = if result["deleted"].as_bool().unwrap_or(false) { "Yes" } else { "No" };
            let _ = writeln!(out, "## Deletion Details\n- **Job ID:** {id}\n- **Deleted:** {deleted}");
            if let Some(ts) = result.get("deletion_timestamp").filter(|v| !v.is_null()) {
                let _ = writeln!(out, "- **Deletion Time:** {}", show(Some(ts)));
            }
            out.push('\n');
        }
        let _ = writeln!(
            out,
            "{WARN} **Important:** This action cannot be undone. The job and all its execution history have been permanently removed."
        );
        return out;
    }

    failure(&mut out, result, "Failed to delete job");
    if result["error"] == "Confirmation Required" {
        let _ = writeln!(
            out,
            "## {WARN} Confirmation Required\n\n{}\n\n**To proceed with deletion:**\n- Set the `confirm` parameter to `true`\n- **Warning:** This action cannot be undone!",
            text(result, "warning", "This action requires confirmation.")
        );
    }
    out
}

fn logs(result: &Value) -> String {
    let mut out = String::from("# Job Execution Logs\n\n");
    if !is_success(result) {
        failure(&mut out, result, "Failed to retrieve logs");
        return out;
    }
    let summary = &result["summary"];
    let _ = writeln!(out, "{OK} **{}**\n", text(result, "message", "Logs retrieved successfully"));
    breakdown(&mut out, "Execution Summary", summary.get("status_breakdown"), run_status_icon);
    if summary["limited"].as_bool().unwrap_or(false) {
        let _ = writeln!(out, "{WARN} *Results limited to {} log entries*\n", show(summary.get("limit_applied")));
    }
    if let Some(job) = result.get("job").filter(|j| j.as_object().is_some_and(|m| !m.is_empty())) {
        let _ = writeln!(
            out,
            "## Job Information\n- **Name:** {}\n- **ID:** {}\n- **Status:** {}\n",
            show(job.get("name")),
            show(job.get("id")),
            show(job.get("status"))
        );
    }

    let entries = result["logs"].as_array().map(Vec::as_slice).unwrap_or_default();
    if entries.is_empty() {
        out.push_str("## No Execution Logs Found\n\nThis job hasn't been executed yet, or all log entries have expired.\n");
        return out;
    }
    out.push_str("## Recent Executions\n\n");
    for (i, log) in entries.iter().enumerate() {
        let status = text(log, "status", "unknown");
        let _ = writeln!(out, "### {}. Execution {}\n- **Status:** {status}", i + 1, run_status_icon(status));
        if let Some(ts) = log.get("executed_at").or_else(|| log.get("timestamp")).filter(|v| !v.is_null()) {
            let _ = writeln!(out, "- **Executed At:** {}", show(Some(ts)));
        }
        if let Some(d) = log.get("duration_ms").filter(|v| !v.is_null()) {
            let _ = writeln!(out, "- **Duration:** {d}ms");
        }
        if let Some(code) = log.get("response_code").filter(|v| !v.is_null()) {
            let _ = writeln!(out, "- **Response Code:** {code}");
        }
        if let Some(size) = log.get("response_size").filter(|v| !v.is_null()) {
            let _ = writeln!(out, "- **Response Size:** {size} bytes");
        }
        let err = log.get("error").or_else(|| log.get("error_message")).and_then(Value::as_str);
        if let Some(err) = err.filter(|e| !e.is_empty()) {
            let _ = writeln!(out, "- **Error:** {err}");
        }
        if let Some(body) = log.get("response_body").and_then(Value::as_str).filter(|b| !b.is_empty()) {
            let _ = writeln!(out, "- **Response Preview:**\n  ```\n  {}\n  ```", preview(body, 200));
        }
        out.push('\n');
    }
    out
}

/// First `max` characters, with an ellipsis when cut.
fn preview(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &s[..cut]),
        None => s.to_string(),
    }
}

fn performance(result: &Value) -> String {
    let mut out = String::from("# Performance Report\n\n");
    if !is_success(result) {
        failure(&mut out, result, "Failed to build performance report");
        return out;
    }
    match text(result, "format", "detailed") {
        "json" => {
            let _ = writeln!(out, "```json\n{}\n```", pretty(&result["report"]));
        }
        "summary" => {
            let s = &result["summary"];
            let _ = writeln!(out, "**Generated:** {}\n", show(result.get("timestamp")));
            let _ = writeln!(out, "- **Total Operations:** {}", show(s.get("total_operations")));
            let _ = writeln!(out, "- **Total Errors:** {}", show(s.get("total_errors")));
            let _ = writeln!(out, "- **Success Rate:** {}", show(s.get("success_rate")));
            let _ = writeln!(out, "- **Monitored Operations:** {}", show(s.get("monitored_operations")));
        }
        _ => {
            let s = &result["performance_summary"];
            let _ = writeln!(out, "**Generated:** {}\n", show(result.get("timestamp")));
            let _ = writeln!(out, "## Overview");
            let _ = writeln!(out, "- **Total Operations:** {}", show(s.get("total_operations")));
            let _ = writeln!(out, "- **Total Errors:** {}", show(s.get("total_errors")));
            let _ = writeln!(out, "- **Success Rate:** {}\n", show(s.get("overall_success_rate")));
            for (heading, key) in [("Slowest Operations", "slowest_operations"), ("Most Used Operations", "most_used_operations")] {
                if let Some(items) = s[key].as_array().filter(|a| !a.is_empty()) {
                    let _ = writeln!(out, "## {heading}");
                    for item in items {
                        let _ = writeln!(out, "- {}", show(Some(item)));
                    }
                    out.push('\n');
                }
            }
            if let Some(ops) = result.get("detailed_metrics").and_then(Value::as_object) {
                out.push_str("## Operation Details\n\n| Operation | Calls | Errors | Avg (s) | Max (s) |\n|---|---|---|---|---|\n");
                for (name, m) in ops {
                    let _ = writeln!(
                        out,
                        "| {name} | {} | {} | {:.3} | {:.3} |",
                        show(m.get("total_calls")),
                        show(m.get("error_count")),
                        m["average_time"].as_f64().unwrap_or(0.0),
                        m["max_time"].as_f64().unwrap_or(0.0)
                    );
                }
            }
        }
    }
    out
}
