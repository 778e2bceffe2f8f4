//! Read-only `cronlytic://` resources.
//!
//! * `cronlytic://jobs` all jobs with a status summary
//! * `cronlytic://job/{id}` one job plus computed fields
//! * `cronlytic://job/{id}/logs` execution history with success rate
//! * `cronlytic://templates/cron` static catalog of schedules

use anyhow::{anyhow, bail};
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::client::ApiClient;
use crate::cron::{describe, next_n_execution_times};
use crate::job::{status_breakdown, status_of};
use crate::transport::Transport;

const SCHEME: &str = "cronlytic://";
/// Job list resource.
pub const JOBS_URI: &str = "cronlytic://jobs";
/// Cron template catalog resource.
pub const TEMPLATES_URI: &str = "cronlytic://templates/cron";
const MIME_JSON: &str = "application/json";

fn entry(uri: String, name: String, description: String) -> Value {
    json!({ "uri": uri, "name": name, "description": description, "mimeType": MIME_JSON })
}

fn job_id_of(job: &Value) -> Option<&str> {
    job.get("job_id")
        .and_then(Value::as_str)
        .or_else(|| job.get("id").and_then(Value::as_str))
        .filter(|id| !id.is_empty())
}

/// Resource entries for `resources/list`.
///
/// Falls back to the static entries when jobs cannot be listed.
pub async fn list_resources<T: Transport>(client: &ApiClient<T>) -> Vec<Value> {
    let templates = entry(
        TEMPLATES_URI.to_string(),
        "Cron Templates".to_string(),
        "Common cron expression patterns with descriptions and use cases".to_string(),
    );
    let jobs = match client.list_jobs().await {
        Ok(jobs) => jobs,
        Err(e) => {
            warn!("listing jobs for resources failed: {}", e.message());
            return vec![
                entry(JOBS_URI.to_string(), "All Jobs".to_string(), "Live list of all user jobs".to_string()),
                templates,
            ];
        }
    };

    let mut out = vec![entry(
        JOBS_URI.to_string(),
        "All Jobs".to_string(),
        "Live list of all user jobs with current status and configuration".to_string(),
    )];
    for job in &jobs {
        let Some(id) = job_id_of(job) else { continue };
        let name = job.get("name").and_then(Value::as_str).unwrap_or(id);
        out.push(entry(format!("{SCHEME}job/{id}"), format!("Job: {name}"), format!("Details for job '{name}'")));
        out.push(entry(
            format!("{SCHEME}job/{id}/logs"),
            format!("Logs: {name}"),
            format!("Execution logs for job '{name}'"),
        ));
    }
    out.push(templates);
    out
}

/// `{uri, mimeType, text}` for `uri`, text being pretty JSON.
pub async fn read_resource<T: Transport>(client: &ApiClient<T>, uri: &str) -> anyhow::Result<Value> {
    let Some(path) = uri.strip_prefix(SCHEME) else {
        let scheme = uri.split_once("://").map_or("", |(s, _)| s);
        bail!("Unsupported URI scheme: {scheme}");
    };
    let parts: Vec<&str> = path.trim_end_matches('/').split('/').collect();
    let body = match parts.as_slice() {
        ["jobs"] => jobs_resource(client).await?,
        ["templates", "cron"] => cron_templates(),
        ["job", id] if !id.trim().is_empty() => job_resource(client, id).await?,
        ["job", id, "logs"] if !id.trim().is_empty() => logs_resource(client, id).await?,
        ["job", ..] => bail!("Invalid job resource path: {path}"),
        _ => bail!("Unknown resource path: {path}"),
    };
    let text = serde_json::to_string_pretty(&body).map_err(|e| anyhow!("encode {uri}: {e}"))?;
    Ok(json!({ "uri": uri, "mimeType": MIME_JSON, "text": text }))
}

async fn jobs_resource<T: Transport>(client: &ApiClient<T>) -> crate::Result<Value> {
    let jobs = client.list_jobs().await?;
    let active = jobs.iter().filter(|j| status_of(j) == "pending").count();
    let paused = jobs.iter().filter(|j| status_of(j) == "paused").count();
    Ok(json!({
        "summary": {
            "total_jobs": jobs.len(),
            "active_jobs": active,
            "paused_jobs": paused,
            "status_breakdown": status_breakdown(&jobs),
        },
        "jobs": jobs,
        "last_updated": "real-time",
        "resource_info": {
            "description": "Live list of all user cron jobs",
            "refresh_rate": "real-time",
            "includes": ["job_details", "status", "next_run_time"],
        },
    }))
}

async fn job_resource<T: Transport>(client: &ApiClient<T>, job_id: &str) -> crate::Result<Value> {
    let job = client.get_job(job_id).await?;
    let name = job.get("name").and_then(Value::as_str).unwrap_or(job_id).to_string();
    let status = status_of(&job).to_string();
    let cron = job.get("cron_expression").and_then(Value::as_str).unwrap_or_default().to_string();
    let method = job.get("method").and_then(Value::as_str).unwrap_or("GET");
    let url = job.get("url").and_then(Value::as_str).unwrap_or_default();

    let computed = json!({
        "is_active": status == "pending",
        "is_paused": status == "paused",
        "has_next_run": job.get("next_run_at").is_some_and(|v| !v.is_null()),
        "execution_method": format!("{method} {url}"),
        "schedule_description": describe(&cron),
        "upcoming_runs": next_n_execution_times(&cron, 3),
    });

    let mut enhanced = match job {
        Value::Object(m) => m,
        other => {
            let mut m = Map::new();
            m.insert("job".into(), other);
            m
        }
    };
    enhanced.insert(
        "resource_info".into(),
        json!({
            "uri": format!("{SCHEME}job/{job_id}"),
            "type": "job_details",
            "last_updated": "real-time",
            "description": format!("Complete configuration and status for job '{name}'"),
        }),
    );
    enhanced.insert("computed".into(), computed);
    Ok(Value::Object(enhanced))
}

async fn logs_resource<T: Transport>(client: &ApiClient<T>, job_id: &str) -> crate::Result<Value> {
    let data = client.get_job_logs(job_id).await?;
    let logs: Vec<Value> = data.get("logs").and_then(Value::as_array).cloned().unwrap_or_default();
    let job = data.get("job").cloned().unwrap_or_else(|| json!({}));
    let breakdown = status_breakdown(&logs);

    let count = |status: &str| breakdown.get(status).and_then(Value::as_u64).unwrap_or(0);
    let success_rate = if logs.is_empty() {
        0.0
    } else {
        (count("success") as f64 / logs.len() as f64 * 1000.0).round() / 10.0
    };
    let name = job.get("name").and_then(Value::as_str);

    Ok(json!({
        "job_info": {
            "id": job_id,
            "name": name.unwrap_or("Unknown"),
            "status": job.get("status").and_then(Value::as_str).unwrap_or("unknown"),
        },
        "summary": {
            "total_executions": logs.len(),
            "status_breakdown": breakdown,
            "success_rate_percent": success_rate,
            "has_recent_failures": count("failed") > 0,
        },
        "resource_info": {
            "uri": format!("{SCHEME}job/{job_id}/logs"),
            "type": "execution_logs",
            "last_updated": "real-time",
            "description": format!("Execution history for job '{}'", name.unwrap_or(job_id)),
            "log_count": logs.len(),
        },
        "logs": logs,
    }))
}

type Template = (&'static str, &'static str, &'static str, &'static [&'static str]);

const CATEGORIES: &[(&str, &[Template])] = &[
    ("common_patterns", &[
        ("every_minute", "* * * * *", "Run every minute", &["Testing", "Frequent monitoring"]),
        ("every_5_minutes", "*/5 * * * *", "Run every 5 minutes", &["API health checks", "Quick data synchronization"]),
        ("every_15_minutes", "*/15 * * * *", "Run every 15 minutes", &["Regular monitoring", "Data updates"]),
        ("every_30_minutes", "*/30 * * * *", "Run every 30 minutes", &["System checks"]),
        ("hourly", "0 * * * *", "Run every hour at minute 0", &["Hourly reports", "Cache clearing"]),
        ("every_6_hours", "0 */6 * * *", "Run every 6 hours", &["System maintenance"]),
        ("daily_midnight", "0 0 * * *", "Run daily at midnight", &["Daily reports", "Database cleanup"]),
        ("daily_morning", "0 9 * * *", "Run daily at 9 AM", &["Morning reports", "Business hour tasks"]),
    ]),
    ("weekly_patterns", &[
        ("weekly_monday", "0 9 * * 1", "Run every Monday at 9 AM", &["Weekly reports"]),
        ("weekly_friday", "0 17 * * 5", "Run every Friday at 5 PM", &["End-of-week reports", "Weekly cleanup"]),
        ("weekdays_only", "0 9 * * 1-5", "Run weekdays at 9 AM (Monday-Friday)", &["Business day tasks"]),
        ("weekends_only", "0 10 * * 6,0", "Run weekends at 10 AM (Saturday and Sunday)", &["Weekend maintenance"]),
    ]),
    ("monthly_patterns", &[
        ("monthly_first", "0 9 1 * *", "Run on the 1st day of every month at 9 AM", &["Monthly reports", "Billing cycles"]),
        ("monthly_mid", "0 9 15 * *", "Run on the 15th of every month at 9 AM", &["Mid-month reports"]),
    ]),
    ("special_patterns", &[
        ("twice_daily", "0 9,21 * * *", "Run twice daily at 9 AM and 9 PM", &["Morning and evening tasks"]),
        ("business_hours", "0 9-17 * * 1-5", "Run every hour during business hours (9 AM-5 PM, weekdays)", &["Active monitoring"]),
        ("quarterly", "0 9 1 1,4,7,10 *", "Run quarterly on the 1st at 9 AM (Jan, Apr, Jul, Oct)", &["Quarterly reports"]),
        ("yearly", "0 9 1 1 *", "Run yearly on January 1st at 9 AM", &["Annual reports", "License renewals"]),
    ]),
    ("api_monitoring", &[
        ("high_frequency", "*/2 * * * *", "Monitor API every 2 minutes", &["Critical API monitoring"]),
        ("standard_monitoring", "*/5 * * * *", "Monitor API every 5 minutes", &["Service monitoring"]),
        ("light_monitoring", "*/15 * * * *", "Monitor API every 15 minutes", &["Non-critical services"]),
    ]),
    ("backup_schedules", &[
        ("daily_backup", "0 2 * * *", "Daily backup at 2 AM", &["Database backups"]),
        ("weekly_backup", "0 3 * * 0", "Weekly backup every Sunday at 3 AM", &["Full system backups"]),
        ("incremental_backup", "0 1 * * *", "Incremental backup daily at 1 AM", &["Change-only backups"]),
    ]),
];

/// Static template catalog.
pub fn cron_templates() -> Value {
    let mut templates = Map::new();
    let mut total = 0;
    for (category, items) in CATEGORIES {
        let mut group = Map::new();
        for (key, expression, description, use_cases) in *items {
            group.insert(
                key.to_string(),
                json!({ "expression": expression, "description": description, "use_cases": use_cases }),
            );
            total += 1;
        }
        templates.insert(category.to_string(), Value::Object(group));
    }

    json!({
        "meta": {
            "description": "Collection of cron expression templates and patterns",
            "total_templates": total,
            "categories": CATEGORIES.iter().map(|(c, _)| *c).collect::<Vec<_>>(),
            "format": "5-field cron expressions (minute hour day month day-of-week)",
            "usage": "Copy the 'expression' field to use in job creation",
        },
        "syntax_guide": {
            "fields": [
                "minute (0-59)",
                "hour (0-23)",
                "day of month (1-31)",
                "month (1-12)",
                "day of week (0-6, Sunday=0)",
            ],
            "special_characters": {
                "*": "Any value (wildcard)",
                "*/n": "Every n units (e.g., */5 = every 5)",
                "n-m": "Range from n to m (e.g., 1-5)",
                "n,m": "List of values (e.g., 1,3,5)",
                "n/m": "Every m starting at n",
            },
        },
        "templates": templates,
        "validation_tips": [
            "Remember: Sunday = 0, Monday = 1, etc.",
            "Month values: January = 1, December = 12",
            "Schedules are evaluated in UTC",
            "Test with frequent patterns first, then adjust timing",
        ],
        "resource_info": { "last_updated": "static", "type": "cron_templates", "refresh_rate": "static" },
    })
}
