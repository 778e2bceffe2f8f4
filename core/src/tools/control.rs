use serde_json::{json, Value};
use tracing::info;

use super::envelope;
use super::jobs::job_id_arg;
use crate::client::ApiClient;
use crate::job::status_breakdown;
use crate::transport::Transport;

const DEFAULT_LOG_LIMIT: usize = 20;
const MAX_LOG_LIMIT: u64 = 100;

/// Pause a job.
pub async fn pause_job<T: Transport>(client: &ApiClient<T>, args: &Value) -> Value {
    envelope("pause_job", async {
        let job_id = job_id_arg(args)?;
        let job = client.pause_job(&job_id).await?;
        info!(%job_id, "job paused");
        Ok(json!({
            "success": true,
            "message": format!("Job '{}' has been paused", job_name(&job)),
            "status": job.get("status").cloned().unwrap_or(Value::Null),
            "job": job,
        }))
    })
    .await
}

/// Resume a paused job.
pub async fn resume_job<T: Transport>(client: &ApiClient<T>, args: &Value) -> Value {
    envelope("resume_job", async {
        let job_id = job_id_arg(args)?;
        let job = client.resume_job(&job_id).await?;
        info!(%job_id, "job resumed");
        Ok(json!({
            "success": true,
            "message": format!("Job '{}' has been resumed", job_name(&job)),
            "status": job.get("status").cloned().unwrap_or(Value::Null),
            "next_run": job.get("next_run_at").cloned().unwrap_or(Value::Null),
            "job": job,
        }))
    })
    .await
}

/// Execution logs, truncated client-side to `limit` (1..=100, default 20).
pub async fn get_job_logs<T: Transport>(client: &ApiClient<T>, args: &Value) -> Value {
    envelope("get_job_logs", async {
        let job_id = job_id_arg(args)?;
        let limit = args
            .get("limit")
            .and_then(Value::as_u64)
            .filter(|n| (1..=MAX_LOG_LIMIT).contains(n))
            .map_or(DEFAULT_LOG_LIMIT, |n| n as usize);

        let data = client.get_job_logs(&job_id).await?;
        let mut logs = match data.get("logs") {
            Some(Value::Array(logs)) => logs.clone(),
            _ => Vec::new(),
        };
        let job = data.get("job").cloned().unwrap_or_else(|| json!({}));

        let limited = logs.len() > limit;
        logs.truncate(limit);
        let total = logs.len();
        let name = job.get("name").and_then(Value::as_str).unwrap_or(&job_id).to_string();

        Ok(json!({
            "success": true,
            "summary": {
                "total_logs_returned": total,
                "status_breakdown": status_breakdown(&logs),
                "recent_executions": total,
                "limited": limited,
                "limit_applied": if limited { json!(limit) } else { Value::Null },
            },
            "message": format!("Retrieved {total} log entr{} for job '{name}'", if total == 1 { "y" } else { "ies" }),
            "logs": logs,
            "job": job,
        }))
    })
    .await
}

fn job_name(job: &Value) -> &str {
    job.get("name").and_then(Value::as_str).unwrap_or("unknown")
}
