use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::envelope;
use crate::client::ApiClient;
use crate::job::{is_paused, status_breakdown};
use crate::transport::Transport;
use crate::validate::{optional_str, validate_complete_job_data, validate_job_id};

const DEFAULT_LIST_LIMIT: usize = 50;

pub(super) fn job_id_arg(args: &Value) -> crate::Result<String> {
    validate_job_id(optional_str(args, "job_id")?.unwrap_or_default())
}

fn name_of(job: &Value) -> &str {
    job.get("name").and_then(Value::as_str).unwrap_or("unknown")
}

/// Validate the job fields and create it remotely.
pub async fn create_job<T: Transport>(client: &ApiClient<T>, args: &Value) -> Value {
    envelope("create_job", async {
        let spec = validate_complete_job_data(args)?;
        debug!(name = %spec.name, cron = %spec.cron_expression, "creating job");
        let job = client.create_job(&spec).await?;
        info!(id = ?job.get("id"), "job created");
        Ok(json!({
            "success": true,
            "message": format!("Job '{}' created successfully", name_of(&job)),
            "next_run": job.get("next_run_at").cloned().unwrap_or(Value::Null),
            "job": job,
        }))
    })
    .await
}

/// List jobs, filtering and truncating client-side.
pub async fn list_jobs<T: Transport>(client: &ApiClient<T>, args: &Value) -> Value {
    envelope("list_jobs", async {
        let include_paused = args.get("include_paused").and_then(Value::as_bool).unwrap_or(true);
        let limit = args
            .get("limit")
            .and_then(Value::as_u64)
            .filter(|n| *n > 0)
            .map_or(DEFAULT_LIST_LIMIT, |n| n as usize);

        let mut jobs = client.list_jobs().await?;
        if !include_paused {
            jobs.retain(|j| !is_paused(j));
        }
        let limited = jobs.len() > limit;
        jobs.truncate(limit);

        let total = jobs.len();
        Ok(json!({
            "success": true,
            "summary": {
                "total_count": total,
                "status_breakdown": status_breakdown(&jobs),
                "limited": limited,
                "limit_applied": if limited { json!(limit) } else { Value::Null },
            },
            "message": format!("Found {total} job{}", if total == 1 { "" } else { "s" }),
            "jobs": jobs,
        }))
    })
    .await
}

/// Fetch one job.
pub async fn get_job<T: Transport>(client: &ApiClient<T>, args: &Value) -> Value {
    envelope("get_job", async {
        let job_id = job_id_arg(args)?;
        let job = client.get_job(&job_id).await?;
        Ok(json!({
            "success": true,
            "message": format!("Retrieved job '{}'", name_of(&job)),
            "job": job,
        }))
    })
    .await
}

/// Replace a job's configuration.
///
/// `method`, `headers` and `body` fall back to `GET`, `{}` and `""` when omitted.
pub async fn update_job<T: Transport>(client: &ApiClient<T>, args: &Value) -> Value {
    envelope("update_job", async {
        let job_id = job_id_arg(args)?;
        let mut data = args.clone();
        if let Some(obj) = data.as_object_mut() {
            obj.remove("job_id");
            obj.entry("method").or_insert_with(|| json!("GET"));
            obj.entry("headers").or_insert_with(|| json!({}));
            obj.entry("body").or_insert_with(|| json!(""));
        }
        let spec = validate_complete_job_data(&data)?;
        let job = client.update_job(&job_id, &spec).await?;
        info!(%job_id, "job updated");
        Ok(json!({
            "success": true,
            "message": format!("Job '{}' updated successfully", name_of(&job)),
            "changes_applied": true,
            "next_run": job.get("next_run_at").cloned().unwrap_or(Value::Null),
            "job": job,
        }))
    })
    .await
}

/// Permanently delete a job. Requires `confirm: true`.
pub async fn delete_job<T: Transport>(client: &ApiClient<T>, args: &Value) -> Value {
    envelope("delete_job", async {
        let job_id = job_id_arg(args)?;
        let confirm = args.get("confirm").and_then(Value::as_bool).unwrap_or(false);
        if !confirm {
            warn!(%job_id, "delete attempted without confirmation");
            return Ok(json!({
                "success": false,
                "error": "Confirmation Required",
                "message": "Job deletion requires confirmation. Set 'confirm' parameter to true to proceed.",
                "warning": "This action cannot be undone. The job and all its execution history will be permanently deleted.",
                "job_id": job_id,
            }));
        }

        let job_name = match client.get_job(&job_id).await {
            Ok(job) => job.get("name").and_then(Value::as_str).unwrap_or(&job_id).to_string(),
            Err(e) => {
                debug!(%job_id, "name lookup before delete failed: {}", e.message());
                job_id.clone()
            }
        };
        let deleted = client.delete_job(&job_id).await?;
        info!(%job_id, name = %job_name, "job deleted");
        Ok(json!({
            "success": true,
            "message": format!("Job '{job_name}' has been permanently deleted"),
            "job_id": job_id,
            "deleted": true,
            "deletion_timestamp": deleted.get("deleted_at").cloned().unwrap_or(Value::Null),
        }))
    })
    .await
}
