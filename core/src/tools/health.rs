use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};

use crate::cfg::USER_AGENT;
use crate::client::ApiClient;
use crate::transport::Transport;

/// Rating for a ping round trip.
pub fn performance_rating(ms: f64) -> &'static str {
    if ms < 200.0 {
        "excellent"
    } else if ms < 500.0 {
        "good"
    } else if ms < 1000.0 {
        "fair"
    } else {
        "poor"
    }
}

/// Composite connectivity, authentication and listing check. Never fails.
pub async fn health_check<T: Transport>(client: &ApiClient<T>) -> Value {
    let health = client.health_check().await;
    let status = health["status"].as_str().unwrap_or("unknown").to_string();
    let healthy = status == "healthy";
    let response_time = health.get("response_time_ms").and_then(Value::as_f64);

    let mut details = Map::new();
    let mut errors: Vec<String> = Vec::new();
    let mut recommendations: Vec<String> = Vec::new();

    details.insert("base_url".into(), json!(client.config().base_url()));
    details.insert("user_agent".into(), json!(USER_AGENT));

    if healthy {
        details.insert("api_response".into(), health.get("api_response").cloned().unwrap_or_else(|| json!({})));
        match client.list_jobs().await {
            Ok(jobs) => {
                details.insert("job_count".into(), json!(jobs.len()));
                details.insert("can_list_jobs".into(), json!(true));
                recommendations.push(if jobs.is_empty() {
                    "No jobs found. You can create your first job using the create_job tool.".to_string()
                } else {
                    format!("Found {} job(s). All systems appear to be working correctly.", jobs.len())
                });
            }
            Err(e) => {
                details.insert("can_list_jobs".into(), json!(false));
                errors.push(format!("Failed to list jobs: {}", e.message()));
                recommendations
                    .push("Authentication succeeded but job listing failed. Check API permissions.".to_string());
            }
        }

        if let Some(ms) = response_time {
            let rating = performance_rating(ms);
            details.insert("performance".into(), json!(rating));
            match rating {
                "fair" => recommendations.push("Response time is a bit slow. Check your network connection.".into()),
                "poor" => recommendations
                    .push("Response time is very slow. Check your network connection and API status.".into()),
                _ => {}
            }
        }
    } else {
        let kind = health["error_type"].as_str().unwrap_or("APIError").to_string();
        let message = health["error"].as_str().unwrap_or_default().to_string();
        errors.push(format!("Cronlytic API error: {message}"));
        details.insert("error_type".into(), json!(kind));
        match kind.as_str() {
            "AuthenticationError" => recommendations.extend([
                "Check that your API key and User ID are correct".to_string(),
                "Verify that your credentials are not expired".to_string(),
                "Ensure you're using the correct environment variables or config file".to_string(),
            ]),
            "ConnectionError" | "TimeoutError" => recommendations.extend([
                "Check your internet connection".to_string(),
                format!("Verify that {} is accessible", client.config().base_url()),
                "Check if there are any firewall restrictions".to_string(),
            ]),
            _ => recommendations.push(format!("Encountered {kind}: {message}")),
        }
    }

    let summary = if healthy {
        "✅ Cronlytic API connection is healthy and working correctly"
    } else {
        "❌ Cronlytic API connection failed"
    };

    json!({
        "success": healthy,
        "tool": "health_check",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        "status": status,
        "connectivity": health["connected"].as_bool().unwrap_or(false),
        "authentication": healthy,
        "response_time_ms": response_time,
        "base_url": client.config().base_url(),
        "details": details,
        "errors": errors,
        "recommendations": recommendations,
        "summary": summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratings_follow_thresholds() {
        assert_eq!(performance_rating(50.0), "excellent");
        assert_eq!(performance_rating(199.99), "excellent");
        assert_eq!(performance_rating(200.0), "good");
        assert_eq!(performance_rating(700.0), "fair");
        assert_eq!(performance_rating(1000.0), "poor");
    }
}
