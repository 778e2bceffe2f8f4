use serde_json::{json, Map, Value};
use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, CronlyticError>;

/// Every failure the server can surface, tagged by kind.
///
/// Validation errors are produced locally before any network traffic. The
/// remaining kinds come out of the API client, either from an HTTP status or
/// from a transport failure.
#[derive(Debug, Clone, Error)]
pub enum CronlyticError {
    /// Local input check failed.
    #[error("Validation error for field '{field}': {message}")]
    Validation {
        /// Name of the offending field.
        field: String,
        /// What was wrong with it.
        message: String,
        /// The value that was rejected.
        value: Value,
    },

    /// Credentials missing or rejected (HTTP 401, or startup config).
    #[error("{message}")]
    Authentication {
        /// Human readable reason.
        message: String,
    },

    /// Credentials valid but the action is not allowed (HTTP 403).
    #[error("{message}")]
    Authorization {
        /// Human readable reason.
        message: String,
        /// Plan name for job-limit failures.
        plan: Option<String>,
        /// Current job count for job-limit failures.
        current_count: Option<u64>,
        /// Plan maximum for job-limit failures.
        max_allowed: Option<u64>,
    },

    /// Requested entity does not exist (HTTP 404).
    #[error("{resource_type} with ID '{resource_id}' not found")]
    NotFound {
        /// Kind of entity, e.g. `job`.
        resource_type: String,
        /// Identifier that was looked up.
        resource_id: String,
    },

    /// Remote rate limit hit (HTTP 429).
    #[error("{message}")]
    RateLimit {
        /// Human readable reason.
        message: String,
        /// Seconds to wait, from the `Retry-After` header.
        retry_after: Option<u64>,
    },

    /// Request did not finish within the configured timeout.
    #[error("{message}")]
    Timeout {
        /// Human readable reason.
        message: String,
    },

    /// Could not reach the API at all.
    #[error("{message}")]
    Connection {
        /// Human readable reason.
        message: String,
    },

    /// Any other API failure (unmapped status, unexpected client error).
    #[error("{message}")]
    Api {
        /// Human readable reason.
        message: String,
        /// HTTP status, when the failure came from a response.
        status_code: Option<u16>,
        /// Parsed response body, `{}` when absent.
        response_data: Value,
    },
}

impl CronlyticError {
    /// Build a validation error for `field`.
    pub fn validation(field: impl Into<String>, message: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Validation { field: field.into(), message: message.into(), value: value.into() }
    }

    /// Build an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication { message: message.into() }
    }

    /// Build a generic API error with no response attached.
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api { message: message.into(), status_code: None, response_data: json!({}) }
    }

    /// Map a non-success HTTP response onto exactly one error kind.
    ///
    /// `path` is the request path relative to the base URL and is only used to
    /// name the missing resource on 404. `retry_after` is the raw
    /// `Retry-After` header value, if the response carried one.
    pub fn from_status(status: u16, body: &Value, path: &str, retry_after: Option<&str>) -> Self {
        let detail = body.get("detail");
        match status {
            401 => Self::Authentication {
                message: detail_text(detail).unwrap_or_else(|| "Authentication failed".to_string()),
            },
            403 => match detail {
                Some(Value::Object(d)) if d.contains_key("job_count") => Self::Authorization {
                    message: d
                        .get("error")
                        .and_then(Value::as_str)
                        .unwrap_or("Authorization failed")
                        .to_string(),
                    plan: d.get("plan").and_then(Value::as_str).map(str::to_string),
                    current_count: d.get("job_count").and_then(Value::as_u64),
                    max_allowed: d.get("max_jobs").and_then(Value::as_u64),
                },
                Some(Value::String(s)) => Self::Authorization {
                    message: s.clone(),
                    plan: None,
                    current_count: None,
                    max_allowed: None,
                },
                _ => Self::Authorization {
                    message: "Authorization failed".to_string(),
                    plan: None,
                    current_count: None,
                    max_allowed: None,
                },
            },
            404 => {
                let (resource_type, resource_id) = resource_from_path(path);
                Self::NotFound { resource_type, resource_id }
            }
            422 => Self::Api {
                message: format!(
                    "Validation error: {}",
                    detail_text(detail).unwrap_or_else(|| "Validation error".to_string())
                ),
                status_code: Some(status),
                response_data: body.clone(),
            },
            429 => Self::RateLimit {
                message: "Rate limit exceeded".to_string(),
                retry_after: retry_after.and_then(|v| v.trim().parse().ok()),
            },
            _ => Self::Api {
                message: detail_text(detail).unwrap_or_else(|| format!("HTTP {status}")),
                status_code: Some(status),
                response_data: body.clone(),
            },
        }
    }

    /// Stable kind name shown to users in the `error` field of envelopes.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "ValidationError",
            Self::Authentication { .. } => "AuthenticationError",
            Self::Authorization { .. } => "AuthorizationError",
            Self::NotFound { .. } => "NotFoundError",
            Self::RateLimit { .. } => "RateLimitError",
            Self::Timeout { .. } => "TimeoutError",
            Self::Connection { .. } => "ConnectionError",
            Self::Api { .. } => "APIError",
        }
    }

    /// Human readable message.
    pub fn message(&self) -> String {
        match self {
            Self::Validation { .. } | Self::NotFound { .. } => self.to_string(),
            Self::Authentication { message }
            | Self::Authorization { message, .. }
            | Self::RateLimit { message, .. }
            | Self::Timeout { message }
            | Self::Connection { message }
            | Self::Api { message, .. } => message.clone(),
        }
    }

    /// Kind-specific structured details, always a JSON object.
    pub fn details(&self) -> Value {
        match self {
            Self::Validation { field, value, .. } => json!({ "field": field, "value": value }),
            Self::Authorization { plan, current_count, max_allowed, .. } => json!({
                "plan": plan,
                "current_count": current_count,
                "max_allowed": max_allowed,
            }),
            Self::NotFound { resource_type, resource_id } => json!({
                "resource_type": resource_type,
                "resource_id": resource_id,
            }),
            Self::RateLimit { retry_after, .. } => json!({ "retry_after": retry_after }),
            Self::Api { status_code, response_data, .. } => json!({
                "status_code": status_code,
                "response_data": response_data,
            }),
            Self::Authentication { .. } | Self::Timeout { .. } | Self::Connection { .. } => {
                Value::Object(Map::new())
            }
        }
    }

    /// Whether the client may try the same request again.
    ///
    /// Only transient failures qualify: timeouts, connection failures and
    /// unmapped API errors. 422 responses are terminal like the other
    /// server-side rejections.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Connection { .. } => true,
            Self::Api { status_code, .. } => *status_code != Some(422),
            Self::Validation { .. }
            | Self::Authentication { .. }
            | Self::Authorization { .. }
            | Self::NotFound { .. }
            | Self::RateLimit { .. } => false,
        }
    }
}

fn detail_text(detail: Option<&Value>) -> Option<String> {
    match detail? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn resource_from_path(path: &str) -> (String, String) {
    let segments: Vec<&str> = path.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        ["jobs", id, ..] => ("job".to_string(), (*id).to_string()),
        [.., last] => ("resource".to_string(), (*last).to_string()),
        [] => ("resource".to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_401_is_authentication_with_detail() {
        let err = CronlyticError::from_status(401, &json!({"detail": "bad key"}), "jobs", None);
        assert!(matches!(err, CronlyticError::Authentication { .. }));
        assert_eq!(err.message(), "bad key");
        assert!(!err.is_retryable());
    }

    #[test]
    fn status_401_without_body_uses_default_message() {
        let err = CronlyticError::from_status(401, &json!({}), "jobs", None);
        assert_eq!(err.message(), "Authentication failed");
    }

    #[test]
    fn status_403_job_limit_carries_plan_details() {
        let body = json!({"detail": {"error": "Job limit reached", "plan": "free", "job_count": 5, "max_jobs": 5}});
        let err = CronlyticError::from_status(403, &body, "jobs", None);
        assert_eq!(err.message(), "Job limit reached");
        assert_eq!(err.details(), json!({"plan": "free", "current_count": 5, "max_allowed": 5}));
        assert_eq!(err.kind_name(), "AuthorizationError");
    }

    #[test]
    fn status_403_plain_string_detail() {
        let err = CronlyticError::from_status(403, &json!({"detail": "forbidden"}), "jobs/abc", None);
        assert_eq!(err.message(), "forbidden");
        assert_eq!(err.details()["plan"], Value::Null);
    }

    #[test]
    fn status_404_names_job_from_path() {
        let err = CronlyticError::from_status(404, &json!({}), "jobs/job-123/logs", None);
        assert_eq!(err.message(), "job with ID 'job-123' not found");
        assert_eq!(err.details()["resource_id"], "job-123");
    }

    #[test]
    fn status_404_other_path_uses_last_segment() {
        let err = CronlyticError::from_status(404, &json!({}), "ping", None);
        assert_eq!(err.details(), json!({"resource_type": "resource", "resource_id": "ping"}));
    }

    #[test]
    fn status_422_is_terminal_api_error() {
        let err = CronlyticError::from_status(422, &json!({"detail": "bad cron"}), "jobs", None);
        assert_eq!(err.message(), "Validation error: bad cron");
        assert_eq!(err.kind_name(), "APIError");
        assert!(!err.is_retryable());
    }

    #[test]
    fn status_429_parses_retry_after() {
        let err = CronlyticError::from_status(429, &json!({}), "jobs", Some("30"));
        assert_eq!(err.details(), json!({"retry_after": 30}));
        assert!(!err.is_retryable());

        let err = CronlyticError::from_status(429, &json!({}), "jobs", Some("soon"));
        assert_eq!(err.details(), json!({"retry_after": null}));
    }

    #[test]
    fn other_status_uses_detail_or_http_code() {
        let err = CronlyticError::from_status(500, &json!({}), "jobs", None);
        assert_eq!(err.message(), "HTTP 500");
        assert_eq!(err.details()["status_code"], 500);
        assert!(err.is_retryable());

        let err = CronlyticError::from_status(502, &json!({"detail": "upstream down"}), "jobs", None);
        assert_eq!(err.message(), "upstream down");
    }

    #[test]
    fn validation_message_names_field() {
        let err = CronlyticError::validation("name", "Job name cannot be empty", "");
        assert_eq!(err.to_string(), "Validation error for field 'name': Job name cannot be empty");
        assert_eq!(err.details(), json!({"field": "name", "value": ""}));
    }
}
