//! Local input checks run before any request leaves the process.
//!
//! Each validator returns the normalized value or a `Validation` error naming
//! the field and the rejected value.

use std::collections::BTreeMap;

use serde_json::Value;
use url::Url;

use crate::cron::validate_cron_expression;
use crate::error::{CronlyticError, Result};
use crate::job::{HttpMethod, JobSpec};

const MAX_NAME_LEN: usize = 50;
const MIN_JOB_ID_LEN: usize = 3;
const REQUIRED_FIELDS: [&str; 6] = ["name", "url", "method", "headers", "body", "cron_expression"];

/// Job name: trimmed, 1-50 chars of `[a-zA-Z0-9_-]`.
pub fn validate_job_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CronlyticError::validation("name", "Job name cannot be empty", name));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(CronlyticError::validation("name", "Job name cannot exceed 50 characters", name));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(CronlyticError::validation(
            "name",
            "Job name can only contain letters, numbers, hyphens (-), and underscores (_)",
            name,
        ));
    }
    Ok(name.to_string())
}

/// Webhook URL: trimmed, http/https with a host.
pub fn validate_url(url: &str) -> Result<String> {
    let url = url.trim();
    let fail = |msg: String| CronlyticError::validation("url", msg, url);
    if url.is_empty() {
        return Err(fail("URL cannot be empty".into()));
    }

    let parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            return Err(fail("URL must include a scheme (http:// or https://)".into()))
        }
        Err(url::ParseError::EmptyHost) => return Err(fail("URL must include a domain name".into())),
        Err(e) => return Err(fail(format!("Invalid URL format: {e}"))),
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(fail("URL scheme must be http:// or https://".into()));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(fail("URL must include a domain name".into()));
    }
    Ok(url.to_string())
}

/// HTTP method, case-insensitive.
pub fn validate_http_method(method: &str) -> Result<HttpMethod> {
    let upper = method.trim().to_ascii_uppercase();
    if upper.is_empty() {
        return Err(CronlyticError::validation("method", "HTTP method cannot be empty", upper));
    }
    upper.parse().map_err(|_| {
        let allowed: Vec<&str> = HttpMethod::ALL.iter().map(|m| m.as_str()).collect();
        CronlyticError::validation(
            "method",
            format!("HTTP method must be one of: {}", allowed.join(", ")),
            upper.clone(),
        )
    })
}

/// Header map: absent or null gives an empty map; keys and values must be strings.
pub fn validate_headers(headers: Option<&Value>) -> Result<BTreeMap<String, String>> {
    let map = match headers {
        None | Some(Value::Null) => return Ok(BTreeMap::new()),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(CronlyticError::validation("headers", "Headers must be a dictionary", other.clone()))
        }
    };

    let mut out = BTreeMap::new();
    for (key, value) in map {
        let Value::String(value) = value else {
            return Err(CronlyticError::validation(
                "headers",
                format!("Header value must be a string, got {} for key '{key}'", json_type(value)),
                value.clone(),
            ));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(CronlyticError::validation("headers", "Header key cannot be empty", key));
        }
        out.insert(key.to_string(), value.trim().to_string());
    }
    Ok(out)
}

/// Request body: any string, absent or null gives `""`.
pub fn validate_request_body(body: Option<&Value>) -> Result<String> {
    match body {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(CronlyticError::validation(
            "body",
            format!("Request body must be a string, got {}", json_type(other)),
            other.clone(),
        )),
    }
}

/// Job id: trimmed and at least three characters.
pub fn validate_job_id(job_id: &str) -> Result<String> {
    let id = job_id.trim();
    if id.is_empty() {
        return Err(CronlyticError::validation("job_id", "Job ID cannot be empty", id));
    }
    if id.chars().count() < MIN_JOB_ID_LEN {
        return Err(CronlyticError::validation("job_id", "Job ID appears to be too short", id));
    }
    Ok(id.to_string())
}

/// Read `field` from a JSON object as a string.
///
/// Missing and null give `Ok(None)`; any other non-string is a validation error.
pub fn optional_str<'a>(data: &'a Value, field: &str) -> Result<Option<&'a str>> {
    match data.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(CronlyticError::validation(
            field,
            format!("{field} must be a string, got {}", json_type(other)),
            other.clone(),
        )),
    }
}

/// Validate every job field, in order, stopping at the first failure.
pub fn validate_complete_job_data(data: &Value) -> Result<JobSpec> {
    if !data.is_object() {
        return Err(CronlyticError::validation("job_data", "Job data must be a dictionary", data.clone()));
    }
    for field in REQUIRED_FIELDS {
        if data.get(field).is_none() {
            return Err(CronlyticError::validation(
                field,
                format!("Required field '{field}' is missing"),
                Value::Null,
            ));
        }
    }

    let name = validate_job_name(optional_str(data, "name")?.unwrap_or_default())?;
    let url = validate_url(optional_str(data, "url")?.unwrap_or_default())?;
    let method = validate_http_method(optional_str(data, "method")?.unwrap_or_default())?;
    let headers = validate_headers(data.get("headers"))?;
    let body = validate_request_body(data.get("body"))?;
    let cron_expression = validate_cron_expression(optional_str(data, "cron_expression")?.unwrap_or_default())?;

    Ok(JobSpec { name, url, method, headers, body, cron_expression })
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
