use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A job definition that passed local validation, ready to send to the API.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct JobSpec {
    /// Job name, `[a-zA-Z0-9_-]{1,50}`.
    pub name: String,
    /// Target webhook URL (http/https).
    pub url: String,
    /// HTTP method used to call the webhook.
    pub method: HttpMethod,
    /// Extra request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Request body, may be empty.
    #[serde(default)]
    pub body: String,
    /// 5-field cron schedule.
    pub cron_expression: String,
}

/// HTTP methods a job may use.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
    /// PATCH
    Patch,
    /// HEAD
    Head,
    /// OPTIONS
    Options,
}

impl HttpMethod {
    /// Every allowed method, alphabetically.
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Delete,
        HttpMethod::Get,
        HttpMethod::Head,
        HttpMethod::Options,
        HttpMethod::Patch,
        HttpMethod::Post,
        HttpMethod::Put,
    ];

    /// Upper-case wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ();

    /// Case-insensitive; surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        HttpMethod::ALL.into_iter().find(|m| m.as_str() == upper).ok_or(())
    }
}

/// `status` field of a remote job or log entry, `"unknown"` when absent.
pub fn status_of(item: &Value) -> &str {
    item.get("status").and_then(Value::as_str).unwrap_or("unknown")
}

/// Whether a remote job is paused.
pub fn is_paused(job: &Value) -> bool {
    status_of(job) == "paused"
}

/// Count items per `status` value.
pub fn status_breakdown(items: &[Value]) -> Map<String, Value> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for item in items {
        *counts.entry(status_of(item).to_string()).or_default() += 1;
    }
    counts.into_iter().map(|(k, v)| (k, Value::from(v))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn method_parse_is_case_insensitive() {
        assert_eq!(" post ".parse::<HttpMethod>(), Ok(HttpMethod::Post));
        assert_eq!("options".parse::<HttpMethod>(), Ok(HttpMethod::Options));
        assert!("TRACE".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn spec_serializes_method_upper_case() {
        let spec = JobSpec {
            name: "daily-sync".into(),
            url: "https://example.com/hook".into(),
            method: HttpMethod::Post,
            headers: BTreeMap::new(),
            body: String::new(),
            cron_expression: "0 2 * * *".into(),
        };
        let v = serde_json::to_value(&spec).unwrap();
        assert_eq!(v["method"], "POST");
        assert_eq!(v["headers"], json!({}));
    }

    #[test]
    fn breakdown_counts_statuses() {
        let items = vec![json!({"status": "paused"}), json!({"status": "pending"}), json!({"status": "paused"}), json!({})];
        let b = status_breakdown(&items);
        assert_eq!(b["paused"], 2);
        assert_eq!(b["pending"], 1);
        assert_eq!(b["unknown"], 1);
        assert!(is_paused(&items[0]));
    }
}
