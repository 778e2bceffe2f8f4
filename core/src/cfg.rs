use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use directories::BaseDirs;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::error::{CronlyticError, Result};

/// Base URL used when no source provides one.
pub const DEFAULT_BASE_URL: &str = "https://api.cronlytic.com/prog";
/// Default per-request timeout (seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Default retry budget on top of the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default base backoff delay (seconds).
pub const DEFAULT_RETRY_DELAY: f64 = 1.0;
/// `User-Agent` sent with every API request.
pub const USER_AGENT: &str = concat!("cronlytic-mcp-server/", env!("CARGO_PKG_VERSION"));

const ENV_API_KEY: &str = "CRONLYTIC_API_KEY";
const ENV_USER_ID: &str = "CRONLYTIC_USER_ID";
const ENV_BASE_URL: &str = "CRONLYTIC_BASE_URL";
const ENV_TIMEOUT: &str = "CRONLYTIC_TIMEOUT";
const ENV_MAX_RETRIES: &str = "CRONLYTIC_MAX_RETRIES";
const ENV_RETRY_DELAY: &str = "CRONLYTIC_RETRY_DELAY";

/// Validated API credentials and client tuning. Immutable once built.
#[derive(Clone, PartialEq)]
pub struct AuthConfig {
    api_key: String,
    user_id: String,
    base_url: String,
    timeout_secs: u64,
    max_retries: u32,
    retry_delay: f64,
}

impl AuthConfig {
    /// Validate and build a config. Fails with an `Authentication` error.
    pub fn new(
        api_key: &str,
        user_id: &str,
        base_url: &str,
        timeout_secs: u64,
        max_retries: u32,
        retry_delay: f64,
    ) -> Result<Self> {
        let invalid = |msg: &str| CronlyticError::authentication(format!("Invalid configuration: {msg}"));

        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(invalid("API key cannot be empty"));
        }
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(invalid("User ID cannot be empty"));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(invalid("Base URL must start with http:// or https://"));
        }
        if timeout_secs == 0 {
            return Err(invalid("Timeout must be positive"));
        }
        if !retry_delay.is_finite() || retry_delay < 0.0 {
            return Err(invalid("Retry delay cannot be negative"));
        }

        Ok(Self {
            api_key: api_key.to_string(),
            user_id: user_id.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs,
            max_retries,
            retry_delay,
        })
    }

    /// Credentials with every tuning knob at its default.
    pub fn with_defaults(api_key: &str, user_id: &str) -> Result<Self> {
        Self::new(
            api_key,
            user_id,
            DEFAULT_BASE_URL,
            DEFAULT_TIMEOUT_SECS,
            DEFAULT_MAX_RETRIES,
            DEFAULT_RETRY_DELAY,
        )
    }

    /// API key.
    pub fn api_key(&self) -> &str { &self.api_key }
    /// User id.
    pub fn user_id(&self) -> &str { &self.user_id }
    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str { &self.base_url }
    /// Request timeout in seconds.
    pub fn timeout_secs(&self) -> u64 { self.timeout_secs }
    /// Retries allowed after the first attempt.
    pub fn max_retries(&self) -> u32 { self.max_retries }
    /// Base backoff delay in seconds.
    pub fn retry_delay(&self) -> f64 { self.retry_delay }

    /// Headers attached to every API request.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("X-API-Key", self.api_key.clone()),
            ("X-User-ID", self.user_id.clone()),
            ("Content-Type", "application/json".to_string()),
            ("User-Agent", USER_AGENT.to_string()),
        ]
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_key", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .finish()
    }
}

/// Values passed explicitly by the caller (CLI flags). Highest precedence.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// API key override.
    pub api_key: Option<String>,
    /// User id override.
    pub user_id: Option<String>,
    /// Base URL override.
    pub base_url: Option<String>,
    /// Config file to read instead of the search path.
    pub config_file: Option<PathBuf>,
}

/// Standard config file locations, in lookup order.
pub fn default_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::with_capacity(3);
    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join("cronlytic_config.json"));
    }
    if let Some(base) = BaseDirs::new() {
        paths.push(base.home_dir().join(".cronlytic").join("config.json"));
    }
    paths.push(PathBuf::from("/etc/cronlytic/config.json"));
    paths
}

/// Resolve config from the process environment and the standard file locations.
pub fn load(overrides: &ConfigOverrides) -> Result<AuthConfig> {
    resolve(overrides, |k| std::env::var(k).ok(), &default_search_paths())
}

/// Merge overrides > `env` > first config file found > defaults.
///
/// `env` is the environment lookup; tests pass a closure over a map.
pub fn resolve<E>(overrides: &ConfigOverrides, env: E, search_paths: &[PathBuf]) -> Result<AuthConfig>
where
    E: Fn(&str) -> Option<String>,
{
    let mut merged = Map::new();

    let file = match &overrides.config_file {
        Some(p) => Some(p.clone()),
        None => search_paths.iter().find(|p| p.exists()).cloned(),
    };
    if let Some(path) = file {
        if let Some(Value::Object(data)) = read_config_file(&path) {
            merged.extend(data);
        }
    }

    for (key, var) in [
        ("api_key", ENV_API_KEY),
        ("user_id", ENV_USER_ID),
        ("base_url", ENV_BASE_URL),
        ("timeout", ENV_TIMEOUT),
        ("max_retries", ENV_MAX_RETRIES),
        ("retry_delay", ENV_RETRY_DELAY),
    ] {
        if let Some(v) = env(var) {
            merged.insert(key.to_string(), Value::String(v));
        }
    }

    for (key, v) in [
        ("api_key", &overrides.api_key),
        ("user_id", &overrides.user_id),
        ("base_url", &overrides.base_url),
    ] {
        if let Some(v) = v {
            merged.insert(key.to_string(), Value::String(v.clone()));
        }
    }

    let api_key = string_field(&merged, "api_key").ok_or_else(|| {
        CronlyticError::authentication(format!(
            "API key is required. Set {ENV_API_KEY} environment variable, provide it in config file, or pass it directly."
        ))
    })?;
    let user_id = string_field(&merged, "user_id").ok_or_else(|| {
        CronlyticError::authentication(format!(
            "User ID is required. Set {ENV_USER_ID} environment variable, provide it in config file, or pass it directly."
        ))
    })?;
    let base_url = string_field(&merged, "base_url").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let timeout = int_field(&merged, "timeout")?.unwrap_or(DEFAULT_TIMEOUT_SECS as i64);
    if timeout <= 0 {
        return Err(CronlyticError::authentication("Invalid configuration: Timeout must be positive"));
    }
    let max_retries = int_field(&merged, "max_retries")?.unwrap_or(DEFAULT_MAX_RETRIES as i64);
    if max_retries < 0 {
        return Err(CronlyticError::authentication("Invalid configuration: Max retries cannot be negative"));
    }
    let retry_delay = float_field(&merged, "retry_delay")?.unwrap_or(DEFAULT_RETRY_DELAY);

    AuthConfig::new(
        &api_key,
        &user_id,
        &base_url,
        timeout as u64,
        u32::try_from(max_retries).unwrap_or(u32::MAX),
        retry_delay,
    )
}

fn read_config_file(path: &Path) -> Option<Value> {
    if !path.exists() {
        debug!(path = %path.display(), "config file not found");
        return None;
    }
    let parsed = fs::read_to_string(path)
        .with_context(|| format!("read {}", path.display()))
        .and_then(|txt| serde_json::from_str::<Value>(&txt).with_context(|| format!("parse {}", path.display())));
    match parsed {
        Ok(v) => {
            info!(path = %path.display(), "loaded configuration");
            Some(v)
        }
        Err(e) => {
            warn!(error = %format!("{e:#}"), "ignoring config file");
            None
        }
    }
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn int_field(map: &Map<String, Value>, key: &str) -> Result<Option<i64>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| bad_value(key, &n.to_string())),
        Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| bad_value(key, s)),
        Some(other) => Err(bad_value(key, &other.to_string())),
    }
}

fn float_field(map: &Map<String, Value>, key: &str) -> Result<Option<f64>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_f64().map(Some).ok_or_else(|| bad_value(key, &n.to_string())),
        Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| bad_value(key, s)),
        Some(other) => Err(bad_value(key, &other.to_string())),
    }
}

fn bad_value(key: &str, raw: &str) -> CronlyticError {
    CronlyticError::authentication(format!("Invalid configuration: {key} has invalid value '{raw}'"))
}

/// Write an example config file, creating parent directories.
///
/// Defaults to `~/.cronlytic/config.json` when `path` is `None`.
pub fn write_example(path: Option<&Path>) -> anyhow::Result<PathBuf> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => BaseDirs::new()
            .ok_or_else(|| anyhow::anyhow!("failed to resolve home directory"))?
            .home_dir()
            .join(".cronlytic")
            .join("config.json"),
    };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create config dir {}", dir.display()))?;
    }
    let example = json!({
        "api_key": "your_cronlytic_api_key_here",
        "user_id": "your_cronlytic_user_id_here",
        "base_url": DEFAULT_BASE_URL,
        "timeout": DEFAULT_TIMEOUT_SECS,
        "max_retries": DEFAULT_MAX_RETRIES,
        "retry_delay": DEFAULT_RETRY_DELAY,
    });
    let s = serde_json::to_string_pretty(&example)?;
    fs::write(&path, s).with_context(|| format!("write {}", path.display()))?;
    info!(path = %path.display(), "created example configuration");
    Ok(path)
}
