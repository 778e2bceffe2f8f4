use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use tracing::warn;

const RECENT_WINDOW: usize = 100;
const SLOW_OPERATION: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
struct OpStats {
    calls: u64,
    errors: u64,
    total: Duration,
    min: Option<Duration>,
    max: Duration,
    last_called: Option<DateTime<Utc>>,
    recent: VecDeque<Duration>,
}

impl OpStats {
    fn add(&mut self, elapsed: Duration, success: bool) {
        self.calls += 1;
        self.total += elapsed;
        self.min = Some(self.min.map_or(elapsed, |m| m.min(elapsed)));
        self.max = self.max.max(elapsed);
        self.last_called = Some(Utc::now());
        if !success {
            self.errors += 1;
        }
        self.recent.push_back(elapsed);
        if self.recent.len() > RECENT_WINDOW {
            self.recent.pop_front();
        }
    }

    fn average_secs(&self) -> f64 {
        if self.calls == 0 { 0.0 } else { self.total.as_secs_f64() / self.calls as f64 }
    }

    fn success_rate(&self) -> f64 {
        if self.calls == 0 { 0.0 } else { (self.calls - self.errors) as f64 / self.calls as f64 * 100.0 }
    }

    fn recent_average_secs(&self, window: usize) -> f64 {
        let n = self.recent.len().min(window);
        if n == 0 {
            return 0.0;
        }
        self.recent.iter().rev().take(n).map(Duration::as_secs_f64).sum::<f64>() / n as f64
    }
}

/// Per-operation call timing, shared by the dispatcher and the report tool.
///
/// Owned by the process entry point and passed around behind an `Arc`.
#[derive(Debug, Default)]
pub struct PerformanceMonitor {
    ops: Mutex<HashMap<String, OpStats>>,
}

impl PerformanceMonitor {
    /// Empty monitor.
    pub fn new() -> Self {
        Self::default()
    }

    fn ops(&self) -> MutexGuard<'_, HashMap<String, OpStats>> {
        self.ops.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record one call of `operation`.
    pub fn record(&self, operation: &str, elapsed: Duration, success: bool) {
        self.ops().entry(operation.to_string()).or_default().add(elapsed, success);
        if elapsed > SLOW_OPERATION {
            warn!(operation, elapsed_ms = elapsed.as_millis() as u64, "slow operation");
        }
    }

    /// Totals plus the five slowest and five most used operations.
    pub fn summary(&self) -> Value {
        let ops = self.ops();
        let total_operations: u64 = ops.values().map(|s| s.calls).sum();
        let total_errors: u64 = ops.values().map(|s| s.errors).sum();
        let overall = if total_operations == 0 {
            0.0
        } else {
            (total_operations - total_errors) as f64 / total_operations as f64 * 100.0
        };

        let mut slowest: Vec<(&String, f64)> = ops.iter().map(|(k, s)| (k, s.average_secs())).collect();
        slowest.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        let mut most_used: Vec<(&String, u64)> = ops.iter().map(|(k, s)| (k, s.calls)).collect();
        most_used.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        json!({
            "total_operations": total_operations,
            "total_errors": total_errors,
            "overall_success_rate": overall,
            "slowest_operations": slowest.iter().take(5).map(|(k, v)| json!([k, v])).collect::<Vec<_>>(),
            "most_used_operations": most_used.iter().take(5).map(|(k, v)| json!([k, v])).collect::<Vec<_>>(),
            "monitored_operations": ops.len(),
        })
    }

    /// Per-operation detail keyed by operation name.
    pub fn detailed(&self) -> Value {
        let ops = self.ops();
        let mut out = Map::new();
        for (name, s) in ops.iter() {
            out.insert(
                name.clone(),
                json!({
                    "total_calls": s.calls,
                    "average_time": s.average_secs(),
                    "recent_average_time": s.recent_average_secs(10),
                    "min_time": s.min.map_or(0.0, |d| d.as_secs_f64()),
                    "max_time": s.max.as_secs_f64(),
                    "success_rate": s.success_rate(),
                    "error_count": s.errors,
                    "last_called": s.last_called.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true)),
                }),
            );
        }
        Value::Object(out)
    }

    /// `{timestamp, summary, detailed_metrics}`.
    pub fn report(&self) -> Value {
        json!({
            "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            "summary": self.summary(),
            "detailed_metrics": self.detailed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_calls_and_errors() {
        let m = PerformanceMonitor::new();
        m.record("list_jobs", Duration::from_millis(100), true);
        m.record("list_jobs", Duration::from_millis(300), false);
        m.record("get_job", Duration::from_millis(50), true);

        let s = m.summary();
        assert_eq!(s["total_operations"], 3);
        assert_eq!(s["total_errors"], 1);
        assert_eq!(s["monitored_operations"], 2);
        assert_eq!(s["most_used_operations"][0], json!(["list_jobs", 2]));
        assert_eq!(s["slowest_operations"][0][0], "list_jobs");

        let d = m.detailed();
        assert_eq!(d["list_jobs"]["success_rate"], 50.0);
        assert_eq!(d["list_jobs"]["min_time"], 0.1);
        assert_eq!(d["list_jobs"]["max_time"], 0.3);
    }

    #[test]
    fn recent_window_is_bounded() {
        let m = PerformanceMonitor::new();
        for i in 0..150 {
            m.record("ping", Duration::from_millis(i), true);
        }
        assert_eq!(m.ops()["ping"].recent.len(), RECENT_WINDOW);
    }
}
