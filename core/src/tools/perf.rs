use serde_json::{json, Value};

use crate::monitor::PerformanceMonitor;

/// Report on recorded tool timings in `summary`, `detailed` (default) or `json` form.
pub fn get_performance_report(monitor: &PerformanceMonitor, args: &Value) -> Value {
    let include_details = args.get("include_details").and_then(Value::as_bool).unwrap_or(true);
    let format = args.get("format").and_then(Value::as_str).unwrap_or("detailed");
    let report = monitor.report();
    let summary = &report["summary"];
    let rate = format!("{:.1}%", summary["overall_success_rate"].as_f64().unwrap_or(0.0));

    match format {
        "json" => json!({ "success": true, "format": "json", "report": report }),
        "summary" => json!({
            "success": true,
            "format": "summary",
            "timestamp": report["timestamp"],
            "summary": {
                "total_operations": summary["total_operations"],
                "total_errors": summary["total_errors"],
                "success_rate": rate,
                "monitored_operations": summary["monitored_operations"],
            },
        }),
        _ => {
            let pairs = |key: &str| -> Vec<(String, Value)> {
                summary[key]
                    .as_array()
                    .map(|a| {
                        a.iter()
                            .map(|p| (p[0].as_str().unwrap_or_default().to_string(), p[1].clone()))
                            .collect()
                    })
                    .unwrap_or_default()
            };
            let slowest: Vec<String> = pairs("slowest_operations")
                .into_iter()
                .map(|(name, t)| format!("{name}: {:.3}s avg", t.as_f64().unwrap_or(0.0)))
                .collect();
            let most_used: Vec<String> = pairs("most_used_operations")
                .into_iter()
                .map(|(name, n)| format!("{name}: {n} calls"))
                .collect();

            let mut out = json!({
                "success": true,
                "format": "detailed",
                "timestamp": report["timestamp"],
                "performance_summary": {
                    "total_operations": summary["total_operations"],
                    "total_errors": summary["total_errors"],
                    "overall_success_rate": rate,
                    "monitored_operations": summary["monitored_operations"],
                    "slowest_operations": slowest,
                    "most_used_operations": most_used,
                },
            });
            let detailed = &report["detailed_metrics"];
            if include_details && detailed.as_object().is_some_and(|m| !m.is_empty()) {
                out["detailed_metrics"] = detailed.clone();
            }
            out
        }
    }
}
