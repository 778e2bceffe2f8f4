use serde_json::{json, Value};

/// Names of every exposed tool, in listing order.
pub const TOOL_NAMES: [&str; 10] = [
    "health_check",
    "create_job",
    "list_jobs",
    "get_job",
    "update_job",
    "delete_job",
    "pause_job",
    "resume_job",
    "get_job_logs",
    "get_performance_report",
];

const METHODS: [&str; 7] = ["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS"];
const CRON_PATTERN: &str = "^[0-9*,/-]+ [0-9*,/-]+ [0-9*,/-]+ [0-9*,/-]+ [0-9*,/-]+$";

fn job_id_schema(action: &str) -> Value {
    json!({
        "type": "string",
        "minLength": 1,
        "description": format!("Unique identifier of the job to {action}"),
    })
}

fn job_fields() -> serde_json::Map<String, Value> {
    let v = json!({
        "name": {
            "type": "string",
            "pattern": "^[a-zA-Z0-9_-]+$",
            "minLength": 1,
            "maxLength": 50,
            "description": "Job name (alphanumeric, hyphens, underscores only)",
        },
        "url": {
            "type": "string",
            "format": "uri",
            "description": "Webhook URL to call (must be http:// or https://)",
        },
        "method": {
            "type": "string",
            "enum": METHODS,
            "default": "GET",
            "description": "HTTP method for the webhook call",
        },
        "headers": {
            "type": "object",
            "additionalProperties": { "type": "string" },
            "default": {},
            "description": "HTTP headers to include with the request (can be empty {})",
        },
        "body": {
            "type": "string",
            "default": "",
            "description": "Request body content (can be empty string)",
        },
        "cron_expression": {
            "type": "string",
            "pattern": CRON_PATTERN,
            "description": "5-field cron expression (minute hour day month day-of-week)",
        },
    });
    match v {
        Value::Object(m) => m,
        _ => serde_json::Map::new(),
    }
}

fn single_job_tool(name: &str, description: &str, action: &str) -> Value {
    json!({
        "name": name,
        "description": description,
        "inputSchema": {
            "type": "object",
            "properties": { "job_id": job_id_schema(action) },
            "required": ["job_id"],
            "additionalProperties": false,
        },
    })
}

/// JSON-schema definitions for `tools/list`.
pub fn tool_definitions() -> Vec<Value> {
    let mut update_props = job_fields();
    update_props.insert("job_id".into(), job_id_schema("update"));

    vec![
        json!({
            "name": "health_check",
            "description": "Test connectivity and authentication with the Cronlytic API",
            "inputSchema": { "type": "object", "properties": {}, "required": [] },
        }),
        json!({
            "name": "create_job",
            "description": "Create a new cron job in Cronlytic with comprehensive validation",
            "inputSchema": {
                "type": "object",
                "properties": job_fields(),
                "required": ["name", "url", "method", "headers", "body", "cron_expression"],
            },
        }),
        json!({
            "name": "list_jobs",
            "description": "List all cron jobs for the authenticated user with status information",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "include_paused": {
                        "type": "boolean",
                        "default": true,
                        "description": "Whether to include paused jobs in the results",
                    },
                    "limit": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 100,
                        "default": 50,
                        "description": "Maximum number of jobs to return",
                    },
                },
                "additionalProperties": false,
            },
        }),
        single_job_tool("get_job", "Get detailed information about a specific cron job by ID", "retrieve"),
        json!({
            "name": "update_job",
            "description": "Update an existing cron job with new configuration",
            "inputSchema": {
                "type": "object",
                "properties": update_props,
                "required": ["job_id", "name", "url", "cron_expression"],
            },
        }),
        json!({
            "name": "delete_job",
            "description": "Permanently delete a cron job (this action cannot be undone)",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "job_id": job_id_schema("delete"),
                    "confirm": {
                        "type": "boolean",
                        "default": false,
                        "description": "Confirmation that you want to permanently delete this job",
                    },
                },
                "required": ["job_id"],
                "additionalProperties": false,
            },
        }),
        single_job_tool("pause_job", "Pause execution of a specific cron job", "pause"),
        single_job_tool("resume_job", "Resume execution of a paused cron job", "resume"),
        json!({
            "name": "get_job_logs",
            "description": "Retrieve execution logs for a specific cron job",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "job_id": job_id_schema("get logs for"),
                    "limit": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 100,
                        "default": 20,
                        "description": "Maximum number of log entries to return (default: 20)",
                    },
                },
                "required": ["job_id"],
                "additionalProperties": false,
            },
        }),
        json!({
            "name": "get_performance_report",
            "description": "Get performance metrics and monitoring data for the MCP server",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "include_details": {
                        "type": "boolean",
                        "default": true,
                        "description": "Include detailed metrics for each operation",
                    },
                    "format": {
                        "type": "string",
                        "enum": ["summary", "detailed", "json"],
                        "default": "detailed",
                        "description": "Format of the performance report",
                    },
                },
                "additionalProperties": false,
            },
        }),
    ]
}
