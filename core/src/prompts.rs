//! Static prompt catalog with `{argument}` placeholder substitution.

use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Prompt lookup/render failure.
#[derive(Debug, Error, PartialEq)]
pub enum PromptError {
    /// No prompt with that name.
    #[error("Prompt '{0}' not found")]
    NotFound(String),
}

/// One declared prompt argument.
#[derive(Debug, Serialize)]
pub struct PromptArg {
    /// Placeholder name.
    pub name: &'static str,
    /// Shown to the user.
    pub description: &'static str,
    /// Whether the caller must supply it.
    pub required: bool,
}

/// One prompt definition.
#[derive(Debug, Serialize)]
pub struct PromptDef {
    /// Unique name.
    pub name: &'static str,
    /// Catalog group.
    #[serde(skip)]
    pub group: &'static str,
    /// One-line summary.
    pub description: &'static str,
    /// Declared arguments.
    pub arguments: &'static [PromptArg],
    /// Markdown body with `{argument}` placeholders.
    #[serde(skip)]
    pub template: &'static str,
}

const fn arg(name: &'static str, description: &'static str) -> PromptArg {
    PromptArg { name, description, required: false }
}

/// Every prompt, grouped by purpose.
pub static PROMPTS: &[PromptDef] = &[
    PromptDef {
        name: "create_job_flow",
        group: "job_management",
        description: "Interactive flow to create a new cron job with step-by-step guidance",
        arguments: &[arg("job_type", "Type of job to create"), arg("complexity", "Complexity level: basic, intermediate, or advanced")],
        template: "# Create a New Cron Job\n\n\
Job type: {job_type}\nComplexity: {complexity}\n\n\
1. Pick a name using letters, numbers, `-` or `_` (max 50 characters).\n\
2. Give the webhook URL (http:// or https://) and HTTP method.\n\
3. Add headers and a body if the endpoint needs them.\n\
4. Choose a 5-field cron schedule; `cronlytic://templates/cron` lists common ones.\n\
5. Call `create_job` and confirm the next run time it reports.\n",
    },
    PromptDef {
        name: "update_job_flow",
        group: "job_management",
        description: "Interactive flow to update existing cron jobs with guided assistance",
        arguments: &[arg("job_id", "ID of the job to update"), arg("update_type", "Type of update needed")],
        template: "# Update Existing Cron Job\n\n\
Job: {job_id}\nChange requested: {update_type}\n\n\
1. Fetch the current configuration with `get_job`.\n\
2. Decide which fields change (schedule, URL, method, headers, body).\n\
3. Call `update_job` with the full configuration, changed and unchanged fields alike.\n\
4. Check the returned next run time and recent logs with `get_job_logs`.\n",
    },
    PromptDef {
        name: "job_monitoring_dashboard",
        group: "job_management",
        description: "Job monitoring and health dashboard guide",
        arguments: &[arg("time_range", "Time range for monitoring data"), arg("focus_area", "Specific area to focus on")],
        template: "# Job Monitoring Dashboard\n\n\
Time range: {time_range}\nFocus: {focus_area}\n\n\
- `list_jobs` gives the status breakdown across all jobs.\n\
- `cronlytic://job/{id}/logs` gives success rate and recent failures per job.\n\
- Paused jobs can be resumed with `resume_job`.\n",
    },
    PromptDef {
        name: "bulk_job_operations",
        group: "job_management",
        description: "Guide for managing many jobs with batch operations",
        arguments: &[arg("operation_type", "Type of bulk operation to perform"), arg("job_filter", "Criteria for selecting jobs")],
        template: "# Bulk Job Operations\n\n\
Operation: {operation_type}\nSelection: {job_filter}\n\n\
1. Use `list_jobs` and pick out the matching job ids.\n\
2. Apply `pause_job`, `resume_job`, `update_job` or `delete_job` one id at a time.\n\
3. Stop at the first failure and check its error before continuing.\n\
4. Run `list_jobs` again to confirm every job reached the intended state.\n",
    },
    PromptDef {
        name: "setup_configuration",
        group: "api_integration",
        description: "Setup guide for Cronlytic MCP server configuration",
        arguments: &[arg("setup_stage", "Current setup stage or area needing help"), arg("environment", "Target environment (development, staging, production)")],
        template: "# Cronlytic MCP Server Setup\n\n\
Stage: {setup_stage}\nEnvironment: {environment}\n\n\
Credentials are read, highest priority first, from command-line flags, the \
`CRONLYTIC_API_KEY` / `CRONLYTIC_USER_ID` environment variables, then \
`./cronlytic_config.json`, `~/.cronlytic/config.json` or `/etc/cronlytic/config.json`.\n\n\
Run `cronlytic-mcp init-config` to write an example file, then `health_check` to verify.\n",
    },
    PromptDef {
        name: "authentication_guide",
        group: "api_integration",
        description: "Guide for authentication setup and troubleshooting",
        arguments: &[arg("auth_issue", "Specific authentication issue or setup question")],
        template: "# Authentication Guide\n\n\
Issue: {auth_issue}\n\n\
Every request carries `X-API-Key` and `X-User-ID` headers built from the configured credentials.\n\n\
- 401 means the key or user id is wrong; copy both again from the Cronlytic dashboard.\n\
- 403 usually means a plan limit; the error lists the plan details.\n\
- `health_check` reports whether authentication succeeded without touching any job.\n",
    },
    PromptDef {
        name: "claude_desktop_integration",
        group: "api_integration",
        description: "Step-by-step guide for integrating with Claude Desktop",
        arguments: &[arg("integration_step", "Current integration step or issue"), arg("operating_system", "Operating system (macOS, Windows, Linux)")],
        template: "# Claude Desktop Integration\n\n\
Step: {integration_step}\nOperating system: {operating_system}\n\n\
1. Install the `cronlytic-mcp` binary somewhere on a stable path.\n\
2. Add an entry under `mcpServers` in `claude_desktop_config.json` whose `command` is that path.\n\
3. Pass `CRONLYTIC_API_KEY` and `CRONLYTIC_USER_ID` in the entry's `env` block.\n\
4. Restart Claude Desktop and ask it to run `health_check`.\n\n\
Server logs go to stderr, so the desktop log viewer shows them.\n",
    },
    PromptDef {
        name: "webhook_testing_guide",
        group: "api_integration",
        description: "Guide for testing webhooks and endpoints",
        arguments: &[arg("webhook_url", "The webhook URL to test"), arg("http_method", "HTTP method for the webhook"), arg("test_type", "Type of testing to perform (basic, comprehensive, load)")],
        template: "# Webhook Testing Guide\n\n\
Endpoint: {http_method} {webhook_url}\nTest type: {test_type}\n\n\
1. Create a job on a frequent schedule such as `*/5 * * * *`.\n\
2. Watch `get_job_logs` for response codes and durations.\n\
3. Move to the real schedule with `update_job` once runs succeed.\n",
    },
    PromptDef {
        name: "api_troubleshooting_guide",
        group: "api_integration",
        description: "API and integration troubleshooting assistance",
        arguments: &[arg("problem_type", "Type of API or integration problem"), arg("error_message", "Specific error message or symptom")],
        template: "# API Troubleshooting\n\n\
Problem: {problem_type}\nError: {error_message}\n\n\
- Connection errors: check `base_url` and network access, then rerun `health_check`.\n\
- Timeouts: raise `timeout` in the configuration or check the API status.\n\
- 429 responses: requests are retried with backoff; lower the call rate if they persist.\n\
- 5xx responses: retried automatically up to `max_retries` times.\n",
    },
    PromptDef {
        name: "job_troubleshooting_guide",
        group: "troubleshooting",
        description: "Troubleshooting assistance for job issues",
        arguments: &[arg("issue_type", "Type of issue encountered"), arg("job_id", "Specific job having issues")],
        template: "# Job Troubleshooting\n\n\
Issue: {issue_type}\nJob: {job_id}\n\n\
- Not running: check the job status and that the cron expression means what you expect.\n\
- Failing: read `error_message` and `response_code` in `get_job_logs`.\n\
- Limits: an `AuthorizationError` with plan details means the job quota is reached.\n",
    },
    PromptDef {
        name: "system_diagnostics",
        group: "troubleshooting",
        description: "System health check and diagnostics guide",
        arguments: &[arg("diagnostic_level", "Level of diagnostics: quick, standard, or comprehensive"), arg("focus_area", "Specific area to focus diagnostics on")],
        template: "# System Diagnostics\n\n\
Level: {diagnostic_level}\nFocus: {focus_area}\n\n\
1. Run `health_check` for connectivity, authentication and latency.\n\
2. Run `get_performance_report` to see per-tool timings and error rates.\n\
3. Start the server with `--debug` for request-level logs on stderr.\n",
    },
    PromptDef {
        name: "error_analysis_guide",
        group: "troubleshooting",
        description: "Error pattern analysis and resolution guide",
        arguments: &[arg("error_type", "Type of errors to analyze"), arg("time_period", "Time period for error analysis")],
        template: "# Error Analysis\n\n\
Errors: {error_type}\nPeriod: {time_period}\n\n\
1. Pull recent runs for each affected job with `get_job_logs`.\n\
2. Group failures by `response_code` and `error_message`.\n\
3. Repeated 4xx codes point at the webhook configuration; 5xx codes point at the endpoint.\n\
4. `get_performance_report` shows which tools fail most often on this side.\n",
    },
    PromptDef {
        name: "performance_optimization",
        group: "troubleshooting",
        description: "Performance analysis and optimization guide",
        arguments: &[arg("optimization_focus", "Area to focus optimization efforts on"), arg("performance_metric", "Specific performance metric to improve")],
        template: "# Performance Optimization\n\n\
Focus: {optimization_focus}\nMetric: {performance_metric}\n\n\
- `get_performance_report` lists average and slowest times per tool.\n\
- Job logs show webhook durations; slow endpoints are the usual cause of long runs.\n\
- Spread jobs that share an endpoint across different minutes.\n",
    },
    PromptDef {
        name: "maintenance_guide",
        group: "troubleshooting",
        description: "Preventive maintenance and system care guide",
        arguments: &[arg("maintenance_type", "Type of maintenance needed"), arg("schedule", "Maintenance schedule preference")],
        template: "# Maintenance Guide\n\n\
Maintenance: {maintenance_type}\nSchedule: {schedule}\n\n\
- Daily: run `health_check` and scan failed runs in `get_job_logs`.\n\
- Weekly: review paused jobs and delete the ones nobody needs.\n\
- Monthly: rotate the API key and review schedules against current load.\n",
    },
    PromptDef {
        name: "best_practices_guide",
        group: "workflow_optimization",
        description: "Best practices for scheduling and webhook design",
        arguments: &[arg("practice_area", "Area of interest"), arg("experience_level", "Experience level")],
        template: "# Best Practices\n\n\
Area: {practice_area}\nLevel: {experience_level}\n\n\
- Make webhooks idempotent; a run may be retried.\n\
- Avoid every-minute schedules unless the work needs it.\n\
- Stagger jobs instead of scheduling them all on the hour.\n\
- Name jobs after what they do so logs read clearly.\n",
    },
    PromptDef {
        name: "schedule_optimization",
        group: "workflow_optimization",
        description: "Guide for tuning cron schedules",
        arguments: &[arg("optimization_goal", "What to optimize for"), arg("current_schedule_pattern", "Cron expression currently in use")],
        template: "# Schedule Optimization\n\n\
Goal: {optimization_goal}\nCurrent schedule: `{current_schedule_pattern}`\n\n\
Compare the current schedule against `cronlytic://templates/cron` and the job's \
execution history; lower frequency where runs find nothing to do.\n",
    },
    PromptDef {
        name: "automation_strategies",
        group: "workflow_optimization",
        description: "Automation strategies for efficient operations",
        arguments: &[
            arg("automation_scope", "Scope of automation to implement"),
            arg("current_automation_level", "Current level of automation in place"),
            arg("service_name", "Name of the service or system to automate"),
            arg("endpoint_url", "Base URL of the service endpoint to automate"),
        ],
        template: "# Automation Strategies\n\n\
Scope: {automation_scope}\nCurrent level: {current_automation_level}\n\
Service: {service_name} at {endpoint_url}\n\n\
1. Create a `{service_name}-health-check` job that calls `{endpoint_url}/health` every 5 minutes.\n\
2. Add cleanup and report jobs on daily schedules outside peak hours.\n\
3. Review failures weekly and pause jobs that fail repeatedly.\n",
    },
    PromptDef {
        name: "scaling_strategies",
        group: "workflow_optimization",
        description: "Scaling strategies for growing job management needs",
        arguments: &[arg("growth_scenario", "Expected growth scenario or scaling challenge"), arg("current_scale", "Current scale of operations")],
        template: "# Scaling Strategies\n\n\
Scenario: {growth_scenario}\nCurrent scale: {current_scale}\n\n\
- Check the plan's job limit before adding jobs in bulk.\n\
- Use a naming scheme such as `team-service-task` so `list_jobs` stays readable.\n\
- Spread schedules across the hour so endpoints do not see bursts.\n\
- Move heavy work behind a queue and let the webhook only enqueue it.\n",
    },
];

/// Definition by name.
pub fn find(name: &str) -> Option<&'static PromptDef> {
    PROMPTS.iter().find(|p| p.name == name)
}

/// `prompts/list` payload entries.
pub fn list() -> Vec<Value> {
    PROMPTS.iter().map(|p| json!(p)).collect()
}

/// Fill the template for `name`. Unknown placeholders stay as written.
pub fn render(name: &str, args: &Map<String, Value>) -> Result<(&'static PromptDef, String), PromptError> {
    let def = find(name).ok_or_else(|| PromptError::NotFound(name.to_string()))?;
    let mut text = def.template.to_string();
    for (key, value) in args {
        let value = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        text = text.replace(&format!("{{{key}}}"), &value);
    }
    Ok((def, text))
}

/// `prompts/get` result. Failures become a single user message.
pub fn get_prompt(name: &str, args: &Map<String, Value>) -> Value {
    match render(name, args) {
        Ok((def, text)) => json!({
            "description": def.description,
            "messages": [{ "role": "user", "content": { "type": "text", "text": text } }],
        }),
        Err(e) => json!({
            "description": format!("Error loading prompt: {name}"),
            "messages": [{
                "role": "user",
                "content": { "type": "text", "text": format!("Error loading prompt '{name}': {e}") },
            }],
        }),
    }
}
