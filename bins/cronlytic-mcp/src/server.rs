//! MCP method dispatch: maps JSON-RPC requests onto the core tools,
//! resources and prompts.

use std::sync::Arc;

use cronlytic_core::monitor::PerformanceMonitor;
use cronlytic_core::tools::{tool_definitions, Tools};
use cronlytic_core::transport::{HttpTransport, Transport};
use cronlytic_core::{format, prompts, resources, ApiClient};
use serde_json::{json, Map, Value};
use tracing::{debug, error, warn};

use crate::jsonrpc::{self, JsonRpcRequest, RpcError, INVALID_REQUEST, METHOD_NOT_FOUND, MCP_VERSION, PARSE_ERROR};

pub const SERVER_NAME: &str = "cronlytic-mcp-server";

pub struct McpServer<T: Transport = HttpTransport> {
    tools: Tools<T>,
}

impl<T: Transport> McpServer<T> {
    pub fn new(client: Arc<ApiClient<T>>, monitor: Arc<PerformanceMonitor>) -> Self {
        Self { tools: Tools::new(client, monitor) }
    }

    /// One newline-delimited frame in, at most one response out.
    /// Malformed JSON is a parse error; valid JSON that is not a request
    /// object is an invalid request.
    pub async fn handle_line(&self, line: &str) -> Option<Value> {
        let frame: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                warn!("unparseable frame: {e}");
                return Some(jsonrpc::error(None, PARSE_ERROR, &format!("Parse error: {e}")));
            }
        };
        let id = frame.get("id").filter(|v| v.is_string() || v.is_number()).cloned();
        match serde_json::from_value::<JsonRpcRequest>(frame) {
            Ok(req) => self.handle(req).await,
            Err(e) => {
                warn!("malformed request: {e}");
                Some(jsonrpc::error(id, INVALID_REQUEST, &format!("Invalid Request: {e}")))
            }
        }
    }

    /// Notifications and id-less requests get no response.
    pub async fn handle(&self, req: JsonRpcRequest) -> Option<Value> {
        let JsonRpcRequest { jsonrpc, method, id, params } = req;
        if method.starts_with("notifications/") {
            debug!(%method, "notification");
            return None;
        }
        if jsonrpc.as_deref().is_some_and(|v| v != "2.0") {
            return Some(jsonrpc::error(id, INVALID_REQUEST, "Invalid Request: jsonrpc must be \"2.0\""));
        }
        let params = params.unwrap_or_else(|| json!({}));
        debug!(%method, "request");

        let result = match method.as_str() {
            "initialize" => Ok(initialize_result()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": tool_definitions() })),
            "tools/call" => self.call_tool(&params).await,
            "resources/list" => Ok(json!({ "resources": resources::list_resources(self.tools.client()).await })),
            "resources/read" => self.read_resource(&params).await,
            "prompts/list" => Ok(json!({ "prompts": prompts::list() })),
            "prompts/get" => get_prompt(&params),
            other => Err(RpcError::new(METHOD_NOT_FOUND, format!("Method not found: {other}"))),
        };

        let id = id?;
        Some(match result {
            Ok(v) => jsonrpc::response(Some(id), v),
            Err(e) => jsonrpc::error(Some(id), e.code, &e.message),
        })
    }

    async fn call_tool(&self, params: &Value) -> Result<Value, RpcError> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires a string 'name'"))?;
        let args = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        let Some(result) = self.tools.call(name, &args).await else {
            error!(tool = name, "unknown tool");
            return Ok(tool_text(format!("Error: Unknown tool: {name}"), true));
        };
        let success = result.get("success").and_then(Value::as_bool).unwrap_or(true);
        Ok(tool_text(format::render(name, &result), !success))
    }

    async fn read_resource(&self, params: &Value) -> Result<Value, RpcError> {
        let uri = params
            .get("uri")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("resources/read requires a string 'uri'"))?;
        let content = match resources::read_resource(self.tools.client(), uri).await {
            Ok(c) => c,
            Err(e) => {
                error!(%uri, "resource read failed: {e:#}");
                let body = json!({ "error": "Failed to read resource", "uri": uri, "message": format!("{e:#}") });
                json!({
                    "uri": uri,
                    "mimeType": "application/json",
                    "text": serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string()),
                })
            }
        };
        Ok(json!({ "contents": [content] }))
    }
}

fn get_prompt(params: &Value) -> Result<Value, RpcError> {
    let name = params
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::invalid_params("prompts/get requires a string 'name'"))?;
    let empty = Map::new();
    let args = params.get("arguments").and_then(Value::as_object).unwrap_or(&empty);
    Ok(prompts::get_prompt(name, args))
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": MCP_VERSION,
        "capabilities": { "tools": {}, "resources": {}, "prompts": {} },
        "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") },
    })
}

fn tool_text(text: String, is_error: bool) -> Value {
    json!({ "content": [{ "type": "text", "text": text }], "isError": is_error })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cronlytic_core::cfg::AuthConfig;
    use cronlytic_core::transport::{ApiRequest, RawResponse, TransportError};

    /// Every request is refused.
    struct Offline;

    #[async_trait]
    impl Transport for Offline {
        async fn send(&self, _request: &ApiRequest) -> Result<RawResponse, TransportError> {
            Err(TransportError::Connect("refused".into()))
        }
    }

    fn server() -> McpServer<Offline> {
        let cfg = AuthConfig::new("key", "user", "https://api.test/prog", 30, 0, 1.0).unwrap();
        McpServer::new(Arc::new(ApiClient::with_transport(cfg, Offline)), Arc::new(PerformanceMonitor::new()))
    }

    async fn call(line: Value) -> Value {
        server().handle_line(&line.to_string()).await.unwrap()
    }

    #[tokio::test]
    async fn initialize_reports_capabilities() {
        let r = call(json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}})).await;
        assert_eq!(r["id"], 1);
        assert_eq!(r["result"]["protocolVersion"], MCP_VERSION);
        assert_eq!(r["result"]["serverInfo"]["name"], SERVER_NAME);
    }

    #[tokio::test]
    async fn notifications_get_no_reply() {
        let s = server();
        let line = json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string();
        assert!(s.handle_line(&line).await.is_none());
    }

    #[tokio::test]
    async fn protocol_errors() {
        let r = server().handle_line("{not json").await.unwrap();
        assert_eq!(r["error"]["code"], PARSE_ERROR);
        assert!(r["id"].is_null());

        let r = call(json!({"jsonrpc": "2.0", "id": 2, "method": "bogus"})).await;
        assert_eq!(r["error"]["code"], METHOD_NOT_FOUND);

        let r = call(json!({"jsonrpc": "2.0", "id": 9})).await;
        assert_eq!(r["error"]["code"], INVALID_REQUEST);
        assert_eq!(r["id"], 9);

        let r = server().handle_line("[1, 2]").await.unwrap();
        assert_eq!(r["error"]["code"], INVALID_REQUEST);
        assert!(r["id"].is_null());

        let r = call(json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call", "params": {}})).await;
        assert_eq!(r["error"]["code"], jsonrpc::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn tools_list_has_ten_tools() {
        let r = call(json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})).await;
        assert_eq!(r["result"]["tools"].as_array().unwrap().len(), 10);
    }

    #[tokio::test]
    async fn validation_failure_is_tool_error() {
        let r = call(json!({
            "jsonrpc": "2.0", "id": 4, "method": "tools/call",
            "params": {"name": "get_job", "arguments": {"job_id": "x"}},
        }))
        .await;
        assert_eq!(r["result"]["isError"], true);
        let text = r["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("# Job Details Result"));
        assert!(text.contains("- **Field:** job_id"));
    }

    #[tokio::test]
    async fn unknown_tool_is_tool_error() {
        let r = call(json!({
            "jsonrpc": "2.0", "id": 5, "method": "tools/call", "params": {"name": "nope"},
        }))
        .await;
        assert_eq!(r["result"]["isError"], true);
        assert_eq!(r["result"]["content"][0]["text"], "Error: Unknown tool: nope");
    }

    #[tokio::test]
    async fn offline_resources_fall_back() {
        let r = call(json!({"jsonrpc": "2.0", "id": 6, "method": "resources/list"})).await;
        let uris: Vec<&str> = r["result"]["resources"].as_array().unwrap().iter().filter_map(|x| x["uri"].as_str()).collect();
        assert_eq!(uris, ["cronlytic://jobs", "cronlytic://templates/cron"]);

        let r = call(json!({
            "jsonrpc": "2.0", "id": 7, "method": "resources/read", "params": {"uri": "cronlytic://nowhere"},
        }))
        .await;
        let doc: Value = serde_json::from_str(r["result"]["contents"][0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(doc["error"], "Failed to read resource");
        assert_eq!(doc["uri"], "cronlytic://nowhere");
    }

    #[tokio::test]
    async fn prompt_substitution() {
        let r = call(json!({
            "jsonrpc": "2.0", "id": 8, "method": "prompts/get",
            "params": {"name": "job_troubleshooting_guide", "arguments": {"job_id": "abc"}},
        }))
        .await;
        let text = r["result"]["messages"][0]["content"]["text"].as_str().unwrap();
        assert!(text.contains("Job: abc"));
    }
}
