//! Newline-delimited JSON-RPC 2.0 over a child process's stdio.

use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use super::settings::McpServerSettings;
use crate::modules::agent::error::McpError;
use crate::modules::agent::tool::ToolOutput;

const PROTOCOL_VERSION: &str = "2024-11-05";

/// Tool advertised by a server in `tools/list`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpTool {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub input_schema: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

/// A running tool server and its request channel
pub struct McpSession {
    name: String,
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    timeout: Duration,
}

impl std::fmt::Debug for McpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpSession")
            .field("name", &self.name)
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

impl McpSession {
    /// Spawn the server process and perform the initialize handshake
    pub async fn start(
        name: &str,
        settings: &McpServerSettings,
        timeout: Duration,
    ) -> Result<Self, McpError> {
        let mut child = Command::new(&settings.command)
            .args(&settings.args)
            .envs(&settings.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| McpError::Spawn {
                name: name.to_string(),
                source,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::Transport(format!("{}: stdin not captured", name)))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::Transport(format!("{}: stdout not captured", name)))?;

        let mut session = Self {
            name: name.to_string(),
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 1,
            timeout,
        };

        session.initialize().await?;
        Ok(session)
    }

    async fn initialize(&mut self) -> Result<(), McpError> {
        let result = self
            .request(
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": env!("CARGO_PKG_NAME"),
                        "version": env!("CARGO_PKG_VERSION"),
                    }
                }),
            )
            .await?;

        let server_name = server_info_name(&result);
        tracing::debug!("MCP server {} initialized: {}", self.name, server_name);

        self.notify("notifications/initialized", json!({})).await
    }

    async fn write_message(&mut self, message: &Value) -> Result<(), McpError> {
        let mut line = serde_json::to_string(message)
            .map_err(|e| McpError::Transport(format!("Serialize failed: {}", e)))?;
        line.push('\n');

        self.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| McpError::Transport(format!("Write failed: {}", e)))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| McpError::Transport(format!("Flush failed: {}", e)))
    }

    async fn notify(&mut self, method: &str, params: Value) -> Result<(), McpError> {
        self.write_message(&json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        }))
        .await
    }

    /// Send a request and wait for the response carrying the same id
    pub async fn request(&mut self, method: &str, params: Value) -> Result<Value, McpError> {
        let id = self.next_id;
        self.next_id += 1;

        self.write_message(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        }))
        .await?;

        match tokio::time::timeout(self.timeout, self.read_response(id)).await {
            Ok(result) => result,
            Err(_) => Err(McpError::Timeout {
                method: method.to_string(),
            }),
        }
    }

    async fn read_response(&mut self, id: u64) -> Result<Value, McpError> {
        loop {
            let line = self
                .stdout
                .next_line()
                .await
                .map_err(|e| McpError::Transport(format!("Read failed: {}", e)))?
                .ok_or_else(|| {
                    McpError::Transport(format!("MCP server {} closed its output", self.name))
                })?;

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            // Servers interleave notifications and log lines with responses
            let response: JsonRpcResponse = match serde_json::from_str(line) {
                Ok(response) => response,
                Err(_) => {
                    tracing::debug!("MCP {}: ignoring non JSON-RPC line", self.name);
                    continue;
                }
            };

            if response.id.as_ref().and_then(Value::as_u64) != Some(id) {
                continue;
            }

            if let Some(err) = response.error {
                return Err(McpError::JsonRpc {
                    code: err.code,
                    message: err.message,
                });
            }

            return Ok(response.result.unwrap_or(Value::Null));
        }
    }

    pub async fn list_tools(&mut self) -> Result<Vec<McpTool>, McpError> {
        let result = self.request("tools/list", json!({})).await?;
        let tools = result.get("tools").cloned().unwrap_or_else(|| json!([]));

        serde_json::from_value(tools)
            .map_err(|e| McpError::Transport(format!("Invalid tools/list result: {}", e)))
    }

    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<ToolOutput, McpError> {
        let result = self
            .request("tools/call", json!({ "name": name, "arguments": arguments }))
            .await?;
        Ok(call_result_to_output(&result))
    }

    pub async fn shutdown(mut self) {
        let _ = self.stdin.shutdown().await;
        if let Err(e) = self.child.kill().await {
            tracing::debug!("MCP server {} already exited: {}", self.name, e);
        }
    }
}

/// Name a server reports in its `initialize` result
fn server_info_name(result: &Value) -> &str {
    result
        .pointer("/serverInfo/name")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
}

/// Flatten a `tools/call` result into the text handed to the model
pub fn call_result_to_output(result: &Value) -> ToolOutput {
    let is_error = result
        .get("isError")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let text_parts: Vec<&str> = result
        .get("content")
        .and_then(Value::as_array)
        .map(|blocks| {
            blocks
                .iter()
                .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|b| b.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    let mut text = text_parts.join("\n");
    if text.trim().is_empty() {
        text = match result.get("structuredContent") {
            Some(structured) => structured.to_string(),
            None => result.to_string(),
        };
    }

    if is_error {
        ToolOutput::error(text)
    } else {
        ToolOutput::success(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_call_result_text_blocks() {
        let result = json!({
            "content": [
                { "type": "text", "text": "line one" },
                { "type": "image", "data": "...", "mimeType": "image/png" },
                { "type": "text", "text": "line two" }
            ]
        });
        assert_eq!(
            call_result_to_output(&result),
            ToolOutput::success("line one\nline two")
        );
    }

    #[test]
    fn test_call_result_error_flag() {
        let result = json!({
            "isError": true,
            "content": [{ "type": "text", "text": "no such file" }]
        });
        assert_eq!(call_result_to_output(&result), ToolOutput::error("no such file"));
    }

    #[test]
    fn test_call_result_structured_fallback() {
        let result = json!({ "content": [], "structuredContent": { "temp": 21 } });
        assert_eq!(
            call_result_to_output(&result),
            ToolOutput::success(r#"{"temp":21}"#)
        );
    }

    #[test]
    fn test_server_info_name() {
        let result = json!({ "serverInfo": { "name": "scripted", "version": "0" } });
        assert_eq!(server_info_name(&result), "scripted");
        assert_eq!(server_info_name(&json!({ "capabilities": {} })), "unknown");
    }

    #[test]
    fn test_tool_list_entry_parses() {
        let tool: McpTool = serde_json::from_value(json!({
            "name": "fetch",
            "description": "Fetch a URL",
            "inputSchema": { "type": "object", "properties": { "url": { "type": "string" } } }
        }))
        .unwrap();

        assert_eq!(tool.name, "fetch");
        assert!(tool.input_schema.get("properties").is_some());
    }

    #[tokio::test]
    async fn test_spawn_failure_names_server() {
        let settings = McpServerSettings {
            command: "definitely-not-an-installed-mcp-server".to_string(),
            args: vec![],
            env: BTreeMap::new(),
            description: None,
        };

        let err = McpSession::start("ghost", &settings, Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(matches!(err, McpError::Spawn { ref name, .. } if name == "ghost"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_server_that_exits_is_transport_error() {
        let settings = McpServerSettings {
            command: "true".to_string(),
            args: vec![],
            env: BTreeMap::new(),
            description: None,
        };

        let err = McpSession::start("quitter", &settings, Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(err, McpError::Transport(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_handshake_list_and_call_against_scripted_server() {
        // Replies to initialize (id 1), tools/list (id 2) and tools/call (id 3) in order,
        // with a log line and a notification mixed in.
        let script = r#"
read line; echo 'starting up'
echo '{"jsonrpc":"2.0","id":1,"result":{"protocolVersion":"2024-11-05","capabilities":{},"serverInfo":{"name":"scripted","version":"0"}}}'
read line
read line; echo '{"jsonrpc":"2.0","method":"notifications/message","params":{}}'
echo '{"jsonrpc":"2.0","id":2,"result":{"tools":[{"name":"now","description":"Current time","inputSchema":{"type":"object","properties":{}}}]}}'
read line; echo '{"jsonrpc":"2.0","id":3,"result":{"content":[{"type":"text","text":"12:00"}]}}'
read line
"#;
        let settings = McpServerSettings {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            env: BTreeMap::new(),
            description: None,
        };

        let mut session = McpSession::start("clock", &settings, Duration::from_secs(5))
            .await
            .unwrap();

        let tools = session.list_tools().await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "now");
        assert_eq!(tools[0].description.as_deref(), Some("Current time"));

        let output = session.call_tool("now", json!({})).await.unwrap();
        assert_eq!(output, ToolOutput::success("12:00"));

        session.shutdown().await;
    }
}
