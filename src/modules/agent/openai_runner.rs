use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::AgentError;
use super::mcp::{McpLauncher, McpToolset};
use super::runner::{AgentRequest, AgentRunOutput, AgentRunner, ToolCallRecord};
use super::tool::{ToolDefinition, ToolOutput};
use crate::core::config::AgentConfig;

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    id: String,
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    arguments: Option<String>,
}

impl FunctionCall {
    /// Raw argument text; models may send `null` or omit it for no-arg calls
    fn raw_arguments(&self) -> &str {
        self.arguments.as_deref().unwrap_or("")
    }
}

/// Agent runner speaking the chat-completions tool-calling protocol
pub struct OpenAiAgentRunner {
    client: reqwest::Client,
    config: AgentConfig,
    mcp: McpLauncher,
}

impl OpenAiAgentRunner {
    pub fn new(config: AgentConfig, mcp: McpLauncher) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.run_timeout())
            .build()?;

        Ok(Self {
            client,
            config,
            mcp,
        })
    }

    async fn complete(&self, api_key: &str, body: &Value) -> Result<Value, AgentError> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(AgentError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text)
            .map_err(|e| AgentError::InvalidResponse(format!("{}: {}", e, text)))
    }

    async fn dispatch(
        &self,
        request: &AgentRequest,
        toolset: &McpToolset,
        call: &ToolCall,
    ) -> ToolOutput {
        let raw = call.function.raw_arguments();
        let arguments: Value = if raw.trim().is_empty() {
            json!({})
        } else {
            match serde_json::from_str(raw) {
                Ok(args) => args,
                Err(e) => {
                    return ToolOutput::error(format!(
                        "Invalid arguments for tool '{}': {}",
                        call.function.name, e
                    ))
                }
            }
        };

        if let Some(tool) = request.tools.get(&call.function.name) {
            tool.execute(arguments).await
        } else if toolset.contains(&call.function.name) {
            toolset.call(&call.function.name, arguments).await
        } else {
            ToolOutput::error(format!("Unknown tool: {}", call.function.name))
        }
    }

    async fn run_loop(
        &self,
        api_key: &str,
        request: &AgentRequest,
        toolset: &McpToolset,
    ) -> Result<AgentRunOutput, AgentError> {
        let tools: Vec<Value> = request
            .tools
            .definitions()
            .iter()
            .chain(toolset.definitions())
            .map(ToolDefinition::to_function_schema)
            .collect();

        let mut messages = vec![
            json!({ "role": "system", "content": request.instructions }),
            json!({ "role": "user", "content": request.input }),
        ];
        let mut tool_calls = Vec::new();

        for iteration in 1..=self.config.max_iterations {
            tracing::debug!("Agent '{}' iteration {}", request.name, iteration);

            let mut body = json!({
                "model": self.config.model,
                "messages": messages,
            });
            if !tools.is_empty() {
                body["tools"] = Value::Array(tools.clone());
            }

            let raw = self.complete(api_key, &body).await?;
            let completion: ChatCompletion = serde_json::from_value(raw.clone())
                .map_err(|e| AgentError::InvalidResponse(e.to_string()))?;
            let message = completion
                .choices
                .into_iter()
                .next()
                .map(|choice| choice.message)
                .ok_or_else(|| AgentError::InvalidResponse("No choices in response".to_string()))?;

            if message.tool_calls.is_empty() {
                tracing::info!(
                    "Agent '{}' finished after {} iterations and {} tool calls",
                    request.name,
                    iteration,
                    tool_calls.len()
                );
                return Ok(AgentRunOutput::from_raw(&raw, tool_calls, iteration));
            }

            // The assistant turn must precede the tool results it asked for
            let assistant_turn = raw
                .pointer("/choices/0/message")
                .cloned()
                .unwrap_or_else(|| json!({ "role": "assistant", "content": message.content }));
            messages.push(assistant_turn);

            for call in &message.tool_calls {
                tracing::info!("Agent '{}' calling tool {}", request.name, call.function.name);

                let output = self.dispatch(request, toolset, call).await;
                if output.is_error {
                    tracing::warn!("Tool {} returned error: {}", call.function.name, output.content);
                }

                messages.push(json!({
                    "role": "tool",
                    "tool_call_id": call.id,
                    "content": output.content,
                }));
                tool_calls.push(ToolCallRecord {
                    name: call.function.name.clone(),
                    arguments: call.function.raw_arguments().to_string(),
                    output: output.content,
                    is_error: output.is_error,
                });
            }
        }

        Err(AgentError::MaxIterations(self.config.max_iterations))
    }
}

#[async_trait]
impl AgentRunner for OpenAiAgentRunner {
    async fn run(&self, request: AgentRequest) -> Result<AgentRunOutput, AgentError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(AgentError::MissingApiKey)?;

        let toolset = self.mcp.launch(&request.mcp_servers).await?;
        tracing::debug!(
            "Agent '{}' starting with {} local tools and {} MCP servers",
            request.name,
            request.tools.names().len(),
            toolset.server_count()
        );
        let result = self.run_loop(api_key, &request, &toolset).await;
        toolset.shutdown().await;

        result
    }
}
