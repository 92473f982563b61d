use async_trait::async_trait;
use serde_json::Value;

use super::error::AgentError;
use super::tool::ToolRegistry;

/// Everything a runner needs for one invocation
#[derive(Clone)]
pub struct AgentRequest {
    pub name: String,
    pub instructions: String,
    pub input: String,
    pub tools: ToolRegistry,
    /// Tool servers to attach, by name in the tool-server settings file
    pub mcp_servers: Vec<String>,
}

/// One tool invocation made during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallRecord {
    pub name: String,
    pub arguments: String,
    pub output: String,
    pub is_error: bool,
}

/// Normalized result of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRunOutput {
    pub final_output: String,
    pub tool_calls: Vec<ToolCallRecord>,
    pub iterations: usize,
}

impl AgentRunOutput {
    /// Build the output from a raw terminal payload, see [`extract_final_text`]
    pub fn from_raw(raw: &Value, tool_calls: Vec<ToolCallRecord>, iterations: usize) -> Self {
        Self {
            final_output: extract_final_text(raw),
            tool_calls,
            iterations,
        }
    }
}

/// Drives a model through its tool-calling loop and returns one final answer
#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn run(&self, request: AgentRequest) -> Result<AgentRunOutput, AgentError>;
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Concatenate `output_text` parts from a Responses-style `output` array
fn output_array_text(items: &[Value]) -> Option<String> {
    let parts: Vec<&str> = items
        .iter()
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .filter(|part| part.get("type").and_then(Value::as_str) == Some("output_text"))
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(""))
    }
}

/// Pull the final answer out of a runner payload.
///
/// Shapes are probed in a fixed order: `response.value`, `output`,
/// `final_output`, `choices[0].message.content`; anything else is returned
/// as the serialized payload. Null fields count as absent.
pub fn extract_final_text(raw: &Value) -> String {
    if let Some(value) = raw.pointer("/response/value").filter(|v| !v.is_null()) {
        return text_of(value);
    }

    if let Some(output) = raw.get("output").filter(|v| !v.is_null()) {
        return match output.as_array().and_then(|items| output_array_text(items)) {
            Some(text) => text,
            None => text_of(output),
        };
    }

    if let Some(value) = raw.get("final_output").filter(|v| !v.is_null()) {
        return text_of(value);
    }

    if let Some(content) = raw
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
    {
        return content.to_string();
    }

    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_value_wins() {
        let raw = json!({
            "response": { "value": "from response" },
            "output": "from output",
            "final_output": "from final_output"
        });
        assert_eq!(extract_final_text(&raw), "from response");
    }

    #[test]
    fn test_output_before_final_output() {
        let raw = json!({ "output": "from output", "final_output": "from final_output" });
        assert_eq!(extract_final_text(&raw), "from output");
    }

    #[test]
    fn test_final_output() {
        let raw = json!({ "response": null, "final_output": "done" });
        assert_eq!(extract_final_text(&raw), "done");
    }

    #[test]
    fn test_responses_output_array() {
        let raw = json!({
            "output": [
                { "type": "reasoning", "summary": [] },
                { "type": "message", "content": [
                    { "type": "output_text", "text": "Hello " },
                    { "type": "output_text", "text": "there" }
                ]}
            ]
        });
        assert_eq!(extract_final_text(&raw), "Hello there");
    }

    #[test]
    fn test_chat_completion_content() {
        let raw = json!({
            "choices": [{ "message": { "role": "assistant", "content": "4" } }]
        });
        assert_eq!(extract_final_text(&raw), "4");
    }

    #[test]
    fn test_non_string_values_are_serialized() {
        assert_eq!(
            extract_final_text(&json!({ "final_output": { "answer": 4 } })),
            r#"{"answer":4}"#
        );
    }

    #[test]
    fn test_unknown_shape_falls_back_to_whole_payload() {
        let raw = json!({ "status": "completed" });
        assert_eq!(extract_final_text(&raw), r#"{"status":"completed"}"#);
    }
}
