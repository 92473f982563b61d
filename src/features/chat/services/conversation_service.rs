use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinError;

use crate::modules::agent::{AgentError, AgentRequest, AgentRunOutput, AgentRunner, ToolRegistry};
use crate::shared::prompts::{render_chat_agent_instructions, TemplateError};

#[derive(Debug, Error)]
enum ConversationError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error("Agent run panicked: {0}")]
    Panicked(String),

    #[error("Agent task failed: {0}")]
    Task(String),
}

fn join_failure(e: JoinError) -> ConversationError {
    if !e.is_panic() {
        return ConversationError::Task(e.to_string());
    }

    let payload = e.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    ConversationError::Panicked(message)
}

/// Runs one agent invocation per user message
pub struct ConversationService {
    runner: Arc<dyn AgentRunner>,
    tools: ToolRegistry,
    mcp_servers: Vec<String>,
    agent_name: String,
    run_timeout: Duration,
}

impl ConversationService {
    pub fn new(
        runner: Arc<dyn AgentRunner>,
        tools: ToolRegistry,
        mcp_servers: Vec<String>,
        agent_name: impl Into<String>,
        run_timeout: Duration,
    ) -> Self {
        Self {
            runner,
            tools,
            mcp_servers,
            agent_name: agent_name.into(),
            run_timeout,
        }
    }

    /// Answer a user message. Failures are folded into the returned text.
    pub async fn handle(&self, user_input: &str) -> String {
        tracing::info!("Running agent for user input: {}", user_input);

        match self.run(user_input).await {
            Ok(output) => {
                for call in &output.tool_calls {
                    tracing::debug!(
                        "Tool call {}({}) -> {} (error: {})",
                        call.name,
                        call.arguments,
                        call.output,
                        call.is_error
                    );
                }
                tracing::info!(
                    "Agent finished in {} iterations. Response: {}",
                    output.iterations,
                    output.final_output
                );
                output.final_output
            }
            Err(e) => {
                tracing::error!("Error during agent run: {}", e);
                format!("❌ Error running agent: {}", e)
            }
        }
    }

    async fn run(&self, user_input: &str) -> Result<AgentRunOutput, ConversationError> {
        let instructions =
            render_chat_agent_instructions(&self.tools.names(), &self.mcp_servers, user_input)?;

        let request = AgentRequest {
            name: self.agent_name.clone(),
            instructions,
            input: user_input.to_string(),
            tools: self.tools.clone(),
            mcp_servers: self.mcp_servers.clone(),
        };

        // A separate task keeps a panicking runner or tool from taking the request down
        let runner = Arc::clone(&self.runner);
        let task = tokio::spawn(async move { runner.run(request).await });
        let abort = task.abort_handle();

        match tokio::time::timeout(self.run_timeout, task).await {
            Ok(Ok(result)) => Ok(result?),
            Ok(Err(e)) => Err(join_failure(e)),
            Err(_) => {
                abort.abort();
                Err(AgentError::Timeout(self.run_timeout.as_secs()).into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::modules::agent::{FnToolExecutor, ToolDefinition, ToolOutput};

    struct FixedRunner {
        answer: String,
        seen: Mutex<Option<AgentRequest>>,
    }

    #[async_trait]
    impl AgentRunner for FixedRunner {
        async fn run(&self, request: AgentRequest) -> Result<AgentRunOutput, AgentError> {
            *self.seen.lock().unwrap() = Some(request);
            Ok(AgentRunOutput {
                final_output: self.answer.clone(),
                tool_calls: vec![],
                iterations: 1,
            })
        }
    }

    struct FailingRunner;

    #[async_trait]
    impl AgentRunner for FailingRunner {
        async fn run(&self, _request: AgentRequest) -> Result<AgentRunOutput, AgentError> {
            Err(AgentError::Api {
                status: 503,
                body: "upstream unavailable".to_string(),
            })
        }
    }

    struct SlowRunner;

    #[async_trait]
    impl AgentRunner for SlowRunner {
        async fn run(&self, _request: AgentRequest) -> Result<AgentRunOutput, AgentError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Err(AgentError::MaxIterations(1))
        }
    }

    struct PanickingRunner;

    #[async_trait]
    impl AgentRunner for PanickingRunner {
        async fn run(&self, _request: AgentRequest) -> Result<AgentRunOutput, AgentError> {
            panic!("tool exploded");
        }
    }

    fn tools() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(FnToolExecutor::new(
            ToolDefinition::builder("weather_api")
                .string_param("location", "Where")
                .build(),
            |_args: serde_json::Value| async move { ToolOutput::success("sunny") },
        ));
        registry
    }

    fn service(runner: Arc<dyn AgentRunner>, timeout: Duration) -> ConversationService {
        ConversationService::new(
            runner,
            tools(),
            vec!["fetch".to_string(), "filesystem".to_string()],
            "MCP Agent",
            timeout,
        )
    }

    #[tokio::test]
    async fn test_returns_final_output_and_builds_request() {
        let runner = Arc::new(FixedRunner {
            answer: "4".to_string(),
            seen: Mutex::new(None),
        });
        let service = service(runner.clone(), Duration::from_secs(5));

        assert_eq!(service.handle("what's 2+2").await, "4");

        let request = runner.seen.lock().unwrap().take().unwrap();
        assert_eq!(request.name, "MCP Agent");
        assert_eq!(request.input, "what's 2+2");
        assert_eq!(request.tools.names(), vec!["weather_api".to_string()]);
        assert_eq!(request.mcp_servers, vec!["fetch".to_string(), "filesystem".to_string()]);
        assert!(request.instructions.contains("The user has asked: what's 2+2"));
    }

    #[tokio::test]
    async fn test_runner_error_becomes_text() {
        let service = service(Arc::new(FailingRunner), Duration::from_secs(5));

        assert_eq!(
            service.handle("hello").await,
            "❌ Error running agent: Model API returned 503: upstream unavailable"
        );
    }

    #[tokio::test]
    async fn test_runner_timeout_becomes_text() {
        let service = service(Arc::new(SlowRunner), Duration::from_secs(1));

        assert_eq!(
            service.handle("hello").await,
            "❌ Error running agent: Agent run timed out after 1s"
        );
    }

    #[tokio::test]
    async fn test_runner_panic_becomes_text() {
        let service = service(Arc::new(PanickingRunner), Duration::from_secs(5));

        assert_eq!(
            service.handle("hello").await,
            "❌ Error running agent: Agent run panicked: tool exploded"
        );
    }

    #[tokio::test]
    async fn test_empty_input_still_runs() {
        let runner = Arc::new(FixedRunner {
            answer: "How can I help?".to_string(),
            seen: Mutex::new(None),
        });
        let service = service(runner.clone(), Duration::from_secs(5));

        assert_eq!(service.handle("").await, "How can I help?");
        assert!(runner.seen.lock().unwrap().is_some());
    }
}
