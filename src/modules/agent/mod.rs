//! Agent runtime: tool contracts, the runner abstraction and its
//! chat-completions implementation, plus stdio tool servers.

pub mod error;
pub mod mcp;
pub mod openai_runner;
pub mod runner;
pub mod tool;

pub use error::AgentError;
pub use openai_runner::OpenAiAgentRunner;
pub use runner::{AgentRequest, AgentRunOutput, AgentRunner};
pub use tool::{FnToolExecutor, ToolDefinition, ToolOutput, ToolRegistry};
