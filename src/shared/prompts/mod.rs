//! Prompt template management.
//!
//! Templates use Jinja2 syntax and live in `templates/prompts/`.
//!
//! # Usage
//!
//! ```ignore
//! use crate::shared::prompts::render_chat_agent_instructions;
//!
//! let instructions = render_chat_agent_instructions(&["sql_executor".into()], &[], "hello")?;
//! ```

pub mod engine;

pub use engine::{render_template, TemplateError};

use minijinja::Value;
use std::collections::HashMap;

/// Render the instructions for the chat agent.
///
/// The user input is embedded as-is; nothing in it is escaped.
pub fn render_chat_agent_instructions(
    tool_names: &[String],
    mcp_servers: &[String],
    user_input: &str,
) -> Result<String, TemplateError> {
    let mut ctx: HashMap<&str, Value> = HashMap::new();
    ctx.insert("tools", Value::from_serialize(tool_names));
    ctx.insert("mcp_servers", Value::from_serialize(mcp_servers));
    ctx.insert("user_input", Value::from(user_input));

    render_template("chat_agent/instructions.jinja", &ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instructions_embed_raw_input() {
        let prompt = render_chat_agent_instructions(
            &["sql_executor".to_string(), "weather_api".to_string()],
            &["fetch".to_string()],
            "what's <the> \"weather\" in Paris?",
        )
        .unwrap();

        assert!(prompt.contains("sql_executor"));
        assert!(prompt.contains("weather_api"));
        assert!(prompt.contains("fetch"));
        assert!(prompt.contains("The user has asked: what's <the> \"weather\" in Paris?"));
    }

    #[test]
    fn test_instructions_without_servers() {
        let prompt = render_chat_agent_instructions(&[], &[], "hi").unwrap();
        assert!(!prompt.contains("external tool servers"));
        assert!(prompt.ends_with("The user has asked: hi"));
    }
}
