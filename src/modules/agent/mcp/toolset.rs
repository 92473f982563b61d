use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use futures::future::join_all;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tokio::sync::Mutex;

use super::session::{McpSession, McpTool};
use super::settings::{McpServerSettings, McpSettings};
use crate::core::config::McpConfig;
use crate::modules::agent::error::McpError;
use crate::modules::agent::tool::{ToolDefinition, ToolOutput};

lazy_static! {
    static ref TOOL_NAME_INVALID_CHARS: Regex = Regex::new(r"[^a-zA-Z0-9_-]").unwrap();
}

/// Function names accepted by chat-completions APIs are capped at 64 chars
const MAX_TOOL_NAME_LEN: usize = 64;

/// Name under which a server tool is exposed to the model
pub fn exposed_tool_name(server: &str, tool: &str) -> String {
    let raw = format!("{}__{}", server, tool);
    let mut name = TOOL_NAME_INVALID_CHARS.replace_all(&raw, "_").into_owned();
    name.truncate(MAX_TOOL_NAME_LEN);
    name
}

struct McpToolRoute {
    server: String,
    tool: String,
}

async fn start_server(
    name: &str,
    server: &McpServerSettings,
    timeout: Duration,
) -> Result<(McpSession, Vec<McpTool>), McpError> {
    let mut session = McpSession::start(name, server, timeout).await?;
    match session.list_tools().await {
        Ok(tools) => Ok((session, tools)),
        Err(e) => {
            session.shutdown().await;
            Err(e)
        }
    }
}

/// Tools of every attached server for the lifetime of one agent run
#[derive(Default)]
pub struct McpToolset {
    sessions: BTreeMap<String, Mutex<McpSession>>,
    routes: BTreeMap<String, McpToolRoute>,
    definitions: Vec<ToolDefinition>,
}

impl McpToolset {
    /// Start the named servers concurrently. Servers that are unknown, fail to
    /// start or fail to list tools are logged and skipped.
    pub async fn start(settings: &McpSettings, names: &[String], timeout: Duration) -> Self {
        let launches = names.iter().filter_map(|name| match settings.get(name) {
            Some(server) => Some(async move {
                (name.clone(), start_server(name, server, timeout).await)
            }),
            None => {
                tracing::warn!("MCP server '{}' is not defined in the config, skipping", name);
                None
            }
        });

        let mut toolset = Self::default();

        for (name, result) in join_all(launches).await {
            match result {
                Ok((session, tools)) => {
                    tracing::info!("MCP server '{}' attached with {} tools", name, tools.len());

                    for tool in tools {
                        let exposed = exposed_tool_name(&name, &tool.name);
                        if toolset.routes.contains_key(&exposed) {
                            tracing::warn!("Duplicate MCP tool name '{}', skipping", exposed);
                            continue;
                        }

                        toolset.definitions.push(ToolDefinition::with_schema(
                            exposed.clone(),
                            tool.description.unwrap_or_default(),
                            tool.input_schema,
                        ));
                        toolset.routes.insert(
                            exposed,
                            McpToolRoute {
                                server: name.clone(),
                                tool: tool.name,
                            },
                        );
                    }

                    toolset.sessions.insert(name, Mutex::new(session));
                }
                Err(e) => {
                    tracing::warn!("MCP server '{}' unavailable: {}", name, e);
                }
            }
        }

        toolset
    }

    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    pub fn contains(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    pub fn server_count(&self) -> usize {
        self.sessions.len()
    }

    /// Call a tool by its exposed name; failures come back as error output
    pub async fn call(&self, name: &str, arguments: Value) -> ToolOutput {
        let Some(route) = self.routes.get(name) else {
            return ToolOutput::error(format!("Unknown tool: {}", name));
        };
        let Some(session) = self.sessions.get(&route.server) else {
            return ToolOutput::error(format!("MCP server '{}' is not running", route.server));
        };

        let result = session.lock().await.call_tool(&route.tool, arguments).await;
        match result {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!("MCP tool '{}' failed: {}", name, e);
                ToolOutput::error(format!("Tool '{}' failed: {}", name, e))
            }
        }
    }

    pub async fn shutdown(self) {
        for session in self.sessions.into_values() {
            session.into_inner().shutdown().await;
        }
    }
}

/// Loads the tool-server settings and starts servers for each run
#[derive(Debug, Clone)]
pub struct McpLauncher {
    config_path: PathBuf,
    request_timeout: Duration,
}

impl McpLauncher {
    pub fn new(config: &McpConfig) -> Self {
        Self {
            config_path: config.config_path.clone(),
            request_timeout: config.request_timeout(),
        }
    }

    pub async fn launch(&self, names: &[String]) -> Result<McpToolset, McpError> {
        if names.is_empty() {
            return Ok(McpToolset::default());
        }

        let settings = McpSettings::load(&self.config_path)?;
        Ok(McpToolset::start(&settings, names, self.request_timeout).await)
    }
}
