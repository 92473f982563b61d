use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::modules::agent::error::McpError;

/// Top level of `mcp_agent.config.yaml`; unrelated sections are ignored
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McpSettingsFile {
    #[serde(default)]
    pub mcp: McpSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McpSettings {
    #[serde(default)]
    pub servers: BTreeMap<String, McpServerSettings>,
}

/// Launch description of one stdio tool server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpServerSettings {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl McpSettings {
    pub fn from_yaml_str(content: &str, path: &str) -> Result<Self, McpError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str::<McpSettingsFile>(content)
            .map(|file| file.mcp)
            .map_err(|e| McpError::ParseConfig {
                path: path.to_string(),
                message: e.to_string(),
            })
    }

    /// Load settings; a missing file means no tool servers
    pub fn load(path: &Path) -> Result<Self, McpError> {
        let shown = path.display().to_string();

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("MCP config {} not found, no tool servers attached", shown);
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(McpError::ReadConfig {
                    path: shown,
                    source,
                })
            }
        };

        Self::from_yaml_str(&content, &shown)
    }

    pub fn server_names(&self) -> Vec<String> {
        self.servers.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&McpServerSettings> {
        self.servers.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
execution_engine: asyncio
logger:
  type: console
  level: debug

mcp:
  servers:
    fetch:
      command: "uvx"
      args: ["mcp-server-fetch"]
    filesystem:
      command: "npx"
      args: ["-y", "@modelcontextprotocol/server-filesystem", "."]
      env:
        NODE_ENV: production

openai:
  default_model: gpt-4o
"#;

    #[test]
    fn test_parse_servers_and_ignore_other_sections() {
        let settings = McpSettings::from_yaml_str(SAMPLE, "sample.yaml").unwrap();

        assert_eq!(
            settings.server_names(),
            vec!["fetch".to_string(), "filesystem".to_string()]
        );

        let fetch = settings.get("fetch").unwrap();
        assert_eq!(fetch.command, "uvx");
        assert_eq!(fetch.args, vec!["mcp-server-fetch".to_string()]);
        assert!(fetch.env.is_empty());

        let filesystem = settings.get("filesystem").unwrap();
        assert_eq!(filesystem.args.len(), 3);
        assert_eq!(
            filesystem.env.get("NODE_ENV").map(String::as_str),
            Some("production")
        );
    }

    #[test]
    fn test_empty_and_serverless_files() {
        assert!(McpSettings::from_yaml_str("", "x").unwrap().servers.is_empty());
        assert!(McpSettings::from_yaml_str("logger:\n  level: info\n", "x")
            .unwrap()
            .servers
            .is_empty());
    }

    #[test]
    fn test_invalid_yaml_is_parse_error() {
        let err = McpSettings::from_yaml_str("mcp:\n  servers:\n    fetch: [1, 2", "bad.yaml")
            .unwrap_err();
        assert!(matches!(err, McpError::ParseConfig { ref path, .. } if path == "bad.yaml"));
    }

    #[test]
    fn test_missing_file_means_no_servers() {
        let settings = McpSettings::load(Path::new("/definitely/not/here.yaml")).unwrap();
        assert_eq!(settings, McpSettings::default());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_path_names_the_file() {
        let err = McpSettings::load(Path::new("/")).unwrap_err();
        assert!(matches!(err, McpError::ReadConfig { ref path, .. } if path == "/"));
    }
}
