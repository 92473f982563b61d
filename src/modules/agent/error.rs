use thiserror::Error;

#[derive(Debug, Error)]
pub enum McpError {
    #[error("Failed to read MCP config {path}: {source}")]
    ReadConfig {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse MCP config {path}: {message}")]
    ParseConfig { path: String, message: String },

    #[error("Failed to spawn MCP server {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("MCP transport error: {0}")]
    Transport(String),

    #[error("MCP server returned error {code}: {message}")]
    JsonRpc { code: i64, message: String },

    #[error("MCP request '{method}' timed out")]
    Timeout { method: String },
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("OPENAI_API_KEY is not configured")]
    MissingApiKey,

    #[error("Model request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Model API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid model response: {0}")]
    InvalidResponse(String),

    #[error("Agent exceeded maximum iterations ({0})")]
    MaxIterations(usize),

    #[error("Agent run timed out after {0}s")]
    Timeout(u64),

    #[error(transparent)]
    Mcp(#[from] McpError),
}
