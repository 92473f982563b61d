//! Client side of the Model Context Protocol over stdio.
//!
//! Tool servers are described in a YAML file (`mcp.servers.<name>`), spawned
//! as child processes for an agent run and exposed to the model as
//! `<server>__<tool>` functions.

pub mod session;
pub mod settings;
pub mod toolset;

pub use settings::McpSettings;
pub use toolset::{McpLauncher, McpToolset};
