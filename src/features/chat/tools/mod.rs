pub mod definitions;
pub mod registry;

pub use registry::create_tool_registry;
