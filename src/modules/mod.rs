//! Modules layer - Infrastructure components for external integrations
//!
//! Contains the agent runtime, the SQL executor and the weather client.

pub mod agent;
pub mod sql;
pub mod weather;
