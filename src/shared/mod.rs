pub mod prompts;
pub mod types;
