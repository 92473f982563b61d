use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request DTO for sending a chat message
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ChatRequestDto {
    /// The user's message, passed to the agent unchanged
    pub user_input: String,
}

/// Response DTO for a chat turn
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ChatResponseDto {
    /// The agent's final answer, or an error description
    pub response: String,
}
