use std::sync::Arc;

use axum::{extract::State, Json};

use crate::core::extractor::AppJson;

use super::super::dtos::{ChatRequestDto, ChatResponseDto};
use super::super::services::ConversationService;

/// Send a message to the agent and receive its final answer
///
/// Agent failures are reported inside `response` with status 200.
#[utoipa::path(
    post,
    path = "/chat",
    request_body = ChatRequestDto,
    responses(
        (status = 200, description = "Agent response", body = ChatResponseDto),
        (status = 400, description = "Malformed JSON body")
    ),
    tag = "chat"
)]
pub async fn chat(
    State(service): State<Arc<ConversationService>>,
    AppJson(dto): AppJson<ChatRequestDto>,
) -> Json<ChatResponseDto> {
    let response = service.handle(&dto.user_input).await;
    Json(ChatResponseDto { response })
}
