use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;

use super::handlers::{chat, health_check};
use super::services::ConversationService;

/// Create routes for the chat feature
pub fn routes(conversation_service: Arc<ConversationService>, pool: PgPool) -> Router {
    let chat_routes = Router::new()
        .route("/chat", post(chat))
        .with_state(conversation_service);

    let health_routes = Router::new()
        .route("/health", get(health_check))
        .with_state(pool);

    chat_routes.merge(health_routes)
}
