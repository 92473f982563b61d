use utoipa::{Modify, OpenApi};

use crate::features::chat::{dtos as chat_dtos, handlers as chat_handlers};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Chat
        chat_handlers::chat_handler::chat,
        // Health
        chat_handlers::health_handler::health_check,
    ),
    components(
        schemas(
            chat_dtos::ChatRequestDto,
            chat_dtos::ChatResponseDto,
        )
    ),
    tags(
        (name = "chat", description = "Agent-backed chat endpoint"),
        (name = "health", description = "Liveness and database reachability"),
    )
)]
pub struct ApiDoc;

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
