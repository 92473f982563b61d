pub mod chat_handler;
pub mod health_handler;

pub use chat_handler::chat;
pub use health_handler::health_check;
