use axum::{extract::State, http::StatusCode};
use sqlx::PgPool;

use crate::core::error::Result;

/// Liveness check that also verifies the database is reachable
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and database are up"),
        (status = 500, description = "Database unreachable")
    ),
    tag = "health"
)]
pub async fn health_check(State(pool): State<PgPool>) -> Result<StatusCode> {
    sqlx::query("SELECT 1").execute(&pool).await?;
    Ok(StatusCode::OK)
}
