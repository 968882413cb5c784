pub mod auth;
pub mod favorites;
pub mod health;
pub mod images;
pub mod media;
pub mod profiles;

use gallery_shared::errors::AppError;

/// Fallback for unknown `/api/*` paths, so they never reach the SPA fallback.
pub async fn api_not_found() -> AppError {
    AppError::not_found("no such api endpoint")
}
