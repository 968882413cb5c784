use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use gallery_shared::errors::{AppError, AppResult, ErrorCode};
use gallery_shared::types::auth::AuthUser;
use gallery_shared::types::ApiResponse;
use gallery_store::models::{UpsertUser, User};

use crate::AppState;

/// Mirrors the token's identity into the local user table.
pub(crate) async fn sync_user(state: &AppState, user: &AuthUser) -> AppResult<User> {
    state
        .storage
        .upsert_user(UpsertUser {
            id: user.id.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            profile_image_url: user.picture.clone(),
        })
        .await
}

// --- GET /api/auth/user ---

pub async fn current_user(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<User>>> {
    let user = sync_user(&state, &user).await?;
    Ok(Json(ApiResponse::ok(user)))
}

/// GET /api/login, /api/logout, /api/callback - interactive login is not provided here
pub async fn login_unavailable() -> AppError {
    AppError::new(
        ErrorCode::LoginUnavailable,
        "interactive login is not configured; send a bearer token instead",
    )
}
