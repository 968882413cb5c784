use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use gallery_shared::errors::AppResult;
use gallery_shared::middleware::ApiPath;
use gallery_shared::types::auth::AuthUser;
use gallery_shared::types::ApiResponse;
use gallery_store::models::Profile;

use super::auth::sync_user;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct FavoriteState {
    pub favorited: bool,
}

// --- GET /api/favorites ---

pub async fn list_favorites(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<Profile>>>> {
    let mut profiles = state.storage.list_favorites(&user.id).await?;
    profiles.retain(|p| p.is_active);
    Ok(Json(ApiResponse::ok(profiles)))
}

// --- GET /api/favorites/:profile_id ---

pub async fn check_favorite(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    ApiPath(profile_id): ApiPath<String>,
) -> AppResult<Json<ApiResponse<FavoriteState>>> {
    let favorited = state.storage.is_favorite(&user.id, &profile_id).await?;
    Ok(Json(ApiResponse::ok(FavoriteState { favorited })))
}

// --- POST /api/favorites/:profile_id ---

pub async fn toggle_favorite(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    ApiPath(profile_id): ApiPath<String>,
) -> AppResult<Json<ApiResponse<FavoriteState>>> {
    // The database backend references users from favorites.
    sync_user(&state, &user).await?;

    let favorited = state.storage.toggle_favorite(&user.id, &profile_id).await?;

    tracing::debug!(user_id = %user.id, profile_id = %profile_id, favorited, "favorite toggled via api");
    Ok(Json(ApiResponse::ok(FavoriteState { favorited })))
}
