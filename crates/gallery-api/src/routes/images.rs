use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use validator::Validate;

use gallery_shared::errors::{AppError, AppResult, ErrorCode};
use gallery_shared::middleware::{AdminUser, ApiJson, ApiPath, OptionalAuthUser};
use gallery_shared::types::ApiResponse;
use gallery_store::models::{NewProfileImage, ProfileImage, UpdateProfileImage};

use super::profiles::visible_profile;
use crate::AppState;

fn image_not_found(image_id: &str) -> AppError {
    AppError::new(ErrorCode::ImageNotFound, format!("post '{image_id}' not found"))
}

// --- GET /api/profiles/:id/images ---

pub async fn list_images(
    viewer: OptionalAuthUser,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<String>,
) -> AppResult<Json<ApiResponse<Vec<ProfileImage>>>> {
    visible_profile(&state, &id, viewer.is_admin()).await?;
    let images = state.storage.list_images(&id).await?;
    Ok(Json(ApiResponse::ok(images)))
}

// --- POST /api/profiles/:id/images ---

pub async fn add_image(
    AdminUser(admin): AdminUser,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<String>,
    ApiJson(payload): ApiJson<NewProfileImage>,
) -> AppResult<(StatusCode, Json<ApiResponse<ProfileImage>>)> {
    payload.validate()?;

    let image = state.storage.add_image(&id, payload).await?;

    tracing::info!(admin_id = %admin.id, profile_id = %id, image_id = %image.id, "post added");
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(image))))
}

// --- PUT /api/profiles/:id/images/:image_id ---

pub async fn update_image(
    AdminUser(_admin): AdminUser,
    State(state): State<Arc<AppState>>,
    ApiPath((id, image_id)): ApiPath<(String, String)>,
    ApiJson(payload): ApiJson<UpdateProfileImage>,
) -> AppResult<Json<ApiResponse<ProfileImage>>> {
    payload.validate()?;

    let image = state
        .storage
        .update_image(&id, &image_id, payload)
        .await?
        .ok_or_else(|| image_not_found(&image_id))?;

    Ok(Json(ApiResponse::ok(image)))
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub id: String,
}

// --- DELETE /api/profiles/:id/images/:image_id ---

pub async fn delete_image(
    AdminUser(admin): AdminUser,
    State(state): State<Arc<AppState>>,
    ApiPath((id, image_id)): ApiPath<(String, String)>,
) -> AppResult<Json<ApiResponse<DeletedResponse>>> {
    if !state.storage.delete_image(&id, &image_id).await? {
        return Err(image_not_found(&image_id));
    }

    tracing::info!(admin_id = %admin.id, profile_id = %id, image_id = %image_id, "post deleted");
    Ok(Json(ApiResponse::ok(DeletedResponse { id: image_id })))
}

#[derive(Debug, Serialize)]
pub struct ClearedResponse {
    pub removed: u64,
}

// --- DELETE /api/profiles/:id/images ---

pub async fn clear_images(
    AdminUser(admin): AdminUser,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<String>,
) -> AppResult<Json<ApiResponse<ClearedResponse>>> {
    if state.storage.get_profile(&id).await?.is_none() {
        return Err(AppError::profile_not_found(&id));
    }
    let removed = state.storage.clear_images(&id).await?;

    tracing::info!(admin_id = %admin.id, profile_id = %id, removed, "posts cleared via api");
    Ok(Json(ApiResponse::ok(ClearedResponse { removed })))
}
