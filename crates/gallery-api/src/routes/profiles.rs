use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use gallery_shared::errors::{AppError, AppResult};
use gallery_shared::middleware::{AdminUser, ApiJson, ApiPath, ApiQuery, OptionalAuthUser};
use gallery_shared::types::{ApiResponse, Paginated, PaginationParams};
use gallery_store::models::{NewProfile, Profile, ProfileImage, UpdateProfile};
use gallery_store::query::{category_counts, CategoryCount};
use gallery_store::{ProfileQuery, ProfileSort};

use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProfilesParams {
    pub search: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub sort: ProfileSort,
    #[serde(default)]
    pub include_inactive: bool,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ProfileDetail {
    #[serde(flatten)]
    pub profile: Profile,
    pub images: Vec<ProfileImage>,
}

/// Loads a profile the viewer is allowed to see. Inactive profiles are
/// visible to admins only.
pub(crate) async fn visible_profile(state: &AppState, id: &str, is_admin: bool) -> AppResult<Profile> {
    match state.storage.get_profile(id).await? {
        Some(profile) if profile.is_active || is_admin => Ok(profile),
        _ => Err(AppError::profile_not_found(id)),
    }
}

// --- GET /api/profiles ---

pub async fn list_profiles(
    viewer: OptionalAuthUser,
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<ListProfilesParams>,
) -> AppResult<Json<ApiResponse<Paginated<Profile>>>> {
    let query = ProfileQuery {
        search: params.search,
        category: params.category,
        include_inactive: params.include_inactive && viewer.is_admin(),
        sort: params.sort,
    };

    let profiles = state.storage.list_profiles(&query).await?;
    let sorted = query.apply(profiles);

    let pagination = PaginationParams::new(params.page, params.per_page);
    Ok(Json(ApiResponse::ok(Paginated::from_vec(sorted, &pagination))))
}

// --- GET /api/profiles/:id ---

pub async fn get_profile(
    viewer: OptionalAuthUser,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<String>,
) -> AppResult<Json<ApiResponse<ProfileDetail>>> {
    let profile = visible_profile(&state, &id, viewer.is_admin()).await?;
    let images = state.storage.list_images(&id).await?;

    Ok(Json(ApiResponse::ok(ProfileDetail { profile, images })))
}

// --- POST /api/profiles ---

pub async fn create_profile(
    AdminUser(admin): AdminUser,
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<NewProfile>,
) -> AppResult<(StatusCode, Json<ApiResponse<Profile>>)> {
    payload.validate()?;

    let profile = state.storage.create_profile(payload).await?;

    tracing::info!(admin_id = %admin.id, profile_id = %profile.id, "profile created via api");
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(profile))))
}

// --- PUT /api/profiles/:id ---

pub async fn update_profile(
    AdminUser(admin): AdminUser,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<String>,
    ApiJson(payload): ApiJson<UpdateProfile>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    payload.validate()?;

    let profile = state
        .storage
        .update_profile(&id, payload)
        .await?
        .ok_or_else(|| AppError::profile_not_found(&id))?;

    tracing::info!(admin_id = %admin.id, profile_id = %id, "profile updated");
    Ok(Json(ApiResponse::ok(profile)))
}

// --- DELETE /api/profiles/:id --- (soft delete)

pub async fn delete_profile(
    AdminUser(admin): AdminUser,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<String>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    if !state.storage.deactivate_profile(&id).await? {
        return Err(AppError::profile_not_found(&id));
    }
    let profile = state
        .storage
        .get_profile(&id)
        .await?
        .ok_or_else(|| AppError::profile_not_found(&id))?;

    tracing::info!(admin_id = %admin.id, profile_id = %id, "profile deactivated");
    Ok(Json(ApiResponse::ok_with_message(profile, "profile deactivated")))
}

// --- GET /api/categories ---

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<CategoryCount>>>> {
    let profiles = state.storage.list_profiles(&ProfileQuery::active()).await?;
    Ok(Json(ApiResponse::ok(category_counts(&profiles))))
}
