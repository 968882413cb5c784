use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use validator::Validate;

use gallery_shared::errors::{AppError, AppResult, ErrorCode};

use crate::schema::{profile_images, profiles, user_favorites, users};

fn default_true() -> bool {
    true
}

fn empty_tags() -> serde_json::Value {
    serde_json::Value::Array(Vec::new())
}

// --- Profile ---

#[derive(Debug, Clone, PartialEq, Queryable, Insertable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = profiles)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub picture_url: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub review_count: Option<String>,
    #[serde(default)]
    pub likes_count: Option<String>,
    #[serde(default)]
    pub media_count: Option<String>,
    #[serde(default)]
    pub views_count: Option<String>,
    #[serde(default)]
    pub subscribers_count: Option<String>,
    #[serde(default = "empty_tags")]
    pub tags: serde_json::Value,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Tags as strings. Non-string entries are ignored.
    pub fn tag_list(&self) -> Vec<&str> {
        match &self.tags {
            serde_json::Value::Array(items) => items.iter().filter_map(|t| t.as_str()).collect(),
            _ => Vec::new(),
        }
    }
}

/// Trims tags, drops empty ones and removes case-insensitive duplicates,
/// keeping the first spelling.
pub fn normalize_tags(tags: &[String]) -> serde_json::Value {
    let mut seen = std::collections::HashSet::new();
    let tags = tags
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_lowercase()))
        .map(|t| serde_json::Value::String(t.to_string()))
        .collect();
    serde_json::Value::Array(tags)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewProfile {
    #[serde(default)]
    pub id: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    pub description: Option<String>,
    #[validate(url)]
    pub picture_url: Option<String>,
    #[validate(url)]
    pub cover_url: Option<String>,
    #[validate(length(max = 32))]
    pub rating: Option<String>,
    #[validate(length(max = 32))]
    pub review_count: Option<String>,
    #[validate(length(max = 32))]
    pub likes_count: Option<String>,
    #[validate(length(max = 32))]
    pub media_count: Option<String>,
    #[validate(length(max = 32))]
    pub views_count: Option<String>,
    #[validate(length(max = 32))]
    pub subscribers_count: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_active: Option<bool>,
}

impl NewProfile {
    pub fn into_profile(self, id: String, now: DateTime<Utc>) -> Profile {
        Profile {
            id,
            name: self.name.trim().to_string(),
            title: self.title,
            category: self.category,
            location: self.location,
            description: self.description,
            picture_url: self.picture_url,
            cover_url: self.cover_url,
            rating: self.rating,
            review_count: self.review_count,
            likes_count: self.likes_count,
            media_count: self.media_count,
            views_count: self.views_count,
            subscribers_count: self.subscribers_count,
            tags: normalize_tags(&self.tags),
            is_active: self.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfile {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    pub description: Option<String>,
    #[validate(url)]
    pub picture_url: Option<String>,
    #[validate(url)]
    pub cover_url: Option<String>,
    #[validate(length(max = 32))]
    pub rating: Option<String>,
    #[validate(length(max = 32))]
    pub review_count: Option<String>,
    #[validate(length(max = 32))]
    pub likes_count: Option<String>,
    #[validate(length(max = 32))]
    pub media_count: Option<String>,
    #[validate(length(max = 32))]
    pub views_count: Option<String>,
    #[validate(length(max = 32))]
    pub subscribers_count: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

/// Column-level changes for a profile row. `updated_at` is always set, so the
/// changeset is never empty.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = profiles)]
pub struct ProfileChangeset {
    pub name: Option<String>,
    pub title: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub picture_url: Option<String>,
    pub cover_url: Option<String>,
    pub rating: Option<String>,
    pub review_count: Option<String>,
    pub likes_count: Option<String>,
    pub media_count: Option<String>,
    pub views_count: Option<String>,
    pub subscribers_count: Option<String>,
    pub tags: Option<serde_json::Value>,
    pub is_active: Option<bool>,
    pub updated_at: DateTime<Utc>,
}

impl UpdateProfile {
    pub fn deactivate() -> Self {
        Self {
            is_active: Some(false),
            ..Default::default()
        }
    }

    pub fn changeset(&self, now: DateTime<Utc>) -> ProfileChangeset {
        ProfileChangeset {
            name: self.name.as_ref().map(|n| n.trim().to_string()),
            title: self.title.clone(),
            category: self.category.clone(),
            location: self.location.clone(),
            description: self.description.clone(),
            picture_url: self.picture_url.clone(),
            cover_url: self.cover_url.clone(),
            rating: self.rating.clone(),
            review_count: self.review_count.clone(),
            likes_count: self.likes_count.clone(),
            media_count: self.media_count.clone(),
            views_count: self.views_count.clone(),
            subscribers_count: self.subscribers_count.clone(),
            tags: self.tags.as_deref().map(normalize_tags),
            is_active: self.is_active,
            updated_at: now,
        }
    }

    pub fn apply_to(&self, profile: &mut Profile, now: DateTime<Utc>) {
        let ProfileChangeset {
            name,
            title,
            category,
            location,
            description,
            picture_url,
            cover_url,
            rating,
            review_count,
            likes_count,
            media_count,
            views_count,
            subscribers_count,
            tags,
            is_active,
            updated_at,
        } = self.changeset(now);

        fn set<T>(slot: &mut T, value: Option<T>) {
            if let Some(v) = value {
                *slot = v;
            }
        }
        fn set_opt<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        set(&mut profile.name, name);
        set_opt(&mut profile.title, title);
        set_opt(&mut profile.category, category);
        set_opt(&mut profile.location, location);
        set_opt(&mut profile.description, description);
        set_opt(&mut profile.picture_url, picture_url);
        set_opt(&mut profile.cover_url, cover_url);
        set_opt(&mut profile.rating, rating);
        set_opt(&mut profile.review_count, review_count);
        set_opt(&mut profile.likes_count, likes_count);
        set_opt(&mut profile.media_count, media_count);
        set_opt(&mut profile.views_count, views_count);
        set_opt(&mut profile.subscribers_count, subscribers_count);
        set(&mut profile.tags, tags);
        set(&mut profile.is_active, is_active);
        profile.updated_at = updated_at;
    }
}

// --- ProfileImage ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Image,
    Video,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Image => "image",
            ContentType::Video => "video",
        }
    }
}

impl std::str::FromStr for ContentType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" => Ok(ContentType::Image),
            "video" => Ok(ContentType::Video),
            _ => Err(AppError::new(
                ErrorCode::ValidationError,
                format!("unknown content type '{s}', expected image or video"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Queryable, Insertable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = profile_images)]
#[serde(rename_all = "camelCase")]
pub struct ProfileImage {
    pub id: String,
    pub profile_id: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    pub content_type: String,
    #[diesel(column_name = display_order)]
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub is_main_image: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// Orders posts for display: ascending `order`, ties by creation time.
pub fn sort_images(images: &mut [ProfileImage]) {
    images.sort_by(|a, b| a.order.cmp(&b.order).then(a.created_at.cmp(&b.created_at)));
}

/// Position for a post appended after `images`.
pub fn next_order(images: &[ProfileImage]) -> i32 {
    images.iter().map(|i| i.order).max().map_or(0, |max| max.saturating_add(1))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewProfileImage {
    #[serde(default)]
    pub id: Option<String>,
    #[validate(url)]
    pub image_url: Option<String>,
    #[validate(url)]
    pub video_url: Option<String>,
    #[validate(url)]
    pub thumbnail_url: Option<String>,
    pub content_type: Option<String>,
    pub order: Option<i32>,
    pub is_main_image: Option<bool>,
}

impl NewProfileImage {
    /// Explicit content type if given, otherwise video when a video URL is present.
    pub fn resolve_content_type(&self) -> AppResult<ContentType> {
        match self.content_type.as_deref() {
            Some(ct) => ct.parse(),
            None if self.video_url.is_some() => Ok(ContentType::Video),
            None => Ok(ContentType::Image),
        }
    }

    /// Any URL identifying the media, used to detect duplicates on import.
    pub fn media_url(&self) -> Option<&str> {
        self.video_url.as_deref().or(self.image_url.as_deref())
    }

    pub fn into_image(
        self,
        id: String,
        profile_id: &str,
        fallback_order: i32,
        now: DateTime<Utc>,
    ) -> AppResult<ProfileImage> {
        if self.image_url.is_none() && self.video_url.is_none() {
            return Err(AppError::new(
                ErrorCode::MissingMediaUrl,
                "a post needs an imageUrl or a videoUrl",
            ));
        }
        let content_type = self.resolve_content_type()?;

        Ok(ProfileImage {
            id,
            profile_id: profile_id.to_string(),
            image_url: self.image_url,
            video_url: self.video_url,
            thumbnail_url: self.thumbnail_url,
            content_type: content_type.as_str().to_string(),
            order: self.order.unwrap_or(fallback_order),
            is_main_image: self.is_main_image.unwrap_or(false),
            created_at: now,
            updated_at: now,
        })
    }
}

impl ProfileImage {
    pub fn media_url(&self) -> Option<&str> {
        self.video_url.as_deref().or(self.image_url.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileImage {
    #[validate(url)]
    pub image_url: Option<String>,
    #[validate(url)]
    pub video_url: Option<String>,
    #[validate(url)]
    pub thumbnail_url: Option<String>,
    pub content_type: Option<String>,
    pub order: Option<i32>,
    pub is_main_image: Option<bool>,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = profile_images)]
pub struct ProfileImageChangeset {
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub content_type: Option<String>,
    pub display_order: Option<i32>,
    pub is_main_image: Option<bool>,
    pub updated_at: DateTime<Utc>,
}

impl UpdateProfileImage {
    /// A new `videoUrl` without an explicit `contentType` turns the post into a video.
    pub fn changeset(&self, now: DateTime<Utc>) -> AppResult<ProfileImageChangeset> {
        let content_type = match self.content_type.as_deref() {
            Some(ct) => Some(ct.parse::<ContentType>()?),
            None if self.video_url.is_some() => Some(ContentType::Video),
            None => None,
        }
        .map(|ct| ct.as_str().to_string());

        Ok(ProfileImageChangeset {
            image_url: self.image_url.clone(),
            video_url: self.video_url.clone(),
            thumbnail_url: self.thumbnail_url.clone(),
            content_type,
            display_order: self.order,
            is_main_image: self.is_main_image,
            updated_at: now,
        })
    }

    pub fn apply_to(&self, image: &mut ProfileImage, now: DateTime<Utc>) -> AppResult<()> {
        let changes = self.changeset(now)?;
        if changes.image_url.is_some() {
            image.image_url = changes.image_url;
        }
        if changes.video_url.is_some() {
            image.video_url = changes.video_url;
        }
        if changes.thumbnail_url.is_some() {
            image.thumbnail_url = changes.thumbnail_url;
        }
        if let Some(ct) = changes.content_type {
            image.content_type = ct;
        }
        if let Some(order) = changes.display_order {
            image.order = order;
        }
        if let Some(main) = changes.is_main_image {
            image.is_main_image = main;
        }
        image.updated_at = changes.updated_at;
        Ok(())
    }
}

// --- User ---

#[derive(Debug, Clone, PartialEq, Queryable, Insertable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = users)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct UpsertUser {
    pub id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,
}

impl UpsertUser {
    /// Row to insert, or to merge over `existing` keeping its creation time.
    pub fn into_user(self, existing: Option<&User>, now: DateTime<Utc>) -> User {
        User {
            id: self.id,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            profile_image_url: self.profile_image_url,
            created_at: existing.map_or(now, |u| u.created_at),
            updated_at: now,
        }
    }
}

// --- Favorite ---

#[derive(Debug, Clone, PartialEq, Queryable, Insertable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = user_favorites)]
#[serde(rename_all = "camelCase")]
pub struct UserFavorite {
    pub id: String,
    pub user_id: String,
    pub profile_id: String,
    pub created_at: DateTime<Utc>,
}
