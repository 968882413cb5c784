use async_trait::async_trait;
use chrono::Utc;
use diesel::dsl::max;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;

use gallery_shared::clients::db::DbPool;
use gallery_shared::errors::{AppError, AppResult, ErrorCode};

use super::{Storage, StorageBackend};
use crate::ids::{new_id, validate_id};
use crate::models::{
    NewProfile, NewProfileImage, Profile, ProfileImage, UpdateProfile, UpdateProfileImage, UpsertUser, User,
    UserFavorite,
};
use crate::query::ProfileQuery;
use crate::schema::{profile_images, profiles, user_favorites, users};

/// Postgres backend. Diesel is synchronous, so every call checks a
/// connection out of the r2d2 pool on the blocking thread pool.
pub struct DbStorage {
    pool: DbPool,
}

impl DbStorage {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn run<T, F>(&self, f: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> AppResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|e| AppError::new(ErrorCode::StorageUnavailable, e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| AppError::internal(format!("database task failed: {e}")))?
    }
}

fn profile_exists(conn: &mut PgConnection, id: &str) -> QueryResult<bool> {
    profiles::table
        .find(id)
        .count()
        .get_result::<i64>(conn)
        .map(|c| c > 0)
}

/// Partial unique index allowing one main image per profile.
const ONE_MAIN_IMAGE_INDEX: &str = "idx_profile_images_one_main";
const IMAGE_PRIMARY_KEY: &str = "profile_images_pkey";

/// Maps unique violations on `profile_images` by the constraint that fired.
/// Losing a race for the main image is a conflict, not a duplicate post.
fn image_write_error(err: diesel::result::Error, image_id: &str) -> AppError {
    match err {
        diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            match info.constraint_name() {
                Some(IMAGE_PRIMARY_KEY) => AppError::new(
                    ErrorCode::ImageAlreadyExists,
                    format!("post '{image_id}' already exists"),
                ),
                Some(ONE_MAIN_IMAGE_INDEX) => AppError::new(
                    ErrorCode::MainImageConflict,
                    "another main image was set at the same time, retry the request",
                ),
                _ => diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info).into(),
            }
        }
        other => other.into(),
    }
}

fn demote_main_images(conn: &mut PgConnection, profile_id: &str, keep: &str) -> QueryResult<usize> {
    diesel::update(
        profile_images::table
            .filter(profile_images::profile_id.eq(profile_id))
            .filter(profile_images::id.ne(keep))
            .filter(profile_images::is_main_image.eq(true)),
    )
    .set((
        profile_images::is_main_image.eq(false),
        profile_images::updated_at.eq(Utc::now()),
    ))
    .execute(conn)
}

#[async_trait]
impl Storage for DbStorage {
    fn backend(&self) -> StorageBackend {
        StorageBackend::Database
    }

    async fn list_profiles(&self, query: &ProfileQuery) -> AppResult<Vec<Profile>> {
        let query = query.clone();
        self.run(move |conn| {
            let mut sql = profiles::table.into_boxed::<diesel::pg::Pg>();
            if !query.include_inactive {
                sql = sql.filter(profiles::is_active.eq(true));
            }
            let rows = sql.load::<Profile>(conn)?;

            // Search spans the jsonb tags, so text matching stays in Rust and
            // behaves the same as the file backend.
            Ok(rows.into_iter().filter(|p| query.matches(p)).collect())
        })
        .await
    }

    async fn get_profile(&self, id: &str) -> AppResult<Option<Profile>> {
        validate_id("profile", id)?;
        let id = id.to_string();
        self.run(move |conn| {
            Ok(profiles::table.find(id).first::<Profile>(conn).optional()?)
        })
        .await
    }

    async fn create_profile(&self, new: NewProfile) -> AppResult<Profile> {
        let id = new.id.clone().unwrap_or_else(new_id);
        validate_id("profile", &id)?;
        let profile = new.into_profile(id, Utc::now());

        let created = self
            .run(move |conn| {
                diesel::insert_into(profiles::table)
                    .values(&profile)
                    .get_result::<Profile>(conn)
                    .map_err(|e| match e {
                        diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                            AppError::new(
                                ErrorCode::ProfileAlreadyExists,
                                format!("profile '{}' already exists", profile.id),
                            )
                        }
                        other => other.into(),
                    })
            })
            .await?;

        tracing::info!(profile_id = %created.id, name = %created.name, "profile created");
        Ok(created)
    }

    async fn update_profile(&self, id: &str, changes: UpdateProfile) -> AppResult<Option<Profile>> {
        validate_id("profile", id)?;
        let id = id.to_string();
        self.run(move |conn| {
            let changeset = changes.changeset(Utc::now());
            Ok(diesel::update(profiles::table.find(id))
                .set(&changeset)
                .get_result::<Profile>(conn)
                .optional()?)
        })
        .await
    }

    async fn deactivate_profile(&self, id: &str) -> AppResult<bool> {
        validate_id("profile", id)?;
        let id = id.to_string();
        self.run(move |conn| {
            let updated = diesel::update(profiles::table.find(id))
                .set((profiles::is_active.eq(false), profiles::updated_at.eq(Utc::now())))
                .execute(conn)?;
            Ok(updated > 0)
        })
        .await
    }

    async fn list_images(&self, profile_id: &str) -> AppResult<Vec<ProfileImage>> {
        validate_id("profile", profile_id)?;
        let profile_id = profile_id.to_string();
        self.run(move |conn| {
            Ok(profile_images::table
                .filter(profile_images::profile_id.eq(profile_id))
                .order((profile_images::display_order.asc(), profile_images::created_at.asc()))
                .load::<ProfileImage>(conn)?)
        })
        .await
    }

    async fn add_image(&self, profile_id: &str, new: NewProfileImage) -> AppResult<ProfileImage> {
        validate_id("profile", profile_id)?;
        let image_id = new.id.clone().unwrap_or_else(new_id);
        validate_id("post", &image_id)?;
        let profile_id = profile_id.to_string();

        self.run(move |conn| {
            conn.transaction::<_, AppError, _>(|conn| {
                if !profile_exists(conn, &profile_id)? {
                    return Err(AppError::profile_not_found(&profile_id));
                }

                let current_max = profile_images::table
                    .filter(profile_images::profile_id.eq(&profile_id))
                    .select(max(profile_images::display_order))
                    .first::<Option<i32>>(conn)?;
                let fallback_order = current_max.map_or(0, |m| m.saturating_add(1));

                let image = new.into_image(image_id, &profile_id, fallback_order, Utc::now())?;
                if image.is_main_image {
                    demote_main_images(conn, &profile_id, &image.id)?;
                }

                diesel::insert_into(profile_images::table)
                    .values(&image)
                    .get_result::<ProfileImage>(conn)
                    .map_err(|e| image_write_error(e, &image.id))
            })
        })
        .await
    }

    async fn update_image(
        &self,
        profile_id: &str,
        image_id: &str,
        changes: UpdateProfileImage,
    ) -> AppResult<Option<ProfileImage>> {
        validate_id("profile", profile_id)?;
        validate_id("post", image_id)?;
        let changeset = changes.changeset(Utc::now())?;
        let (profile_id, image_id) = (profile_id.to_string(), image_id.to_string());

        self.run(move |conn| {
            conn.transaction::<_, AppError, _>(|conn| {
                let target = profile_images::table
                    .filter(profile_images::id.eq(&image_id))
                    .filter(profile_images::profile_id.eq(&profile_id));

                // Nothing may change, siblings included, unless the post exists.
                let existing = target.clone().for_update().first::<ProfileImage>(conn).optional()?;
                if existing.is_none() {
                    return Ok(None);
                }

                if changeset.is_main_image == Some(true) {
                    demote_main_images(conn, &profile_id, &image_id)?;
                }
                diesel::update(target)
                    .set(&changeset)
                    .get_result::<ProfileImage>(conn)
                    .optional()
                    .map_err(|e| image_write_error(e, &image_id))
            })
        })
        .await
    }

    async fn delete_image(&self, profile_id: &str, image_id: &str) -> AppResult<bool> {
        validate_id("profile", profile_id)?;
        validate_id("post", image_id)?;
        let (profile_id, image_id) = (profile_id.to_string(), image_id.to_string());
        self.run(move |conn| {
            let deleted = diesel::delete(
                profile_images::table
                    .filter(profile_images::id.eq(image_id))
                    .filter(profile_images::profile_id.eq(profile_id)),
            )
            .execute(conn)?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn clear_images(&self, profile_id: &str) -> AppResult<u64> {
        validate_id("profile", profile_id)?;
        let profile_id = profile_id.to_string();
        let removed = self
            .run({
                let profile_id = profile_id.clone();
                move |conn| {
                    let deleted = diesel::delete(
                        profile_images::table.filter(profile_images::profile_id.eq(profile_id)),
                    )
                    .execute(conn)?;
                    Ok(deleted as u64)
                }
            })
            .await?;

        tracing::info!(profile_id = %profile_id, removed, "posts cleared");
        Ok(removed)
    }

    async fn get_user(&self, id: &str) -> AppResult<Option<User>> {
        validate_id("user", id)?;
        let id = id.to_string();
        self.run(move |conn| Ok(users::table.find(id).first::<User>(conn).optional()?))
            .await
    }

    async fn upsert_user(&self, user: UpsertUser) -> AppResult<User> {
        validate_id("user", &user.id)?;
        self.run(move |conn| {
            let now = Utc::now();
            let row = user.into_user(None, now);
            Ok(diesel::insert_into(users::table)
                .values(&row)
                .on_conflict(users::id)
                .do_update()
                .set((
                    users::email.eq(&row.email),
                    users::first_name.eq(&row.first_name),
                    users::last_name.eq(&row.last_name),
                    users::profile_image_url.eq(&row.profile_image_url),
                    users::updated_at.eq(now),
                ))
                .get_result::<User>(conn)?)
        })
        .await
    }

    async fn list_favorites(&self, user_id: &str) -> AppResult<Vec<Profile>> {
        validate_id("user", user_id)?;
        let user_id = user_id.to_string();
        self.run(move |conn| {
            Ok(user_favorites::table
                .inner_join(profiles::table)
                .filter(user_favorites::user_id.eq(user_id))
                .order(user_favorites::created_at.desc())
                .select(profiles::all_columns)
                .load::<Profile>(conn)?)
        })
        .await
    }

    async fn is_favorite(&self, user_id: &str, profile_id: &str) -> AppResult<bool> {
        validate_id("user", user_id)?;
        validate_id("profile", profile_id)?;
        let (user_id, profile_id) = (user_id.to_string(), profile_id.to_string());
        self.run(move |conn| {
            let count = user_favorites::table
                .filter(user_favorites::user_id.eq(user_id))
                .filter(user_favorites::profile_id.eq(profile_id))
                .count()
                .get_result::<i64>(conn)?;
            Ok(count > 0)
        })
        .await
    }

    async fn toggle_favorite(&self, user_id: &str, profile_id: &str) -> AppResult<bool> {
        validate_id("user", user_id)?;
        validate_id("profile", profile_id)?;
        let (user_id, profile_id) = (user_id.to_string(), profile_id.to_string());

        self.run(move |conn| {
            conn.transaction::<_, AppError, _>(|conn| {
                if !profile_exists(conn, &profile_id)? {
                    return Err(AppError::profile_not_found(&profile_id));
                }

                let removed = diesel::delete(
                    user_favorites::table
                        .filter(user_favorites::user_id.eq(&user_id))
                        .filter(user_favorites::profile_id.eq(&profile_id)),
                )
                .execute(conn)?;
                if removed > 0 {
                    return Ok(false);
                }

                let favorite = UserFavorite {
                    id: new_id(),
                    user_id: user_id.clone(),
                    profile_id: profile_id.clone(),
                    created_at: Utc::now(),
                };
                diesel::insert_into(user_favorites::table)
                    .values(&favorite)
                    .on_conflict((user_favorites::user_id, user_favorites::profile_id))
                    .do_nothing()
                    .execute(conn)?;
                Ok(true)
            })
        })
        .await
    }

    async fn ping(&self) -> AppResult<()> {
        self.run(|conn| {
            diesel::sql_query("SELECT 1").execute(conn)?;
            Ok(())
        })
        .await
    }
}
