use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use gallery_shared::errors::{AppError, AppResult, ErrorCode};

use super::{Storage, StorageBackend};
use crate::ids::{new_id, validate_id};
use crate::models::{
    next_order, sort_images, NewProfile, NewProfileImage, Profile, ProfileImage, UpdateProfile,
    UpdateProfileImage, UpsertUser, User, UserFavorite,
};
use crate::query::ProfileQuery;

const PROFILE_FILE: &str = "profile.json";
const POST_PREFIX: &str = "post-";
const USERS_DIR: &str = "_users";
const USER_FILE: &str = "user.json";
const FAVORITES_FILE: &str = "favorites.json";

/// JSON documents under a data directory:
///
/// ```text
/// <root>/<profileId>/profile.json
/// <root>/<profileId>/post-<imageId>.json
/// <root>/_users/<userId>/user.json
/// <root>/_users/<userId>/favorites.json
/// ```
///
/// Each directory has its own async mutex held across every
/// read-modify-write, and files are replaced by rename so readers never see a
/// partial document.
pub struct FileStorage {
    root: PathBuf,
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl FileStorage {
    pub async fn open(root: impl AsRef<Path>) -> AppResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(USERS_DIR)).await?;
        tracing::debug!(root = %root.display(), "file storage ready");
        Ok(Self {
            root,
            locks: DashMap::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn profile_dir(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    fn user_dir(&self, id: &str) -> PathBuf {
        self.root.join(USERS_DIR).join(id)
    }

    fn post_path(&self, profile_id: &str, image_id: &str) -> PathBuf {
        self.profile_dir(profile_id).join(format!("{POST_PREFIX}{image_id}.json"))
    }

    async fn lock(&self, dir: &Path) -> DirLock<'_> {
        let lock = self
            .locks
            .entry(dir.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        DirLock {
            locks: &self.locks,
            dir: dir.to_path_buf(),
            guard: Some(lock.lock_owned().await),
        }
    }

    async fn read_profile(&self, id: &str) -> AppResult<Option<Profile>> {
        read_json(&self.profile_dir(id).join(PROFILE_FILE)).await
    }

    async fn write_profile(&self, profile: &Profile) -> AppResult<()> {
        write_json(&self.profile_dir(&profile.id).join(PROFILE_FILE), profile).await
    }

    /// Post file names in a profile directory. A missing directory has no posts.
    async fn post_paths(&self, profile_id: &str) -> AppResult<Vec<PathBuf>> {
        let dir = self.profile_dir(profile_id);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(POST_PREFIX) && name.ends_with(".json") {
                paths.push(entry.path());
            }
        }
        Ok(paths)
    }

    async fn load_images(&self, profile_id: &str) -> AppResult<Vec<ProfileImage>> {
        let mut images = Vec::new();
        for path in self.post_paths(profile_id).await? {
            match read_json::<ProfileImage>(&path).await {
                Ok(Some(image)) => images.push(image),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable post");
                }
            }
        }
        sort_images(&mut images);
        Ok(images)
    }

    /// Clears the main flag on every post except `keep`. Caller holds the profile lock.
    async fn demote_main_images(&self, images: &[ProfileImage], keep: &str) -> AppResult<()> {
        let now = Utc::now();
        for image in images.iter().filter(|i| i.is_main_image && i.id != keep) {
            let mut image = image.clone();
            image.is_main_image = false;
            image.updated_at = now;
            write_json(&self.post_path(&image.profile_id, &image.id), &image).await?;
        }
        Ok(())
    }

    async fn read_favorites(&self, user_id: &str) -> AppResult<Vec<UserFavorite>> {
        Ok(read_json(&self.user_dir(user_id).join(FAVORITES_FILE))
            .await?
            .unwrap_or_default())
    }
}

/// Held directory lock. Dropping it releases the mutex and forgets the map
/// entry once no other task holds or waits on it.
struct DirLock<'a> {
    locks: &'a DashMap<PathBuf, Arc<Mutex<()>>>,
    dir: PathBuf,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for DirLock<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // Cloning out of the map happens under the shard lock, so a count of
        // one here means nobody else can be holding this mutex.
        self.locks.remove_if(&self.dir, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[async_trait]
impl Storage for FileStorage {
    fn backend(&self) -> StorageBackend {
        StorageBackend::File
    }

    async fn list_profiles(&self, query: &ProfileQuery) -> AppResult<Vec<Profile>> {
        let mut entries = fs::read_dir(&self.root).await?;
        let mut profiles = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('_') || name.starts_with('.') {
                continue;
            }

            let path = entry.path().join(PROFILE_FILE);
            match read_json::<Profile>(&path).await {
                Ok(Some(profile)) if query.matches(&profile) => profiles.push(profile),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable profile");
                }
            }
        }

        Ok(profiles)
    }

    async fn get_profile(&self, id: &str) -> AppResult<Option<Profile>> {
        validate_id("profile", id)?;
        self.read_profile(id).await
    }

    async fn create_profile(&self, new: NewProfile) -> AppResult<Profile> {
        let id = new.id.clone().unwrap_or_else(new_id);
        validate_id("profile", &id)?;

        let dir = self.profile_dir(&id);
        let _guard = self.lock(&dir).await;

        if fs::try_exists(dir.join(PROFILE_FILE)).await? {
            return Err(AppError::new(
                ErrorCode::ProfileAlreadyExists,
                format!("profile '{id}' already exists"),
            ));
        }

        fs::create_dir_all(&dir).await?;
        let profile = new.into_profile(id, Utc::now());
        self.write_profile(&profile).await?;

        tracing::info!(profile_id = %profile.id, name = %profile.name, "profile created");
        Ok(profile)
    }

    async fn update_profile(&self, id: &str, changes: UpdateProfile) -> AppResult<Option<Profile>> {
        validate_id("profile", id)?;
        let _guard = self.lock(&self.profile_dir(id)).await;

        let Some(mut profile) = self.read_profile(id).await? else {
            return Ok(None);
        };
        changes.apply_to(&mut profile, Utc::now());
        self.write_profile(&profile).await?;

        Ok(Some(profile))
    }

    async fn deactivate_profile(&self, id: &str) -> AppResult<bool> {
        let updated = self.update_profile(id, UpdateProfile::deactivate()).await?;
        Ok(updated.is_some())
    }

    async fn list_images(&self, profile_id: &str) -> AppResult<Vec<ProfileImage>> {
        validate_id("profile", profile_id)?;
        self.load_images(profile_id).await
    }

    async fn add_image(&self, profile_id: &str, new: NewProfileImage) -> AppResult<ProfileImage> {
        validate_id("profile", profile_id)?;
        let image_id = new.id.clone().unwrap_or_else(new_id);
        validate_id("post", &image_id)?;

        let _guard = self.lock(&self.profile_dir(profile_id)).await;

        if self.read_profile(profile_id).await?.is_none() {
            return Err(AppError::profile_not_found(profile_id));
        }

        let path = self.post_path(profile_id, &image_id);
        if fs::try_exists(&path).await? {
            return Err(AppError::new(
                ErrorCode::ImageAlreadyExists,
                format!("post '{image_id}' already exists"),
            ));
        }

        let existing = self.load_images(profile_id).await?;
        let image = new.into_image(image_id, profile_id, next_order(&existing), Utc::now())?;
        if image.is_main_image {
            self.demote_main_images(&existing, &image.id).await?;
        }
        write_json(&path, &image).await?;

        tracing::debug!(profile_id, image_id = %image.id, "post added");
        Ok(image)
    }

    async fn update_image(
        &self,
        profile_id: &str,
        image_id: &str,
        changes: UpdateProfileImage,
    ) -> AppResult<Option<ProfileImage>> {
        validate_id("profile", profile_id)?;
        validate_id("post", image_id)?;
        let _guard = self.lock(&self.profile_dir(profile_id)).await;

        let path = self.post_path(profile_id, image_id);
        let Some(mut image) = read_json::<ProfileImage>(&path).await? else {
            return Ok(None);
        };
        changes.apply_to(&mut image, Utc::now())?;

        if image.is_main_image {
            let siblings = self.load_images(profile_id).await?;
            self.demote_main_images(&siblings, image_id).await?;
        }
        write_json(&path, &image).await?;

        Ok(Some(image))
    }

    async fn delete_image(&self, profile_id: &str, image_id: &str) -> AppResult<bool> {
        validate_id("profile", profile_id)?;
        validate_id("post", image_id)?;
        let _guard = self.lock(&self.profile_dir(profile_id)).await;

        match fs::remove_file(self.post_path(profile_id, image_id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn clear_images(&self, profile_id: &str) -> AppResult<u64> {
        validate_id("profile", profile_id)?;
        let _guard = self.lock(&self.profile_dir(profile_id)).await;

        let mut removed = 0;
        for path in self.post_paths(profile_id).await? {
            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        tracing::info!(profile_id, removed, "posts cleared");
        Ok(removed)
    }

    async fn get_user(&self, id: &str) -> AppResult<Option<User>> {
        validate_id("user", id)?;
        read_json(&self.user_dir(id).join(USER_FILE)).await
    }

    async fn upsert_user(&self, user: UpsertUser) -> AppResult<User> {
        validate_id("user", &user.id)?;
        let dir = self.user_dir(&user.id);
        let _guard = self.lock(&dir).await;

        let path = dir.join(USER_FILE);
        let existing = read_json::<User>(&path).await?;
        let user = user.into_user(existing.as_ref(), Utc::now());

        fs::create_dir_all(&dir).await?;
        write_json(&path, &user).await?;
        Ok(user)
    }

    async fn list_favorites(&self, user_id: &str) -> AppResult<Vec<Profile>> {
        validate_id("user", user_id)?;
        let mut favorites = self.read_favorites(user_id).await?;
        favorites.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut profiles = Vec::with_capacity(favorites.len());
        for favorite in favorites {
            if let Some(profile) = self.read_profile(&favorite.profile_id).await? {
                profiles.push(profile);
            }
        }
        Ok(profiles)
    }

    async fn is_favorite(&self, user_id: &str, profile_id: &str) -> AppResult<bool> {
        validate_id("user", user_id)?;
        validate_id("profile", profile_id)?;
        let favorites = self.read_favorites(user_id).await?;
        Ok(favorites.iter().any(|f| f.profile_id == profile_id))
    }

    async fn toggle_favorite(&self, user_id: &str, profile_id: &str) -> AppResult<bool> {
        validate_id("user", user_id)?;
        validate_id("profile", profile_id)?;

        if self.read_profile(profile_id).await?.is_none() {
            return Err(AppError::profile_not_found(profile_id));
        }

        let dir = self.user_dir(user_id);
        let _guard = self.lock(&dir).await;

        let mut favorites = self.read_favorites(user_id).await?;
        let before = favorites.len();
        favorites.retain(|f| f.profile_id != profile_id);
        let favorited = favorites.len() == before;

        if favorited {
            favorites.push(UserFavorite {
                id: new_id(),
                user_id: user_id.to_string(),
                profile_id: profile_id.to_string(),
                created_at: Utc::now(),
            });
        }

        fs::create_dir_all(&dir).await?;
        write_json(&dir.join(FAVORITES_FILE), &favorites).await?;

        tracing::debug!(user_id, profile_id, favorited, "favorite toggled");
        Ok(favorited)
    }

    async fn ping(&self) -> AppResult<()> {
        let meta = fs::metadata(&self.root).await?;
        if !meta.is_dir() {
            return Err(AppError::new(
                ErrorCode::StorageUnavailable,
                format!("{} is not a directory", self.root.display()),
            ));
        }
        Ok(())
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> AppResult<Option<T>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Writes to a sibling temp file, then renames over the target.
async fn write_json<T: Serialize>(path: &Path, value: &T) -> AppResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension(format!("json.tmp-{}", Uuid::new_v4().simple()));

    fs::write(&tmp, &bytes).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn storage() -> (TempDir, FileStorage) {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::open(dir.path()).await.unwrap();
        (dir, storage)
    }

    fn new_profile(id: &str, name: &str) -> NewProfile {
        NewProfile {
            id: Some(id.into()),
            name: name.into(),
            category: Some("Art".into()),
            ..Default::default()
        }
    }

    fn post(url: &str) -> NewProfileImage {
        NewProfileImage {
            image_url: Some(url.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn created_profile_is_listed_and_readable() {
        let (dir, storage) = storage().await;
        let created = storage.create_profile(new_profile("jane", "Jane")).await.unwrap();

        assert!(dir.path().join("jane").join("profile.json").exists());
        let listed = storage.list_profiles(&ProfileQuery::active()).await.unwrap();
        assert_eq!(listed, vec![created.clone()]);
        assert_eq!(storage.get_profile("jane").await.unwrap(), Some(created));
    }

    #[tokio::test]
    async fn duplicate_id_conflicts() {
        let (_dir, storage) = storage().await;
        storage.create_profile(new_profile("jane", "Jane")).await.unwrap();

        let err = storage.create_profile(new_profile("jane", "Other")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ProfileAlreadyExists);
    }

    #[tokio::test]
    async fn deactivated_profile_is_hidden_but_kept() {
        let (_dir, storage) = storage().await;
        storage.create_profile(new_profile("jane", "Jane")).await.unwrap();

        assert!(storage.deactivate_profile("jane").await.unwrap());
        assert!(!storage.deactivate_profile("ghost").await.unwrap());

        assert!(storage.list_profiles(&ProfileQuery::active()).await.unwrap().is_empty());
        let stored = storage.get_profile("jane").await.unwrap().unwrap();
        assert!(!stored.is_active);
    }

    #[tokio::test]
    async fn internal_and_broken_directories_are_skipped() {
        let (dir, storage) = storage().await;
        storage.create_profile(new_profile("jane", "Jane")).await.unwrap();

        std::fs::create_dir_all(dir.path().join("broken")).unwrap();
        std::fs::write(dir.path().join("broken").join("profile.json"), b"{not json").unwrap();
        std::fs::create_dir_all(dir.path().join("empty")).unwrap();
        std::fs::write(dir.path().join("stray.txt"), b"hello").unwrap();

        let listed = storage.list_profiles(&ProfileQuery::active()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "jane");
    }

    #[tokio::test]
    async fn path_like_ids_never_touch_the_filesystem() {
        let (_dir, storage) = storage().await;
        let err = storage.get_profile("../etc").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidId);

        let err = storage.create_profile(new_profile("_users", "Sneaky")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidId);
    }

    #[tokio::test]
    async fn posts_are_appended_in_order() {
        let (_dir, storage) = storage().await;
        storage.create_profile(new_profile("jane", "Jane")).await.unwrap();

        let first = storage.add_image("jane", post("https://cdn.example.com/1.jpg")).await.unwrap();
        let second = storage.add_image("jane", post("https://cdn.example.com/2.jpg")).await.unwrap();
        assert_eq!((first.order, second.order), (0, 1));

        let images = storage.list_images("jane").await.unwrap();
        let ids: Vec<_> = images.iter().map(|i| i.id.clone()).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn post_for_missing_profile_is_rejected() {
        let (_dir, storage) = storage().await;
        let err = storage.add_image("ghost", post("https://cdn.example.com/1.jpg")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ProfileNotFound);
    }

    #[tokio::test]
    async fn only_one_main_image() {
        let (_dir, storage) = storage().await;
        storage.create_profile(new_profile("jane", "Jane")).await.unwrap();

        let mut main = post("https://cdn.example.com/1.jpg");
        main.is_main_image = Some(true);
        let a = storage.add_image("jane", main.clone()).await.unwrap();
        let b = storage.add_image("jane", post("https://cdn.example.com/2.jpg")).await.unwrap();

        let promote = UpdateProfileImage { is_main_image: Some(true), ..Default::default() };
        storage.update_image("jane", &b.id, promote).await.unwrap().unwrap();

        let images = storage.list_images("jane").await.unwrap();
        let mains: Vec<_> = images.iter().filter(|i| i.is_main_image).map(|i| i.id.clone()).collect();
        assert_eq!(mains, vec![b.id.clone()]);

        let c = storage.add_image("jane", main).await.unwrap();
        let images = storage.list_images("jane").await.unwrap();
        let mains: Vec<_> = images.iter().filter(|i| i.is_main_image).map(|i| i.id.clone()).collect();
        assert_eq!(mains, vec![c.id]);
        assert!(images.iter().any(|i| i.id == a.id && !i.is_main_image));
    }

    #[tokio::test]
    async fn delete_and_clear_posts() {
        let (_dir, storage) = storage().await;
        storage.create_profile(new_profile("jane", "Jane")).await.unwrap();
        let a = storage.add_image("jane", post("https://cdn.example.com/1.jpg")).await.unwrap();
        storage.add_image("jane", post("https://cdn.example.com/2.jpg")).await.unwrap();
        storage.add_image("jane", post("https://cdn.example.com/3.jpg")).await.unwrap();

        assert!(storage.delete_image("jane", &a.id).await.unwrap());
        assert!(!storage.delete_image("jane", &a.id).await.unwrap());
        assert_eq!(storage.clear_images("jane").await.unwrap(), 2);
        assert!(storage.list_images("jane").await.unwrap().is_empty());
        assert!(storage.get_profile("jane").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn favorite_toggle_flips_and_is_idempotent_over_two_calls() {
        let (_dir, storage) = storage().await;
        storage.create_profile(new_profile("jane", "Jane")).await.unwrap();

        assert!(storage.toggle_favorite("u1", "jane").await.unwrap());
        assert!(storage.is_favorite("u1", "jane").await.unwrap());
        assert_eq!(storage.list_favorites("u1").await.unwrap().len(), 1);

        assert!(!storage.toggle_favorite("u1", "jane").await.unwrap());
        assert!(!storage.is_favorite("u1", "jane").await.unwrap());
        assert!(storage.list_favorites("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn favoriting_missing_profile_fails() {
        let (_dir, storage) = storage().await;
        let err = storage.toggle_favorite("u1", "ghost").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ProfileNotFound);
    }

    #[tokio::test]
    async fn concurrent_favorites_are_not_lost() {
        let (_dir, storage) = storage().await;
        let storage = Arc::new(storage);
        for i in 0..16 {
            storage.create_profile(new_profile(&format!("p{i}"), "P")).await.unwrap();
        }

        let toggles = (0..16).map(|i| {
            let storage = storage.clone();
            tokio::spawn(async move { storage.toggle_favorite("u1", &format!("p{i}")).await })
        });
        for result in futures::future::join_all(toggles).await {
            assert!(result.unwrap().unwrap());
        }

        assert_eq!(storage.list_favorites("u1").await.unwrap().len(), 16);
    }

    #[tokio::test]
    async fn concurrent_updates_keep_every_post_order_unique() {
        let (_dir, storage) = storage().await;
        let storage = Arc::new(storage);
        storage.create_profile(new_profile("jane", "Jane")).await.unwrap();

        let adds = (0..12).map(|i| {
            let storage = storage.clone();
            tokio::spawn(async move {
                storage.add_image("jane", post(&format!("https://cdn.example.com/{i}.jpg"))).await
            })
        });
        for result in futures::future::join_all(adds).await {
            result.unwrap().unwrap();
        }

        let mut orders: Vec<_> = storage.list_images("jane").await.unwrap().iter().map(|i| i.order).collect();
        orders.sort();
        assert_eq!(orders, (0..12).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn concurrent_profile_updates_keep_every_field() {
        let (_dir, storage) = storage().await;
        let storage = Arc::new(storage);
        storage.create_profile(new_profile("jane", "Jane")).await.unwrap();

        let updates = vec![
            UpdateProfile { title: Some("Photographer".into()), ..Default::default() },
            UpdateProfile { location: Some("Lisbon".into()), ..Default::default() },
            UpdateProfile { description: Some("Street and portraits".into()), ..Default::default() },
            UpdateProfile { rating: Some("4.9".into()), ..Default::default() },
            UpdateProfile { review_count: Some("120".into()), ..Default::default() },
            UpdateProfile { likes_count: Some("1.2K".into()), ..Default::default() },
            UpdateProfile { views_count: Some("30K".into()), ..Default::default() },
            UpdateProfile { subscribers_count: Some("800".into()), ..Default::default() },
        ];
        let tasks = updates.into_iter().map(|changes| {
            let storage = storage.clone();
            tokio::spawn(async move { storage.update_profile("jane", changes).await })
        });
        for result in futures::future::join_all(tasks).await {
            assert!(result.unwrap().unwrap().is_some());
        }

        let profile = storage.get_profile("jane").await.unwrap().unwrap();
        assert_eq!(profile.name, "Jane");
        assert_eq!(profile.title.as_deref(), Some("Photographer"));
        assert_eq!(profile.location.as_deref(), Some("Lisbon"));
        assert_eq!(profile.description.as_deref(), Some("Street and portraits"));
        assert_eq!(profile.rating.as_deref(), Some("4.9"));
        assert_eq!(profile.review_count.as_deref(), Some("120"));
        assert_eq!(profile.likes_count.as_deref(), Some("1.2K"));
        assert_eq!(profile.views_count.as_deref(), Some("30K"));
        assert_eq!(profile.subscribers_count.as_deref(), Some("800"));
    }

    #[tokio::test]
    async fn directory_locks_are_forgotten_after_use() {
        let (_dir, storage) = storage().await;
        storage.create_profile(new_profile("jane", "Jane")).await.unwrap();
        storage.add_image("jane", post("https://cdn.example.com/a.jpg")).await.unwrap();
        assert!(storage.update_profile("ghost", UpdateProfile::default()).await.unwrap().is_none());
        storage.toggle_favorite("u1", "jane").await.unwrap();

        assert!(storage.locks.is_empty());

        let held = storage.lock(&storage.profile_dir("jane")).await;
        assert_eq!(storage.locks.len(), 1);
        drop(held);
        assert!(storage.locks.is_empty());
    }

    #[tokio::test]
    async fn video_url_update_switches_content_type() {
        let (_dir, storage) = storage().await;
        storage.create_profile(new_profile("jane", "Jane")).await.unwrap();
        let image = storage.add_image("jane", post("https://cdn.example.com/a.jpg")).await.unwrap();
        assert_eq!(image.content_type, "image");

        let changes = UpdateProfileImage {
            video_url: Some("https://cdn.example.com/a.mp4".into()),
            ..Default::default()
        };
        let updated = storage.update_image("jane", &image.id, changes).await.unwrap().unwrap();
        assert_eq!(updated.content_type, "video");
        assert_eq!(storage.list_images("jane").await.unwrap()[0].content_type, "video");
    }

    #[tokio::test]
    async fn upsert_user_keeps_creation_time() {
        let (_dir, storage) = storage().await;
        let first = storage
            .upsert_user(UpsertUser { id: "u1".into(), email: Some("a@example.com".into()), ..Default::default() })
            .await
            .unwrap();
        let second = storage
            .upsert_user(UpsertUser { id: "u1".into(), email: Some("b@example.com".into()), ..Default::default() })
            .await
            .unwrap();

        assert_eq!(first.created_at, second.created_at);
        assert_eq!(storage.get_user("u1").await.unwrap().unwrap().email.as_deref(), Some("b@example.com"));
    }

    #[tokio::test]
    async fn ping_checks_root() {
        let (_dir, storage) = storage().await;
        storage.ping().await.unwrap();
        assert_eq!(storage.backend(), StorageBackend::File);
    }
}
