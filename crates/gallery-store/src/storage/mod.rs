use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use gallery_shared::errors::AppResult;

use crate::models::{
    NewProfile, NewProfileImage, Profile, ProfileImage, UpdateProfile, UpdateProfileImage, UpsertUser, User,
};
use crate::query::ProfileQuery;

mod db;
mod file;

pub use db::DbStorage;
pub use file::FileStorage;

/// CRUD contract implemented by both persistence backends.
///
/// Methods returning `Option`/`bool` report a missing row that way instead of
/// erroring, so callers decide which not-found error to surface.
#[async_trait]
pub trait Storage: Send + Sync {
    fn backend(&self) -> StorageBackend;

    async fn list_profiles(&self, query: &ProfileQuery) -> AppResult<Vec<Profile>>;
    async fn get_profile(&self, id: &str) -> AppResult<Option<Profile>>;
    async fn create_profile(&self, new: NewProfile) -> AppResult<Profile>;
    async fn update_profile(&self, id: &str, changes: UpdateProfile) -> AppResult<Option<Profile>>;
    /// Soft delete. Returns whether the profile existed.
    async fn deactivate_profile(&self, id: &str) -> AppResult<bool>;

    async fn list_images(&self, profile_id: &str) -> AppResult<Vec<ProfileImage>>;
    async fn add_image(&self, profile_id: &str, new: NewProfileImage) -> AppResult<ProfileImage>;
    async fn update_image(
        &self,
        profile_id: &str,
        image_id: &str,
        changes: UpdateProfileImage,
    ) -> AppResult<Option<ProfileImage>>;
    async fn delete_image(&self, profile_id: &str, image_id: &str) -> AppResult<bool>;
    /// Deletes every post of a profile and returns how many were removed.
    async fn clear_images(&self, profile_id: &str) -> AppResult<u64>;

    async fn get_user(&self, id: &str) -> AppResult<Option<User>>;
    async fn upsert_user(&self, user: UpsertUser) -> AppResult<User>;

    /// Favorited profiles, most recently favorited first.
    async fn list_favorites(&self, user_id: &str) -> AppResult<Vec<Profile>>;
    async fn is_favorite(&self, user_id: &str, profile_id: &str) -> AppResult<bool>;
    /// Flips membership and returns the new state.
    async fn toggle_favorite(&self, user_id: &str, profile_id: &str) -> AppResult<bool>;

    async fn ping(&self) -> AppResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    File,
    #[serde(alias = "db", alias = "postgres")]
    Database,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::File => write!(f, "file"),
            StorageBackend::Database => write!(f, "database"),
        }
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StorageBackend::File),
            "database" | "db" | "postgres" => Ok(StorageBackend::Database),
            other => Err(format!("unknown storage backend '{other}' (expected file or database)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StorageBackend,
    pub data_dir: PathBuf,
    pub database_url: String,
    pub pool_size: u32,
}

/// Opens the configured backend.
pub async fn open_storage(config: &StoreConfig) -> anyhow::Result<Arc<dyn Storage>> {
    let storage: Arc<dyn Storage> = match config.backend {
        StorageBackend::File => Arc::new(FileStorage::open(&config.data_dir).await?),
        StorageBackend::Database => {
            let url = config.database_url.clone();
            let pool_size = config.pool_size;
            let pool = tokio::task::spawn_blocking(move || {
                gallery_shared::clients::db::create_pool(&url, pool_size)
            })
            .await??;
            Arc::new(DbStorage::new(pool))
        }
    };

    tracing::info!(backend = %config.backend, "storage opened");
    Ok(storage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names_parse() {
        assert_eq!("file".parse::<StorageBackend>().unwrap(), StorageBackend::File);
        assert_eq!(" Postgres ".parse::<StorageBackend>().unwrap(), StorageBackend::Database);
        assert_eq!("db".parse::<StorageBackend>().unwrap(), StorageBackend::Database);
        assert!("sqlite".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn backend_deserializes_aliases() {
        let backend: StorageBackend = serde_json::from_str("\"postgres\"").unwrap();
        assert_eq!(backend, StorageBackend::Database);
        assert_eq!(backend.to_string(), "database");
    }

    #[tokio::test]
    async fn opens_file_backend() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = StoreConfig {
            backend: StorageBackend::File,
            data_dir: dir.path().join("store"),
            database_url: String::new(),
            pool_size: 1,
        };
        let storage = open_storage(&config).await.unwrap();
        assert_eq!(storage.backend(), StorageBackend::File);
        storage.ping().await.unwrap();
        assert!(dir.path().join("store").is_dir());
    }
}
