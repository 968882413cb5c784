pub mod ids;
pub mod models;
pub mod query;
pub mod schema;
pub mod storage;

pub use query::{ProfileQuery, ProfileSort};
pub use storage::{open_storage, Storage, StorageBackend, StoreConfig};
