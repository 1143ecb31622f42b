//! SQLite persistence for wallpapers and sync status.

pub mod db;
pub mod errors;
pub mod schema;
pub mod sync_status;
pub mod wallpapers;

pub use db::{create_pool, get_connection, init, run_migrations, spawn_writer, DbPool, WriteHandle};
pub use errors::StorageError;
pub use sync_status::SyncStatusRepository;
pub use wallpapers::WallpaperRepository;
