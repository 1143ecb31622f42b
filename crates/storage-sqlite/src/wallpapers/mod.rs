mod model;
mod repository;

pub(crate) use model::{timestamp_from_db, timestamp_to_db};
pub use model::WallpaperDB;
pub use repository::WallpaperRepository;
