//! Wallsync core: canonical wallpaper model, normalization, store traits,
//! the sync orchestrator and its scheduler.

pub mod errors;
pub mod sync;
pub mod wallpapers;

pub use errors::{DatabaseError, Error, Result};
