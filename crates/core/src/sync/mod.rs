//! Sync orchestration: status, single-flight passes, scheduling.

mod sync_backoff;
mod sync_scheduler;
mod sync_status_model;
mod sync_status_tracker;
mod sync_traits;
mod wallpaper_sync_service;

pub use sync_backoff::*;
pub use sync_scheduler::*;
pub use sync_status_model::*;
pub use sync_status_tracker::*;
pub use sync_traits::*;
pub use wallpaper_sync_service::*;
