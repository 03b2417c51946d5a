//! Playlist collection persistence and cover caching

pub mod cache;
pub mod store;

pub use cache::{CoverCache, cover_via_cache};
pub use store::{Collection, PRIORITY_UNASSIGNED, PlaylistRecord, PlaylistStore};
