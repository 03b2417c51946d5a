//! Spotify Web API module

pub mod client;
pub mod credentials;
pub mod models;

pub use client::SpotifyClient;
pub use credentials::SpotifyCredentials;
pub use models::*;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// Remote playlist capability consumed by the pipelines.
///
/// Injected as a trait object so tasks and tests construct their own source
/// instead of reaching for ambient state.
#[async_trait]
pub trait PlaylistSource: Send + Sync {
    /// All playlists owned by `username`, across pages
    async fn list_playlists(&self, username: &str) -> Result<Vec<PlaylistItem>>;

    /// Metadata of a single playlist
    async fn get_playlist(&self, id: &str) -> Result<PlaylistItem>;

    /// Playable tracks of a playlist, in playlist order; may be empty
    async fn list_tracks(&self, playlist_id: &str) -> Result<Vec<RemoteTrack>>;

    /// Raw bytes from `url`; a non-success status is an error
    async fn fetch_bytes(&self, url: &str) -> Result<Bytes>;
}
