//! Spotify Web API response models

use chrono::Utc;
use serde::Deserialize;

use crate::library::{PRIORITY_UNASSIGNED, PlaylistRecord};

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
}

/// One page of a paginated listing
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    /// Absolute URL of the next page, absent on the last one
    pub next: Option<String>,
}

/// A playlist as returned by the listing and lookup endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub owner: Owner,
    pub external_urls: ExternalUrls,
    pub tracks: TrackRef,
    #[serde(default)]
    pub images: Vec<Image>,
    /// Absent or null visibility is treated as public
    #[serde(default)]
    pub public: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Owner {
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExternalUrls {
    pub spotify: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackRef {
    pub total: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// An entry of a playlist's track listing
#[derive(Debug, Deserialize)]
pub struct TrackEntry {
    #[serde(default)]
    pub track: Option<TrackObject>,
    #[serde(default)]
    pub is_local: bool,
}

#[derive(Debug, Deserialize)]
pub struct TrackObject {
    pub name: String,
    /// Withdrawn and local tracks have no catalog id
    #[serde(default)]
    pub id: Option<String>,
}

/// A playable track of a remote playlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub name: String,
    pub id: String,
}

impl PlaylistItem {
    pub fn is_public(&self) -> bool {
        self.public.unwrap_or(true)
    }

    /// URL of the largest cover image, if any
    pub fn largest_cover_url(&self) -> Option<String> {
        self.images
            .iter()
            .max_by_key(|image| (image.width.unwrap_or(0), image.height.unwrap_or(0)))
            .map(|image| image.url.clone())
    }

    /// Build a fresh collection record: enabled, priority unassigned
    pub fn into_record(self) -> PlaylistRecord {
        let cover_url = self.largest_cover_url();
        PlaylistRecord {
            id: self.id,
            title: self.name,
            owner: self.owner.display_name.unwrap_or_else(|| "Unknown".to_string()),
            url: self.external_urls.spotify,
            total_tracks: self.tracks.total,
            cover_url,
            enabled: true,
            priority: PRIORITY_UNASSIGNED,
            added_at: Utc::now(),
        }
    }
}
