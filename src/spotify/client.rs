//! Spotify Web API HTTP client

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use tokio::sync::Mutex;
use tracing::debug;

use super::PlaylistSource;
use super::credentials::SpotifyCredentials;
use super::models::{Page, PlaylistItem, RemoteTrack, TokenResponse, TrackEntry};

const API_BASE: &str = "https://api.spotify.com/v1";
const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Refresh the token this long before it actually expires
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// HTTP client for the Spotify Web API, authenticating with the
/// client-credentials flow
pub struct SpotifyClient {
    credentials: SpotifyCredentials,
    http_client: Client,
    token: Mutex<Option<CachedToken>>,
}

impl SpotifyClient {
    pub fn new(credentials: SpotifyCredentials) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent("playsync/0.1.0")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            credentials,
            http_client,
            token: Mutex::new(None),
        })
    }

    /// Verify the credentials by fetching an access token
    pub async fn verify(&self) -> Result<()> {
        self.access_token().await.map(|_| ())
    }

    /// Current access token, fetching a fresh one when the cached token is
    /// missing or about to expire
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.expires_at > Utc::now() {
                return Ok(token.access_token.clone());
            }
        }

        debug!("Requesting client-credentials token");
        let response = self
            .http_client
            .post(TOKEN_URL)
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .context("Failed to reach the Spotify token endpoint")?
            .error_for_status()
            .context("Spotify rejected the client credentials")?
            .json::<TokenResponse>()
            .await
            .context("Failed to parse token response")?;

        let lifetime = (response.expires_in - TOKEN_EXPIRY_MARGIN_SECS).max(0);
        let token = response.access_token.clone();
        *cached = Some(CachedToken {
            access_token: response.access_token,
            expires_at: Utc::now() + Duration::seconds(lifetime),
        });

        Ok(token)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let token = self.access_token().await?;

        self.http_client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .with_context(|| format!("Request failed: {url}"))?
            .error_for_status()
            .with_context(|| format!("Spotify returned an error for {url}"))?
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {url}"))
    }
}

#[async_trait]
impl PlaylistSource for SpotifyClient {
    async fn list_playlists(&self, username: &str) -> Result<Vec<PlaylistItem>> {
        let mut playlists = Vec::new();
        let mut next = Some(format!("{API_BASE}/users/{username}/playlists?limit=50"));

        while let Some(url) = next {
            debug!("Fetching playlists page: {}", url);
            let page: Page<PlaylistItem> = self.get_json(&url).await?;
            playlists.extend(page.items);
            next = page.next;
        }

        debug!("Found {} playlists for '{}'", playlists.len(), username);
        Ok(playlists)
    }

    async fn get_playlist(&self, id: &str) -> Result<PlaylistItem> {
        self.get_json(&format!("{API_BASE}/playlists/{id}")).await
    }

    async fn list_tracks(&self, playlist_id: &str) -> Result<Vec<RemoteTrack>> {
        let mut tracks = Vec::new();
        let mut next = Some(format!(
            "{API_BASE}/playlists/{playlist_id}/tracks?limit=100&fields=next,items(is_local,track(id,name))"
        ));

        while let Some(url) = next {
            debug!("Fetching tracks page: {}", url);
            let page: Page<TrackEntry> = self.get_json(&url).await?;
            for entry in page.items {
                if entry.is_local {
                    continue;
                }
                // Withdrawn tracks have no catalog id and cannot be resolved
                let Some(track) = entry.track else { continue };
                let Some(id) = track.id else { continue };
                tracks.push(RemoteTrack {
                    name: track.name,
                    id,
                });
            }
            next = page.next;
        }

        debug!("Resolved {} tracks for playlist {}", tracks.len(), playlist_id);
        Ok(tracks)
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Bytes> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request failed: {url}"))?;

        if !response.status().is_success() {
            anyhow::bail!("'{}' answered {}", url, response.status());
        }

        response
            .bytes()
            .await
            .with_context(|| format!("Failed to read body from {url}"))
    }
}
