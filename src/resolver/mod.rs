//! Track resolution and download through the external `spotdl` program

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;
use tracing::debug;
use url::Url;

use crate::spotify::PlaylistSource;
use crate::utils::sanitize_title;

/// Default track download program
pub const DEFAULT_PROGRAM: &str = "spotdl";

/// One downloadable track of a resolved playlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDescriptor {
    pub name: String,
    /// Remote identifier the download program accepts (a track share URL)
    pub identifier: String,
}

/// Track resolution/download capability consumed by the sync pipeline
#[async_trait]
pub trait TrackResolver: Send + Sync {
    /// Availability probe; failure means no sync can start at all
    async fn ready(&self) -> Result<()>;

    /// Ordered track descriptors for a playlist share URL; may be empty
    async fn resolve_tracks(&self, playlist_url: &str) -> Result<Vec<TrackDescriptor>>;

    /// Download one track into `output_dir`, returning the local file path
    async fn download_track(&self, track: &TrackDescriptor, output_dir: &Path) -> Result<PathBuf>;
}

/// Extract the playlist id from a share URL: the last path segment, query
/// stripped
pub fn playlist_id_from_url(playlist_url: &str) -> Result<String> {
    let url = Url::parse(playlist_url)
        .with_context(|| format!("Invalid playlist URL '{playlist_url}'"))?;

    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("No playlist id in URL '{playlist_url}'"))
}

/// Resolver backed by the Spotify API for track listing and the `spotdl`
/// command line for the actual audio download
pub struct SpotdlResolver {
    program: String,
    source: Arc<dyn PlaylistSource>,
}

impl SpotdlResolver {
    pub fn new(program: impl Into<String>, source: Arc<dyn PlaylistSource>) -> Self {
        Self {
            program: program.into(),
            source,
        }
    }
}

#[async_trait]
impl TrackResolver for SpotdlResolver {
    async fn ready(&self) -> Result<()> {
        let output = Command::new(&self.program)
            .arg("--version")
            .output()
            .await
            .with_context(|| format!("Could not run '{}'", self.program))?;

        if !output.status.success() {
            anyhow::bail!("'{} --version' exited with {}", self.program, output.status);
        }

        debug!(
            "{} available: {}",
            self.program,
            String::from_utf8_lossy(&output.stdout).trim()
        );
        Ok(())
    }

    async fn resolve_tracks(&self, playlist_url: &str) -> Result<Vec<TrackDescriptor>> {
        let playlist_id = playlist_id_from_url(playlist_url)?;
        let tracks = self.source.list_tracks(&playlist_id).await?;

        Ok(tracks
            .into_iter()
            .map(|track| TrackDescriptor {
                identifier: format!("https://open.spotify.com/track/{}", track.id),
                name: track.name,
            })
            .collect())
    }

    async fn download_track(&self, track: &TrackDescriptor, output_dir: &Path) -> Result<PathBuf> {
        let template = output_dir.join("{title}.{output-ext}");

        let output = Command::new(&self.program)
            .arg("download")
            .arg(&track.identifier)
            .arg("--output")
            .arg(&template)
            .output()
            .await
            .with_context(|| format!("Could not run '{}'", self.program))?;

        if !output.status.success() {
            anyhow::bail!(
                "'{}' failed for '{}': {}",
                self.program,
                track.name,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(output_dir.join(format!("{}.mp3", sanitize_title(&track.name))))
    }
}
