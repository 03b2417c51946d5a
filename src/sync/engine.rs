//! Playlist synchronization pipeline

use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, error, info, warn};

use crate::library::{CoverCache, PlaylistRecord, PlaylistStore, cover_via_cache};
use crate::resolver::TrackResolver;
use crate::spotify::PlaylistSource;
use crate::tasks::{TaskContext, TaskOutcome};
use crate::utils::sanitize_title;

/// Drives playlist downloads into per-playlist output folders.
///
/// `sync_all` and `sync_one` share one loop over an ordered working set:
/// enabled records ascending by priority for the former, a singleton for
/// the latter. Per-playlist and per-track failures are logged and skipped;
/// only an unavailable resolver aborts before any playlist is attempted.
pub struct SyncEngine {
    store: Arc<PlaylistStore>,
    cache: Arc<CoverCache>,
    source: Arc<dyn PlaylistSource>,
    resolver: Arc<dyn TrackResolver>,
    output_root: PathBuf,
}

impl SyncEngine {
    pub fn new(
        store: Arc<PlaylistStore>,
        cache: Arc<CoverCache>,
        source: Arc<dyn PlaylistSource>,
        resolver: Arc<dyn TrackResolver>,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            cache,
            source,
            resolver,
            output_root: output_root.into(),
        }
    }

    /// Sync every enabled playlist, in priority order
    pub async fn sync_all(self: Arc<Self>, ctx: TaskContext) -> TaskOutcome {
        let working_set = self.store.all().working_set();
        self.run(ctx, working_set).await
    }

    /// Sync a single playlist
    pub async fn sync_one(self: Arc<Self>, ctx: TaskContext, record: PlaylistRecord) -> TaskOutcome {
        self.run(ctx, vec![record]).await
    }

    async fn run(&self, ctx: TaskContext, working_set: Vec<PlaylistRecord>) -> TaskOutcome {
        if let Err(e) = self.resolver.ready().await {
            error!("Track resolver unavailable: {:#}", e);
            return TaskOutcome::FatalError;
        }

        let total = working_set.len();
        info!("Synchronizing {} playlist(s)", total);

        for (index, playlist) in working_set.iter().enumerate() {
            if ctx.cancel.is_cancelled() {
                info!("Sync cancelled before '{}'", playlist.title);
                return TaskOutcome::Cancelled;
            }

            if self.sync_playlist(&ctx, playlist, index + 1, total).await {
                return TaskOutcome::Cancelled;
            }
        }

        TaskOutcome::Success
    }

    /// Process one playlist; item-level failures are absorbed. Returns true
    /// when cancellation was observed mid-playlist.
    async fn sync_playlist(
        &self,
        ctx: &TaskContext,
        playlist: &PlaylistRecord,
        position: usize,
        total: usize,
    ) -> bool {
        info!("== Starting sync for '{}' ==", playlist.title);

        let dir = self.output_root.join(sanitize_title(&playlist.title));
        if let Err(e) = fs::create_dir_all(&dir).await {
            warn!("Could not create '{}': {}", dir.display(), e);
            return false;
        }

        let cover = cover_via_cache(
            &self.cache,
            self.source.as_ref(),
            &playlist.id,
            playlist.cover_url.as_deref(),
        )
        .await;
        if !cover.is_empty() {
            if let Err(e) = fs::write(dir.join("cover.jpg"), &cover).await {
                warn!("Could not write cover for '{}': {}", playlist.title, e);
            }
        }

        let tracks = match self.resolver.resolve_tracks(&playlist.url).await {
            Ok(tracks) => tracks,
            Err(e) => {
                warn!(
                    "Could not resolve tracks for '{}': {:#}",
                    playlist.title, e
                );
                return false;
            }
        };
        if tracks.is_empty() {
            warn!("No tracks found for '{}'", playlist.title);
            return false;
        }

        let track_total = tracks.len();
        for (track_index, track) in tracks.iter().enumerate() {
            if ctx.cancel.is_cancelled() {
                info!("Sync cancelled during '{}'", playlist.title);
                return true;
            }

            ctx.events
                .progress(
                    format!(
                        "{}: synchronizing {}… {}/{}",
                        playlist.title,
                        track.name,
                        track_index + 1,
                        track_total
                    ),
                    Some((position, total)),
                )
                .await;

            match self.resolver.download_track(track, &dir).await {
                Ok(path) => debug!("Downloaded '{}' to {}", track.name, path.display()),
                Err(e) => warn!("Failed to download '{}': {:#}", track.name, e),
            }
        }

        false
    }
}
