//! On-disk cover cache

use bytes::Bytes;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::spotify::PlaylistSource;

/// Store of cover images, one `<playlist-id>.jpg` file per entry.
///
/// Entries are written once and never refreshed; a playlist leaving the
/// collection deletes its entry.
pub struct CoverCache {
    dir: PathBuf,
}

impl CoverCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn entry_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.jpg"))
    }

    /// Cached cover bytes for `id`, or `None` on a miss
    pub fn get(&self, id: &str) -> Option<Bytes> {
        std::fs::read(self.entry_path(id)).ok().map(Bytes::from)
    }

    /// Store cover bytes for `id`. Empty bytes are never cached.
    pub fn save(&self, id: &str, cover: &Bytes) {
        if cover.is_empty() {
            return;
        }
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            warn!(
                "Failed to create cache directory {}: {}",
                self.dir.display(),
                e
            );
            return;
        }
        if let Err(e) = std::fs::write(self.entry_path(id), cover) {
            warn!("Failed to cache cover for {}: {}", id, e);
        }
    }

    /// Drop the entry for `id`; invoked when the playlist is removed from
    /// the collection
    pub fn delete(&self, id: &str) {
        let path = self.entry_path(id);
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!("Failed to delete cache entry {}: {}", path.display(), e);
            } else {
                debug!("Deleted cache entry {}", path.display());
            }
        }
    }
}

/// Cache-aside cover accessor: a hit never refetches; a miss fetches from
/// the remote cover URL and populates the cache only on success.
///
/// Returns empty bytes when no cover can be had; a failed fetch never
/// poisons the cache.
pub async fn cover_via_cache(
    cache: &CoverCache,
    source: &dyn PlaylistSource,
    id: &str,
    cover_url: Option<&str>,
) -> Bytes {
    if let Some(cover) = cache.get(id) {
        return cover;
    }

    let Some(url) = cover_url else {
        return Bytes::new();
    };

    match source.fetch_bytes(url).await {
        Ok(cover) => {
            cache.save(id, &cover);
            cover
        }
        Err(e) => {
            warn!("Could not download cover from '{}': {}", url, e);
            Bytes::new()
        }
    }
}
