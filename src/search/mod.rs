//! Search and add pipelines
//!
//! Both run as background tasks behind a [`TaskSlot`](crate::tasks::TaskSlot):
//! search lists a user's public playlists and reports each one as found;
//! add persists a found playlist into the collection, rejecting duplicates.

use bytes::Bytes;
use std::sync::Arc;
use tracing::{info, warn};

use crate::library::{CoverCache, PlaylistRecord, PlaylistStore, cover_via_cache};
use crate::spotify::PlaylistSource;
use crate::tasks::{TaskContext, TaskEvent, TaskOutcome};

/// Username seeded into a store that has none
pub const DEFAULT_USERNAME: &str = "Spotify";

/// Sentinel username meaning "use the stored value"
pub const USERNAME_SENTINEL: &str = "default";

/// List `username`'s public playlists, emitting one
/// [`TaskEvent::PlaylistFound`] per hit.
///
/// An empty username is a fatal no-op. The sentinel `"default"` resolves to
/// the store's persisted username, seeding [`DEFAULT_USERNAME`] (and
/// emitting a [`TaskEvent::UsernameUpdated`] correction) when none is
/// persisted yet. Any other username becomes the new persisted default
/// before the listing starts.
pub async fn run_search(
    ctx: TaskContext,
    store: Arc<PlaylistStore>,
    cache: Arc<CoverCache>,
    source: Arc<dyn PlaylistSource>,
    username: String,
) -> TaskOutcome {
    if username.is_empty() {
        warn!("Could not search playlists: no username provided");
        return TaskOutcome::FatalError;
    }

    let username = if username == USERNAME_SENTINEL {
        let stored = store.username();
        if stored.is_empty() {
            store.set_username(DEFAULT_USERNAME);
            ctx.events
                .send(TaskEvent::UsernameUpdated(DEFAULT_USERNAME.to_string()))
                .await;
            DEFAULT_USERNAME.to_string()
        } else {
            stored
        }
    } else {
        store.set_username(&username);
        username
    };

    info!("Searching playlists for '{}'", username);

    let playlists = match source.list_playlists(&username).await {
        Ok(playlists) => playlists,
        Err(e) => {
            warn!("Could not list playlists for '{}': {:#}", username, e);
            return TaskOutcome::PartialFailure;
        }
    };

    for item in playlists {
        if ctx.cancel.is_cancelled() {
            info!("Search cancelled");
            return TaskOutcome::Cancelled;
        }
        if !item.is_public() {
            continue;
        }

        let record = item.into_record();
        let cover = cover_via_cache(
            &cache,
            source.as_ref(),
            &record.id,
            record.cover_url.as_deref(),
        )
        .await;
        ctx.events
            .send(TaskEvent::PlaylistFound { record, cover })
            .await;
    }

    TaskOutcome::Success
}

/// Persist a found playlist into the collection.
///
/// Rejected (logged, no mutation) when the id is already present: re-adding
/// never overwrites the stored record. On success the record is enabled,
/// given the next trailing priority, its cover cached, and a
/// [`TaskEvent::PlaylistAdded`] emitted.
pub async fn run_add(
    ctx: TaskContext,
    store: Arc<PlaylistStore>,
    cache: Arc<CoverCache>,
    mut record: PlaylistRecord,
    cover: Bytes,
) -> TaskOutcome {
    if store.get(&record.id).is_some() {
        warn!(
            "Playlist '{}' ({}) is already in the collection",
            record.title, record.id
        );
        return TaskOutcome::FatalError;
    }

    record.enabled = true;
    store.set(record.clone());
    cache.save(&record.id, &cover);

    // the store assigned the trailing priority; re-read so the event
    // carries the stored form
    let record = store.get(&record.id).unwrap_or(record);
    info!("Added playlist '{}' ({})", record.title, record.id);
    ctx.events
        .send(TaskEvent::PlaylistAdded { record, cover })
        .await;

    TaskOutcome::Success
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spotify::testing::{MockSource, playlist_item};
    use crate::tasks::{CancelToken, TaskSender};
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    struct Fixture {
        _dir: TempDir,
        store: Arc<PlaylistStore>,
        cache: Arc<CoverCache>,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().expect("create temp dir");
        let store = Arc::new(PlaylistStore::open(dir.path().join("playlists.json")));
        let cache = Arc::new(CoverCache::new(dir.path().join("covers")));
        Fixture {
            _dir: dir,
            store,
            cache,
        }
    }

    fn context() -> (TaskContext, mpsc::Receiver<TaskEvent>, CancelToken) {
        let (tx, rx) = mpsc::channel(100);
        let cancel = CancelToken::new();
        let ctx = TaskContext {
            cancel: cancel.clone(),
            events: TaskSender::new(tx),
        };
        (ctx, rx, cancel)
    }

    fn drain(rx: &mut mpsc::Receiver<TaskEvent>) -> Vec<TaskEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_empty_username_is_fatal_noop() {
        let fx = fixture();
        let (ctx, mut rx, _) = context();
        let source = Arc::new(MockSource::default());

        let outcome = run_search(
            ctx,
            fx.store.clone(),
            fx.cache.clone(),
            source,
            String::new(),
        )
        .await;

        assert_eq!(outcome, TaskOutcome::FatalError);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_default_sentinel_seeds_username_and_reports_it() {
        let fx = fixture();
        let (ctx, mut rx, _) = context();
        let source = Arc::new(MockSource::default());

        let outcome = run_search(
            ctx,
            fx.store.clone(),
            fx.cache.clone(),
            source,
            USERNAME_SENTINEL.to_string(),
        )
        .await;

        assert_eq!(outcome, TaskOutcome::Success);
        assert_eq!(fx.store.username(), DEFAULT_USERNAME);
        let events = drain(&mut rx);
        assert!(events.iter().any(|event| matches!(
            event,
            TaskEvent::UsernameUpdated(name) if name == DEFAULT_USERNAME
        )));
    }

    #[tokio::test]
    async fn test_default_sentinel_uses_stored_username() {
        let fx = fixture();
        fx.store.set_username("alice");
        let (ctx, mut rx, _) = context();
        let source = Arc::new(MockSource::default());

        run_search(
            ctx,
            fx.store.clone(),
            fx.cache.clone(),
            source,
            USERNAME_SENTINEL.to_string(),
        )
        .await;

        assert_eq!(fx.store.username(), "alice");
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_explicit_username_is_persisted() {
        let fx = fixture();
        let (ctx, _rx, _) = context();
        let source = Arc::new(MockSource::default());

        run_search(
            ctx,
            fx.store.clone(),
            fx.cache.clone(),
            source,
            "bob".to_string(),
        )
        .await;

        assert_eq!(fx.store.username(), "bob");
    }

    #[tokio::test]
    async fn test_search_filters_non_public_playlists() {
        let fx = fixture();
        let (ctx, mut rx, _) = context();

        let mut mock = MockSource::with_cover(b"cover");
        mock.add_playlist(playlist_item("pub1", "Public One", Some(true)), vec![]);
        mock.add_playlist(playlist_item("priv", "Private", Some(false)), vec![]);
        mock.add_playlist(playlist_item("pub2", "Public Two", None), vec![]);
        let source = Arc::new(mock);

        let outcome = run_search(
            ctx,
            fx.store.clone(),
            fx.cache.clone(),
            source,
            "alice".to_string(),
        )
        .await;

        assert_eq!(outcome, TaskOutcome::Success);
        let found: Vec<PlaylistRecord> = drain(&mut rx)
            .into_iter()
            .filter_map(|event| match event {
                TaskEvent::PlaylistFound { record, .. } => Some(record),
                _ => None,
            })
            .collect();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, "pub1");
        assert_eq!(found[1].id, "pub2");
        assert!(found.iter().all(|record| record.enabled));
        assert!(
            found
                .iter()
                .all(|record| record.priority == crate::library::PRIORITY_UNASSIGNED)
        );
    }

    #[tokio::test]
    async fn test_search_listing_failure_is_partial() {
        let fx = fixture();
        let (ctx, mut rx, _) = context();
        let source = Arc::new(MockSource {
            fail_listing: true,
            ..MockSource::default()
        });

        let outcome = run_search(
            ctx,
            fx.store.clone(),
            fx.cache.clone(),
            source,
            "alice".to_string(),
        )
        .await;

        assert_eq!(outcome, TaskOutcome::PartialFailure);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_search_honors_cancellation() {
        let fx = fixture();
        let (ctx, mut rx, cancel) = context();

        let mut mock = MockSource::with_cover(b"cover");
        mock.add_playlist(playlist_item("p1", "One", Some(true)), vec![]);
        mock.add_playlist(playlist_item("p2", "Two", Some(true)), vec![]);
        let source = Arc::new(mock);

        cancel.cancel();
        let outcome = run_search(
            ctx,
            fx.store.clone(),
            fx.cache.clone(),
            source,
            "alice".to_string(),
        )
        .await;

        assert_eq!(outcome, TaskOutcome::Cancelled);
        assert!(
            drain(&mut rx)
                .iter()
                .all(|event| !matches!(event, TaskEvent::PlaylistFound { .. }))
        );
    }

    #[tokio::test]
    async fn test_add_persists_record_and_cover() {
        let fx = fixture();
        let (ctx, mut rx, _) = context();

        let record = playlist_item("p1", "Focus", Some(true)).into_record();
        let outcome = run_add(
            ctx,
            fx.store.clone(),
            fx.cache.clone(),
            record,
            Bytes::from_static(b"cover"),
        )
        .await;

        assert_eq!(outcome, TaskOutcome::Success);
        let stored = fx.store.get("p1").expect("record persisted");
        assert!(stored.enabled);
        assert_eq!(stored.priority, 0);
        assert_eq!(fx.cache.get("p1"), Some(Bytes::from_static(b"cover")));

        let events = drain(&mut rx);
        assert!(events.iter().any(|event| matches!(
            event,
            TaskEvent::PlaylistAdded { record, .. } if record.priority == 0
        )));
    }

    #[tokio::test]
    async fn test_add_rejects_duplicate_id() {
        let fx = fixture();

        let (ctx, _rx, _) = context();
        let first = playlist_item("p1", "Original", Some(true)).into_record();
        run_add(
            ctx,
            fx.store.clone(),
            fx.cache.clone(),
            first,
            Bytes::new(),
        )
        .await;

        let (ctx, mut rx, _) = context();
        let second = playlist_item("p1", "Impostor", Some(true)).into_record();
        let outcome = run_add(
            ctx,
            fx.store.clone(),
            fx.cache.clone(),
            second,
            Bytes::new(),
        )
        .await;

        assert_eq!(outcome, TaskOutcome::FatalError);
        assert_eq!(
            fx.store.get("p1").map(|record| record.title),
            Some("Original".to_string())
        );
        assert!(drain(&mut rx).is_empty());
    }
}
