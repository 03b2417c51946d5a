//! Durable playlist collection

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, error};

/// Priority value meaning "not yet assigned a position"
pub const PRIORITY_UNASSIGNED: i64 = -1;

/// A remote playlist under management
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaylistRecord {
    /// Authoritative key; on load the store map key wins over this field
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub owner: String,
    pub url: String,
    pub total_tracks: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Sync and display position; lower syncs earlier
    #[serde(default = "default_priority")]
    pub priority: i64,
    #[serde(default = "Utc::now")]
    pub added_at: DateTime<Utc>,
}

fn default_enabled() -> bool {
    true
}

fn default_priority() -> i64 {
    PRIORITY_UNASSIGNED
}

/// Full snapshot of the managed collection: the search username plus every
/// playlist record, in insertion order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Collection {
    #[serde(default)]
    pub username: String,
    #[serde(default, with = "playlist_map")]
    pub playlists: Vec<PlaylistRecord>,
}

impl Collection {
    pub fn get(&self, id: &str) -> Option<&PlaylistRecord> {
        self.playlists.iter().find(|record| record.id == id)
    }

    /// Records in consumption order: ascending priority, ties resolved by
    /// insertion order (the sort is stable)
    pub fn ordered(&self) -> Vec<PlaylistRecord> {
        let mut records = self.playlists.clone();
        records.sort_by_key(|record| record.priority);
        records
    }

    /// Enabled records in sync order
    pub fn working_set(&self) -> Vec<PlaylistRecord> {
        self.ordered()
            .into_iter()
            .filter(|record| record.enabled)
            .collect()
    }
}

/// Persists the playlist list as a JSON map keyed by id, written in list
/// order and read back in document order so insertion order survives a
/// reload.
mod playlist_map {
    use super::PlaylistRecord;
    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S>(records: &[PlaylistRecord], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(records.len()))?;
        for record in records {
            map.serialize_entry(&record.id, record)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<PlaylistRecord>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct MapVisitor;

        impl<'de> Visitor<'de> for MapVisitor {
            type Value = Vec<PlaylistRecord>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of playlist id to record")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut records = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((id, mut record)) = access.next_entry::<String, PlaylistRecord>()? {
                    // The key is authoritative
                    record.id = id;
                    records.push(record);
                }
                Ok(records)
            }
        }

        deserializer.deserialize_map(MapVisitor)
    }
}

/// Durable store for the collection; the single source of truth shared by
/// concurrent tasks.
///
/// Every mutation rewrites the backing file before returning, inside the
/// store's lock, so writers are serialized and the change is visible to the
/// next read and to the next process launch. A failed write keeps the
/// in-memory state; it is not rolled back.
pub struct PlaylistStore {
    path: PathBuf,
    inner: Mutex<Collection>,
}

impl PlaylistStore {
    /// Open the store at `path`, starting with an empty collection when the
    /// file is missing or unreadable
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let collection = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(collection) => collection,
                Err(e) => {
                    error!("Invalid store file {}: {}", path.display(), e);
                    Collection::default()
                }
            },
            Err(_) => {
                debug!("No store file at {}, starting empty", path.display());
                Collection::default()
            }
        };

        Self {
            path,
            inner: Mutex::new(collection),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Collection> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, collection: &Collection) {
        if let Err(e) = self.write_file(collection) {
            error!("Failed to persist {}: {:#}", self.path.display(), e);
        }
    }

    fn write_file(&self, collection: &Collection) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create store directory {}", parent.display())
                })?;
            }
        }

        let contents =
            serde_json::to_string_pretty(collection).context("Failed to serialize collection")?;

        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write store file {}", self.path.display()))?;

        debug!(
            "Saved {} playlists to {}",
            collection.playlists.len(),
            self.path.display()
        );
        Ok(())
    }

    pub fn username(&self) -> String {
        self.lock().username.clone()
    }

    pub fn set_username(&self, username: &str) {
        let mut collection = self.lock();
        collection.username = username.to_string();
        self.persist(&collection);
    }

    /// Consistent snapshot of the whole collection
    pub fn all(&self) -> Collection {
        self.lock().clone()
    }

    pub fn get(&self, id: &str) -> Option<PlaylistRecord> {
        self.lock().get(id).cloned()
    }

    /// Insert or replace a record by id. An unassigned priority is resolved
    /// to the next trailing position.
    pub fn set(&self, mut record: PlaylistRecord) {
        let mut collection = self.lock();
        if record.priority == PRIORITY_UNASSIGNED {
            record.priority = collection
                .playlists
                .iter()
                .map(|existing| existing.priority + 1)
                .max()
                .unwrap_or(0);
        }
        match collection
            .playlists
            .iter()
            .position(|existing| existing.id == record.id)
        {
            Some(index) => collection.playlists[index] = record,
            None => collection.playlists.push(record),
        }
        self.persist(&collection);
    }

    /// Replace the entire collection
    pub fn set_all(&self, collection: Collection) {
        let mut guard = self.lock();
        *guard = collection;
        self.persist(&guard);
    }

    /// Reassign one record's priority. Last write wins; duplicate priorities
    /// are tolerated in storage and resolved by insertion order when the
    /// collection is consumed. Returns false when the id is unknown.
    pub fn set_priority(&self, id: &str, priority: i64) -> bool {
        let mut collection = self.lock();
        let Some(record) = collection
            .playlists
            .iter_mut()
            .find(|record| record.id == id)
        else {
            return false;
        };
        record.priority = priority;
        self.persist(&collection);
        true
    }

    /// Remove a record, returning it so the caller can invalidate its cover
    /// cache entry
    pub fn remove(&self, id: &str) -> Option<PlaylistRecord> {
        let mut collection = self.lock();
        let index = collection
            .playlists
            .iter()
            .position(|record| record.id == id)?;
        let record = collection.playlists.remove(index);
        self.persist(&collection);
        Some(record)
    }
}
