//! Cross-run memory of processed posts.
//!
//! The store is a flat JSON document holding the last successful check time and every
//! post id ever processed. It only grows; nothing is evicted.

pub mod dedup;


pub use dedup::{filter_unseen, merge_batches};

use chrono::{DateTime, Utc};
use moltscout_core::{CoreError, MemoryError, PostRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredMemory {
    #[serde(default)]
    last_checked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    seen_post_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "StoredMemory", into = "StoredMemory")]
pub struct MemoryStore {
    last_checked_at: Option<DateTime<Utc>>,
    seen_post_ids: Vec<String>,
    index: HashSet<String>,
}

impl From<StoredMemory> for MemoryStore {
    fn from(stored: StoredMemory) -> Self {
        let mut memory = MemoryStore {
            last_checked_at: stored.last_checked_at,
            ..MemoryStore::default()
        };
        memory.mark_seen(stored.seen_post_ids.iter().map(String::as_str));
        memory
    }
}

impl From<MemoryStore> for StoredMemory {
    fn from(memory: MemoryStore) -> Self {
        StoredMemory {
            last_checked_at: memory.last_checked_at,
            seen_post_ids: memory.seen_post_ids,
        }
    }
}

impl PartialEq for MemoryStore {
    fn eq(&self, other: &Self) -> bool {
        self.last_checked_at == other.last_checked_at && self.seen_post_ids == other.seen_post_ids
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_checked_at(&self) -> Option<DateTime<Utc>> {
        self.last_checked_at
    }

    /// Ids in the order they were first seen.
    pub fn seen_post_ids(&self) -> &[String] {
        &self.seen_post_ids
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains(id)
    }

    pub fn len(&self) -> usize {
        self.seen_post_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen_post_ids.is_empty()
    }

    /// Appends ids not already remembered. Empty ids are skipped. Returns how many
    /// were added.
    pub fn mark_seen<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) -> usize {
        let mut added = 0;
        for id in ids {
            if id.is_empty() || self.index.contains(id) {
                continue;
            }
            self.index.insert(id.to_string());
            self.seen_post_ids.push(id.to_string());
            added += 1;
        }
        added
    }

    /// The store as it should look after `posts` were processed at `now`.
    pub fn advanced(&self, posts: &[PostRecord], now: DateTime<Utc>) -> MemoryStore {
        let mut next = self.clone();
        let added = next.mark_seen(posts.iter().map(|p| p.id.as_str()));
        let skipped = posts.iter().filter(|p| !p.has_id()).count();
        if skipped > 0 {
            debug!("{} posts without an id were not remembered", skipped);
        }
        debug!("Remembering {} new post ids ({} total)", added, next.len());
        next.last_checked_at = Some(now);
        next
    }
}

/// Durable storage for the [`MemoryStore`]. Both operations fail fast.
pub trait MemoryPersistence {
    async fn load(&self) -> Result<MemoryStore, CoreError>;
    async fn save(&self, memory: &MemoryStore) -> Result<(), CoreError>;
}

impl<P: MemoryPersistence> MemoryPersistence for &P {
    async fn load(&self) -> Result<MemoryStore, CoreError> {
        (**self).load().await
    }

    async fn save(&self, memory: &MemoryStore) -> Result<(), CoreError> {
        (**self).save(memory).await
    }
}

/// Keeps the memory as pretty-printed JSON and replaces it atomically on save.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn display_path(&self) -> String {
        self.path.display().to_string()
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "memory.json".to_string());
        self.path
            .with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()))
    }
}

impl MemoryPersistence for JsonFileStore {
    async fn load(&self) -> Result<MemoryStore, CoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "No memory file at {}, starting with an empty memory",
                    self.path.display()
                );
                return Ok(MemoryStore::new());
            }
            Err(e) => {
                return Err(MemoryError::ReadFailed {
                    path: self.display_path(),
                    reason: e.to_string(),
                }
                .into())
            }
        };

        let memory: MemoryStore =
            serde_json::from_str(&raw).map_err(|e| MemoryError::Corrupt {
                path: self.display_path(),
                details: e.to_string(),
            })?;

        debug!(
            "Loaded memory with {} seen posts, last checked {:?}",
            memory.len(),
            memory.last_checked_at()
        );
        Ok(memory)
    }

    async fn save(&self, memory: &MemoryStore) -> Result<(), CoreError> {
        let write_failed = |reason: String| MemoryError::WriteFailed {
            path: self.display_path(),
            reason,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| write_failed(e.to_string()))?;
        }

        let json = serde_json::to_string_pretty(memory)?;
        let temp_path = self.temp_path();

        tokio::fs::write(&temp_path, json)
            .await
            .map_err(|e| write_failed(e.to_string()))?;

        if let Err(e) = tokio::fs::rename(&temp_path, &self.path).await {
            if let Err(cleanup) = tokio::fs::remove_file(&temp_path).await {
                warn!(
                    "Could not remove temporary memory file {}: {}",
                    temp_path.display(),
                    cleanup
                );
            }
            return Err(write_failed(e.to_string()).into());
        }

        debug!(
            "Saved memory with {} seen posts to {}",
            memory.len(),
            self.path.display()
        );
        Ok(())
    }
}
