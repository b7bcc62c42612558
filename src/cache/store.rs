//! Disk-backed TTL store.
//!
//! The whole map is serialized as one JSON object and written on every
//! mutation:
//!
//! ```json
//! { "alice|C8x": { "value": ["https://..."], "timestamp": 1735689600000 } }
//! ```

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::error::CacheError;

/// A cached list of media URLs and the time it was last written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Media URLs for the post
    #[serde(alias = "urls")]
    pub value: Vec<String>,

    /// Last write time in milliseconds since the Unix epoch
    pub timestamp: i64,
}

/// Build the cache key for a post.
pub fn cache_key(username: &str, post_id: &str) -> String {
    format!("{}|{}", username, post_id)
}

/// Current time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Persistent key → URL-list map with timestamped entries.
///
/// # Thread Safety
///
/// The map is guarded by an async `RwLock`. Saves are serialized on a second
/// lock and snapshot the map only after acquiring it, so the file on disk
/// always ends up reflecting the most recent mutation.
pub struct TtlCache {
    path: PathBuf,
    entries: RwLock<HashMap<String, CacheEntry>>,
    write_lock: Mutex<()>,
}

impl TtlCache {
    /// Load the cache from `path`.
    ///
    /// A missing file yields an empty cache. Any other read or parse failure
    /// is returned as [`CacheError::Load`].
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let path = path.into();

        let entries = match tokio::fs::read(&path).await {
            Ok(data) => serde_json::from_slice::<HashMap<String, CacheEntry>>(&data).map_err(
                |e| CacheError::Load {
                    path: path.display().to_string(),
                    message: e.to_string(),
                },
            )?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "Cache file not found, starting empty");
                HashMap::new()
            }
            Err(e) => {
                return Err(CacheError::Load {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })
            }
        };

        debug!(path = %path.display(), entries = entries.len(), "Cache loaded");

        Ok(Self {
            path,
            entries: RwLock::new(entries),
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up the URLs stored for `key`. Never checks or mutates expiry.
    pub async fn get(&self, key: &str) -> Option<Vec<String>> {
        self.entries
            .read()
            .await
            .get(key)
            .map(|entry| entry.value.clone())
    }

    /// Full entry for `key`, including its timestamp.
    pub async fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.entries.read().await.get(key).cloned()
    }

    /// Number of entries currently held.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Store `value` under `key` with a fresh timestamp and persist.
    ///
    /// The in-memory map is updated even if the write fails.
    pub async fn add(&self, key: impl Into<String>, value: Vec<String>) -> Result<(), CacheError> {
        {
            let mut entries = self.entries.write().await;
            entries.insert(
                key.into(),
                CacheEntry {
                    value,
                    timestamp: now_millis(),
                },
            );
        }

        self.save().await
    }

    /// Remove every entry older than `window` and persist the result.
    ///
    /// Returns the number of removed entries.
    pub async fn sweep(&self, window: Duration) -> Result<usize, CacheError> {
        let removed = self.remove_expired(now_millis(), window).await;
        self.save().await?;
        Ok(removed)
    }

    async fn remove_expired(&self, now: i64, window: Duration) -> usize {
        let window_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);

        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| now.saturating_sub(entry.timestamp) <= window_ms);
        before - entries.len()
    }

    /// Write the full map to disk, replacing the previous file.
    pub async fn save(&self) -> Result<(), CacheError> {
        let _guard = self.write_lock.lock().await;

        let data = {
            let entries = self.entries.read().await;
            serde_json::to_vec(&*entries).map_err(|e| self.persist_error(e))?
        };

        let tmp_path = self.tmp_path();
        tokio::fs::write(&tmp_path, &data)
            .await
            .map_err(|e| self.persist_error(e))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| self.persist_error(e))?;

        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn persist_error(&self, err: impl std::fmt::Display) -> CacheError {
        CacheError::Persist {
            path: self.path.display().to_string(),
            message: err.to_string(),
        }
    }
}
