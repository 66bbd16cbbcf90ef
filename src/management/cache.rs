use std::{
    collections::HashMap,
    io,
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::utils;

/// Cadence of the background sweep started by [`TtlCache::spawn_sweeper`].
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// A cached value with its write time and absolute expiry, both in ms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    pub timestamp: i64,
    pub expires_at: i64,
}

impl<T> CacheEntry<T> {
    fn is_expired(&self, now: i64) -> bool {
        now > self.expires_at
    }
}

/// Age and remaining lifetime of a live entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryInfo {
    pub age_ms: i64,
    pub expires_in_ms: i64,
}

#[derive(Debug)]
pub enum CacheError {
    IoError(io::Error),
    SerdeError(serde_json::Error),
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::IoError(e) => write!(f, "cache io error: {}", e),
            CacheError::SerdeError(e) => write!(f, "cache serde error: {}", e),
        }
    }
}

/// Namespaced key/value store with per-entry time-to-live.
///
/// Expiry is lazy: an entry past its deadline is evicted by the read that
/// observes it. [`TtlCache::spawn_sweeper`] additionally drops expired entries
/// on a fixed cadence so unread keys do not pile up.
///
/// With a persistence directory every write is mirrored to a JSON file per
/// key and reads fall back to that file on a
/// memory miss, which lets a widget render the last snapshot right after a
/// restart. Disk failures are logged and treated as a miss.
pub struct TtlCache<T> {
    namespace: String,
    default_ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
    persist_dir: Option<PathBuf>,
}

impl<T> TtlCache<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + 'static,
{
    pub fn new(namespace: &str, default_ttl: Duration) -> Self {
        Self {
            namespace: namespace.to_string(),
            default_ttl,
            entries: Mutex::new(HashMap::new()),
            persist_dir: None,
        }
    }

    pub fn persistent(namespace: &str, default_ttl: Duration, dir: PathBuf) -> Self {
        Self {
            persist_dir: Some(dir),
            ..Self::new(namespace, default_ttl)
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Returns the value for `key` unless it is missing or expired.
    pub async fn get(&self, key: &str) -> Option<T> {
        let full_key = self.full_key(key);
        let now = utils::now_ms();

        {
            let mut entries = self.lock();
            if let Some(entry) = entries.get(&full_key) {
                if !entry.is_expired(now) {
                    return Some(entry.data.clone());
                }
                debug!(key = %full_key, "Cache entry expired");
                entries.remove(&full_key);
            }
        }

        let entry = self.load(key).await?;
        if entry.is_expired(now) {
            self.remove_file(key).await;
            return None;
        }

        let data = entry.data.clone();
        self.lock().insert(full_key, entry);
        Some(data)
    }

    /// Stores `data` under `key` for `ttl`, replacing any previous entry.
    pub async fn set(&self, key: &str, data: T, ttl: Duration) {
        let full_key = self.full_key(key);
        let now = utils::now_ms();
        let entry = CacheEntry {
            data,
            timestamp: now,
            expires_at: now + ttl.as_millis() as i64,
        };

        if self.persist_dir.is_some() {
            if let Err(e) = self.persist(key, &entry).await {
                warn!(key = %full_key, error = %e, "Failed to persist cache entry");
            }
        }
        self.lock().insert(full_key, entry);
    }

    /// Stores `data` under `key` with the namespace default lifetime.
    pub async fn put(&self, key: &str, data: T) {
        self.set(key, data, self.default_ttl).await;
    }

    pub async fn delete(&self, key: &str) {
        let full_key = self.full_key(key);
        self.lock().remove(&full_key);
        self.remove_file(key).await;
    }

    /// True when a live entry for `key` is held in memory.
    pub fn has(&self, key: &str) -> bool {
        let now = utils::now_ms();
        self.lock()
            .get(&self.full_key(key))
            .is_some_and(|entry| !entry.is_expired(now))
    }

    pub fn info(&self, key: &str) -> Option<EntryInfo> {
        let now = utils::now_ms();
        let entries = self.lock();
        let entry = entries.get(&self.full_key(key))?;
        if entry.is_expired(now) {
            return None;
        }
        Some(EntryInfo {
            age_ms: now - entry.timestamp,
            expires_in_ms: entry.expires_at - now,
        })
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every in-memory entry. Persisted files are left alone.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Removes expired in-memory entries and returns how many were dropped.
    pub fn cleanup(&self) -> usize {
        let now = utils::now_ms();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Runs [`TtlCache::cleanup`] every `every` until the cache is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()>
    where
        T: Sync,
    {
        let cache = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                let removed = cache.cleanup();
                if removed > 0 {
                    debug!(namespace = %cache.namespace, removed, "Swept expired cache entries");
                }
            }
        })
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}_{}", self.namespace, key)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// `<dir>/<namespace>_<hex key>.json`. Hex keeps distinct keys apart on
    /// every filesystem, including case-insensitive ones.
    fn path(&self, key: &str) -> Option<PathBuf> {
        let encoded: String = key.bytes().map(|b| format!("{:02x}", b)).collect();
        self.persist_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}_{}.json", self.namespace, encoded)))
    }

    async fn persist(&self, key: &str, entry: &CacheEntry<T>) -> Result<(), CacheError> {
        let Some(path) = self.path(key) else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(CacheError::IoError)?;
        }

        let json = serde_json::to_string_pretty(entry).map_err(CacheError::SerdeError)?;
        async_fs::write(path, json)
            .await
            .map_err(CacheError::IoError)
    }

    async fn load(&self, key: &str) -> Option<CacheEntry<T>> {
        let path = self.path(key)?;
        let json = match async_fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read cache file");
                return None;
            }
        };

        match serde_json::from_str(&json) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Discarding unreadable cache file");
                None
            }
        }
    }

    async fn remove_file(&self, key: &str) {
        let Some(path) = self.path(key) else {
            return;
        };
        if let Err(e) = async_fs::remove_file(&path).await {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Failed to remove cache file");
            }
        }
    }
}
