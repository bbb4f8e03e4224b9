//! Caching primitives.
//!
//! [`BoundedCache`] is an in-memory map with a fixed capacity: once full it stops
//! accepting new entries instead of evicting old ones. [`DiskCache`] stores whole JSON
//! documents under content-addressed file names (`<namespace>_<sha256>.json`).
//!
//! Neither cache is authoritative. Read and write failures are logged and treated as
//! misses.

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Hex-encoded SHA-256 of the parts, NUL-separated. A single part hashes as itself.
pub fn content_hash(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update([0u8]);
        }
        hasher.update(part.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Hit/miss counters reported by [`BoundedCache::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Fixed-capacity map with an insert-if-room policy.
///
/// Safe to share across tasks. Readers never block each other; a writer racing past
/// the capacity check cannot push the map above `capacity`.
#[derive(Debug)]
pub struct BoundedCache<K, V> {
    capacity: usize,
    entries: RwLock<HashMap<K, V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Look up a value, counting the hit or miss.
    pub fn get(&self, key: &K) -> Option<V> {
        let found = match self.entries.read() {
            Ok(map) => map.get(key).cloned(),
            Err(poisoned) => poisoned.into_inner().get(key).cloned(),
        };
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Insert if there is room. Returns `false` when the cache is full and the key is new.
    ///
    /// Existing keys are always overwritten.
    pub fn insert(&self, key: K, value: V) -> bool {
        let mut map = match self.entries.write() {
            Ok(map) => map,
            Err(poisoned) => poisoned.into_inner(),
        };
        if map.len() >= self.capacity && !map.contains_key(&key) {
            return false;
        }
        map.insert(key, value);
        true
    }

    pub fn len(&self) -> usize {
        match self.entries.read() {
            Ok(map) => map.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Drop every entry and reset the counters. Returns the stats from before the clear.
    pub fn clear(&self) -> CacheStats {
        let stats = self.stats();
        match self.entries.write() {
            Ok(mut map) => map.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        stats
    }
}

/// Namespace for fetched author corpora.
pub const CORPUS_NAMESPACE: &str = "rss";
/// Namespace for LLM style-similarity verdicts.
pub const LLM_SCORE_NAMESPACE: &str = "llm_sim";

/// Content-addressed JSON document store on disk.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path for a key in a namespace: `<dir>/<namespace>_<hash>.json`.
    pub fn path_for(&self, namespace: &str, hash: &str) -> PathBuf {
        self.dir.join(format!("{namespace}_{hash}.json"))
    }

    /// Read and decode a cached document. Missing or unreadable entries are `None`.
    pub fn read<T: DeserializeOwned>(&self, namespace: &str, hash: &str) -> Option<T> {
        let path = self.path_for(namespace, hash);
        if !path.exists() {
            return None;
        }
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cache read failed");
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(value) => {
                tracing::debug!(path = %path.display(), "cache hit");
                Some(value)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cache entry is not valid JSON");
                None
            }
        }
    }

    /// Encode and write a document. Uses atomic write (tmp + rename).
    ///
    /// Returns `false` if the entry could not be written; the failure is logged.
    pub fn write<T: Serialize>(&self, namespace: &str, hash: &str, value: &T) -> bool {
        let path = self.path_for(namespace, hash);
        let result = (|| -> std::io::Result<()> {
            std::fs::create_dir_all(&self.dir)?;
            let json = serde_json::to_vec_pretty(value)?;
            let tmp_path = path.with_extension("tmp");
            std::fs::write(&tmp_path, json)?;
            std::fs::rename(&tmp_path, &path)
        })();
        match result {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "cache entry written");
                true
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cache write failed");
                false
            }
        }
    }

    /// Number of entries in a namespace.
    pub fn count(&self, namespace: &str) -> usize {
        self.entries(namespace).len()
    }

    /// Delete every entry in a namespace. Returns how many files were removed.
    pub fn clear(&self, namespace: &str) -> std::io::Result<usize> {
        let mut removed = 0;
        for path in self.entries(namespace) {
            std::fs::remove_file(&path)?;
            removed += 1;
        }
        Ok(removed)
    }

    fn entries(&self, namespace: &str) -> Vec<PathBuf> {
        let prefix = format!("{namespace}_");
        let Ok(read_dir) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        read_dir
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension().is_some_and(|ext| ext == "json")
                    && path
                        .file_name()
                        .and_then(|name| name.to_str())
                        .is_some_and(|name| name.starts_with(&prefix))
            })
            .collect()
    }
}
