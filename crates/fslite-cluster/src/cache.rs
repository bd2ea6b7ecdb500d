//! Bounded recency cache of reconstructed outputs.

use std::path::PathBuf;

use fslite_types::FileId;
use fslite_utils::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedOutput {
    pub path: PathBuf,
    /// Whether the reconstruction that produced `path` passed every check.
    pub verified: bool,
}

/// Strict LRU map `file_id -> output`. Hits and inserts move the entry to
/// the front; evicting forgets the entry but leaves the file on disk.
pub struct RecencyCache {
    inner: Mutex<LruCache<FileId, CachedOutput>>,
}

impl RecencyCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(max_size)),
        }
    }

    pub fn get(&self, file_id: &FileId) -> Option<CachedOutput> {
        self.inner.lock().get(file_id).cloned()
    }

    /// Returns the id that was evicted to make room, if any.
    pub fn put(&self, file_id: FileId, output: CachedOutput) -> Option<FileId> {
        let evicted = self.inner.lock().push(file_id, output);
        evicted.map(|(id, _)| {
            tracing::debug!(file_id = %id, "evicted from cache");
            id
        })
    }

    pub fn contains(&self, file_id: &FileId) -> bool {
        self.inner.lock().contains_key(file_id)
    }

    pub fn remove(&self, file_id: &FileId) -> Option<CachedOutput> {
        self.inner.lock().remove(file_id)
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    /// Cached ids, most recently used first.
    pub fn keys(&self) -> Vec<FileId> {
        self.inner.lock().keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn out(name: &str) -> CachedOutput {
        CachedOutput {
            path: PathBuf::from(name),
            verified: true,
        }
    }

    fn id(s: &str) -> FileId {
        FileId::new(s)
    }

    #[test]
    fn test_evicts_least_recent() {
        let cache = RecencyCache::new(5);
        for n in 0..5 {
            assert_eq!(cache.put(id(&format!("f{}", n)), out("p")), None);
        }
        assert_eq!(cache.put(id("f5"), out("p")), Some(id("f0")));
        assert_eq!(cache.len(), 5);
        assert!(!cache.contains(&id("f0")));
    }

    #[test]
    fn test_hit_protects_entry() {
        let cache = RecencyCache::new(5);
        for n in 0..5 {
            cache.put(id(&format!("f{}", n)), out("p"));
        }
        assert!(cache.get(&id("f0")).is_some());
        assert_eq!(cache.put(id("f5"), out("p")), Some(id("f1")));
        assert!(cache.contains(&id("f0")));
        assert_eq!(cache.keys()[0], id("f5"));
        assert_eq!(cache.keys()[1], id("f0"));
    }

    #[test]
    fn test_reinsert_updates_without_eviction() {
        let cache = RecencyCache::new(2);
        cache.put(id("a"), out("one"));
        cache.put(id("b"), out("two"));
        let mut failed = out("three");
        failed.verified = false;
        assert_eq!(cache.put(id("a"), failed.clone()), None);
        assert_eq!(cache.get(&id("a")), Some(failed));
        assert_eq!(cache.remove(&id("b")).map(|o| o.path), Some(PathBuf::from("two")));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 2);
    }
}
