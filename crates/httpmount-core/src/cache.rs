//! Bounded in-memory cache of block-aligned content.
//!
//! Keyed by `(file identity, block index)`. Sequential readers and kernel
//! read-ahead tend to ask for the same blocks repeatedly; a hit answers the
//! read without a network round trip. Entries are evicted least recently used.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use lru::LruCache;

/// Cache key: which file, which block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockKey {
    pub file_id: u64,
    pub index: u64,
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Thread-safe via internal mutex; the lock is never held across a fetch.
pub struct BlockCache {
    blocks: Mutex<LruCache<BlockKey, Arc<Vec<u8>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl BlockCache {
    /// Returns `None` for a capacity of zero (caching disabled).
    pub fn new(capacity: usize) -> Option<Self> {
        let cap = NonZeroUsize::new(capacity)?;
        Some(Self {
            blocks: Mutex::new(LruCache::new(cap)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    pub fn get(&self, key: &BlockKey) -> Option<Arc<Vec<u8>>> {
        let found = self
            .blocks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    pub fn insert(&self, key: BlockKey, data: Arc<Vec<u8>>) {
        self.blocks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .put(key, data);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.blocks.lock().unwrap_or_else(|e| e.into_inner()).len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
