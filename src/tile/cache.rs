//! Decoded tile cache.
//!
//! Viewport-style access patterns re-request the same tiles as the user pans
//! back and forth; caching decoded tiles avoids repeating both the fetch and
//! the decompression. The cache is optional and off unless the reader is
//! configured with a capacity.

use std::num::NonZeroUsize;

use bytes::Bytes;
use lru::LruCache;
use tokio::sync::Mutex;

use super::TileIndex;

// =============================================================================
// Cache Key
// =============================================================================

/// Cache key for a decoded tile: which IFD, which grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCacheKey {
    /// Index of the IFD in the file's chain
    pub ifd_index: usize,

    /// Grid position within that IFD
    pub index: TileIndex,
}

impl TileCacheKey {
    /// Create a new cache key.
    pub fn new(ifd_index: usize, index: TileIndex) -> Self {
        Self { ifd_index, index }
    }
}

// =============================================================================
// TileCache
// =============================================================================

/// LRU cache of decoded tile buffers, bounded by entry count.
///
/// Thread-safe; share it via `Arc` or borrow it from the owning reader.
pub struct TileCache {
    cache: Mutex<LruCache<TileCacheKey, Bytes>>,
}

impl TileCache {
    /// Create a cache holding at most `capacity` decoded tiles.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Fetch a cached tile, marking it most recently used.
    pub async fn get(&self, key: &TileCacheKey) -> Option<Bytes> {
        self.cache.lock().await.get(key).cloned()
    }

    /// Store a decoded tile, evicting the least recently used entry if full.
    pub async fn put(&self, key: TileCacheKey, tile: Bytes) {
        self.cache.lock().await.put(key, tile);
    }

    /// Number of tiles currently cached.
    pub async fn len(&self) -> usize {
        self.cache.lock().await.len()
    }

    /// Whether the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.cache.lock().await.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
