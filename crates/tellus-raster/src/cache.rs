//! In-memory payload cache with a bounded resident set.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use crate::payload::TilePayload;
use crate::tile::RasterTileIdentifier;

/// Concurrent identifier-to-payload cache with least-recently-used eviction.
///
/// Insert-if-absent semantics: concurrent inserts for the same identifier
/// keep a single payload. The resident set is bounded by `capacity` tiles;
/// inserting beyond it evicts the least recently touched payloads.
pub struct TileCache {
    payloads: DashMap<RasterTileIdentifier, Arc<TilePayload>>,
    recency: Mutex<VecDeque<RasterTileIdentifier>>,
    capacity: usize,
}

impl TileCache {
    /// Create a cache bounded to `capacity` resident payloads.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "tile cache capacity must be nonzero");
        Self {
            payloads: DashMap::new(),
            recency: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    /// Number of resident payloads.
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    /// Look up a payload, marking it most recently used on a hit.
    pub fn get(&self, id: RasterTileIdentifier) -> Option<Arc<TilePayload>> {
        let payload = self.payloads.get(&id).map(|entry| Arc::clone(&entry))?;
        self.touch(id);
        Some(payload)
    }

    /// True if the payload is resident, without affecting recency.
    pub fn contains(&self, id: RasterTileIdentifier) -> bool {
        self.payloads.contains_key(&id)
    }

    /// Insert a payload, evicting least-recently-used entries beyond the
    /// capacity bound. Returns the resident payload, which is the existing
    /// one if another thread inserted the same identifier first.
    pub fn insert(&self, id: RasterTileIdentifier, payload: Arc<TilePayload>) -> Arc<TilePayload> {
        let resident = Arc::clone(
            &self
                .payloads
                .entry(id)
                .or_insert_with(|| Arc::clone(&payload)),
        );
        self.touch(id);
        self.evict_over_capacity();
        resident
    }

    fn touch(&self, id: RasterTileIdentifier) {
        let mut recency = self.recency.lock().expect("tile cache recency poisoned");
        if let Some(position) = recency.iter().position(|&entry| entry == id) {
            recency.remove(position);
        }
        recency.push_back(id);
    }

    fn evict_over_capacity(&self) {
        let mut recency = self.recency.lock().expect("tile cache recency poisoned");
        while recency.len() > self.capacity {
            if let Some(oldest) = recency.pop_front() {
                self.payloads.remove(&oldest);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::TileData;

    fn payload() -> Arc<TilePayload> {
        Arc::new(TilePayload::new(1, 1, TileData::Height32F(vec![0.0])))
    }

    fn id(x: i64) -> RasterTileIdentifier {
        RasterTileIdentifier::new(0, x, 0)
    }

    #[test]
    fn test_insert_and_get() {
        let cache = TileCache::new(4);
        cache.insert(id(1), payload());
        assert!(cache.get(id(1)).is_some());
        assert!(cache.get(id(2)).is_none());
    }

    #[test]
    fn test_eviction_drops_least_recently_used() {
        let cache = TileCache::new(2);
        cache.insert(id(1), payload());
        cache.insert(id(2), payload());
        // Touch 1 so 2 becomes the eviction candidate.
        cache.get(id(1));
        cache.insert(id(3), payload());

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(id(1)));
        assert!(!cache.contains(id(2)));
        assert!(cache.contains(id(3)));
    }

    #[test]
    fn test_duplicate_insert_keeps_first_payload() {
        let cache = TileCache::new(4);
        let first = cache.insert(id(1), payload());
        let second = cache.insert(id(1), payload());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    #[should_panic(expected = "capacity must be nonzero")]
    fn test_zero_capacity_panics() {
        TileCache::new(0);
    }
}
