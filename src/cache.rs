//! Matrix cell caches.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::model::GeoPoint;
use crate::traits::{MatrixCache, TravelCost};

/// Ordered pair of coordinates rounded to a fixed number of decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PairKey {
    from: (i64, i64),
    to: (i64, i64),
}

impl PairKey {
    pub fn new(from: GeoPoint, to: GeoPoint, precision: u32) -> Self {
        let scale = 10f64.powi(precision as i32);
        Self {
            from: round_point(from, scale),
            to: round_point(to, scale),
        }
    }
}

fn round_point(point: GeoPoint, scale: f64) -> (i64, i64) {
    (
        (point.lat * scale).round() as i64,
        (point.lng * scale).round() as i64,
    )
}

#[derive(Debug, Clone, Copy)]
struct CachedCost {
    cost: TravelCost,
    stored_at: Instant,
}

/// In-process cache with a time-to-live per entry.
#[derive(Debug)]
pub struct InMemoryMatrixCache {
    ttl: Duration,
    entries: RwLock<HashMap<PairKey, CachedCost>>,
}

impl InMemoryMatrixCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Drops expired entries.
    pub fn evict_expired(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        before - entries.len()
    }
}

impl Default for InMemoryMatrixCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(24 * 3600))
    }
}

impl MatrixCache for InMemoryMatrixCache {
    fn get(&self, key: &PairKey) -> Option<TravelCost> {
        self.entries
            .read()
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| entry.cost)
    }

    fn put(&self, key: PairKey, cost: TravelCost) {
        self.entries.write().insert(
            key,
            CachedCost {
                cost,
                stored_at: Instant::now(),
            },
        );
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }

    fn clear(&self) {
        self.entries.write().clear();
    }
}

/// Cache that never stores anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMatrixCache;

impl MatrixCache for NoopMatrixCache {
    fn get(&self, _key: &PairKey) -> Option<TravelCost> {
        None
    }

    fn put(&self, _key: PairKey, _cost: TravelCost) {}

    fn len(&self) -> usize {
        0
    }

    fn clear(&self) {}
}
