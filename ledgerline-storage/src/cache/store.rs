//! Bounded, TTL-expiring store for one operation.

use super::entry::CacheEntry;
use super::key::CacheKey;
use super::policy::OperationCachePolicy;
use ledgerline_core::Operation;
use lru::LruCache;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::Instant;

struct Slot {
    entry: CacheEntry,
    expires_at: Instant,
}

/// Counters and size of one store at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    pub operation: Operation,
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    /// Live entries pushed out by capacity pressure.
    pub evictions: u64,
}

impl StoreStats {
    /// Hit rate in `0.0..=1.0`.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// LRU store whose slots expire after the operation's TTL.
///
/// Capacity is enforced on insert: expired slots are dropped first, then the
/// least recently used live slot. The lock is only held for map updates.
pub struct ExpiringStore {
    operation: Operation,
    policy: OperationCachePolicy,
    slots: Mutex<LruCache<CacheKey, Slot>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ExpiringStore {
    pub fn new(operation: Operation, policy: OperationCachePolicy) -> Self {
        Self {
            operation,
            policy,
            slots: Mutex::new(LruCache::unbounded()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn policy(&self) -> OperationCachePolicy {
        self.policy
    }

    /// Live entry for `key`. Expired slots count as a miss and are removed.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let now = Instant::now();
        let mut slots = self.slots.lock();

        let found = slots
            .get(key)
            .map(|slot| (slot.expires_at > now, slot.entry.clone()));

        match found {
            Some((true, entry)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry)
            }
            Some((false, _)) => {
                slots.pop(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store `entry` under `key` for the policy's TTL. A bypass policy
    /// stores nothing.
    pub fn insert(&self, key: CacheKey, entry: CacheEntry) {
        if self.policy.is_bypass() {
            return;
        }

        let now = Instant::now();
        let mut slots = self.slots.lock();

        if !slots.contains(&key) && slots.len() >= self.policy.capacity {
            Self::purge_locked(&mut slots, now);
            while slots.len() >= self.policy.capacity {
                if slots.pop_lru().is_none() {
                    break;
                }
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }

        slots.put(
            key,
            Slot {
                entry,
                expires_at: now + self.policy.ttl,
            },
        );
    }

    /// Drop every entry. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let mut slots = self.slots.lock();
        let dropped = slots.len();
        slots.clear();
        dropped
    }

    /// Entries currently held, including any not yet purged after expiry.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove expired slots. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut slots = self.slots.lock();
        Self::purge_locked(&mut slots, now)
    }

    fn purge_locked(slots: &mut LruCache<CacheKey, Slot>, now: Instant) -> usize {
        let expired: Vec<CacheKey> = slots
            .iter()
            .filter(|(_, slot)| slot.expires_at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            slots.pop(key);
        }
        expired.len()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            operation: self.operation,
            entries: self.len(),
            capacity: self.policy.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for ExpiringStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiringStore")
            .field("operation", &self.operation)
            .field("policy", &self.policy)
            .field("entries", &self.len())
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;

    fn key(n: u64) -> CacheKey {
        CacheKey::new(Operation::Epoch).push(&n)
    }

    fn entry(n: u64) -> CacheEntry {
        CacheEntry::from_result::<u64>(&Ok(n))
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_after_insert_hits() {
        let store = ExpiringStore::new(
            Operation::Epoch,
            OperationCachePolicy::new(2, Duration::from_secs(10)),
        );
        store.insert(key(1), entry(10));

        let hit = store.get(&key(1)).and_then(|e| e.replay::<u64>());
        assert_eq!(hit, Some(Ok(10)));
        assert!(store.get(&key(2)).is_none());

        let stats = store.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_slot_is_a_miss_and_removed() {
        let store = ExpiringStore::new(
            Operation::Epoch,
            OperationCachePolicy::new(2, Duration::from_secs(10)),
        );
        store.insert(key(1), entry(10));

        tokio::time::advance(Duration::from_secs(10)).await;

        assert!(store.get(&key(1)).is_none());
        assert_eq!(store.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_evicts_expired_before_live() {
        let store = ExpiringStore::new(
            Operation::Epoch,
            OperationCachePolicy::new(2, Duration::from_secs(10)),
        );
        store.insert(key(1), entry(1));
        tokio::time::advance(Duration::from_secs(6)).await;
        store.insert(key(2), entry(2));
        // Touch key 2 so key 1 is the LRU regardless.
        assert!(store.get(&key(2)).is_some());
        tokio::time::advance(Duration::from_secs(5)).await;

        // Key 1 has expired; inserting key 3 must drop it and keep key 2.
        store.insert(key(3), entry(3));
        assert_eq!(store.len(), 2);
        assert!(store.get(&key(2)).is_some());
        assert!(store.get(&key(3)).is_some());
        assert_eq!(store.stats().evictions, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_evicts_least_recently_used() {
        let store = ExpiringStore::new(
            Operation::Epoch,
            OperationCachePolicy::new(2, Duration::from_secs(60)),
        );
        store.insert(key(1), entry(1));
        store.insert(key(2), entry(2));
        assert!(store.get(&key(1)).is_some());

        store.insert(key(3), entry(3));

        assert!(store.get(&key(1)).is_some());
        assert!(store.get(&key(2)).is_none());
        assert_eq!(store.stats().evictions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bypass_stores_nothing() {
        let store = ExpiringStore::new(Operation::OracleVotingContract, OperationCachePolicy::bypass());
        store.insert(key(1), entry(1));
        assert!(store.is_empty());
        assert!(store.get(&key(1)).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let store = ExpiringStore::new(
            Operation::Epoch,
            OperationCachePolicy::new(10, Duration::from_secs(5)),
        );
        store.insert(key(1), entry(1));
        store.insert(key(2), entry(2));
        tokio::time::advance(Duration::from_secs(3)).await;
        store.insert(key(3), entry(3));
        tokio::time::advance(Duration::from_secs(3)).await;

        assert_eq!(store.purge_expired(), 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_clear_returns_dropped_count() {
        let store = ExpiringStore::new(Operation::Epoch, OperationCachePolicy::default());
        store.insert(key(1), entry(1));
        store.insert(key(2), entry(2));
        assert_eq!(store.clear(), 2);
        assert!(store.is_empty());
    }

    proptest! {
        #[test]
        fn prop_never_exceeds_capacity(
            capacity in 1usize..8,
            keys in proptest::collection::vec(0u64..32, 0..64),
        ) {
            let store = ExpiringStore::new(
                Operation::Epoch,
                OperationCachePolicy::new(capacity, Duration::from_secs(60)),
            );
            for k in keys {
                store.insert(key(k), entry(k));
                prop_assert!(store.len() <= capacity);
            }
        }
    }
}
