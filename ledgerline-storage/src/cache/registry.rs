//! Operation-to-store registry.

use super::policy::{CachePolicyTable, OperationCachePolicy};
use super::store::{ExpiringStore, StoreStats};
use ledgerline_core::Operation;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Lazily populated map of one `ExpiringStore` per operation.
///
/// The registry mutex guards map mutation only; each store has its own lock.
pub struct CacheRegistry {
    policies: CachePolicyTable,
    stores: Mutex<HashMap<Operation, Arc<ExpiringStore>>>,
    clears: AtomicU64,
}

impl CacheRegistry {
    pub fn new(policies: CachePolicyTable) -> Self {
        Self {
            policies,
            stores: Mutex::new(HashMap::new()),
            clears: AtomicU64::new(0),
        }
    }

    /// The store for `op`, created with the operation's policy on first use.
    pub fn get_or_create(&self, op: Operation) -> Arc<ExpiringStore> {
        let mut stores = self.stores.lock();
        stores
            .entry(op)
            .or_insert_with(|| Arc::new(ExpiringStore::new(op, self.policies.policy(op))))
            .clone()
    }

    /// Empty every store. Stores and their policies are kept.
    ///
    /// Returns the number of entries dropped.
    pub fn clear(&self) -> usize {
        let stores: Vec<Arc<ExpiringStore>> = self.stores.lock().values().cloned().collect();
        let dropped = stores.iter().map(|store| store.clear()).sum();
        self.clears.fetch_add(1, Ordering::Relaxed);
        dropped
    }

    pub fn policy(&self, op: Operation) -> OperationCachePolicy {
        self.policies.policy(op)
    }

    pub fn policies(&self) -> &CachePolicyTable {
        &self.policies
    }

    /// How many times `clear` has run.
    pub fn clear_count(&self) -> u64 {
        self.clears.load(Ordering::Relaxed)
    }

    /// Remove expired entries from every store.
    pub fn purge_expired(&self) -> usize {
        let stores: Vec<Arc<ExpiringStore>> = self.stores.lock().values().cloned().collect();
        stores.iter().map(|store| store.purge_expired()).sum()
    }

    /// Stats for every store created so far, ordered by operation.
    pub fn snapshot(&self) -> Vec<StoreStats> {
        let stores: Vec<Arc<ExpiringStore>> = self.stores.lock().values().cloned().collect();
        let mut stats: Vec<StoreStats> = stores.iter().map(|store| store.stats()).collect();
        stats.sort_by_key(|s| s.operation);
        stats
    }
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new(CachePolicyTable::standard())
    }
}

impl fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheRegistry")
            .field("stores", &self.stores.lock().len())
            .field("clears", &self.clear_count())
            .finish()
    }
}

// ============================================================================
// REPORT
// ============================================================================

/// Summary of cache occupancy, logged periodically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheReport {
    pub total_stores: usize,
    pub empty_stores: usize,
    pub total_entries: usize,
    /// Non-empty stores, largest first.
    pub occupied: Vec<(Operation, usize)>,
}

impl CacheReport {
    pub fn from_snapshot(snapshot: &[StoreStats]) -> Self {
        let mut occupied: Vec<(Operation, usize)> = snapshot
            .iter()
            .filter(|s| s.entries > 0)
            .map(|s| (s.operation, s.entries))
            .collect();
        occupied.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        Self {
            total_stores: snapshot.len(),
            empty_stores: snapshot.len() - occupied.len(),
            total_entries: occupied.iter().map(|(_, n)| n).sum(),
            occupied,
        }
    }
}

impl fmt::Display for CacheReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total: {}, empty: {}",
            self.total_stores, self.empty_stores
        )?;
        if self.occupied.is_empty() {
            return Ok(());
        }
        f.write_str(" (")?;
        for (i, (op, n)) in self.occupied.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{op}: {n}")?;
        }
        f.write_str(")")
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheEntry, CacheKey};
    use std::time::Duration;

    fn put(registry: &CacheRegistry, op: Operation, n: u64) {
        registry
            .get_or_create(op)
            .insert(CacheKey::new(op).push(&n), CacheEntry::from_result::<u64>(&Ok(n)));
    }

    #[test]
    fn test_get_or_create_returns_same_store() {
        let registry = CacheRegistry::default();
        let a = registry.get_or_create(Operation::Epoch);
        let b = registry.get_or_create(Operation::Epoch);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.policy(), registry.policy(Operation::Epoch));
    }

    #[test]
    fn test_store_uses_operation_policy() {
        let table = CachePolicyTable::standard()
            .with(Operation::Epoch, OperationCachePolicy::new(2, Duration::from_secs(10)));
        let registry = CacheRegistry::new(table);
        assert_eq!(registry.get_or_create(Operation::Epoch).policy().capacity, 2);
    }

    #[test]
    fn test_clear_keeps_stores() {
        let registry = CacheRegistry::default();
        put(&registry, Operation::Epoch, 1);
        put(&registry, Operation::Epoch, 2);
        put(&registry, Operation::LastBlock, 1);

        assert_eq!(registry.clear(), 3);
        assert_eq!(registry.clear_count(), 1);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.iter().all(|s| s.entries == 0));
    }

    #[test]
    fn test_report_sorted_by_size() {
        let registry = CacheRegistry::default();
        put(&registry, Operation::Epoch, 1);
        put(&registry, Operation::Epoch, 2);
        put(&registry, Operation::LastBlock, 1);
        registry.get_or_create(Operation::Flip);

        let report = CacheReport::from_snapshot(&registry.snapshot());
        assert_eq!(report.total_stores, 3);
        assert_eq!(report.empty_stores, 1);
        assert_eq!(report.total_entries, 3);
        assert_eq!(
            report.to_string(),
            "Total: 3, empty: 1 (Epoch: 2, LastBlock: 1)"
        );
    }
}
