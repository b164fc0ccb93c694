//! Ledgerline Storage - Response Cache and Epoch Tracking
//!
//! Wraps an opaque `Accessor` with a per-operation response cache that is
//! invalidated wholesale whenever a new blockchain epoch is observed.

pub mod cache;
pub mod caching_accessor;
pub mod epoch;

pub use cache::{
    CacheEntry, CacheKey, CachePolicyTable, CacheRegistry, CacheReport, ExpiringStore, KeyPart,
    OperationCachePolicy, StoreStats,
};
pub use caching_accessor::CachingAccessor;
pub use epoch::{
    AccessorEpochSource, Clock, EpochObserver, EpochPoll, EpochTracker, EpochTrackerConfig,
    SystemClock,
};
