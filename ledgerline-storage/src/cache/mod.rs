//! Per-operation response cache.
//!
//! Each read operation gets its own bounded, TTL-expiring store, created on
//! first use with the capacity and lifetime from the [`CachePolicyTable`].
//! Outcomes are cached whether they succeeded or failed, so a failing query
//! is not retried against the database until its entry expires or the epoch
//! changes.

pub mod entry;
pub mod key;
pub mod policy;
pub mod registry;
pub mod store;

pub use entry::CacheEntry;
pub use key::{CacheKey, KeyPart};
pub use policy::{
    CachePolicyTable, OperationCachePolicy, DEFAULT_CAPACITY, DEFAULT_TTL, PERMANENT_TTL,
};
pub use registry::{CacheRegistry, CacheReport};
pub use store::{ExpiringStore, StoreStats};
