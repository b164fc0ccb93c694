//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use ledgerline_core::{Accessor, MemPool};
use ledgerline_storage::{CacheRegistry, EpochTracker};

use crate::admission::AdmissionController;
use crate::config::ApiConfig;

/// Read capability handed to route handlers. In a running gateway this is
/// the caching accessor.
pub type SharedAccessor = Arc<dyn Accessor>;

/// Optional pending-transaction source.
pub type SharedMemPool = Option<Arc<dyn MemPool>>;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub accessor: SharedAccessor,
    pub mempool: SharedMemPool,
    pub admission: Arc<AdmissionController>,
    /// Response cache behind `accessor`, for reporting.
    pub registry: Arc<CacheRegistry>,
    pub tracker: Arc<EpochTracker>,
    pub config: Arc<ApiConfig>,
    pub start_time: Instant,
}

crate::impl_from_ref!(SharedAccessor, accessor);
crate::impl_from_ref!(SharedMemPool, mempool);
crate::impl_from_ref!(Arc<AdmissionController>, admission);
crate::impl_from_ref!(Arc<CacheRegistry>, registry);
crate::impl_from_ref!(Arc<EpochTracker>, tracker);
crate::impl_from_ref!(Arc<ApiConfig>, config);
crate::impl_from_ref!(Instant, start_time);
