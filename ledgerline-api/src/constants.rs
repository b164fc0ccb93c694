//! Constants for the Ledgerline API
//!
//! Default values for every environment-driven setting, kept in one place so
//! the config loaders and their tests agree.

// ============================================================================
// ADMISSION
// ============================================================================

/// Default size of the standard admission lane
pub const DEFAULT_MAX_REQ_COUNT: usize = 50;

/// Size of the heavy lookup lane
pub const HEAVY_LANE_CAPACITY: usize = 1;

/// Default maximum wait for an admission slot in seconds
pub const DEFAULT_ADMISSION_TIMEOUT_SECS: u64 = 60;

/// Default per-client request ceiling per rolling minute (0 disables)
pub const DEFAULT_REQS_PER_MINUTE_LIMIT: u32 = 0;

/// Default length of one rate sub-window in seconds
pub const DEFAULT_RATE_WINDOW_SECS: u64 = 30;

/// Default comma-separated heavy route patterns
pub const DEFAULT_HEAVY_ROUTE_PATTERNS: &str = "(?i)/adjacentflips$";

/// Default interval between rate window sweeps in seconds
pub const DEFAULT_RATE_SWEEP_INTERVAL_SECS: u64 = 60;

// ============================================================================
// CACHE
// ============================================================================

/// Default per-operation store capacity
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Default entry TTL in seconds
pub const DEFAULT_CACHE_TTL_SECS: u64 = 60;

/// TTL in seconds for data that never changes within an epoch
pub const DEFAULT_CACHE_PERMANENT_TTL_SECS: u64 = 2 * 60 * 60;

/// Default interval between cache reports in seconds
pub const DEFAULT_CACHE_REPORT_INTERVAL_SECS: u64 = 60;

// ============================================================================
// EPOCH TRACKING
// ============================================================================

/// Default pause between epoch polls in seconds
pub const DEFAULT_EPOCH_POLL_INTERVAL_SECS: u64 = 5;

/// Default delay after validation time before fast polling resumes (25 minutes)
pub const DEFAULT_EPOCH_RESUME_DELAY_SECS: u64 = 1500;

// ============================================================================
// UPSTREAM INDEXER
// ============================================================================

/// Default timeout for indexer requests in seconds
pub const DEFAULT_INDEXER_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// PAGINATION
// ============================================================================

/// Default page size when `count` is omitted
pub const DEFAULT_PAGE_SIZE: u64 = 30;

/// Maximum page size accepted from clients
pub const MAX_PAGE_SIZE: u64 = 100;

/// Look-back window for the active addresses count
pub const ACTIVE_ADDRESSES_WINDOW_HOURS: i64 = 24;

// ============================================================================
// CORS
// ============================================================================

/// Default CORS max age in seconds (24 hours)
pub const DEFAULT_CORS_MAX_AGE_SECS: u64 = 86400;
