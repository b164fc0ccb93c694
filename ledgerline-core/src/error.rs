//! Error types for Ledgerline read operations

use thiserror::Error;

/// Backing-store errors reported by an `Accessor`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// The query ran but produced no row. This is a legitimate, cacheable
    /// "no data" outcome, not a transport failure.
    #[error("No data found")]
    NotFound,

    #[error("Query {query} failed: {reason}")]
    QueryFailed { query: String, reason: String },

    #[error("Connection to backing store failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Failed to decode {query} result: {reason}")]
    DecodeFailed { query: String, reason: String },
}

/// Errors reported by upstream HTTP services (the indexer mempool API).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("Request to {url} failed: {reason}")]
    RequestFailed { url: String, reason: String },

    #[error("Request to {url} returned status {status}")]
    BadStatus { url: String, status: u16 },

    #[error("Got error response from {url}: {message}")]
    ErrorResponse { url: String, message: String },

    #[error("Invalid response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },
}

/// Validation errors for caller-supplied arguments.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unknown operation: {name}")]
    UnknownOperation { name: String },
}

/// Master error type for all Ledgerline errors.
///
/// `Clone` is required: failed reads are cached and replayed verbatim.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl LedgerError {
    /// Shorthand for the "no data" outcome.
    pub fn not_found() -> Self {
        LedgerError::Storage(StorageError::NotFound)
    }

    /// Whether this error means the requested record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::Storage(StorageError::NotFound))
    }
}

impl From<serde_json::Error> for UpstreamError {
    fn from(err: serde_json::Error) -> Self {
        UpstreamError::InvalidResponse {
            url: String::new(),
            reason: err.to_string(),
        }
    }
}

/// Result type alias for Ledgerline operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

// =============================================================================
// TESTS
// =============================================================================
