//! Ledgerline Core - Read Models and Capability Traits
//!
//! Data types, the error taxonomy and the read-capability traits shared by
//! every other crate in the workspace. No I/O happens here.

pub mod accessor;
pub mod error;
pub mod operation;
pub mod page;
pub mod types;

pub use accessor::{Accessor, EpochMarker, EpochSource, MemPool};
pub use error::{
    ConfigError, LedgerError, LedgerResult, StorageError, UpstreamError, ValidationError,
};
pub use operation::Operation;
pub use page::Page;
pub use types::*;
