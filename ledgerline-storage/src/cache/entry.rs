//! Stored outcome of one accessor call.

use ledgerline_core::{LedgerError, LedgerResult};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// The outcome of one call, success or failure.
///
/// Values are type-erased so a single store type serves every operation. The
/// key namespace is per operation, so a slot is only ever read back as the
/// type it was written with.
#[derive(Clone)]
pub struct CacheEntry {
    outcome: Result<Arc<dyn Any + Send + Sync>, LedgerError>,
}

impl CacheEntry {
    pub fn from_result<T>(result: &LedgerResult<T>) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        match result {
            Ok(value) => Self {
                outcome: Ok(Arc::new(value.clone())),
            },
            Err(err) => Self {
                outcome: Err(err.clone()),
            },
        }
    }

    pub fn is_error(&self) -> bool {
        self.outcome.is_err()
    }

    /// Replay the stored outcome. `None` if the stored value is not a `T`.
    pub fn replay<T>(&self) -> Option<LedgerResult<T>>
    where
        T: Clone + 'static,
    {
        match &self.outcome {
            Ok(value) => value.downcast_ref::<T>().cloned().map(Ok),
            Err(err) => Some(Err(err.clone())),
        }
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Ok(_) => f.write_str("CacheEntry(Ok(..))"),
            Err(err) => write!(f, "CacheEntry(Err({err}))"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerline_core::StorageError;

    #[test]
    fn test_replay_value() {
        let entry = CacheEntry::from_result::<u64>(&Ok(42));
        assert_eq!(entry.replay::<u64>(), Some(Ok(42)));
        assert!(!entry.is_error());
    }

    #[test]
    fn test_replay_error_verbatim() {
        let err = LedgerError::from(StorageError::QueryFailed {
            query: "epoch".to_string(),
            reason: "timeout".to_string(),
        });
        let entry = CacheEntry::from_result::<u64>(&Err(err.clone()));
        assert!(entry.is_error());
        assert_eq!(entry.replay::<u64>(), Some(Err(err)));
    }

    #[test]
    fn test_replay_with_wrong_type_is_none() {
        let entry = CacheEntry::from_result::<u64>(&Ok(1));
        assert_eq!(entry.replay::<String>(), None);
    }
}
