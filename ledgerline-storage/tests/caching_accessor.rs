//! Behaviour of the caching accessor against an instrumented backing accessor.

use ledgerline_core::{Accessor, LedgerError, Operation, StorageError};
use ledgerline_storage::{
    AccessorEpochSource, CachePolicyTable, CacheRegistry, CachingAccessor, EpochTracker,
    EpochTrackerConfig, OperationCachePolicy,
};
use ledgerline_test_utils::{
    at_hour, epoch_marker, generators::arb_operation, transaction_fixture, ManualClock,
    RecordingAccessor, ScriptedEpochSource, StaticMemPool,
};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn caching(
    table: CachePolicyTable,
) -> (Arc<RecordingAccessor>, Arc<CachingAccessor<RecordingAccessor>>) {
    let inner = Arc::new(RecordingAccessor::new());
    let registry = Arc::new(CacheRegistry::new(table));
    let cached = Arc::new(CachingAccessor::new(inner.clone(), registry));
    (inner, cached)
}

fn small_epoch_table() -> CachePolicyTable {
    CachePolicyTable::standard().with(
        Operation::Epoch,
        OperationCachePolicy::new(2, Duration::from_secs(10)),
    )
}

#[tokio::test(start_paused = true)]
async fn test_repeated_read_hits_cache() {
    let (inner, cached) = caching(small_epoch_table());

    let first = cached.epoch(5).await.unwrap();
    let second = cached.epoch(5).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.epoch, 5);
    assert_eq!(inner.calls(Operation::Epoch), 1);
}

#[tokio::test(start_paused = true)]
async fn test_expired_entry_reloads() {
    let (inner, cached) = caching(small_epoch_table());

    cached.epoch(5).await.unwrap();
    tokio::time::advance(Duration::from_secs(11)).await;
    cached.epoch(5).await.unwrap();

    assert_eq!(inner.calls(Operation::Epoch), 2);
}

#[tokio::test(start_paused = true)]
async fn test_epoch_advance_invalidates_everything() {
    let (inner, cached) = caching(small_epoch_table());
    let source = Arc::new(ScriptedEpochSource::new(vec![
        Ok(epoch_marker(10, at_hour(12))),
        Ok(epoch_marker(11, at_hour(12))),
    ]));
    let tracker = EpochTracker::with_clock(
        source,
        Arc::new(ManualClock::new(at_hour(13))),
        EpochTrackerConfig::default(),
    );
    tracker.register(cached.clone());

    assert!(!tracker.poll().await.advanced);
    cached.epoch(5).await.unwrap();
    cached.last_block().await.unwrap();

    assert!(tracker.poll().await.advanced);
    assert_eq!(cached.registry().clear_count(), 1);

    cached.epoch(5).await.unwrap();
    cached.last_block().await.unwrap();
    assert_eq!(inner.calls(Operation::Epoch), 2);
    assert_eq!(inner.calls(Operation::LastBlock), 2);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_epoch_does_not_clear() {
    let (_inner, cached) = caching(CachePolicyTable::standard());
    let source = Arc::new(ScriptedEpochSource::new(vec![Ok(epoch_marker(10, at_hour(12)))]));
    let tracker = EpochTracker::new(source.clone(), EpochTrackerConfig::default());
    tracker.register(cached.clone());

    for _ in 0..3 {
        tracker.poll().await;
    }

    assert_eq!(source.fetches(), 3);
    assert_eq!(cached.registry().clear_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_errors_are_cached_verbatim() {
    let (inner, cached) = caching(CachePolicyTable::standard());
    let err = LedgerError::from(StorageError::QueryFailed {
        query: "flip".to_string(),
        reason: "statement timeout".to_string(),
    });
    inner.fail(Operation::Flip, err.clone());

    assert_eq!(cached.flip("0xf1").await, Err(err.clone()));
    inner.clear_failure(Operation::Flip);
    assert_eq!(cached.flip("0xf1").await, Err(err));
    assert_eq!(inner.calls(Operation::Flip), 1);
}

#[tokio::test(start_paused = true)]
async fn test_bypass_operations_always_call_through() {
    let (inner, cached) = caching(CachePolicyTable::standard());

    for _ in 0..3 {
        cached.oracle_voting_contract("0xc0", None).await.unwrap();
    }

    assert_eq!(inner.calls(Operation::OracleVotingContract), 3);
    assert!(cached
        .registry()
        .snapshot()
        .iter()
        .all(|s| s.operation != Operation::OracleVotingContract));
}

#[tokio::test(start_paused = true)]
async fn test_continuation_token_is_part_of_key() {
    let (inner, cached) = caching(CachePolicyTable::standard());

    let first = cached.epochs(2, None).await.unwrap();
    let next = cached
        .epochs(2, first.continuation_token.as_deref())
        .await
        .unwrap();
    let empty_token = cached.epochs(2, Some("")).await.unwrap();
    cached.epochs(2, None).await.unwrap();

    assert_eq!(first.items[0].epoch, 0);
    assert_eq!(next.items[0].epoch, 2);
    assert_eq!(empty_token.items[0].epoch, 0);
    assert_eq!(inner.calls(Operation::Epochs), 3);
}

#[tokio::test(start_paused = true)]
async fn test_state_filters_are_part_of_key() {
    let (inner, cached) = caching(CachePolicyTable::standard());
    let human = vec!["Human".to_string()];
    let none: Vec<String> = Vec::new();

    cached.epoch_identities_count(7, &human, &none).await.unwrap();
    cached.epoch_identities_count(7, &none, &human).await.unwrap();
    cached.epoch_identities_count(7, &human, &none).await.unwrap();

    assert_eq!(inner.calls(Operation::EpochIdentitiesCount), 2);
}

#[tokio::test(start_paused = true)]
async fn test_active_addresses_count_ignores_cut_off() {
    let (inner, cached) = caching(CachePolicyTable::standard());

    assert_eq!(cached.active_addresses_count(at_hour(1)).await, Ok(42));
    assert_eq!(cached.active_addresses_count(at_hour(2)).await, Ok(42));
    assert_eq!(inner.calls(Operation::ActiveAddressesCount), 1);
}

#[tokio::test(start_paused = true)]
async fn test_transaction_falls_back_to_mempool() {
    let inner = Arc::new(RecordingAccessor::new());
    inner.fail(Operation::Transaction, LedgerError::not_found());
    inner.fail(Operation::TransactionRaw, LedgerError::not_found());
    let mempool = Arc::new(StaticMemPool::new().with_transaction(transaction_fixture("0xp1")));
    let cached = CachingAccessor::new(inner.clone(), Arc::new(CacheRegistry::default()))
        .with_mempool(mempool.clone());

    let tx = cached.transaction("0xp1").await.unwrap();
    assert_eq!(tx.hash, "0xp1");
    let raw = cached.transaction_raw("0xp1").await.unwrap();
    assert_eq!(raw.0, "pending:0xp1");

    // The combined outcome is cached.
    cached.transaction("0xp1").await.unwrap();
    assert_eq!(mempool.lookups(), 2);
    assert_eq!(inner.calls(Operation::Transaction), 1);

    assert!(cached.transaction("0xmissing").await.unwrap_err().is_not_found());
}

#[tokio::test(start_paused = true)]
async fn test_transaction_store_hit_skips_mempool() {
    let inner = Arc::new(RecordingAccessor::new());
    let mempool = Arc::new(StaticMemPool::new());
    let cached = CachingAccessor::new(inner, Arc::new(CacheRegistry::default()))
        .with_mempool(mempool.clone());

    cached.transaction("0xa").await.unwrap();
    assert_eq!(mempool.lookups(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_transaction_other_errors_do_not_fall_back() {
    let inner = Arc::new(RecordingAccessor::new());
    let err = LedgerError::from(StorageError::ConnectionFailed {
        reason: "refused".to_string(),
    });
    inner.fail(Operation::Transaction, err.clone());
    let mempool = Arc::new(StaticMemPool::new().with_transaction(transaction_fixture("0xa")));
    let cached = CachingAccessor::new(inner, Arc::new(CacheRegistry::default()))
        .with_mempool(mempool.clone());

    assert_eq!(cached.transaction("0xa").await, Err(err));
    assert_eq!(mempool.lookups(), 0);
}

#[tokio::test]
async fn test_accessor_epoch_source_reads_last_epoch() {
    use ledgerline_core::EpochSource;

    let inner = Arc::new(RecordingAccessor::new());
    inner.set_last_epoch(42, at_hour(9));
    let source = AccessorEpochSource::new(inner.clone());

    assert_eq!(source.latest_epoch().await, Ok(epoch_marker(42, at_hour(9))));
    assert_eq!(inner.calls(Operation::LastEpoch), 1);
}

proptest! {
    #[test]
    fn prop_store_policy_matches_table(op in arb_operation()) {
        let table = CachePolicyTable::standard();
        let registry = CacheRegistry::new(table.clone());
        prop_assert_eq!(registry.get_or_create(op).policy(), table.policy(op));
    }
}
