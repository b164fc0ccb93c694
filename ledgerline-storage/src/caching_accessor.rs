//! Caching Accessor
//!
//! Decorates any [`Accessor`] with the per-operation response cache. Every
//! read computes a [`CacheKey`] from its operation and arguments; a live
//! entry is replayed without touching the wrapped accessor, otherwise the
//! call goes through and its outcome (value or error) is stored.
//!
//! Concurrent misses for the same key are not coalesced: each of them calls
//! the wrapped accessor and the last one to finish wins the slot.
//!
//! The cache is dropped wholesale whenever the epoch tracker reports a new
//! epoch, see the [`EpochObserver`] impl.

use crate::cache::{CacheEntry, CacheKey, CacheRegistry};
use crate::epoch::EpochObserver;
use async_trait::async_trait;
use ledgerline_core::*;
use std::future::Future;
use std::sync::Arc;

/// Read-through cache in front of an `Accessor`.
pub struct CachingAccessor<A: ?Sized> {
    inner: Arc<A>,
    mempool: Option<Arc<dyn MemPool>>,
    registry: Arc<CacheRegistry>,
}

impl<A: Accessor + ?Sized> CachingAccessor<A> {
    pub fn new(inner: Arc<A>, registry: Arc<CacheRegistry>) -> Self {
        Self {
            inner,
            mempool: None,
            registry,
        }
    }

    /// Serve `transaction` and `transaction_raw` from the mempool when the
    /// store has no such transaction yet.
    pub fn with_mempool(mut self, mempool: Arc<dyn MemPool>) -> Self {
        self.mempool = Some(mempool);
        self
    }

    pub fn registry(&self) -> &Arc<CacheRegistry> {
        &self.registry
    }

    pub fn inner(&self) -> &Arc<A> {
        &self.inner
    }

    async fn get_or_load<T, F, Fut>(&self, key: CacheKey, load: F) -> LedgerResult<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = LedgerResult<T>>,
    {
        let op = key.operation();
        if self.registry.policy(op).is_bypass() {
            return load().await;
        }

        let store = self.registry.get_or_create(op);
        if let Some(outcome) = store.get(&key).and_then(|entry| entry.replay::<T>()) {
            tracing::trace!(key = %key, "Cache hit");
            return outcome;
        }

        let outcome = load().await;
        if let Err(e) = &outcome {
            tracing::debug!(key = %key, error = %e, "Caching failed read");
        }
        store.insert(key, CacheEntry::from_result(&outcome));
        outcome
    }
}

impl<A: ?Sized> EpochObserver for CachingAccessor<A>
where
    A: Send + Sync,
{
    fn on_epoch_advance(&self, previous: EpochMarker, current: EpochMarker) {
        let dropped = self.registry.clear();
        tracing::info!(
            previous_epoch = previous.epoch,
            epoch = current.epoch,
            dropped,
            "New epoch detected, cache cleared"
        );
    }
}

/// Generates the `Accessor` impl: one cached forwarder per table row, plus
/// the hand-written methods in the trailing `custom` block.
macro_rules! cached_reads {
    (
        $( fn $name:ident ( $( $arg:ident : $ty:ty ),* ) -> $ret:ty => $op:ident ; )*
        custom { $($custom:tt)* }
    ) => {
        #[async_trait]
        impl<A: Accessor + ?Sized> Accessor for CachingAccessor<A> {
            $(
                async fn $name(&self, $( $arg: $ty ),*) -> LedgerResult<$ret> {
                    let key = CacheKey::new(Operation::$op)$( .push(&$arg) )*;
                    self.get_or_load(key, || self.inner.$name($( $arg ),*)).await
                }
            )*

            $($custom)*
        }
    };
}

cached_reads! {
    fn search(value: &str) -> Vec<Entity> => Search;
    fn coins() -> AllCoins => Coins;
    fn circulating_supply(addresses_to_exclude: &[String]) -> Amount => CirculatingSupply;

    fn epochs_count() -> u64 => EpochsCount;
    fn epochs(count: u64, continuation_token: Option<&str>) -> Page<EpochSummary> => Epochs;
    fn last_epoch() -> EpochDetail => LastEpoch;
    fn epoch(epoch: u64) -> EpochDetail => Epoch;
    fn epoch_blocks_count(epoch: u64) -> u64 => EpochBlocksCount;
    fn epoch_blocks(epoch: u64, count: u64, continuation_token: Option<&str>) -> Page<BlockSummary> => EpochBlocks;
    fn epoch_flips_count(epoch: u64) -> u64 => EpochFlipsCount;
    fn epoch_flips(epoch: u64, count: u64, continuation_token: Option<&str>) -> Page<FlipSummary> => EpochFlips;
    fn epoch_flip_states_summary(epoch: u64) -> Vec<StrValueCount> => EpochFlipStatesSummary;
    fn epoch_identities_count(epoch: u64, prev_states: &[String], states: &[String]) -> u64 => EpochIdentitiesCount;
    fn epoch_identities(
        epoch: u64,
        prev_states: &[String],
        states: &[String],
        count: u64,
        continuation_token: Option<&str>
    ) -> Page<EpochIdentity> => EpochIdentities;
    fn epoch_identity_states_summary(epoch: u64) -> Vec<StrValueCount> => EpochIdentityStatesSummary;
    fn epoch_identity_states_interim_summary(epoch: u64) -> Vec<StrValueCount> => EpochIdentityStatesInterimSummary;
    fn epoch_invites_summary(epoch: u64) -> InvitesSummary => EpochInvitesSummary;
    fn epoch_txs_count(epoch: u64) -> u64 => EpochTxsCount;
    fn epoch_txs(epoch: u64, count: u64, continuation_token: Option<&str>) -> Page<TransactionSummary> => EpochTxs;
    fn epoch_rewards_summary(epoch: u64) -> RewardsSummary => EpochRewardsSummary;
    fn epoch_bad_authors_count(epoch: u64) -> u64 => EpochBadAuthorsCount;
    fn epoch_bad_authors(epoch: u64, count: u64, continuation_token: Option<&str>) -> Page<BadAuthor> => EpochBadAuthors;
    fn epoch_identities_rewards(epoch: u64, count: u64, continuation_token: Option<&str>) -> Page<IdentityRewards> => EpochIdentitiesRewards;
    fn epoch_fund_payments(epoch: u64) -> Vec<FundPayment> => EpochFundPayments;
    fn epoch_reward_bounds(epoch: u64) -> Vec<RewardBounds> => EpochRewardBounds;
    fn epoch_identity(epoch: u64, address: &str) -> EpochIdentity => EpochIdentity;
    fn epoch_identity_rewards(epoch: u64, address: &str) -> Vec<Reward> => EpochIdentityRewards;

    fn last_block() -> BlockDetail => LastBlock;
    fn block_by_height(height: u64) -> BlockDetail => BlockByHeight;
    fn block_by_hash(hash: &str) -> BlockDetail => BlockByHash;
    fn block_txs(block: &str, count: u64, continuation_token: Option<&str>) -> Page<TransactionSummary> => BlockTxs;
    fn transaction_events(hash: &str, count: u64, continuation_token: Option<&str>) -> Page<TxEvent> => TransactionEvents;

    fn identity(address: &str) -> Identity => Identity;
    fn identity_epochs(address: &str, count: u64, continuation_token: Option<&str>) -> Page<EpochIdentity> => IdentityEpochs;
    fn identity_flips(address: &str, count: u64, continuation_token: Option<&str>) -> Page<FlipSummary> => IdentityFlips;
    fn address(address: &str) -> AddressInfo => Address;
    fn address_txs(address: &str, count: u64, continuation_token: Option<&str>) -> Page<TransactionSummary> => AddressTxs;
    fn balances_count() -> u64 => BalancesCount;
    fn balances(sort_by: Option<&str>, count: u64, continuation_token: Option<&str>) -> Page<Balance> => Balances;

    fn flip(hash: &str) -> FlipDetail => Flip;
    fn flip_epoch_adjacent_flips(hash: &str) -> AdjacentStrValues => FlipEpochAdjacentFlips;
    fn flip_address_adjacent_flips(hash: &str) -> AdjacentStrValues => FlipAddressAdjacentFlips;
    fn flip_epoch_identity_adjacent_flips(hash: &str) -> AdjacentStrValues => FlipEpochIdentityAdjacentFlips;

    fn contract(address: &str) -> Contract => Contract;
    fn oracle_voting_contracts(
        author: Option<&str>,
        oracle: Option<&str>,
        states: &[String],
        all: bool,
        sort_by: Option<&str>,
        count: u64,
        continuation_token: Option<&str>
    ) -> Page<OracleVotingContract> => OracleVotingContracts;
    fn oracle_voting_contract(address: &str, oracle: Option<&str>) -> OracleVotingContract => OracleVotingContract;
    fn estimated_oracle_rewards(committee_size: u64) -> Vec<EstimatedOracleReward> => EstimatedOracleRewards;
    fn address_contract_tx_balance_updates(
        address: &str,
        contract_address: &str,
        count: u64,
        continuation_token: Option<&str>
    ) -> Page<ContractTxBalanceUpdate> => AddressContractTxBalanceUpdates;
    fn upgrades(count: u64, continuation_token: Option<&str>) -> Page<ActivatedUpgrade> => Upgrades;
    fn upgrade(upgrade: u64) -> ActivatedUpgrade => Upgrade;
    fn token(address: &str) -> Token => Token;
    fn token_holders(address: &str, count: u64, continuation_token: Option<&str>) -> Page<TokenBalance> => TokenHolders;
    fn address_tokens(address: &str, count: u64, continuation_token: Option<&str>) -> Page<TokenBalance> => AddressTokens;

    custom {
        /// Only the latest count is kept, whatever the cut-off.
        async fn active_addresses_count(&self, after_time: Timestamp) -> LedgerResult<u64> {
            let key = CacheKey::new(Operation::ActiveAddressesCount);
            self.get_or_load(key, || self.inner.active_addresses_count(after_time))
                .await
        }

        async fn transaction(&self, hash: &str) -> LedgerResult<TransactionDetail> {
            let key = CacheKey::new(Operation::Transaction).push(&hash);
            self.get_or_load(key, || async move {
                match self.inner.transaction(hash).await {
                    Err(e) if e.is_not_found() => match &self.mempool {
                        Some(mempool) => mempool.transaction(hash).await,
                        None => Err(e),
                    },
                    other => other,
                }
            })
            .await
        }

        async fn transaction_raw(&self, hash: &str) -> LedgerResult<RawTransaction> {
            let key = CacheKey::new(Operation::TransactionRaw).push(&hash);
            self.get_or_load(key, || async move {
                match self.inner.transaction_raw(hash).await {
                    Err(e) if e.is_not_found() => match &self.mempool {
                        Some(mempool) => mempool.transaction_raw(hash).await,
                        None => Err(e),
                    },
                    other => other,
                }
            })
            .await
        }
    }
}
