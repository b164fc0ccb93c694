//! Read-capability traits
//!
//! `Accessor` is the full read surface of the indexer database. Deployments
//! supply a concrete implementation; the gateway only ever sees the trait.

use crate::error::LedgerResult;
use crate::page::Page;
use crate::types::*;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ============================================================================
// ACCESSOR
// ============================================================================

/// Read operations against the indexer database.
///
/// Every method is a pure read. Paginated methods take a page size and an
/// opaque continuation token and return a [`Page`].
#[async_trait]
pub trait Accessor: Send + Sync {
    async fn search(&self, value: &str) -> LedgerResult<Vec<Entity>>;
    async fn coins(&self) -> LedgerResult<AllCoins>;
    async fn circulating_supply(&self, addresses_to_exclude: &[String]) -> LedgerResult<Amount>;
    /// Number of addresses active after `after_time`. Only one value is ever
    /// meaningful at a time, so implementations may ignore older cut-offs.
    async fn active_addresses_count(&self, after_time: Timestamp) -> LedgerResult<u64>;

    // === Epochs ===

    async fn epochs_count(&self) -> LedgerResult<u64>;
    async fn epochs(
        &self,
        count: u64,
        continuation_token: Option<&str>,
    ) -> LedgerResult<Page<EpochSummary>>;
    async fn last_epoch(&self) -> LedgerResult<EpochDetail>;
    async fn epoch(&self, epoch: u64) -> LedgerResult<EpochDetail>;
    async fn epoch_blocks_count(&self, epoch: u64) -> LedgerResult<u64>;
    async fn epoch_blocks(
        &self,
        epoch: u64,
        count: u64,
        continuation_token: Option<&str>,
    ) -> LedgerResult<Page<BlockSummary>>;
    async fn epoch_flips_count(&self, epoch: u64) -> LedgerResult<u64>;
    async fn epoch_flips(
        &self,
        epoch: u64,
        count: u64,
        continuation_token: Option<&str>,
    ) -> LedgerResult<Page<FlipSummary>>;
    async fn epoch_flip_states_summary(&self, epoch: u64) -> LedgerResult<Vec<StrValueCount>>;
    async fn epoch_identities_count(
        &self,
        epoch: u64,
        prev_states: &[String],
        states: &[String],
    ) -> LedgerResult<u64>;
    async fn epoch_identities(
        &self,
        epoch: u64,
        prev_states: &[String],
        states: &[String],
        count: u64,
        continuation_token: Option<&str>,
    ) -> LedgerResult<Page<EpochIdentity>>;
    async fn epoch_identity_states_summary(&self, epoch: u64) -> LedgerResult<Vec<StrValueCount>>;
    async fn epoch_identity_states_interim_summary(
        &self,
        epoch: u64,
    ) -> LedgerResult<Vec<StrValueCount>>;
    async fn epoch_invites_summary(&self, epoch: u64) -> LedgerResult<InvitesSummary>;
    async fn epoch_txs_count(&self, epoch: u64) -> LedgerResult<u64>;
    async fn epoch_txs(
        &self,
        epoch: u64,
        count: u64,
        continuation_token: Option<&str>,
    ) -> LedgerResult<Page<TransactionSummary>>;
    async fn epoch_rewards_summary(&self, epoch: u64) -> LedgerResult<RewardsSummary>;
    async fn epoch_bad_authors_count(&self, epoch: u64) -> LedgerResult<u64>;
    async fn epoch_bad_authors(
        &self,
        epoch: u64,
        count: u64,
        continuation_token: Option<&str>,
    ) -> LedgerResult<Page<BadAuthor>>;
    async fn epoch_identities_rewards(
        &self,
        epoch: u64,
        count: u64,
        continuation_token: Option<&str>,
    ) -> LedgerResult<Page<IdentityRewards>>;
    async fn epoch_fund_payments(&self, epoch: u64) -> LedgerResult<Vec<FundPayment>>;
    async fn epoch_reward_bounds(&self, epoch: u64) -> LedgerResult<Vec<RewardBounds>>;
    async fn epoch_identity(&self, epoch: u64, address: &str) -> LedgerResult<EpochIdentity>;
    async fn epoch_identity_rewards(&self, epoch: u64, address: &str)
        -> LedgerResult<Vec<Reward>>;

    // === Blocks & transactions ===

    async fn last_block(&self) -> LedgerResult<BlockDetail>;
    async fn block_by_height(&self, height: u64) -> LedgerResult<BlockDetail>;
    async fn block_by_hash(&self, hash: &str) -> LedgerResult<BlockDetail>;
    async fn block_txs(
        &self,
        block: &str,
        count: u64,
        continuation_token: Option<&str>,
    ) -> LedgerResult<Page<TransactionSummary>>;
    async fn transaction(&self, hash: &str) -> LedgerResult<TransactionDetail>;
    async fn transaction_raw(&self, hash: &str) -> LedgerResult<RawTransaction>;
    async fn transaction_events(
        &self,
        hash: &str,
        count: u64,
        continuation_token: Option<&str>,
    ) -> LedgerResult<Page<TxEvent>>;

    // === Identities & addresses ===

    async fn identity(&self, address: &str) -> LedgerResult<Identity>;
    async fn identity_epochs(
        &self,
        address: &str,
        count: u64,
        continuation_token: Option<&str>,
    ) -> LedgerResult<Page<EpochIdentity>>;
    async fn identity_flips(
        &self,
        address: &str,
        count: u64,
        continuation_token: Option<&str>,
    ) -> LedgerResult<Page<FlipSummary>>;
    async fn address(&self, address: &str) -> LedgerResult<AddressInfo>;
    async fn address_txs(
        &self,
        address: &str,
        count: u64,
        continuation_token: Option<&str>,
    ) -> LedgerResult<Page<TransactionSummary>>;
    async fn balances_count(&self) -> LedgerResult<u64>;
    async fn balances(
        &self,
        sort_by: Option<&str>,
        count: u64,
        continuation_token: Option<&str>,
    ) -> LedgerResult<Page<Balance>>;

    // === Flips ===

    async fn flip(&self, hash: &str) -> LedgerResult<FlipDetail>;
    async fn flip_epoch_adjacent_flips(&self, hash: &str) -> LedgerResult<AdjacentStrValues>;
    async fn flip_address_adjacent_flips(&self, hash: &str) -> LedgerResult<AdjacentStrValues>;
    async fn flip_epoch_identity_adjacent_flips(
        &self,
        hash: &str,
    ) -> LedgerResult<AdjacentStrValues>;

    // === Contracts, upgrades & tokens ===

    async fn contract(&self, address: &str) -> LedgerResult<Contract>;
    #[allow(clippy::too_many_arguments)]
    async fn oracle_voting_contracts(
        &self,
        author: Option<&str>,
        oracle: Option<&str>,
        states: &[String],
        all: bool,
        sort_by: Option<&str>,
        count: u64,
        continuation_token: Option<&str>,
    ) -> LedgerResult<Page<OracleVotingContract>>;
    async fn oracle_voting_contract(
        &self,
        address: &str,
        oracle: Option<&str>,
    ) -> LedgerResult<OracleVotingContract>;
    async fn estimated_oracle_rewards(
        &self,
        committee_size: u64,
    ) -> LedgerResult<Vec<EstimatedOracleReward>>;
    async fn address_contract_tx_balance_updates(
        &self,
        address: &str,
        contract_address: &str,
        count: u64,
        continuation_token: Option<&str>,
    ) -> LedgerResult<Page<ContractTxBalanceUpdate>>;
    async fn upgrades(
        &self,
        count: u64,
        continuation_token: Option<&str>,
    ) -> LedgerResult<Page<ActivatedUpgrade>>;
    async fn upgrade(&self, upgrade: u64) -> LedgerResult<ActivatedUpgrade>;
    async fn token(&self, address: &str) -> LedgerResult<Token>;
    async fn token_holders(
        &self,
        address: &str,
        count: u64,
        continuation_token: Option<&str>,
    ) -> LedgerResult<Page<TokenBalance>>;
    async fn address_tokens(
        &self,
        address: &str,
        count: u64,
        continuation_token: Option<&str>,
    ) -> LedgerResult<Page<TokenBalance>>;
}

// ============================================================================
// MEMPOOL
// ============================================================================

/// Pending (not yet mined) transactions, served by the upstream node indexer.
#[async_trait]
pub trait MemPool: Send + Sync {
    async fn transaction(&self, hash: &str) -> LedgerResult<TransactionDetail>;
    async fn transaction_raw(&self, hash: &str) -> LedgerResult<RawTransaction>;
    async fn address_transactions(
        &self,
        address: &str,
        count: u64,
    ) -> LedgerResult<Vec<TransactionSummary>>;
    async fn transactions(&self, count: u64) -> LedgerResult<Vec<TransactionSummary>>;
}

// ============================================================================
// EPOCH SOURCE
// ============================================================================

/// The most recent epoch and when its validation ceremony is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochMarker {
    pub epoch: u64,
    pub validation_time: Timestamp,
}

/// Source of the current epoch, polled by the epoch tracker.
#[async_trait]
pub trait EpochSource: Send + Sync {
    async fn latest_epoch(&self) -> LedgerResult<EpochMarker>;
}
