//! Ledgerline Test Utilities
//!
//! Shared test infrastructure for the Ledgerline workspace:
//! - `RecordingAccessor`: an `Accessor` that counts calls per operation and
//!   can be told to fail or to respond slowly
//! - `StaticMemPool`, `ScriptedEpochSource`, `ManualClock`
//! - Proptest generators and fixtures

pub use ledgerline_core::{
    Accessor, EpochMarker, EpochSource, LedgerError, LedgerResult, MemPool, Operation, Page,
    StorageError,
};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use ledgerline_core::*;
use ledgerline_storage::Clock;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

// ============================================================================
// FIXTURES
// ============================================================================

/// A fixed, readable instant: 2024-03-01 at `hour`:00 UTC.
pub fn at_hour(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0)
        .single()
        .unwrap_or_default()
}

pub fn epoch_marker(epoch: u64, validation_time: DateTime<Utc>) -> EpochMarker {
    EpochMarker {
        epoch,
        validation_time,
    }
}

pub fn transaction_fixture(hash: &str) -> TransactionDetail {
    TransactionDetail {
        hash: hash.to_string(),
        kind: "SendTx".to_string(),
        from: "0x1111".to_string(),
        to: Some("0x2222".to_string()),
        amount: "1.5".to_string(),
        ..Default::default()
    }
}

// ============================================================================
// RECORDING ACCESSOR
// ============================================================================

/// In-memory `Accessor` that records how often each operation reached it.
///
/// Every read returns a deterministic fixture derived from its arguments,
/// unless a failure was configured for that operation.
#[derive(Default)]
pub struct RecordingAccessor {
    calls: Mutex<HashMap<Operation, usize>>,
    failures: Mutex<HashMap<Operation, LedgerError>>,
    last_epoch: Mutex<EpochDetail>,
    delay: Option<Duration>,
}

impl RecordingAccessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make every call of `op` fail with `err`.
    pub fn fail(&self, op: Operation, err: LedgerError) {
        self.failures.lock().insert(op, err);
    }

    pub fn clear_failure(&self, op: Operation) {
        self.failures.lock().remove(&op);
    }

    pub fn set_last_epoch(&self, epoch: u64, validation_time: DateTime<Utc>) {
        *self.last_epoch.lock() = EpochDetail {
            epoch,
            validation_time,
            ..Default::default()
        };
    }

    /// How many times `op` reached this accessor.
    pub fn calls(&self, op: Operation) -> usize {
        self.calls.lock().get(&op).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }

    async fn record(&self, op: Operation) -> LedgerResult<()> {
        *self.calls.lock().entry(op).or_insert(0) += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.failures.lock().get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

macro_rules! fixture {
    () => {
        Default::default()
    };
    ($body:block) => {
        $body
    };
}

macro_rules! recording_reads {
    (
        $( fn $name:ident ( $( $arg:ident : $ty:ty ),* ) -> $ret:ty => $op:ident $( $body:block )? ; )*
        custom { $($custom:tt)* }
    ) => {
        #[async_trait]
        impl Accessor for RecordingAccessor {
            $(
                #[allow(unused_variables)]
                async fn $name(&self, $( $arg: $ty ),*) -> LedgerResult<$ret> {
                    self.record(Operation::$op).await?;
                    Ok(fixture!($( $body )?))
                }
            )*

            $($custom)*
        }
    };
}

recording_reads! {
    fn search(value: &str) -> Vec<Entity> => Search {
        vec![Entity { name: "Address".to_string(), value: value.to_string() }]
    };
    fn coins() -> AllCoins => Coins;
    fn circulating_supply(addresses_to_exclude: &[String]) -> Amount => CirculatingSupply {
        "1000".to_string()
    };
    fn active_addresses_count(after_time: Timestamp) -> u64 => ActiveAddressesCount { 42 };

    fn epochs_count() -> u64 => EpochsCount;
    fn epochs(count: u64, continuation_token: Option<&str>) -> Page<EpochSummary> => Epochs {
        let start: u64 = continuation_token.and_then(|t| t.parse().ok()).unwrap_or(0);
        let items = (start..start + count)
            .map(|epoch| EpochSummary { epoch, ..Default::default() })
            .collect();
        Page::new(items, Some((start + count).to_string()))
    };
    fn epoch(epoch: u64) -> EpochDetail => Epoch {
        EpochDetail { epoch, ..Default::default() }
    };
    fn epoch_blocks_count(epoch: u64) -> u64 => EpochBlocksCount;
    fn epoch_blocks(epoch: u64, count: u64, continuation_token: Option<&str>) -> Page<BlockSummary> => EpochBlocks;
    fn epoch_flips_count(epoch: u64) -> u64 => EpochFlipsCount;
    fn epoch_flips(epoch: u64, count: u64, continuation_token: Option<&str>) -> Page<FlipSummary> => EpochFlips;
    fn epoch_flip_states_summary(epoch: u64) -> Vec<StrValueCount> => EpochFlipStatesSummary;
    fn epoch_identities_count(epoch: u64, prev_states: &[String], states: &[String]) -> u64 => EpochIdentitiesCount {
        (prev_states.len() + states.len()) as u64
    };
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
    fn epoch_rewards_summary(epoch: u64) -> RewardsSummary => EpochRewardsSummary {
        RewardsSummary { epoch, ..Default::default() }
    };
    fn epoch_bad_authors_count(epoch: u64) -> u64 => EpochBadAuthorsCount;
    fn epoch_bad_authors(epoch: u64, count: u64, continuation_token: Option<&str>) -> Page<BadAuthor> => EpochBadAuthors;
    fn epoch_identities_rewards(epoch: u64, count: u64, continuation_token: Option<&str>) -> Page<IdentityRewards> => EpochIdentitiesRewards;
    fn epoch_fund_payments(epoch: u64) -> Vec<FundPayment> => EpochFundPayments;
    fn epoch_reward_bounds(epoch: u64) -> Vec<RewardBounds> => EpochRewardBounds;
    fn epoch_identity(epoch: u64, address: &str) -> EpochIdentity => EpochIdentity {
        EpochIdentity { epoch, address: address.to_string(), ..Default::default() }
    };
    fn epoch_identity_rewards(epoch: u64, address: &str) -> Vec<Reward> => EpochIdentityRewards;

    fn last_block() -> BlockDetail => LastBlock;
    fn block_by_height(height: u64) -> BlockDetail => BlockByHeight {
        BlockDetail { height, ..Default::default() }
    };
    fn block_by_hash(hash: &str) -> BlockDetail => BlockByHash {
        BlockDetail { hash: hash.to_string(), ..Default::default() }
    };
    fn block_txs(block: &str, count: u64, continuation_token: Option<&str>) -> Page<TransactionSummary> => BlockTxs;
    fn transaction(hash: &str) -> TransactionDetail => Transaction { transaction_fixture(hash) };
    fn transaction_raw(hash: &str) -> RawTransaction => TransactionRaw {
        RawTransaction(format!("raw:{hash}"))
    };
    fn transaction_events(hash: &str, count: u64, continuation_token: Option<&str>) -> Page<TxEvent> => TransactionEvents {
        let start: u64 = continuation_token.and_then(|t| t.parse().ok()).unwrap_or(0);
        let items = (start..start + count)
            .map(|i| TxEvent { event_name: format!("event{}", i), data: vec![hash.to_string()] })
            .collect();
        Page::new(items, Some((start + count).to_string()))
    };

    fn identity(address: &str) -> Identity => Identity {
        Identity { address: address.to_string(), state: "Human".to_string(), ..Default::default() }
    };
    fn identity_epochs(address: &str, count: u64, continuation_token: Option<&str>) -> Page<EpochIdentity> => IdentityEpochs;
    fn identity_flips(address: &str, count: u64, continuation_token: Option<&str>) -> Page<FlipSummary> => IdentityFlips;
    fn address(address: &str) -> AddressInfo => Address {
        AddressInfo { address: address.to_string(), ..Default::default() }
    };
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
        async fn last_epoch(&self) -> LedgerResult<EpochDetail> {
            self.record(Operation::LastEpoch).await?;
            Ok(self.last_epoch.lock().clone())
        }
    }
}

// ============================================================================
// MEMPOOL
// ============================================================================

/// `MemPool` backed by a fixed set of pending transactions.
#[derive(Default)]
pub struct StaticMemPool {
    transactions: Mutex<HashMap<String, TransactionDetail>>,
    lookups: Mutex<usize>,
}

impl StaticMemPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transaction(self, tx: TransactionDetail) -> Self {
        self.transactions.lock().insert(tx.hash.clone(), tx);
        self
    }

    pub fn lookups(&self) -> usize {
        *self.lookups.lock()
    }

    fn find(&self, hash: &str) -> LedgerResult<TransactionDetail> {
        *self.lookups.lock() += 1;
        self.transactions
            .lock()
            .get(hash)
            .cloned()
            .ok_or_else(LedgerError::not_found)
    }
}

#[async_trait]
impl MemPool for StaticMemPool {
    async fn transaction(&self, hash: &str) -> LedgerResult<TransactionDetail> {
        self.find(hash)
    }

    async fn transaction_raw(&self, hash: &str) -> LedgerResult<RawTransaction> {
        self.find(hash).map(|tx| RawTransaction(format!("pending:{}", tx.hash)))
    }

    async fn address_transactions(
        &self,
        address: &str,
        count: u64,
    ) -> LedgerResult<Vec<TransactionSummary>> {
        Ok(self
            .transactions
            .lock()
            .values()
            .filter(|tx| tx.from == address || tx.to.as_deref() == Some(address))
            .take(count as usize)
            .map(summary_of)
            .collect())
    }

    async fn transactions(&self, count: u64) -> LedgerResult<Vec<TransactionSummary>> {
        Ok(self
            .transactions
            .lock()
            .values()
            .take(count as usize)
            .map(summary_of)
            .collect())
    }
}

fn summary_of(tx: &TransactionDetail) -> TransactionSummary {
    TransactionSummary {
        hash: tx.hash.clone(),
        kind: tx.kind.clone(),
        from: tx.from.clone(),
        to: tx.to.clone(),
        amount: tx.amount.clone(),
        ..Default::default()
    }
}

// ============================================================================
// EPOCH SOURCE & CLOCK
// ============================================================================

/// `EpochSource` that replays a script of outcomes, then keeps returning the
/// last one.
pub struct ScriptedEpochSource {
    script: Mutex<VecDeque<LedgerResult<EpochMarker>>>,
    last: Mutex<LedgerResult<EpochMarker>>,
    fetches: Mutex<usize>,
}

impl ScriptedEpochSource {
    pub fn new(script: Vec<LedgerResult<EpochMarker>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(Err(LedgerError::not_found())),
            fetches: Mutex::new(0),
        }
    }

    pub fn push(&self, outcome: LedgerResult<EpochMarker>) {
        self.script.lock().push_back(outcome);
    }

    pub fn fetches(&self) -> usize {
        *self.fetches.lock()
    }
}

#[async_trait]
impl EpochSource for ScriptedEpochSource {
    async fn latest_epoch(&self) -> LedgerResult<EpochMarker> {
        *self.fetches.lock() += 1;
        let next = self.script.lock().pop_front();
        match next {
            Some(outcome) => {
                *self.last.lock() = outcome.clone();
                outcome
            }
            None => self.last.lock().clone(),
        }
    }
}

/// Settable wall clock.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

// ============================================================================
// GENERATORS
// ============================================================================

pub mod generators {
    use super::*;
    use proptest::prelude::*;

    pub fn arb_operation() -> impl Strategy<Value = Operation> {
        proptest::sample::select(Operation::ALL.to_vec())
    }

    pub fn arb_continuation_token() -> impl Strategy<Value = Option<String>> {
        proptest::option::of("[0-9a-f]{0,12}")
    }
}
