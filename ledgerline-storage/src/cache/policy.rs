//! Per-operation cache policy.

use ledgerline_core::{ConfigError, Operation};
use std::collections::HashMap;
use std::time::Duration;

/// Default number of entries kept per operation.
pub const DEFAULT_CAPACITY: usize = 100;

/// Default lifetime of a cached outcome.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Lifetime used for epoch-scoped aggregates that never change once the
/// epoch is over. Epoch changes clear them anyway.
pub const PERMANENT_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Capacity and lifetime for one operation's store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationCachePolicy {
    pub capacity: usize,
    pub ttl: Duration,
}

impl OperationCachePolicy {
    pub const fn new(capacity: usize, ttl: Duration) -> Self {
        Self { capacity, ttl }
    }

    /// Never cache: every call goes to the wrapped accessor.
    pub const fn bypass() -> Self {
        Self {
            capacity: 0,
            ttl: Duration::ZERO,
        }
    }

    pub fn is_bypass(&self) -> bool {
        self.capacity == 0
    }
}

impl Default for OperationCachePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

/// Operation-to-policy table with a process-wide fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicyTable {
    default: OperationCachePolicy,
    permanent_ttl: Duration,
    overrides: HashMap<Operation, OperationCachePolicy>,
}

impl CachePolicyTable {
    /// Table where every operation uses `default`.
    pub fn new(default: OperationCachePolicy) -> Self {
        Self {
            default,
            permanent_ttl: PERMANENT_TTL,
            overrides: HashMap::new(),
        }
    }

    /// The production table.
    pub fn standard() -> Self {
        Self::standard_with(OperationCachePolicy::default(), PERMANENT_TTL)
    }

    /// The production table with a custom default and permanent lifetime.
    pub fn standard_with(default: OperationCachePolicy, permanent_ttl: Duration) -> Self {
        let mut table = Self::new(default);
        table.permanent_ttl = permanent_ttl;

        let minutes = |m: u64| Duration::from_secs(m * 60);

        table.set_ttl(Operation::LastBlock, Duration::from_secs(20));
        table.set(
            Operation::ActiveAddressesCount,
            OperationCachePolicy::new(1, minutes(5)),
        );
        table.set_ttl(Operation::EpochIdentityStatesInterimSummary, minutes(5));
        table.set_ttl(Operation::EpochInvitesSummary, minutes(3));
        table.set_ttl(Operation::FlipEpochAdjacentFlips, minutes(20));
        table.set_ttl(Operation::FlipAddressAdjacentFlips, minutes(20));
        table.set_ttl(Operation::FlipEpochIdentityAdjacentFlips, minutes(20));

        for op in [
            Operation::EpochFlipStatesSummary,
            Operation::EpochIdentityStatesSummary,
            Operation::EpochRewardsSummary,
            Operation::EpochBadAuthorsCount,
            Operation::EpochBadAuthors,
            Operation::EpochIdentitiesRewards,
            Operation::EpochFundPayments,
            Operation::EpochRewardBounds,
            Operation::Upgrade,
            Operation::EpochIdentity,
        ] {
            table.set_ttl(op, permanent_ttl);
        }

        // Results depend on wall-clock state outside the store.
        for op in [
            Operation::OracleVotingContracts,
            Operation::OracleVotingContract,
            Operation::EstimatedOracleRewards,
            Operation::AddressContractTxBalanceUpdates,
        ] {
            table.set(op, OperationCachePolicy::bypass());
        }

        table
    }

    pub fn set(&mut self, op: Operation, policy: OperationCachePolicy) {
        self.overrides.insert(op, policy);
    }

    /// Override only the lifetime, keeping the default capacity.
    pub fn set_ttl(&mut self, op: Operation, ttl: Duration) {
        let capacity = self.default.capacity;
        self.set(op, OperationCachePolicy::new(capacity, ttl));
    }

    pub fn with(mut self, op: Operation, policy: OperationCachePolicy) -> Self {
        self.set(op, policy);
        self
    }

    pub fn policy(&self, op: Operation) -> OperationCachePolicy {
        self.overrides.get(&op).copied().unwrap_or(self.default)
    }

    pub fn default_policy(&self) -> OperationCachePolicy {
        self.default
    }

    pub fn permanent_ttl(&self) -> Duration {
        self.permanent_ttl
    }

    /// Apply overrides of the form `Op=capacity:ttl_secs` or `Op=bypass`,
    /// comma-separated. Blank input is a no-op.
    pub fn apply_overrides(&mut self, spec: &str) -> Result<(), ConfigError> {
        for item in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (op, policy) = parse_override(item)?;
            self.set(op, policy);
        }
        Ok(())
    }
}

impl Default for CachePolicyTable {
    fn default() -> Self {
        Self::standard()
    }
}

const OVERRIDES_FIELD: &str = "LEDGERLINE_CACHE_OVERRIDES";

fn invalid(item: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: OVERRIDES_FIELD.to_string(),
        value: item.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_override(item: &str) -> Result<(Operation, OperationCachePolicy), ConfigError> {
    let (name, rest) = item
        .split_once('=')
        .ok_or_else(|| invalid(item, "expected Op=capacity:ttl_secs or Op=bypass"))?;
    let op: Operation = name.trim().parse()?;
    let rest = rest.trim();

    if rest.eq_ignore_ascii_case("bypass") {
        return Ok((op, OperationCachePolicy::bypass()));
    }

    let (capacity, ttl) = rest
        .split_once(':')
        .ok_or_else(|| invalid(item, "expected capacity:ttl_secs"))?;
    let capacity: usize = capacity
        .trim()
        .parse()
        .map_err(|_| invalid(item, "capacity is not a number"))?;
    let ttl: u64 = ttl
        .trim()
        .parse()
        .map_err(|_| invalid(item, "ttl_secs is not a number"))?;

    Ok((op, OperationCachePolicy::new(capacity, Duration::from_secs(ttl))))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_lifetimes() {
        let table = CachePolicyTable::standard();
        assert_eq!(table.policy(Operation::Epoch), OperationCachePolicy::default());
        assert_eq!(table.policy(Operation::LastBlock).ttl, Duration::from_secs(20));
        assert_eq!(
            table.policy(Operation::ActiveAddressesCount),
            OperationCachePolicy::new(1, Duration::from_secs(300))
        );
        assert_eq!(
            table.policy(Operation::FlipAddressAdjacentFlips).ttl,
            Duration::from_secs(1200)
        );
        assert_eq!(table.policy(Operation::EpochRewardBounds).ttl, PERMANENT_TTL);
        assert_eq!(table.policy(Operation::EpochInvitesSummary).ttl, Duration::from_secs(180));
    }

    #[test]
    fn test_standard_table_bypasses_oracle_reads() {
        let table = CachePolicyTable::standard();
        assert!(table.policy(Operation::OracleVotingContracts).is_bypass());
        assert!(table.policy(Operation::EstimatedOracleRewards).is_bypass());
        assert!(!table.policy(Operation::Contract).is_bypass());
    }

    #[test]
    fn test_standard_with_custom_permanent_ttl() {
        let table = CachePolicyTable::standard_with(
            OperationCachePolicy::new(10, Duration::from_secs(5)),
            Duration::from_secs(900),
        );
        assert_eq!(
            table.policy(Operation::Upgrade),
            OperationCachePolicy::new(10, Duration::from_secs(900))
        );
        assert_eq!(table.policy(Operation::BlockByHeight), table.default_policy());
        assert_eq!(table.permanent_ttl(), Duration::from_secs(900));
    }

    #[test]
    fn test_apply_overrides() {
        let mut table = CachePolicyTable::standard();
        table
            .apply_overrides(" Epoch=2:10 , LastBlock=bypass,,")
            .unwrap();
        assert_eq!(
            table.policy(Operation::Epoch),
            OperationCachePolicy::new(2, Duration::from_secs(10))
        );
        assert!(table.policy(Operation::LastBlock).is_bypass());
    }

    #[test]
    fn test_apply_overrides_empty_is_noop() {
        let mut table = CachePolicyTable::standard();
        table.apply_overrides("").unwrap();
        assert_eq!(table, CachePolicyTable::standard());
    }

    #[test]
    fn test_apply_overrides_rejects_malformed() {
        let mut table = CachePolicyTable::standard();

        let err = table.apply_overrides("Epoch=abc").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = table.apply_overrides("Epoch=1:x").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = table.apply_overrides("Epoch").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = table.apply_overrides("NoSuchOp=1:1").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownOperation { .. }));
    }
}
