//! Operation catalogue
//!
//! Every read on the `Accessor` surface has a stable logical name. The name
//! selects the cache namespace and the cache policy for that read.

use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;

macro_rules! operations {
    ($($variant:ident),+ $(,)?) => {
        /// Logical name of a read operation.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Operation {
            $($variant,)+
        }

        impl Operation {
            /// Every operation, in declaration order.
            pub const ALL: &'static [Operation] = &[$(Operation::$variant,)+];

            /// Stable name, used in cache keys, config overrides and metric labels.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Operation::$variant => stringify!($variant),)+
                }
            }
        }

        impl FromStr for Operation {
            type Err = ConfigError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($variant) => Ok(Operation::$variant),)+
                    other => Err(ConfigError::UnknownOperation {
                        name: other.to_string(),
                    }),
                }
            }
        }
    };
}

operations! {
    Search,
    Coins,
    CirculatingSupply,
    ActiveAddressesCount,
    EpochsCount,
    Epochs,
    LastEpoch,
    Epoch,
    EpochBlocksCount,
    EpochBlocks,
    EpochFlipsCount,
    EpochFlips,
    EpochFlipStatesSummary,
    EpochIdentitiesCount,
    EpochIdentities,
    EpochIdentityStatesSummary,
    EpochIdentityStatesInterimSummary,
    EpochInvitesSummary,
    EpochTxsCount,
    EpochTxs,
    EpochRewardsSummary,
    EpochBadAuthorsCount,
    EpochBadAuthors,
    EpochIdentitiesRewards,
    EpochFundPayments,
    EpochRewardBounds,
    EpochIdentity,
    EpochIdentityRewards,
    LastBlock,
    BlockByHeight,
    BlockByHash,
    BlockTxs,
    Transaction,
    TransactionRaw,
    TransactionEvents,
    Identity,
    IdentityEpochs,
    IdentityFlips,
    Address,
    AddressTxs,
    BalancesCount,
    Balances,
    Flip,
    FlipEpochAdjacentFlips,
    FlipAddressAdjacentFlips,
    FlipEpochIdentityAdjacentFlips,
    Contract,
    OracleVotingContracts,
    OracleVotingContract,
    EstimatedOracleRewards,
    AddressContractTxBalanceUpdates,
    Upgrades,
    Upgrade,
    Token,
    TokenHolders,
    AddressTokens,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
