//! Domain read models
//!
//! Shapes returned by the `Accessor` surface. Monetary amounts are kept as
//! decimal strings so no precision is lost between the store and the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Decimal amount rendered as a string.
pub type Amount = String;

// ============================================================================
// SEARCH & COINS
// ============================================================================

/// A search hit: the kind of entity and its identifier.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllCoins {
    pub burnt: Amount,
    pub minted: Amount,
    pub total_balance: Amount,
    pub total_stake: Amount,
}

// ============================================================================
// EPOCHS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochSummary {
    pub epoch: u64,
    pub validation_time: Option<Timestamp>,
    pub valid_flips: u32,
    pub qualified_flips: u32,
    pub block_count: u32,
    pub tx_count: u32,
    pub min_score_for_invite: f32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochDetail {
    pub epoch: u64,
    pub validation_time: Timestamp,
    pub validation_first_block_height: u64,
    pub state_root: String,
    pub discrimination_stake_threshold: Option<Amount>,
}

/// A value with the number of times it occurs; used by state summaries.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrValueCount {
    pub value: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitesSummary {
    pub all_count: u64,
    pub used_count: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardsSummary {
    pub epoch: u64,
    pub total: Amount,
    pub validation: Amount,
    pub flips: Amount,
    pub invitations: Amount,
    pub foundation: Amount,
    pub zero_wallet: Amount,
    pub validation_share: Option<Amount>,
    pub flips_share: Option<Amount>,
    pub invitations_share: Option<Amount>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadAuthor {
    pub address: String,
    pub reason: String,
    pub prev_state: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    pub balance: Amount,
    pub stake: Amount,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRewards {
    pub address: String,
    pub prev_state: String,
    pub state: String,
    pub age: u16,
    pub rewards: Vec<Reward>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundPayment {
    pub address: String,
    pub balance: Amount,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardBound {
    pub amount: Amount,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardBounds {
    #[serde(rename = "type")]
    pub kind: u8,
    pub min: RewardBound,
    pub max: RewardBound,
}

/// An identity's participation in one epoch.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochIdentity {
    pub address: String,
    pub epoch: u64,
    pub prev_state: String,
    pub state: String,
    pub short_answers_score: Option<f32>,
    pub long_answers_score: Option<f32>,
    pub total_short_answers_score: Option<f32>,
    pub made_flips: u8,
    pub available_flips: u8,
    pub total_validation_reward: Amount,
    pub birth_epoch: u64,
}

// ============================================================================
// BLOCKS & TRANSACTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSummary {
    pub height: u64,
    pub hash: String,
    pub timestamp: Option<Timestamp>,
    pub tx_count: u16,
    pub proposer: String,
    pub size: u64,
    pub flags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDetail {
    pub epoch: u64,
    pub height: u64,
    pub hash: String,
    pub timestamp: Option<Timestamp>,
    pub tx_count: u16,
    pub proposer: String,
    pub proposer_vrf_score: Option<f64>,
    pub size: u64,
    pub full_size: u64,
    pub body_size: u64,
    pub flags: Vec<String>,
    pub upgrade: Option<u32>,
    pub fee_rate: Amount,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub hash: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: Option<Timestamp>,
    pub from: String,
    pub to: Option<String>,
    pub amount: Amount,
    pub tips: Amount,
    pub max_fee: Amount,
    pub fee: Amount,
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDetail {
    pub epoch: u64,
    pub block_height: u64,
    pub block_hash: String,
    pub hash: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: Option<Timestamp>,
    pub from: String,
    pub to: Option<String>,
    pub amount: Amount,
    pub tips: Amount,
    pub max_fee: Amount,
    pub fee: Amount,
    pub size: u32,
    pub nonce: u32,
    pub success: Option<bool>,
    pub error: Option<String>,
}

/// Hex-encoded signed transaction bytes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawTransaction(pub String);

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxEvent {
    pub event_name: String,
    pub data: Vec<String>,
}

// ============================================================================
// IDENTITIES & ADDRESSES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub address: String,
    pub state: String,
    pub prev_state: String,
    pub made_flips: u32,
    pub qualified_flips: u32,
    pub total_short_answers_score: Option<f32>,
    pub total_validation_reward: Amount,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInfo {
    pub address: String,
    pub balance: Amount,
    pub stake: Amount,
    pub tx_count: u64,
    pub flips_count: u64,
    pub reported_flips_count: u64,
    pub token_count: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub address: String,
    pub balance: Amount,
    pub stake: Amount,
}

// ============================================================================
// FLIPS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlipSummary {
    pub cid: String,
    pub author: String,
    pub epoch: u64,
    pub status: String,
    pub answer: String,
    pub short_resp_count: u32,
    pub long_resp_count: u32,
    pub timestamp: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlipDetail {
    pub author: String,
    pub epoch: u64,
    pub tx_hash: String,
    pub block_hash: String,
    pub block_height: u64,
    pub timestamp: Option<Timestamp>,
    pub size: u32,
    pub status: String,
    pub answer: String,
    pub grade: Option<u8>,
}

/// One neighbour in an ordered sequence. `cycled` is set when the sequence
/// wrapped around to reach it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjacentStrValue {
    pub value: String,
    pub cycled: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjacentStrValues {
    pub prev: AdjacentStrValue,
    pub next: AdjacentStrValue,
}

// ============================================================================
// CONTRACTS, UPGRADES & TOKENS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub address: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub author: String,
    pub deploy_tx_hash: String,
    pub stake: Amount,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleVotingContract {
    pub contract_address: String,
    pub author: String,
    pub balance: Amount,
    pub state: String,
    pub fact: String,
    pub voting_min_payment: Option<Amount>,
    pub start_time: Option<Timestamp>,
    pub estimated_termination_time: Option<Timestamp>,
    pub votes_count: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimatedOracleReward {
    pub amount: Amount,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractTxBalanceUpdate {
    pub hash: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: Option<Timestamp>,
    pub from: String,
    pub contract_address: String,
    pub balance_change: Option<Amount>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivatedUpgrade {
    pub upgrade: u32,
    pub height: u64,
    pub hash: String,
    pub timestamp: Option<Timestamp>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub contract_address: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub address: String,
    pub balance: Amount,
    pub token: Option<Token>,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_summary_serializes_kind_as_type() {
        let tx = TransactionSummary {
            hash: "0xabc".to_string(),
            kind: "SendTx".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "SendTx");
        assert!(json.get("maxFee").is_some());
    }

    #[test]
    fn test_raw_transaction_is_transparent() {
        let raw = RawTransaction("0xdeadbeef".to_string());
        assert_eq!(serde_json::to_string(&raw).unwrap(), "\"0xdeadbeef\"");
    }

    #[test]
    fn test_adjacent_values_deserialize_from_camel_case() {
        let json = r#"{"prev":{"value":"a","cycled":true},"next":{"value":"b","cycled":false}}"#;
        let values: AdjacentStrValues = serde_json::from_str(json).unwrap();
        assert!(values.prev.cycled);
        assert_eq!(values.next.value, "b");
    }
}
