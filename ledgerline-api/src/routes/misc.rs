//! Chain-wide REST API Routes
//!
//! Search, coin supply, balances, upgrades, contracts and tokens.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Router,
};
use chrono::{Duration, Utc};
use ledgerline_core::{
    ActivatedUpgrade, Amount, AllCoins, Balance, Contract, Entity, EstimatedOracleReward,
    OracleVotingContract, Token, TokenBalance,
};
use serde::Deserialize;

use super::{split_values, ApiResponse, PageParams};
use crate::constants::ACTIVE_ADDRESSES_WINDOW_HOURS;
use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, SharedAccessor};

// ============================================================================
// QUERY PARAMETERS
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SupplyParams {
    /// Comma-separated addresses left out of the supply.
    #[serde(default)]
    pub exclude: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BalancesParams {
    #[serde(default, rename = "sortBy", alias = "sortby")]
    pub sort_by: Option<String>,
    #[serde(default, alias = "count")]
    pub limit: Option<u64>,
    #[serde(default, rename = "continuationToken", alias = "continuationtoken")]
    pub continuation_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OracleVotingParams {
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub oracle: Option<String>,
    #[serde(default)]
    pub states: Option<String>,
    #[serde(default)]
    pub all: Option<bool>,
    #[serde(default, rename = "sortBy", alias = "sortby")]
    pub sort_by: Option<String>,
    #[serde(default, alias = "count")]
    pub limit: Option<u64>,
    #[serde(default, rename = "continuationToken", alias = "continuationtoken")]
    pub continuation_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OracleParams {
    #[serde(default)]
    pub oracle: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitteeParams {
    #[serde(default, rename = "committeeSize", alias = "committeesize")]
    pub committee_size: Option<u64>,
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /api/search?value=
pub async fn search(
    State(accessor): State<SharedAccessor>,
    Query(params): Query<SearchParams>,
) -> ApiResult<ApiResponse<Vec<Entity>>> {
    let value = params
        .value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::missing_field("value"))?;
    Ok(ApiResponse::new(accessor.search(value).await?))
}

/// GET /api/coins
pub async fn coins(State(accessor): State<SharedAccessor>) -> ApiResult<ApiResponse<AllCoins>> {
    Ok(ApiResponse::new(accessor.coins().await?))
}

/// GET /api/circulatingsupply
pub async fn circulating_supply(
    State(accessor): State<SharedAccessor>,
    Query(params): Query<SupplyParams>,
) -> ApiResult<ApiResponse<Amount>> {
    let excluded = split_values(params.exclude.as_deref());
    Ok(ApiResponse::new(
        accessor.circulating_supply(&excluded).await?,
    ))
}

/// GET /api/activeaddresses/count - addresses active in the last 24 hours
pub async fn active_addresses_count(
    State(accessor): State<SharedAccessor>,
) -> ApiResult<ApiResponse<u64>> {
    let after = Utc::now() - Duration::hours(ACTIVE_ADDRESSES_WINDOW_HOURS);
    Ok(ApiResponse::new(
        accessor.active_addresses_count(after).await?,
    ))
}

/// GET /api/balances/count
pub async fn balances_count(State(accessor): State<SharedAccessor>) -> ApiResult<ApiResponse<u64>> {
    Ok(ApiResponse::new(accessor.balances_count().await?))
}

/// GET /api/balances
pub async fn balances(
    State(accessor): State<SharedAccessor>,
    Query(params): Query<BalancesParams>,
) -> ApiResult<ApiResponse<Vec<Balance>>> {
    let paging = PageParams {
        limit: params.limit,
        continuation_token: params.continuation_token.clone(),
    };
    let page = accessor
        .balances(params.sort_by.as_deref(), paging.count()?, paging.token())
        .await?;
    Ok(ApiResponse::page(page))
}

/// GET /api/upgrades
pub async fn upgrades(
    State(accessor): State<SharedAccessor>,
    Query(params): Query<PageParams>,
) -> ApiResult<ApiResponse<Vec<ActivatedUpgrade>>> {
    let page = accessor.upgrades(params.count()?, params.token()).await?;
    Ok(ApiResponse::page(page))
}

/// GET /api/upgrade/:upgrade
pub async fn upgrade(
    State(accessor): State<SharedAccessor>,
    Path(upgrade): Path<u64>,
) -> ApiResult<ApiResponse<ActivatedUpgrade>> {
    Ok(ApiResponse::new(accessor.upgrade(upgrade).await?))
}

/// GET /api/contract/:address
pub async fn contract(
    State(accessor): State<SharedAccessor>,
    Path(address): Path<String>,
) -> ApiResult<ApiResponse<Contract>> {
    Ok(ApiResponse::new(accessor.contract(&address).await?))
}

/// GET /api/oraclevotingcontracts
pub async fn oracle_voting_contracts(
    State(accessor): State<SharedAccessor>,
    Query(params): Query<OracleVotingParams>,
) -> ApiResult<ApiResponse<Vec<OracleVotingContract>>> {
    let paging = PageParams {
        limit: params.limit,
        continuation_token: params.continuation_token.clone(),
    };
    let states = split_values(params.states.as_deref());
    let page = accessor
        .oracle_voting_contracts(
            params.author.as_deref(),
            params.oracle.as_deref(),
            &states,
            params.all.unwrap_or(false),
            params.sort_by.as_deref(),
            paging.count()?,
            paging.token(),
        )
        .await?;
    Ok(ApiResponse::page(page))
}

/// GET /api/oraclevotingcontract/:address
pub async fn oracle_voting_contract(
    State(accessor): State<SharedAccessor>,
    Path(address): Path<String>,
    Query(params): Query<OracleParams>,
) -> ApiResult<ApiResponse<OracleVotingContract>> {
    Ok(ApiResponse::new(
        accessor
            .oracle_voting_contract(&address, params.oracle.as_deref())
            .await?,
    ))
}

/// GET /api/oraclevotingcontracts/estimatedreward?committeeSize=
pub async fn estimated_oracle_rewards(
    State(accessor): State<SharedAccessor>,
    Query(params): Query<CommitteeParams>,
) -> ApiResult<ApiResponse<Vec<EstimatedOracleReward>>> {
    let committee_size = params
        .committee_size
        .ok_or_else(|| ApiError::missing_field("committeeSize"))?;
    Ok(ApiResponse::new(
        accessor.estimated_oracle_rewards(committee_size).await?,
    ))
}

/// GET /api/token/:address
pub async fn token(
    State(accessor): State<SharedAccessor>,
    Path(address): Path<String>,
) -> ApiResult<ApiResponse<Token>> {
    Ok(ApiResponse::new(accessor.token(&address).await?))
}

/// GET /api/token/:address/holders
pub async fn token_holders(
    State(accessor): State<SharedAccessor>,
    Path(address): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<ApiResponse<Vec<TokenBalance>>> {
    let page = accessor
        .token_holders(&address, params.count()?, params.token())
        .await?;
    Ok(ApiResponse::page(page))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/search", get(search))
        .route("/coins", get(coins))
        .route("/circulatingsupply", get(circulating_supply))
        .route("/activeaddresses/count", get(active_addresses_count))
        .route("/balances/count", get(balances_count))
        .route("/balances", get(balances))
        .route("/upgrades", get(upgrades))
        .route("/upgrade/:upgrade", get(upgrade))
        .route("/contract/:address", get(contract))
        .route("/oraclevotingcontracts", get(oracle_voting_contracts))
        .route(
            "/oraclevotingcontracts/estimatedreward",
            get(estimated_oracle_rewards),
        )
        .route("/oraclevotingcontract/:address", get(oracle_voting_contract))
        .route("/token/:address", get(token))
        .route("/token/:address/holders", get(token_holders))
}
