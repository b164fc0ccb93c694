//! Epoch REST API Routes
//!
//! Epoch listings and per-epoch aggregates: blocks, flips, identities,
//! transactions and rewards.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Router,
};
use ledgerline_core::{
    BadAuthor, BlockSummary, EpochDetail, EpochIdentity, EpochSummary, FlipSummary, FundPayment,
    IdentityRewards, InvitesSummary, Reward, RewardBounds, RewardsSummary, StrValueCount,
    TransactionSummary,
};
use serde::Deserialize;

use super::{split_values, ApiResponse, PageParams};
use crate::error::ApiResult;
use crate::state::{AppState, SharedAccessor};

// ============================================================================
// QUERY PARAMETERS
// ============================================================================

/// Identity state filters. Both are comma-separated lists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentityFilterParams {
    #[serde(default)]
    pub states: Option<String>,
    #[serde(default, rename = "prevStates", alias = "prevstates")]
    pub prev_states: Option<String>,
    #[serde(default, alias = "count")]
    pub limit: Option<u64>,
    #[serde(default, rename = "continuationToken", alias = "continuationtoken")]
    pub continuation_token: Option<String>,
}

impl IdentityFilterParams {
    fn page(&self) -> PageParams {
        PageParams {
            limit: self.limit,
            continuation_token: self.continuation_token.clone(),
        }
    }

    fn states(&self) -> Vec<String> {
        split_values(self.states.as_deref())
    }

    fn prev_states(&self) -> Vec<String> {
        split_values(self.prev_states.as_deref())
    }
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /api/epochs/count
pub async fn epochs_count(State(accessor): State<SharedAccessor>) -> ApiResult<ApiResponse<u64>> {
    Ok(ApiResponse::new(accessor.epochs_count().await?))
}

/// GET /api/epochs
pub async fn epochs(
    State(accessor): State<SharedAccessor>,
    Query(params): Query<PageParams>,
) -> ApiResult<ApiResponse<Vec<EpochSummary>>> {
    let page = accessor.epochs(params.count()?, params.token()).await?;
    Ok(ApiResponse::page(page))
}

/// GET /api/epoch/last
pub async fn last_epoch(State(accessor): State<SharedAccessor>) -> ApiResult<ApiResponse<EpochDetail>> {
    Ok(ApiResponse::new(accessor.last_epoch().await?))
}

/// GET /api/epoch/:epoch
pub async fn epoch(
    State(accessor): State<SharedAccessor>,
    Path(epoch): Path<u64>,
) -> ApiResult<ApiResponse<EpochDetail>> {
    Ok(ApiResponse::new(accessor.epoch(epoch).await?))
}

/// GET /api/epoch/:epoch/blocks/count
pub async fn epoch_blocks_count(
    State(accessor): State<SharedAccessor>,
    Path(epoch): Path<u64>,
) -> ApiResult<ApiResponse<u64>> {
    Ok(ApiResponse::new(accessor.epoch_blocks_count(epoch).await?))
}

/// GET /api/epoch/:epoch/blocks
pub async fn epoch_blocks(
    State(accessor): State<SharedAccessor>,
    Path(epoch): Path<u64>,
    Query(params): Query<PageParams>,
) -> ApiResult<ApiResponse<Vec<BlockSummary>>> {
    let page = accessor
        .epoch_blocks(epoch, params.count()?, params.token())
        .await?;
    Ok(ApiResponse::page(page))
}

/// GET /api/epoch/:epoch/flips/count
pub async fn epoch_flips_count(
    State(accessor): State<SharedAccessor>,
    Path(epoch): Path<u64>,
) -> ApiResult<ApiResponse<u64>> {
    Ok(ApiResponse::new(accessor.epoch_flips_count(epoch).await?))
}

/// GET /api/epoch/:epoch/flips
pub async fn epoch_flips(
    State(accessor): State<SharedAccessor>,
    Path(epoch): Path<u64>,
    Query(params): Query<PageParams>,
) -> ApiResult<ApiResponse<Vec<FlipSummary>>> {
    let page = accessor
        .epoch_flips(epoch, params.count()?, params.token())
        .await?;
    Ok(ApiResponse::page(page))
}

/// GET /api/epoch/:epoch/flipstatessummary
pub async fn epoch_flip_states_summary(
    State(accessor): State<SharedAccessor>,
    Path(epoch): Path<u64>,
) -> ApiResult<ApiResponse<Vec<StrValueCount>>> {
    Ok(ApiResponse::new(
        accessor.epoch_flip_states_summary(epoch).await?,
    ))
}

/// GET /api/epoch/:epoch/identities/count
pub async fn epoch_identities_count(
    State(accessor): State<SharedAccessor>,
    Path(epoch): Path<u64>,
    Query(params): Query<IdentityFilterParams>,
) -> ApiResult<ApiResponse<u64>> {
    let count = accessor
        .epoch_identities_count(epoch, &params.prev_states(), &params.states())
        .await?;
    Ok(ApiResponse::new(count))
}

/// GET /api/epoch/:epoch/identities
pub async fn epoch_identities(
    State(accessor): State<SharedAccessor>,
    Path(epoch): Path<u64>,
    Query(params): Query<IdentityFilterParams>,
) -> ApiResult<ApiResponse<Vec<EpochIdentity>>> {
    let paging = params.page();
    let page = accessor
        .epoch_identities(
            epoch,
            &params.prev_states(),
            &params.states(),
            paging.count()?,
            paging.token(),
        )
        .await?;
    Ok(ApiResponse::page(page))
}

/// GET /api/epoch/:epoch/identitystatessummary
pub async fn epoch_identity_states_summary(
    State(accessor): State<SharedAccessor>,
    Path(epoch): Path<u64>,
) -> ApiResult<ApiResponse<Vec<StrValueCount>>> {
    Ok(ApiResponse::new(
        accessor.epoch_identity_states_summary(epoch).await?,
    ))
}

/// GET /api/epoch/:epoch/identitystatesinterimsummary
pub async fn epoch_identity_states_interim_summary(
    State(accessor): State<SharedAccessor>,
    Path(epoch): Path<u64>,
) -> ApiResult<ApiResponse<Vec<StrValueCount>>> {
    Ok(ApiResponse::new(
        accessor.epoch_identity_states_interim_summary(epoch).await?,
    ))
}

/// GET /api/epoch/:epoch/invitessummary
pub async fn epoch_invites_summary(
    State(accessor): State<SharedAccessor>,
    Path(epoch): Path<u64>,
) -> ApiResult<ApiResponse<InvitesSummary>> {
    Ok(ApiResponse::new(accessor.epoch_invites_summary(epoch).await?))
}

/// GET /api/epoch/:epoch/txs/count
pub async fn epoch_txs_count(
    State(accessor): State<SharedAccessor>,
    Path(epoch): Path<u64>,
) -> ApiResult<ApiResponse<u64>> {
    Ok(ApiResponse::new(accessor.epoch_txs_count(epoch).await?))
}

/// GET /api/epoch/:epoch/txs
pub async fn epoch_txs(
    State(accessor): State<SharedAccessor>,
    Path(epoch): Path<u64>,
    Query(params): Query<PageParams>,
) -> ApiResult<ApiResponse<Vec<TransactionSummary>>> {
    let page = accessor
        .epoch_txs(epoch, params.count()?, params.token())
        .await?;
    Ok(ApiResponse::page(page))
}

/// GET /api/epoch/:epoch/rewardssummary
pub async fn epoch_rewards_summary(
    State(accessor): State<SharedAccessor>,
    Path(epoch): Path<u64>,
) -> ApiResult<ApiResponse<RewardsSummary>> {
    Ok(ApiResponse::new(accessor.epoch_rewards_summary(epoch).await?))
}

/// GET /api/epoch/:epoch/authors/bad/count
pub async fn epoch_bad_authors_count(
    State(accessor): State<SharedAccessor>,
    Path(epoch): Path<u64>,
) -> ApiResult<ApiResponse<u64>> {
    Ok(ApiResponse::new(
        accessor.epoch_bad_authors_count(epoch).await?,
    ))
}

/// GET /api/epoch/:epoch/authors/bad
pub async fn epoch_bad_authors(
    State(accessor): State<SharedAccessor>,
    Path(epoch): Path<u64>,
    Query(params): Query<PageParams>,
) -> ApiResult<ApiResponse<Vec<BadAuthor>>> {
    let page = accessor
        .epoch_bad_authors(epoch, params.count()?, params.token())
        .await?;
    Ok(ApiResponse::page(page))
}

/// GET /api/epoch/:epoch/identityrewards
pub async fn epoch_identities_rewards(
    State(accessor): State<SharedAccessor>,
    Path(epoch): Path<u64>,
    Query(params): Query<PageParams>,
) -> ApiResult<ApiResponse<Vec<IdentityRewards>>> {
    let page = accessor
        .epoch_identities_rewards(epoch, params.count()?, params.token())
        .await?;
    Ok(ApiResponse::page(page))
}

/// GET /api/epoch/:epoch/fundpayments
pub async fn epoch_fund_payments(
    State(accessor): State<SharedAccessor>,
    Path(epoch): Path<u64>,
) -> ApiResult<ApiResponse<Vec<FundPayment>>> {
    Ok(ApiResponse::new(accessor.epoch_fund_payments(epoch).await?))
}

/// GET /api/epoch/:epoch/rewardbounds
pub async fn epoch_reward_bounds(
    State(accessor): State<SharedAccessor>,
    Path(epoch): Path<u64>,
) -> ApiResult<ApiResponse<Vec<RewardBounds>>> {
    Ok(ApiResponse::new(accessor.epoch_reward_bounds(epoch).await?))
}

/// GET /api/epoch/:epoch/identity/:address
pub async fn epoch_identity(
    State(accessor): State<SharedAccessor>,
    Path((epoch, address)): Path<(u64, String)>,
) -> ApiResult<ApiResponse<EpochIdentity>> {
    Ok(ApiResponse::new(
        accessor.epoch_identity(epoch, &address).await?,
    ))
}

/// GET /api/epoch/:epoch/identity/:address/rewards
pub async fn epoch_identity_rewards(
    State(accessor): State<SharedAccessor>,
    Path((epoch, address)): Path<(u64, String)>,
) -> ApiResult<ApiResponse<Vec<Reward>>> {
    Ok(ApiResponse::new(
        accessor.epoch_identity_rewards(epoch, &address).await?,
    ))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/epochs/count", get(epochs_count))
        .route("/epochs", get(epochs))
        .route("/epoch/last", get(last_epoch))
        .route("/epoch/:epoch", get(epoch))
        .route("/epoch/:epoch/blocks/count", get(epoch_blocks_count))
        .route("/epoch/:epoch/blocks", get(epoch_blocks))
        .route("/epoch/:epoch/flips/count", get(epoch_flips_count))
        .route("/epoch/:epoch/flips", get(epoch_flips))
        .route(
            "/epoch/:epoch/flipstatessummary",
            get(epoch_flip_states_summary),
        )
        .route("/epoch/:epoch/identities/count", get(epoch_identities_count))
        .route("/epoch/:epoch/identities", get(epoch_identities))
        .route(
            "/epoch/:epoch/identitystatessummary",
            get(epoch_identity_states_summary),
        )
        .route(
            "/epoch/:epoch/identitystatesinterimsummary",
            get(epoch_identity_states_interim_summary),
        )
        .route("/epoch/:epoch/invitessummary", get(epoch_invites_summary))
        .route("/epoch/:epoch/txs/count", get(epoch_txs_count))
        .route("/epoch/:epoch/txs", get(epoch_txs))
        .route("/epoch/:epoch/rewardssummary", get(epoch_rewards_summary))
        .route("/epoch/:epoch/authors/bad/count", get(epoch_bad_authors_count))
        .route("/epoch/:epoch/authors/bad", get(epoch_bad_authors))
        .route("/epoch/:epoch/identityrewards", get(epoch_identities_rewards))
        .route("/epoch/:epoch/fundpayments", get(epoch_fund_payments))
        .route("/epoch/:epoch/rewardbounds", get(epoch_reward_bounds))
        .route("/epoch/:epoch/identity/:address", get(epoch_identity))
        .route(
            "/epoch/:epoch/identity/:address/rewards",
            get(epoch_identity_rewards),
        )
}
