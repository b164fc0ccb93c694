//! Identity and Address REST API Routes

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Router,
};
use ledgerline_core::{
    AddressInfo, ContractTxBalanceUpdate, EpochIdentity, FlipSummary, Identity, TokenBalance,
    TransactionSummary,
};

use super::{ApiResponse, PageParams};
use crate::error::ApiResult;
use crate::state::{AppState, SharedAccessor};

// ============================================================================
// IDENTITY
// ============================================================================

/// GET /api/identity/:address
pub async fn identity(
    State(accessor): State<SharedAccessor>,
    Path(address): Path<String>,
) -> ApiResult<ApiResponse<Identity>> {
    Ok(ApiResponse::new(accessor.identity(&address).await?))
}

/// GET /api/identity/:address/epochs
pub async fn identity_epochs(
    State(accessor): State<SharedAccessor>,
    Path(address): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<ApiResponse<Vec<EpochIdentity>>> {
    let page = accessor
        .identity_epochs(&address, params.count()?, params.token())
        .await?;
    Ok(ApiResponse::page(page))
}

/// GET /api/identity/:address/flips
pub async fn identity_flips(
    State(accessor): State<SharedAccessor>,
    Path(address): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<ApiResponse<Vec<FlipSummary>>> {
    let page = accessor
        .identity_flips(&address, params.count()?, params.token())
        .await?;
    Ok(ApiResponse::page(page))
}

// ============================================================================
// ADDRESS
// ============================================================================

/// GET /api/address/:address
pub async fn address(
    State(accessor): State<SharedAccessor>,
    Path(address): Path<String>,
) -> ApiResult<ApiResponse<AddressInfo>> {
    Ok(ApiResponse::new(accessor.address(&address).await?))
}

/// GET /api/address/:address/txs
pub async fn address_txs(
    State(accessor): State<SharedAccessor>,
    Path(address): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<ApiResponse<Vec<TransactionSummary>>> {
    let page = accessor
        .address_txs(&address, params.count()?, params.token())
        .await?;
    Ok(ApiResponse::page(page))
}

/// GET /api/address/:address/tokens
pub async fn address_tokens(
    State(accessor): State<SharedAccessor>,
    Path(address): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<ApiResponse<Vec<TokenBalance>>> {
    let page = accessor
        .address_tokens(&address, params.count()?, params.token())
        .await?;
    Ok(ApiResponse::page(page))
}

/// GET /api/address/:address/contract/:contract/balanceupdates
pub async fn address_contract_balance_updates(
    State(accessor): State<SharedAccessor>,
    Path((address, contract)): Path<(String, String)>,
    Query(params): Query<PageParams>,
) -> ApiResult<ApiResponse<Vec<ContractTxBalanceUpdate>>> {
    let page = accessor
        .address_contract_tx_balance_updates(
            &address,
            &contract,
            params.count()?,
            params.token(),
        )
        .await?;
    Ok(ApiResponse::page(page))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/identity/:address", get(identity))
        .route("/identity/:address/epochs", get(identity_epochs))
        .route("/identity/:address/flips", get(identity_flips))
        .route("/address/:address", get(address))
        .route("/address/:address/txs", get(address_txs))
        .route("/address/:address/tokens", get(address_tokens))
        .route(
            "/address/:address/contract/:contract/balanceupdates",
            get(address_contract_balance_updates),
        )
}
