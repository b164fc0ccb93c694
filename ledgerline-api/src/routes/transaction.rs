//! Transaction REST API Routes
//!
//! Mined transactions come from the accessor. Pending ones are read through
//! the optional mempool source; without one those routes answer 503.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Router,
};
use ledgerline_core::{MemPool, RawTransaction, TransactionDetail, TransactionSummary, TxEvent};
use std::sync::Arc;

use super::{ApiResponse, PageParams};
use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, SharedAccessor, SharedMemPool};

fn require_mempool(mempool: SharedMemPool) -> ApiResult<Arc<dyn MemPool>> {
    mempool.ok_or_else(|| ApiError::service_unavailable("Mempool source is not configured"))
}

/// GET /api/transaction/:hash
pub async fn transaction(
    State(accessor): State<SharedAccessor>,
    Path(hash): Path<String>,
) -> ApiResult<ApiResponse<TransactionDetail>> {
    Ok(ApiResponse::new(accessor.transaction(&hash).await?))
}

/// GET /api/transaction/:hash/raw
pub async fn transaction_raw(
    State(accessor): State<SharedAccessor>,
    Path(hash): Path<String>,
) -> ApiResult<ApiResponse<RawTransaction>> {
    Ok(ApiResponse::new(accessor.transaction_raw(&hash).await?))
}

/// GET /api/transaction/:hash/events
pub async fn transaction_events(
    State(accessor): State<SharedAccessor>,
    Path(hash): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<ApiResponse<Vec<TxEvent>>> {
    let page = accessor
        .transaction_events(&hash, params.count()?, params.token())
        .await?;
    Ok(ApiResponse::page(page))
}

/// GET /api/mempool/txs
pub async fn mempool_txs(
    State(mempool): State<SharedMemPool>,
    Query(params): Query<PageParams>,
) -> ApiResult<ApiResponse<Vec<TransactionSummary>>> {
    let count = params.count()?;
    let mempool = require_mempool(mempool)?;
    Ok(ApiResponse::new(mempool.transactions(count).await?))
}

/// GET /api/mempool/transaction/:hash
pub async fn mempool_transaction(
    State(mempool): State<SharedMemPool>,
    Path(hash): Path<String>,
) -> ApiResult<ApiResponse<TransactionDetail>> {
    let mempool = require_mempool(mempool)?;
    Ok(ApiResponse::new(mempool.transaction(&hash).await?))
}

/// GET /api/mempool/transaction/:hash/raw
pub async fn mempool_transaction_raw(
    State(mempool): State<SharedMemPool>,
    Path(hash): Path<String>,
) -> ApiResult<ApiResponse<RawTransaction>> {
    let mempool = require_mempool(mempool)?;
    Ok(ApiResponse::new(mempool.transaction_raw(&hash).await?))
}

/// GET /api/address/:address/mempool/txs
pub async fn address_mempool_txs(
    State(mempool): State<SharedMemPool>,
    Path(address): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<ApiResponse<Vec<TransactionSummary>>> {
    let count = params.count()?;
    let mempool = require_mempool(mempool)?;
    Ok(ApiResponse::new(
        mempool.address_transactions(&address, count).await?,
    ))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/transaction/:hash", get(transaction))
        .route("/transaction/:hash/raw", get(transaction_raw))
        .route("/transaction/:hash/events", get(transaction_events))
        .route("/mempool/txs", get(mempool_txs))
        .route("/mempool/transaction/:hash", get(mempool_transaction))
        .route("/mempool/transaction/:hash/raw", get(mempool_transaction_raw))
        .route("/address/:address/mempool/txs", get(address_mempool_txs))
}
