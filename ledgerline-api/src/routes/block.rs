//! Block REST API Routes

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Router,
};
use ledgerline_core::{BlockDetail, TransactionSummary};

use super::{ApiResponse, PageParams};
use crate::error::ApiResult;
use crate::state::{AppState, SharedAccessor};

/// A block is addressed either by height or by hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockRef {
    Height(u64),
    Hash(String),
}

impl BlockRef {
    pub fn parse(id: &str) -> Self {
        match id.parse::<u64>() {
            Ok(height) => Self::Height(height),
            Err(_) => Self::Hash(id.to_string()),
        }
    }
}

/// GET /api/block/last
pub async fn last_block(State(accessor): State<SharedAccessor>) -> ApiResult<ApiResponse<BlockDetail>> {
    Ok(ApiResponse::new(accessor.last_block().await?))
}

/// GET /api/block/:id - by height or hash
pub async fn block(
    State(accessor): State<SharedAccessor>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<BlockDetail>> {
    let block = match BlockRef::parse(&id) {
        BlockRef::Height(height) => accessor.block_by_height(height).await?,
        BlockRef::Hash(hash) => accessor.block_by_hash(&hash).await?,
    };
    Ok(ApiResponse::new(block))
}

/// GET /api/block/:id/txs
pub async fn block_txs(
    State(accessor): State<SharedAccessor>,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<ApiResponse<Vec<TransactionSummary>>> {
    let page = accessor
        .block_txs(&id, params.count()?, params.token())
        .await?;
    Ok(ApiResponse::page(page))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/block/last", get(last_block))
        .route("/block/:id", get(block))
        .route("/block/:id/txs", get(block_txs))
}
