//! Flip REST API Routes
//!
//! The three adjacent-flip lookups are the expensive queries that run in the
//! heavy admission lane.

use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use ledgerline_core::{AdjacentStrValues, FlipDetail};

use super::ApiResponse;
use crate::error::ApiResult;
use crate::state::{AppState, SharedAccessor};

/// GET /api/flip/:hash
pub async fn flip(
    State(accessor): State<SharedAccessor>,
    Path(hash): Path<String>,
) -> ApiResult<ApiResponse<FlipDetail>> {
    Ok(ApiResponse::new(accessor.flip(&hash).await?))
}

/// GET /api/flip/:hash/epoch/adjacentflips
pub async fn flip_epoch_adjacent_flips(
    State(accessor): State<SharedAccessor>,
    Path(hash): Path<String>,
) -> ApiResult<ApiResponse<AdjacentStrValues>> {
    Ok(ApiResponse::new(
        accessor.flip_epoch_adjacent_flips(&hash).await?,
    ))
}

/// GET /api/flip/:hash/address/adjacentflips
pub async fn flip_address_adjacent_flips(
    State(accessor): State<SharedAccessor>,
    Path(hash): Path<String>,
) -> ApiResult<ApiResponse<AdjacentStrValues>> {
    Ok(ApiResponse::new(
        accessor.flip_address_adjacent_flips(&hash).await?,
    ))
}

/// GET /api/flip/:hash/epochidentity/adjacentflips
pub async fn flip_epoch_identity_adjacent_flips(
    State(accessor): State<SharedAccessor>,
    Path(hash): Path<String>,
) -> ApiResult<ApiResponse<AdjacentStrValues>> {
    Ok(ApiResponse::new(
        accessor.flip_epoch_identity_adjacent_flips(&hash).await?,
    ))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/flip/:hash", get(flip))
        .route(
            "/flip/:hash/epoch/adjacentflips",
            get(flip_epoch_adjacent_flips),
        )
        .route(
            "/flip/:hash/address/adjacentflips",
            get(flip_address_adjacent_flips),
        )
        .route(
            "/flip/:hash/epochidentity/adjacentflips",
            get(flip_epoch_identity_adjacent_flips),
        )
}
