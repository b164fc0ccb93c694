//! REST API Routes
//!
//! Read-only routes over the indexed chain data. Every route is registered
//! lower-case: request paths are lower-cased before routing, so clients may
//! use any casing (`/api/Epoch/Last` and `/api/epoch/last` are the same).
//!
//! Successful responses use the envelope
//! `{"result": ..., "continuationToken": ...}`; errors use `{"error": ...}`.

pub mod block;
pub mod epoch;
pub mod flip;
pub mod health;
pub mod identity;
pub mod misc;
pub mod transaction;

use axum::{
    extract::Request,
    http::{header, uri::PathAndQuery, Method, Uri},
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use ledgerline_core::Page;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tower::util::MapRequest;
use tower::Layer;
use tower_http::cors::{Any, CorsLayer};

use crate::constants::{DEFAULT_CORS_MAX_AGE_SECS, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::error::{ApiError, ApiResult};
use crate::middleware::admission_middleware;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

// ============================================================================
// RESPONSE ENVELOPE
// ============================================================================

/// Successful response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub result: T,
    #[serde(
        rename = "continuationToken",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub continuation_token: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn new(result: T) -> Self {
        Self {
            result,
            continuation_token: None,
        }
    }
}

impl<T> ApiResponse<Vec<T>> {
    pub fn page(page: Page<T>) -> Self {
        Self {
            result: page.items,
            continuation_token: page.continuation_token,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

// ============================================================================
// QUERY PARAMETERS
// ============================================================================

/// Keyset pagination parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    #[serde(default, alias = "count")]
    pub limit: Option<u64>,
    #[serde(default, rename = "continuationToken", alias = "continuationtoken")]
    pub continuation_token: Option<String>,
}

impl PageParams {
    /// Requested page size, defaulted and bounded.
    pub fn count(&self) -> ApiResult<u64> {
        match self.limit {
            None => Ok(DEFAULT_PAGE_SIZE),
            Some(n) if (1..=MAX_PAGE_SIZE).contains(&n) => Ok(n),
            Some(_) => Err(ApiError::invalid_range("limit", 1, MAX_PAGE_SIZE)),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.continuation_token.as_deref()
    }
}

/// Split a comma-separated query value, dropping blanks.
pub(crate) fn split_values(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

// ============================================================================
// ROUTER
// ============================================================================

/// All `/api` routes, without admission or observability layers.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(misc::create_router())
        .merge(epoch::create_router())
        .merge(block::create_router())
        .merge(transaction::create_router())
        .merge(identity::create_router())
        .merge(flip::create_router())
}

/// Create the complete gateway router.
///
/// Execution order: CORS -> Observability -> Admission (`/api` only) -> Handler.
/// `/health` and `/metrics` bypass admission.
pub fn create_gateway_router(state: AppState) -> Router {
    let api = api_router().layer(from_fn_with_state(
        state.admission.clone(),
        admission_middleware,
    ));

    let router = Router::new()
        .nest("/api", api)
        .route("/health", get(health::health))
        .route("/metrics", get(metrics_handler))
        .layer(from_fn(observability_middleware));

    let router = if state.config.cors_enabled {
        router.layer(build_cors_layer())
    } else {
        router
    };

    router.with_state(state)
}

/// Any origin may read; the gateway serves public chain data.
fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::POST,
            Method::PUT,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .expose_headers([header::RETRY_AFTER])
        .max_age(Duration::from_secs(DEFAULT_CORS_MAX_AGE_SECS))
}

// ============================================================================
// CASE-INSENSITIVE PATHS
// ============================================================================

/// The gateway router behind the path lower-casing step.
pub type GatewayService = MapRequest<Router, fn(Request) -> Request>;

/// Lower-case the request path so routing ignores case. The query string is
/// left alone.
pub fn lowercase_path(mut request: Request) -> Request {
    let uri = request.uri();
    if !uri.path().bytes().any(|b| b.is_ascii_uppercase()) {
        return request;
    }

    let lowered = match uri.query() {
        Some(query) => format!("{}?{}", uri.path().to_ascii_lowercase(), query),
        None => uri.path().to_ascii_lowercase(),
    };

    let mut parts = uri.clone().into_parts();
    if let Ok(path_and_query) = lowered.parse::<PathAndQuery>() {
        parts.path_and_query = Some(path_and_query);
        if let Ok(uri) = Uri::from_parts(parts) {
            *request.uri_mut() = uri;
        }
    }
    request
}

/// Wrap a router so it matches paths case-insensitively.
pub fn case_insensitive(router: Router) -> GatewayService {
    tower::util::MapRequestLayer::new(lowercase_path as fn(Request) -> Request).layer(router)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_params_bounds() {
        assert_eq!(PageParams::default().count().unwrap(), DEFAULT_PAGE_SIZE);

        let params = PageParams {
            limit: Some(MAX_PAGE_SIZE),
            continuation_token: Some("40".to_string()),
        };
        assert_eq!(params.count().unwrap(), MAX_PAGE_SIZE);
        assert_eq!(params.token(), Some("40"));

        for bad in [0, MAX_PAGE_SIZE + 1] {
            let params = PageParams {
                limit: Some(bad),
                continuation_token: None,
            };
            assert!(params.count().is_err());
        }
    }

    #[test]
    fn test_envelope_omits_missing_token() -> Result<(), serde_json::Error> {
        let json = serde_json::to_value(ApiResponse::new(7u64))?;
        assert_eq!(json, serde_json::json!({ "result": 7 }));

        let page = Page::new(vec![1u64, 2], Some("2".to_string()));
        let json = serde_json::to_value(ApiResponse::page(page))?;
        assert_eq!(
            json,
            serde_json::json!({ "result": [1, 2], "continuationToken": "2" })
        );
        Ok(())
    }

    #[test]
    fn test_lowercase_path_keeps_query() {
        let request = Request::builder()
            .uri("/API/Epoch/Last?continuationToken=AbC")
            .body(axum::body::Body::empty())
            .unwrap();
        let request = lowercase_path(request);
        assert_eq!(request.uri().path(), "/api/epoch/last");
        assert_eq!(request.uri().query(), Some("continuationToken=AbC"));
    }

    #[test]
    fn test_split_values() {
        assert_eq!(
            split_values(Some("Human, Verified,,")),
            vec!["Human".to_string(), "Verified".to_string()]
        );
        assert!(split_values(None).is_empty());
    }
}
