//! Admission Middleware
//!
//! Gatekeeper in front of every API route. Derives the caller identity,
//! asks the [`AdmissionController`] for a ticket and holds it while the
//! handler runs. Rejections become 429 (with `Retry-After`) or 503.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use uuid::Uuid;

use crate::admission::{AdmissionController, ClientId};
use crate::error::ApiError;

/// Extract the caller identity, considering proxy headers.
pub fn extract_client_id(request: &Request) -> ClientId {
    // X-Forwarded-For can contain multiple IPs, take the first one
    if let Some(ip) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok())
    {
        return ip.into();
    }

    if let Some(ip) = request
        .headers()
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.trim().parse::<IpAddr>().ok())
    {
        return ip.into();
    }

    // Fall back to connection IP
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| ClientId::from(addr.ip()))
        .unwrap_or_else(ClientId::unknown)
}

/// Admission middleware.
///
/// The ticket is released once the handler has produced its response, on
/// every path out of this function.
pub async fn admission_middleware(
    State(admission): State<Arc<AdmissionController>>,
    request: Request,
    next: Next,
) -> Response {
    let req_id = Uuid::now_v7();
    let client = extract_client_id(&request);
    let route = request.uri().path().to_lowercase();

    // Search terms may be personal data, keep them out of the logs.
    if route.contains("/search") {
        tracing::debug!(req_id = %req_id, client = %client, "Got api request");
    } else {
        tracing::debug!(req_id = %req_id, client = %client, url = %request.uri(), "Got api request");
    }

    let ticket = match admission.admit(&client, &route).await {
        Ok(ticket) => ticket,
        Err(rejection) => {
            tracing::warn!(
                req_id = %req_id,
                client = %client,
                reason = rejection.reason(),
                error = %rejection,
                "Unable to admit api request"
            );
            return ApiError::from(rejection).into_response();
        }
    };

    let response = next.run(request).await;
    admission.release(ticket);

    tracing::debug!(req_id = %req_id, status = response.status().as_u16(), "Completed api request");
    response
}
