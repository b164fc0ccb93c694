//! End-to-end tests for the assembled gateway: routing, envelope, error
//! mapping, caching and the background jobs, over an in-memory accessor.

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{header, StatusCode},
    response::Response,
};
use ledgerline_api::{ApiConfig, Gateway, GatewayService};
use ledgerline_test_utils::*;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn gateway(accessor: &Arc<RecordingAccessor>, config: ApiConfig) -> Gateway {
    Gateway::with_mempool(accessor.clone(), None, config).expect("gateway builds")
}

async fn get(service: &GatewayService, uri: &str) -> Response {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("valid request");
    service.clone().oneshot(request).await.expect("infallible")
}

async fn json(response: Response) -> Result<Value, String> {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .map_err(|e| e.to_string())?;
    serde_json::from_slice(&bytes).map_err(|e| e.to_string())
}

// ============================================================================
// ROUTING & ENVELOPE
// ============================================================================

#[tokio::test]
async fn test_paths_are_case_insensitive() -> Result<(), String> {
    let accessor = Arc::new(RecordingAccessor::new());
    let service = gateway(&accessor, ApiConfig::default()).service();

    let response = get(&service, "/API/Epoch/5").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await?;
    assert_eq!(body["result"]["epoch"], 5);

    let response = get(&service, "/api/epoch/5").await;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_paginated_envelope_carries_token() -> Result<(), String> {
    let accessor = Arc::new(RecordingAccessor::new());
    let service = gateway(&accessor, ApiConfig::default()).service();

    let body = json(get(&service, "/api/Epochs?limit=2&continuationToken=4").await).await?;
    let items = body["result"].as_array().ok_or("result is not an array")?;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["epoch"], 4);
    assert_eq!(body["continuationToken"], "6");
    Ok(())
}

#[tokio::test]
async fn test_oversized_page_is_rejected() -> Result<(), String> {
    let accessor = Arc::new(RecordingAccessor::new());
    let service = gateway(&accessor, ApiConfig::default()).service();

    let response = get(&service, "/api/epochs?limit=101").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json(response).await?;
    assert_eq!(body["error"]["code"], "INVALID_RANGE");
    assert_eq!(accessor.calls(Operation::Epochs), 0);
    Ok(())
}

#[tokio::test]
async fn test_search_requires_value() -> Result<(), String> {
    let accessor = Arc::new(RecordingAccessor::new());
    let service = gateway(&accessor, ApiConfig::default()).service();

    let response = get(&service, "/api/Search").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json(get(&service, "/api/Search?value=0xAbC").await).await?;
    assert_eq!(body["result"][0]["value"], "0xAbC");
    Ok(())
}

#[tokio::test]
async fn test_block_by_height_or_hash() -> Result<(), String> {
    let accessor = Arc::new(RecordingAccessor::new());
    let service = gateway(&accessor, ApiConfig::default()).service();

    let body = json(get(&service, "/api/Block/120").await).await?;
    assert_eq!(body["result"]["height"], 120);
    let body = json(get(&service, "/api/Block/0xbeef").await).await?;
    assert_eq!(body["result"]["hash"], "0xbeef");

    assert_eq!(accessor.calls(Operation::BlockByHeight), 1);
    assert_eq!(accessor.calls(Operation::BlockByHash), 1);
    Ok(())
}

// ============================================================================
// ERROR MAPPING
// ============================================================================

#[tokio::test]
async fn test_not_found_maps_to_404_and_is_cached() -> Result<(), String> {
    let accessor = Arc::new(RecordingAccessor::new());
    accessor.fail(Operation::Flip, LedgerError::not_found());
    let service = gateway(&accessor, ApiConfig::default()).service();

    for _ in 0..2 {
        let response = get(&service, "/api/Flip/0xabc").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json(response).await?;
        assert_eq!(body["error"]["code"], "ENTITY_NOT_FOUND");
    }
    assert_eq!(accessor.calls(Operation::Flip), 1);
    Ok(())
}

#[tokio::test]
async fn test_storage_failure_is_opaque_500() -> Result<(), String> {
    let accessor = Arc::new(RecordingAccessor::new());
    accessor.fail(
        Operation::Balances,
        StorageError::QueryFailed {
            query: "balances".to_string(),
            reason: "statement timeout".to_string(),
        }
        .into(),
    );
    let service = gateway(&accessor, ApiConfig::default()).service();

    let response = get(&service, "/api/Balances").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json(response).await?;
    assert_eq!(body["error"]["code"], "DATABASE_ERROR");
    let message = body["error"]["message"].as_str().unwrap_or_default();
    assert!(!message.contains("statement timeout"));
    Ok(())
}

#[tokio::test]
async fn test_rate_limited_client_gets_429_but_health_answers() -> Result<(), String> {
    let accessor = Arc::new(RecordingAccessor::new());
    let config = ApiConfig {
        reqs_per_minute_limit: 1,
        ..ApiConfig::default()
    };
    let service = gateway(&accessor, config).service();

    assert_eq!(get(&service, "/api/Upgrades").await.status(), StatusCode::OK);

    let limited = get(&service, "/api/Upgrades").await;
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(limited.headers().contains_key(header::RETRY_AFTER));

    let health = get(&service, "/health").await;
    assert_eq!(health.status(), StatusCode::OK);
    let body = json(health).await?;
    assert_eq!(body["admission"]["totals"]["rate_limited"], 1);
    Ok(())
}

#[test]
fn test_gateway_refuses_zero_rate_window() {
    let accessor = Arc::new(RecordingAccessor::new());
    let config = ApiConfig {
        reqs_per_minute_limit: 5,
        rate_window: Duration::ZERO,
        ..ApiConfig::default()
    };
    assert!(Gateway::with_mempool(accessor, None, config).is_err());
}

// ============================================================================
// CACHING
// ============================================================================

#[tokio::test]
async fn test_repeated_reads_hit_the_cache() -> Result<(), String> {
    let accessor = Arc::new(RecordingAccessor::new());
    let service = gateway(&accessor, ApiConfig::default()).service();

    let first = json(get(&service, "/api/Epoch/5/Identity/0xAA").await).await?;
    let second = json(get(&service, "/api/epoch/5/identity/0xaa").await).await?;
    assert_eq!(first, second);
    assert_eq!(accessor.calls(Operation::EpochIdentity), 1);

    // Different arguments are different entries.
    json(get(&service, "/api/Epoch/6/Identity/0xaa").await).await?;
    assert_eq!(accessor.calls(Operation::EpochIdentity), 2);
    Ok(())
}

#[tokio::test]
async fn test_transaction_events_are_paged_per_token() -> Result<(), String> {
    let accessor = Arc::new(RecordingAccessor::new());
    let service = gateway(&accessor, ApiConfig::default()).service();

    let body = json(get(&service, "/api/Transaction/0xabc/Events?limit=3").await).await?;
    let items = body["result"].as_array().ok_or("result is not an array")?;
    assert_eq!(items.len(), 3);
    assert_eq!(body["continuationToken"], "3");

    let next =
        json(get(&service, "/api/Transaction/0xabc/Events?limit=3&continuationToken=3").await)
            .await?;
    assert_eq!(next["result"][0]["eventName"], "event3");
    assert_eq!(accessor.calls(Operation::TransactionEvents), 2);

    json(get(&service, "/api/Transaction/0xabc/Events?limit=3&continuationToken=3").await).await?;
    assert_eq!(accessor.calls(Operation::TransactionEvents), 2);

    let response = get(&service, "/api/Transaction/0xabc/Events?limit=101").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_pending_transaction_served_from_mempool() -> Result<(), String> {
    let accessor = Arc::new(RecordingAccessor::new());
    accessor.fail(Operation::Transaction, LedgerError::not_found());
    let mempool = Arc::new(StaticMemPool::new().with_transaction(transaction_fixture("0xpending")));

    let service = Gateway::with_mempool(
        accessor.clone(),
        Some(mempool.clone() as Arc<dyn MemPool>),
        ApiConfig::default(),
    )
    .map_err(|e| e.to_string())?
    .service();

    let body = json(get(&service, "/api/Transaction/0xPending").await).await?;
    assert_eq!(body["result"]["hash"], "0xpending");

    json(get(&service, "/api/Transaction/0xpending").await).await?;
    assert_eq!(accessor.calls(Operation::Transaction), 1);
    assert_eq!(mempool.lookups(), 1);
    Ok(())
}

#[tokio::test]
async fn test_mempool_routes_need_a_source() {
    let accessor = Arc::new(RecordingAccessor::new());
    let service = gateway(&accessor, ApiConfig::default()).service();

    let response = get(&service, "/api/MemPool/Txs").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

// ============================================================================
// LIFECYCLE
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_new_epoch_invalidates_cached_responses() -> Result<(), String> {
    let accessor = Arc::new(RecordingAccessor::new());
    accessor.set_last_epoch(10, at_hour(0));

    let handle = gateway(&accessor, ApiConfig::default()).start();
    let service = handle.service();

    // Let the tracker take its baseline.
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(handle.state().tracker.current().map(|m| m.epoch), Some(10));

    get(&service, "/api/Epoch/5").await;
    get(&service, "/api/Epoch/5").await;
    assert_eq!(accessor.calls(Operation::Epoch), 1);

    accessor.set_last_epoch(11, at_hour(1));
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(handle.state().tracker.advances(), 1);

    get(&service, "/api/Epoch/5").await;
    assert_eq!(accessor.calls(Operation::Epoch), 2);

    handle.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_every_job() {
    let accessor = Arc::new(RecordingAccessor::new());
    let config = ApiConfig {
        reqs_per_minute_limit: 10,
        ..ApiConfig::default()
    };

    let handle = gateway(&accessor, config).start();
    tokio::time::sleep(Duration::from_secs(2)).await;

    tokio::time::timeout(Duration::from_secs(5), handle.shutdown())
        .await
        .expect("jobs stop promptly");
}

#[tokio::test]
async fn test_serve_answers_over_tcp() -> Result<(), String> {
    let accessor = Arc::new(RecordingAccessor::new());
    let handle = gateway(&accessor, ApiConfig::default()).start();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .map_err(|e| e.to_string())?;
    let addr = listener.local_addr().map_err(|e| e.to_string())?;

    let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        tokio::select! {
            served = handle.serve(listener) => served.map_err(|e| e.to_string())?,
            _ = done_rx => {}
        }
        handle.shutdown().await;
        Ok::<(), String>(())
    });

    let response = reqwest::get(format!("http://{}/API/Coins", addr))
        .await
        .map_err(|e| e.to_string())?;
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(accessor.calls(Operation::Coins), 1);

    let _ = done_tx.send(());
    server.await.map_err(|e| e.to_string())??;
    Ok(())
}
