//! Gateway Assembly
//!
//! Wires an opaque [`Accessor`] into a running gateway: the response cache
//! in front of it, the epoch tracker that invalidates that cache, the
//! admission controller and the background jobs.
//!
//! ```ignore
//! let gateway = Gateway::new(accessor, ApiConfig::from_env())?;
//! let handle = gateway.start();
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:1234").await?;
//! handle.serve(listener).await?;
//! handle.shutdown().await;
//! ```

use axum::extract::Request;
use ledgerline_core::{Accessor, MemPool};
use ledgerline_storage::{AccessorEpochSource, CacheRegistry, CachingAccessor, EpochTracker};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::admission::AdmissionController;
use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::indexer::IndexerClient;
use crate::jobs::{
    cache_report_task, epoch_watch_task, rate_window_sweep_task, CacheReportConfig,
    EpochMetricsObserver, RateSweepConfig,
};
use crate::routes::{case_insensitive, create_gateway_router, GatewayService};
use crate::state::AppState;

// ============================================================================
// GATEWAY
// ============================================================================

/// A fully wired gateway that has not started its background jobs yet.
pub struct Gateway {
    state: AppState,
}

impl Gateway {
    /// Build a gateway over `accessor`. The mempool client is created from
    /// `LEDGERLINE_INDEXER_URL` when set.
    pub fn new(accessor: Arc<dyn Accessor>, config: ApiConfig) -> ApiResult<Self> {
        let mempool = IndexerClient::from_config(&config)?
            .map(|client| Arc::new(client) as Arc<dyn MemPool>);
        Self::with_mempool(accessor, mempool, config)
    }

    /// Build a gateway with an explicit mempool source.
    pub fn with_mempool(
        accessor: Arc<dyn Accessor>,
        mempool: Option<Arc<dyn MemPool>>,
        config: ApiConfig,
    ) -> ApiResult<Self> {
        config.validate()?;
        let registry = Arc::new(CacheRegistry::new(config.cache_policies()?));

        let mut caching = CachingAccessor::new(Arc::clone(&accessor), Arc::clone(&registry));
        if let Some(mempool) = &mempool {
            caching = caching.with_mempool(Arc::clone(mempool));
        }
        let caching = Arc::new(caching);

        // The tracker reads the uncached accessor so it sees new epochs.
        let source = Arc::new(AccessorEpochSource::new(accessor));
        let tracker = Arc::new(EpochTracker::new(source, config.epoch_tracker()));
        tracker.register(caching.clone());
        tracker.register(Arc::new(EpochMetricsObserver));

        let admission = Arc::new(AdmissionController::from_config(&config)?);

        tracing::info!(
            max_req_count = config.max_req_count,
            reqs_per_minute_limit = config.reqs_per_minute_limit,
            mempool = mempool.is_some(),
            "Gateway configured"
        );

        Ok(Self {
            state: AppState {
                accessor: caching,
                mempool,
                admission,
                registry,
                tracker,
                config: Arc::new(config),
                start_time: Instant::now(),
            },
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// The request service, without background jobs running.
    pub fn service(&self) -> GatewayService {
        case_insensitive(create_gateway_router(self.state.clone()))
    }

    /// Spawn the background jobs.
    pub fn start(self) -> GatewayHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state = self.state;

        let epoch_watch = tokio::spawn({
            let tracker = Arc::clone(&state.tracker);
            let rx = shutdown_rx.clone();
            async move {
                epoch_watch_task(tracker, rx).await;
            }
        });

        let cache_report = tokio::spawn({
            let registry = Arc::clone(&state.registry);
            let config = CacheReportConfig::from(state.config.as_ref());
            let rx = shutdown_rx.clone();
            async move {
                cache_report_task(registry, config, rx).await;
            }
        });

        let mut tasks = vec![epoch_watch, cache_report];

        if state.config.rate_limit_enabled() {
            tasks.push(tokio::spawn({
                let admission = Arc::clone(&state.admission);
                let config = RateSweepConfig::from(state.config.as_ref());
                let rx = shutdown_rx.clone();
                async move {
                    rate_window_sweep_task(admission, config, rx).await;
                }
            }));
        }

        tracing::info!(jobs = tasks.len(), "Gateway started");

        GatewayHandle {
            state,
            shutdown_tx,
            shutdown_rx,
            tasks,
        }
    }
}

// ============================================================================
// HANDLE
// ============================================================================

/// A started gateway. Dropping it without `shutdown` leaves the jobs running
/// until their sender side is dropped.
pub struct GatewayHandle {
    state: AppState,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl GatewayHandle {
    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn service(&self) -> GatewayService {
        case_insensitive(create_gateway_router(self.state.clone()))
    }

    /// Serve HTTP on `listener` until `shutdown` is called.
    pub async fn serve(&self, listener: TcpListener) -> ApiResult<()> {
        let addr = listener
            .local_addr()
            .map_err(|e| ApiError::internal_error(format!("Listener has no address: {}", e)))?;
        tracing::info!(%addr, "Serving gateway");

        let mut shutdown_rx = self.shutdown_rx.clone();
        let make_service = axum::ServiceExt::<Request>::into_make_service_with_connect_info::<
            SocketAddr,
        >(self.service());

        axum::serve(listener, make_service)
            .with_graceful_shutdown(async move {
                while !*shutdown_rx.borrow() {
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
            })
            .await
            .map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))
    }

    /// Signal every job and wait for them to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Background job failed");
            }
        }
        tracing::info!("Gateway stopped");
    }
}
