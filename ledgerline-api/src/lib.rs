//! Ledgerline API - Read Gateway for the Chain Indexer
//!
//! Public HTTP front end of the indexer database. Every `/api` request goes
//! through per-client rate limiting and a two-lane concurrency limit before
//! it reaches a handler; handlers read through a response cache that is
//! dropped whenever a new epoch begins.
//!
//! The database itself is opaque: deployments hand [`Gateway`] an
//! `Accessor` implementation and get a service to serve.

pub mod admission;
pub mod config;
pub mod constants;
pub mod error;
pub mod indexer;
pub mod jobs;
pub mod macros;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use admission::{
    AdmissionConfig, AdmissionController, AdmissionLane, ClientId, Rejection, RouteClassifier,
    Ticket,
};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use indexer::IndexerClient;
pub use middleware::{admission_middleware, extract_client_id};
pub use routes::{create_gateway_router, ApiResponse, GatewayService, PageParams};
pub use server::{Gateway, GatewayHandle};
pub use state::AppState;
