//! Health Check Endpoint
//!
//! `/health` reports liveness plus a summary of the admission lanes, the
//! response cache and the tracked epoch. It is served outside admission so
//! an overloaded gateway still answers it.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::admission::{AdmissionLane, AdmissionSnapshot};
use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Serving, but the epoch has not been observed yet.
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epoch: Option<u64>,
    pub admission: AdmissionHealth,
    pub cache: CacheHealth,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionHealth {
    pub standard_in_flight: usize,
    pub standard_capacity: usize,
    pub heavy_in_flight: usize,
    pub tracked_clients: usize,
    pub totals: AdmissionSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheHealth {
    pub stores: usize,
    pub entries: usize,
    pub clears: u64,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let admission = &state.admission;
    let snapshot = state.registry.snapshot();
    let epoch = state.tracker.current().map(|marker| marker.epoch);

    let response = HealthResponse {
        status: if epoch.is_some() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        epoch,
        admission: AdmissionHealth {
            standard_in_flight: admission.in_flight(AdmissionLane::Standard),
            standard_capacity: admission.capacity(AdmissionLane::Standard),
            heavy_in_flight: admission.in_flight(AdmissionLane::HeavyLookup),
            tracked_clients: admission.tracked_clients(),
            totals: admission.stats(),
        },
        cache: CacheHealth {
            stores: snapshot.len(),
            entries: snapshot.iter().map(|s| s.entries).sum(),
            clears: state.registry.clear_count(),
        },
    };

    (StatusCode::OK, Json(response))
}
