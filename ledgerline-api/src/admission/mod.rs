//! Request Admission
//!
//! Per-client rate windows, route classification into lanes and the
//! controller that combines them.

pub mod classifier;
pub mod controller;
pub mod rate_window;

pub use classifier::{AdmissionLane, RouteClassifier};
pub use controller::{
    AdmissionConfig, AdmissionController, AdmissionSnapshot, AdmissionStats, Rejection, Ticket,
};
pub use rate_window::{ClientId, RateLimiter, RateWindow};
