//! Request middleware for the gateway.

pub mod admission;

pub use admission::{admission_middleware, extract_client_id};
