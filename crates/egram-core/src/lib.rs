//! Shared plumbing for E-Gram Panchayat services: configuration loading, tracing setup,
//! health probes, request-id middleware and wire-format helpers.

pub mod config;
pub mod health;
pub mod middleware;
pub mod serde;
pub mod tracing;
