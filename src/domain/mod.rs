//! Domain layer for the task dependency service
//!
//! This module contains core business rules, models and port traits.

pub mod errors;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use errors::{DomainError, DomainResult};
