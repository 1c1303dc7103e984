//! Port trait definitions (Hexagonal Architecture)
//!
//! Async trait interfaces that infrastructure adapters implement:
//! - DependencyRepository: edge storage and task lookups
//! - AuditSink: write-only audit trail for dependency mutations

pub mod audit_sink;
pub mod dependency_repository;

pub use audit_sink::{AuditSink, NullAuditSink};
pub use dependency_repository::DependencyRepository;
