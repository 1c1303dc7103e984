//! taskdeps - task dependency graph service
//!
//! Stores "blocker must finish before blocked" edges between todo items and
//! guarantees the graph stays acyclic, including under concurrent writers.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, errors and the store/audit ports
//! - **Service Layer** (`services`): cycle guard, graph queries and mutations
//! - **Adapters** (`adapters`): SQLite and in-memory stores, HTTP API
//! - **Infrastructure Layer** (`infrastructure`): configuration, logging, audit sinks
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use taskdeps::adapters::sqlite::{initialize_database, SqliteDependencyRepository};
//! use taskdeps::domain::models::{CreateDependencyRequest, TenantContext};
//! use taskdeps::services::DependencyService;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pool = initialize_database("sqlite:deps.db", None).await?;
//!     let service = DependencyService::new(Arc::new(SqliteDependencyRepository::new(pool)));
//!     let request = CreateDependencyRequest::new(
//!         "6f1c2d3e-4a5b-4c6d-8e7f-0123456789ab",
//!         "0b7e8f9a-1c2d-4e3f-a4b5-c6d7e8f90a1b",
//!     );
//!     service.create_dependency(request, &TenantContext::default()).await?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    Config, CreateDependencyRequest, DeleteDependencyRequest, DependencyEdge, DependencyView, TaskRef,
    TaskStatus, TenantContext,
};
pub use domain::ports::{AuditSink, DependencyRepository};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{CycleGuard, DependencyQueryService, DependencyService};
