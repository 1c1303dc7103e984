//! Dependency graph services.

pub mod cycle_guard;
pub mod dependency_query_service;
pub mod dependency_service;

pub use cycle_guard::{CycleCheck, CycleGuard};
pub use dependency_query_service::DependencyQueryService;
pub use dependency_service::{DependencyService, TenantLocks};
