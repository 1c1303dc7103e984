//! Domain models for the task dependency graph.

pub mod audit;
pub mod config;
pub mod dependency;
pub mod task;

pub use audit::{AuditAction, AuditRecord};
pub use config::{
    AuditConfig, Config, DatabaseConfig, LoggingConfig, ServerConfig, TenancyConfig,
};
pub use dependency::{
    parse_task_id, CreateDependencyRequest, DeleteDependencyRequest, DependencyEdge,
    DependencyEntry, DependencyView, EdgeKey, TenantContext, UNKNOWN_TASK_TEXT,
};
pub use task::{TaskRef, TaskStatus};
