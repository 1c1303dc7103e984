//! Domain errors for the task dependency service.

use thiserror::Error;
use uuid::Uuid;

/// Format a cycle path as a human-readable string: `A -> B -> C -> A`.
fn format_cycle_path(path: &[Uuid]) -> String {
    path.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Domain-level errors raised by the dependency services and store adapters.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Task not found: {0}")]
    TaskNotFound(Uuid),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Dependency would create a cycle: {}", format_cycle_path(.0))]
    DependencyCycle(Vec<Uuid>),

    #[error("Dependency already exists: {blocker_id} -> {blocked_id}")]
    DuplicateDependency { blocker_id: Uuid, blocked_id: Uuid },

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result alias used across the domain and services.
pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Whether the error was caused by the request rather than the system.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::DatabaseError(_) | Self::SerializationError(_))
    }

    /// Whether the error is one of the two conflict cases (cycle or duplicate).
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::DependencyCycle(_) | Self::DuplicateDependency { .. })
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
