//! Repository port for dependency edges and the task lookups they need.
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{DependencyEdge, TaskRef};

/// Storage primitives over the `(blocker, blocked)` edge relation.
///
/// Implementations carry no business rules beyond what the storage layer
/// enforces itself (unique pairs, no self-loops, no cycle-closing insert).
/// Every call goes to the backing store; nothing is cached.
#[async_trait]
pub trait DependencyRepository: Send + Sync {
    /// All edges where `blocker_id == task_id`.
    async fn find_edges_by_blocker(&self, task_id: Uuid) -> DomainResult<Vec<DependencyEdge>>;

    /// All edges where `blocked_id == task_id`.
    async fn find_edges_by_blocked(&self, task_id: Uuid) -> DomainResult<Vec<DependencyEdge>>;

    /// All edges whose blocker is any of `task_ids`.
    ///
    /// Empty input returns an empty list without touching the store.
    async fn find_edges_by_blockers(&self, task_ids: &[Uuid]) -> DomainResult<Vec<DependencyEdge>>;

    /// Batch task lookup. Ids absent from the store are omitted.
    async fn find_tasks_by_ids(&self, ids: &HashSet<Uuid>) -> DomainResult<HashMap<Uuid, TaskRef>>;

    /// Whether the exact `(blocker_id, blocked_id)` edge exists.
    async fn edge_exists(&self, blocker_id: Uuid, blocked_id: Uuid) -> DomainResult<bool>;

    /// Insert an edge.
    ///
    /// # Errors
    /// * `DomainError::DuplicateDependency` if the pair already exists
    /// * `DomainError::DependencyCycle` if the store itself sees that the
    ///   edge would close a cycle
    async fn insert_edge(&self, blocker_id: Uuid, blocked_id: Uuid) -> DomainResult<DependencyEdge>;

    /// Delete an edge. Succeeds even when the edge does not exist.
    async fn delete_edge(&self, blocker_id: Uuid, blocked_id: Uuid) -> DomainResult<()>;

    /// Tenant of a task.
    ///
    /// Returns `None` when the task does not exist and `Some(None)` for a
    /// task without a team.
    async fn get_task_tenant(&self, task_id: Uuid) -> DomainResult<Option<Option<Uuid>>>;
}
