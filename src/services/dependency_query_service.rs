//! Read side of the dependency graph.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{DependencyEdge, DependencyEntry, DependencyView, TaskRef, TenantContext, TaskStatus, UNKNOWN_TASK_TEXT};
use crate::domain::ports::DependencyRepository;

/// Builds the `blocks` / `blockedBy` view of a single task.
pub struct DependencyQueryService<R: DependencyRepository> {
    repo: Arc<R>,
    tenancy_enabled: bool,
}

impl<R: DependencyRepository> DependencyQueryService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            repo,
            tenancy_enabled: true,
        }
    }

    /// Turn tenant scoping on or off. On by default.
    pub fn with_tenancy(mut self, enabled: bool) -> Self {
        self.tenancy_enabled = enabled;
        self
    }

    /// Return what `task_id` blocks and what blocks it.
    ///
    /// Edges whose opposite task has been deleted are still listed, with
    /// placeholder text and `todo` status.
    pub async fn get_dependencies(&self, task_id: Uuid, ctx: &TenantContext) -> DomainResult<DependencyView> {
        let owner = self
            .repo
            .get_task_tenant(task_id)
            .await?
            .ok_or(DomainError::TaskNotFound(task_id))?;

        if self.tenancy_enabled && owner != ctx.tenant_id {
            warn!(
                %task_id,
                caller_tenant = ?ctx.tenant_id,
                "dependency read denied: task belongs to another tenant"
            );
            return Err(DomainError::Forbidden(
                "Task belongs to a different team".to_string(),
            ));
        }

        let (blocks, blocked_by) = tokio::try_join!(
            self.repo.find_edges_by_blocker(task_id),
            self.repo.find_edges_by_blocked(task_id),
        )?;

        let related: HashSet<Uuid> = blocks
            .iter()
            .map(|e| e.blocked_id)
            .chain(blocked_by.iter().map(|e| e.blocker_id))
            .collect();

        let tasks = if related.is_empty() {
            HashMap::new()
        } else {
            self.repo.find_tasks_by_ids(&related).await?
        };

        let blocks: Vec<DependencyEntry> = blocks
            .into_iter()
            .map(|e| {
                let other = e.blocked_id;
                entry(e, tasks.get(&other))
            })
            .collect();
        let blocked_by: Vec<DependencyEntry> = blocked_by
            .into_iter()
            .map(|e| {
                let other = e.blocker_id;
                entry(e, tasks.get(&other))
            })
            .collect();

        let is_blocked = blocked_by.iter().any(|e| !e.task_status.is_done());

        debug!(%task_id, blocks = blocks.len(), blocked_by = blocked_by.len(), is_blocked, "built dependency view");

        Ok(DependencyView {
            blocks,
            blocked_by,
            is_blocked,
        })
    }
}

fn entry(edge: DependencyEdge, other: Option<&TaskRef>) -> DependencyEntry {
    let (task_text, task_status) = match other {
        Some(task) => (task.text.clone(), task.status),
        None => (UNKNOWN_TASK_TEXT.to_string(), TaskStatus::default()),
    };
    DependencyEntry {
        blocker_id: edge.blocker_id,
        blocked_id: edge.blocked_id,
        task_text,
        task_status,
    }
}
