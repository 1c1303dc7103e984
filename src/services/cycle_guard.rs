//! Cycle detection for proposed dependency edges.
//!
//! Adding `blocker -> blocked` closes a cycle exactly when `blocker` is
//! already reachable from `blocked` by following existing edges. The guard
//! walks the graph breadth-first, fetching one whole frontier per store call.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::ports::DependencyRepository;

/// Outcome of a cycle check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleCheck {
    /// The edge can be added without creating a cycle.
    Safe,
    /// The edge would close a cycle. Holds the existing path
    /// `blocked -> ... -> blocker`.
    Cycle(Vec<Uuid>),
}

impl CycleCheck {
    /// Whether the proposed edge would close a cycle.
    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::Cycle(_))
    }
}

/// Breadth-first reachability check run before inserting an edge.
pub struct CycleGuard<R: DependencyRepository> {
    repo: Arc<R>,
}

impl<R: DependencyRepository> Clone for CycleGuard<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
        }
    }
}

impl<R: DependencyRepository> CycleGuard<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Decide whether adding `blocker_id -> blocked_id` would create a cycle.
    ///
    /// Read-only. Terminates on any graph, including one that already
    /// contains a cycle, because each task is expanded at most once.
    pub async fn check(&self, blocker_id: Uuid, blocked_id: Uuid) -> DomainResult<CycleCheck> {
        if blocker_id == blocked_id {
            return Ok(CycleCheck::Cycle(vec![blocked_id]));
        }

        let mut visited: HashSet<Uuid> = HashSet::from([blocked_id]);
        let mut parent: HashMap<Uuid, Uuid> = HashMap::new();
        let mut frontier = vec![blocked_id];
        let mut depth = 0usize;

        while !frontier.is_empty() {
            let edges = self.repo.find_edges_by_blockers(&frontier).await?;
            let mut next = Vec::new();

            for edge in edges {
                if !visited.insert(edge.blocked_id) {
                    continue;
                }
                parent.insert(edge.blocked_id, edge.blocker_id);

                if edge.blocked_id == blocker_id {
                    let path = trace_path(&parent, blocked_id, blocker_id);
                    debug!(%blocker_id, %blocked_id, depth, "cycle detected");
                    return Ok(CycleCheck::Cycle(path));
                }
                next.push(edge.blocked_id);
            }

            frontier = next;
            depth += 1;
        }

        debug!(%blocker_id, %blocked_id, depth, visited = visited.len(), "no cycle");
        Ok(CycleCheck::Safe)
    }
}

/// Walk parent links back from `to` and return the path `from -> ... -> to`.
fn trace_path(parent: &HashMap<Uuid, Uuid>, from: Uuid, to: Uuid) -> Vec<Uuid> {
    let mut path = vec![to];
    let mut current = to;
    while current != from {
        match parent.get(&current) {
            Some(&prev) => {
                path.push(prev);
                current = prev;
            }
            None => break,
        }
    }
    path.reverse();
    path
}
