use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Barrier;
use uuid::Uuid;

use taskdeps::domain::models::{DependencyEdge, TaskRef};
use taskdeps::domain::ports::DependencyRepository;
use taskdeps::DomainResult;

/// Repository wrapper that holds every `insert_edge` call at a barrier.
///
/// With a barrier of `n`, no insert reaches the wrapped store until `n`
/// requests have passed every check before the insert.
pub struct RendezvousRepository<R> {
    inner: Arc<R>,
    barrier: Barrier,
    inserts: AtomicUsize,
}

impl<R: DependencyRepository> RendezvousRepository<R> {
    pub fn new(inner: Arc<R>, parties: usize) -> Self {
        Self {
            inner,
            barrier: Barrier::new(parties),
            inserts: AtomicUsize::new(0),
        }
    }

    /// Number of inserts that reached the barrier.
    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<R: DependencyRepository> DependencyRepository for RendezvousRepository<R> {
    async fn find_edges_by_blocker(&self, task_id: Uuid) -> DomainResult<Vec<DependencyEdge>> {
        self.inner.find_edges_by_blocker(task_id).await
    }

    async fn find_edges_by_blocked(&self, task_id: Uuid) -> DomainResult<Vec<DependencyEdge>> {
        self.inner.find_edges_by_blocked(task_id).await
    }

    async fn find_edges_by_blockers(&self, task_ids: &[Uuid]) -> DomainResult<Vec<DependencyEdge>> {
        self.inner.find_edges_by_blockers(task_ids).await
    }

    async fn find_tasks_by_ids(&self, ids: &HashSet<Uuid>) -> DomainResult<HashMap<Uuid, TaskRef>> {
        self.inner.find_tasks_by_ids(ids).await
    }

    async fn edge_exists(&self, blocker_id: Uuid, blocked_id: Uuid) -> DomainResult<bool> {
        self.inner.edge_exists(blocker_id, blocked_id).await
    }

    async fn insert_edge(&self, blocker_id: Uuid, blocked_id: Uuid) -> DomainResult<DependencyEdge> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.barrier.wait().await;
        self.inner.insert_edge(blocker_id, blocked_id).await
    }

    async fn delete_edge(&self, blocker_id: Uuid, blocked_id: Uuid) -> DomainResult<()> {
        self.inner.delete_edge(blocker_id, blocked_id).await
    }

    async fn get_task_tenant(&self, task_id: Uuid) -> DomainResult<Option<Option<Uuid>>> {
        self.inner.get_task_tenant(task_id).await
    }
}
