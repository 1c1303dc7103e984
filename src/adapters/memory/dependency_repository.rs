//! In-memory implementation of the DependencyRepository.
//!
//! Backs the unit and HTTP tests. Mirrors the storage-level rules
//! of the SQLite adapter: unique pairs, no self-loops, and no insert that
//! would close a cycle. Every port call increments a counter so tests can
//! assert that a request never reached the store.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{DependencyEdge, TaskRef};
use crate::domain::ports::DependencyRepository;

#[derive(Default)]
struct Inner {
    tasks: HashMap<Uuid, TaskRef>,
    /// Keyed by (blocker, blocked); BTreeMap keeps iteration deterministic.
    edges: BTreeMap<(Uuid, Uuid), DependencyEdge>,
    /// Insertion order, used as the listing order.
    order: Vec<(Uuid, Uuid)>,
}

impl Inner {
    fn ordered_edges(&self, keep: impl Fn(&DependencyEdge) -> bool) -> Vec<DependencyEdge> {
        self.order
            .iter()
            .filter_map(|key| self.edges.get(key))
            .filter(|edge| keep(edge))
            .cloned()
            .collect()
    }

    fn reaches(&self, from: Uuid, target: Uuid) -> bool {
        let mut visited = HashSet::from([from]);
        let mut queue = VecDeque::from([from]);

        while let Some(node) = queue.pop_front() {
            if node == target {
                return true;
            }
            let successors = self.edges.range((node, Uuid::nil())..=(node, Uuid::from_u128(u128::MAX)));
            for &(_, blocked) in successors.map(|(key, _)| key) {
                if visited.insert(blocked) {
                    queue.push_back(blocked);
                }
            }
        }
        false
    }
}

/// Dependency store held entirely in memory.
#[derive(Default)]
pub struct InMemoryDependencyRepository {
    inner: RwLock<Inner>,
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl InMemoryDependencyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a task. Not counted as a store call.
    pub async fn upsert_task(&self, task: &TaskRef) {
        self.inner.write().await.tasks.insert(task.id, task.clone());
    }

    /// Remove a task, leaving its edges behind.
    pub async fn delete_task(&self, task_id: Uuid) {
        self.inner.write().await.tasks.remove(&task_id);
    }

    /// Number of port calls made so far.
    pub fn store_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make every subsequent port call fail with a database error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of stored edges.
    pub async fn edge_count(&self) -> usize {
        self.inner.read().await.edges.len()
    }

    /// Snapshot of all edges in insertion order.
    pub async fn all_edges(&self) -> Vec<DependencyEdge> {
        self.inner.read().await.ordered_edges(|_| true)
    }

    fn enter(&self) -> DomainResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomainError::DatabaseError("in-memory store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DependencyRepository for InMemoryDependencyRepository {
    async fn find_edges_by_blocker(&self, task_id: Uuid) -> DomainResult<Vec<DependencyEdge>> {
        self.enter()?;
        Ok(self.inner.read().await.ordered_edges(|e| e.blocker_id == task_id))
    }

    async fn find_edges_by_blocked(&self, task_id: Uuid) -> DomainResult<Vec<DependencyEdge>> {
        self.enter()?;
        Ok(self.inner.read().await.ordered_edges(|e| e.blocked_id == task_id))
    }

    async fn find_edges_by_blockers(&self, task_ids: &[Uuid]) -> DomainResult<Vec<DependencyEdge>> {
        if task_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.enter()?;
        let wanted: HashSet<Uuid> = task_ids.iter().copied().collect();
        Ok(self.inner.read().await.ordered_edges(|e| wanted.contains(&e.blocker_id)))
    }

    async fn find_tasks_by_ids(&self, ids: &HashSet<Uuid>) -> DomainResult<HashMap<Uuid, TaskRef>> {
        self.enter()?;
        let inner = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.tasks.get(id).map(|t| (*id, t.clone())))
            .collect())
    }

    async fn edge_exists(&self, blocker_id: Uuid, blocked_id: Uuid) -> DomainResult<bool> {
        self.enter()?;
        Ok(self.inner.read().await.edges.contains_key(&(blocker_id, blocked_id)))
    }

    async fn insert_edge(&self, blocker_id: Uuid, blocked_id: Uuid) -> DomainResult<DependencyEdge> {
        self.enter()?;
        if blocker_id == blocked_id {
            return Err(DomainError::Validation("A task cannot depend on itself".to_string()));
        }

        let mut inner = self.inner.write().await;
        if inner.edges.contains_key(&(blocker_id, blocked_id)) {
            return Err(DomainError::DuplicateDependency { blocker_id, blocked_id });
        }
        if inner.reaches(blocked_id, blocker_id) {
            return Err(DomainError::DependencyCycle(vec![blocker_id, blocked_id, blocker_id]));
        }

        let edge = DependencyEdge::new(blocker_id, blocked_id);
        inner.edges.insert((blocker_id, blocked_id), edge.clone());
        inner.order.push((blocker_id, blocked_id));
        Ok(edge)
    }

    async fn delete_edge(&self, blocker_id: Uuid, blocked_id: Uuid) -> DomainResult<()> {
        self.enter()?;
        let mut inner = self.inner.write().await;
        if inner.edges.remove(&(blocker_id, blocked_id)).is_some() {
            inner.order.retain(|key| *key != (blocker_id, blocked_id));
        }
        Ok(())
    }

    async fn get_task_tenant(&self, task_id: Uuid) -> DomainResult<Option<Option<Uuid>>> {
        self.enter()?;
        Ok(self.inner.read().await.tasks.get(&task_id).map(|t| t.tenant_id))
    }
}
