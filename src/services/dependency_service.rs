//! Write side of the dependency graph.
//!
//! Every mutation runs the same pipeline: validate the request, resolve and
//! authorize both tasks, take the mutation lock of the tenant that owns
//! them, then (for creates) check for cycles and duplicates before
//! inserting. The lock spans the check and the insert, so two concurrent
//! requests in one tenant cannot both pass the cycle check and together
//! close a cycle. Locks are keyed by the tasks' stored tenant, never by an
//! unverified caller value, so the lock map only grows with real tenants.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;
use tracing::{info, warn};
use uuid::Uuid;

use super::cycle_guard::{CycleCheck, CycleGuard};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    AuditAction, AuditRecord, CreateDependencyRequest, DeleteDependencyRequest, DependencyEdge, EdgeKey,
    TenantContext,
};
use crate::domain::ports::{AuditSink, DependencyRepository, NullAuditSink};

/// One async mutex per tenant. Personal tasks (no tenant) share a lock.
#[derive(Default)]
pub struct TenantLocks {
    locks: Mutex<HashMap<Option<Uuid>, Arc<tokio::sync::Mutex<()>>>>,
}

impl TenantLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive mutation rights within `tenant_id`.
    pub async fn acquire(&self, tenant_id: Option<Uuid>) -> OwnedMutexGuard<()> {
        let lock = {
            // the map only holds Arcs, so a poisoned guard is still consistent
            let mut locks = self.locks.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            Arc::clone(locks.entry(tenant_id).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of tenants that have taken a lock so far.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(std::sync::PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Creates and removes dependency edges.
pub struct DependencyService<R: DependencyRepository> {
    repo: Arc<R>,
    guard: CycleGuard<R>,
    audit: Arc<dyn AuditSink>,
    locks: TenantLocks,
    tenancy_enabled: bool,
}

impl<R: DependencyRepository> DependencyService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            guard: CycleGuard::new(Arc::clone(&repo)),
            repo,
            audit: Arc::new(NullAuditSink),
            locks: TenantLocks::new(),
            tenancy_enabled: true,
        }
    }

    /// Send audit records to `audit` instead of discarding them.
    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Turn tenant scoping on or off. On by default.
    pub fn with_tenancy(mut self, enabled: bool) -> Self {
        self.tenancy_enabled = enabled;
        self
    }

    /// Record that `blocker_id` must finish before `blocked_id`.
    ///
    /// # Errors
    ///
    /// - `Validation` for a missing or malformed id, or a self-dependency.
    /// - `TaskNotFound` if either task does not exist.
    /// - `Forbidden` if the tasks are outside the caller's tenant.
    /// - `DependencyCycle` if the edge would close a cycle.
    /// - `DuplicateDependency` if the edge already exists.
    pub async fn create_dependency(
        &self,
        request: CreateDependencyRequest,
        ctx: &TenantContext,
    ) -> DomainResult<DependencyEdge> {
        let key = request.validate()?;
        let tenant = self.authorize(key, ctx).await?;
        let _lock = self.locks.acquire(tenant).await;

        if let CycleCheck::Cycle(path) = self.guard.check(key.blocker_id, key.blocked_id).await? {
            info!(
                blocker_id = %key.blocker_id,
                blocked_id = %key.blocked_id,
                "rejected dependency that would create a cycle"
            );
            let mut cycle = Vec::with_capacity(path.len() + 1);
            cycle.push(key.blocker_id);
            cycle.extend(path);
            return Err(DomainError::DependencyCycle(cycle));
        }

        if self.repo.edge_exists(key.blocker_id, key.blocked_id).await? {
            return Err(DomainError::DuplicateDependency {
                blocker_id: key.blocker_id,
                blocked_id: key.blocked_id,
            });
        }

        let edge = self.repo.insert_edge(key.blocker_id, key.blocked_id).await?;
        info!(blocker_id = %edge.blocker_id, blocked_id = %edge.blocked_id, "dependency created");

        self.audit(AuditAction::DependencyCreated, key, ctx).await;
        Ok(edge)
    }

    /// Remove the `blocker_id -> blocked_id` edge.
    ///
    /// Succeeds whether or not the edge existed, as long as both tasks
    /// exist and belong to the caller.
    pub async fn delete_dependency(&self, request: DeleteDependencyRequest, ctx: &TenantContext) -> DomainResult<()> {
        let key = request.validate()?;
        let tenant = self.authorize(key, ctx).await?;
        let _lock = self.locks.acquire(tenant).await;

        self.repo.delete_edge(key.blocker_id, key.blocked_id).await?;
        info!(blocker_id = %key.blocker_id, blocked_id = %key.blocked_id, "dependency removed");

        self.audit(AuditAction::DependencyRemoved, key, ctx).await;
        Ok(())
    }

    /// Both tasks must exist and, with tenancy on, share the caller's tenant.
    ///
    /// Returns the lock key for the mutation: the tasks' tenant, or `None`
    /// when tenancy is off.
    async fn authorize(&self, key: EdgeKey, ctx: &TenantContext) -> DomainResult<Option<Uuid>> {
        let ids = HashSet::from([key.blocker_id, key.blocked_id]);
        let tasks = self.repo.find_tasks_by_ids(&ids).await?;

        let blocker = tasks
            .get(&key.blocker_id)
            .ok_or(DomainError::TaskNotFound(key.blocker_id))?;
        let blocked = tasks
            .get(&key.blocked_id)
            .ok_or(DomainError::TaskNotFound(key.blocked_id))?;

        if !self.tenancy_enabled {
            return Ok(None);
        }

        if blocker.tenant_id != blocked.tenant_id {
            warn!(
                blocker_id = %key.blocker_id,
                blocked_id = %key.blocked_id,
                caller_tenant = ?ctx.tenant_id,
                "cross-tenant dependency attempt"
            );
            return Err(DomainError::Forbidden(
                "Cannot create dependencies between tasks of different teams".to_string(),
            ));
        }

        if blocker.tenant_id != ctx.tenant_id {
            warn!(
                blocker_id = %key.blocker_id,
                blocked_id = %key.blocked_id,
                caller_tenant = ?ctx.tenant_id,
                task_tenant = ?blocker.tenant_id,
                "dependency mutation outside caller's team"
            );
            return Err(DomainError::Forbidden(
                "Tasks belong to a different team".to_string(),
            ));
        }

        Ok(blocker.tenant_id)
    }

    /// The mutation is already committed; a failing sink only gets logged.
    async fn audit(&self, action: AuditAction, key: EdgeKey, ctx: &TenantContext) {
        let record = AuditRecord::new(action, key.blocker_id, key.blocked_id, ctx.tenant_id);
        if let Err(e) = self.audit.record(record).await {
            warn!(action = action.as_str(), error = %e, "failed to write audit record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryDependencyRepository;
    use crate::domain::models::TaskRef;
    use async_trait::async_trait;
    use tokio::sync::Mutex as AsyncMutex;

    #[derive(Default)]
    struct RecordingSink {
        records: AsyncMutex<Vec<AuditRecord>>,
    }

    #[async_trait]
    impl AuditSink for RecordingSink {
        async fn record(&self, record: AuditRecord) -> DomainResult<()> {
            self.records.lock().await.push(record);
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl AuditSink for FailingSink {
        async fn record(&self, _record: AuditRecord) -> DomainResult<()> {
            Err(DomainError::DatabaseError("audit disk full".to_string()))
        }
    }

    async fn seeded(count: usize, tenant: Option<Uuid>) -> (Arc<InMemoryDependencyRepository>, Vec<Uuid>) {
        let repo = Arc::new(InMemoryDependencyRepository::new());
        let mut ids = Vec::new();
        for i in 0..count {
            let mut task = TaskRef::new(format!("task {i}"));
            task.tenant_id = tenant;
            repo.upsert_task(&task).await;
            ids.push(task.id);
        }
        (repo, ids)
    }

    #[tokio::test]
    async fn test_malformed_ids_never_reach_store() {
        let (repo, ids) = seeded(1, None).await;
        let service = DependencyService::new(Arc::clone(&repo));
        let ctx = TenantContext::default();

        let cases = vec![
            CreateDependencyRequest::default(),
            CreateDependencyRequest::new("not-a-uuid", ids[0]),
            CreateDependencyRequest::new(ids[0], "550e8400e29b41d4a716446655440000"),
            CreateDependencyRequest::new(ids[0], ids[0]),
        ];
        for request in cases {
            let err = service.create_dependency(request, &ctx).await.unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)), "got {err:?}");
        }

        let err = service
            .delete_dependency(DeleteDependencyRequest::new(ids[0], "{bad}"), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        assert_eq!(repo.store_calls(), 0);
    }

    #[tokio::test]
    async fn test_create_then_duplicate_then_cycle() {
        let (repo, ids) = seeded(2, None).await;
        let service = DependencyService::new(Arc::clone(&repo));
        let ctx = TenantContext::default();

        let edge = service
            .create_dependency(CreateDependencyRequest::new(ids[0], ids[1]), &ctx)
            .await
            .unwrap();
        assert_eq!((edge.blocker_id, edge.blocked_id), (ids[0], ids[1]));

        let err = service
            .create_dependency(CreateDependencyRequest::new(ids[0], ids[1]), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::DuplicateDependency { .. }));

        let err = service
            .create_dependency(CreateDependencyRequest::new(ids[1], ids[0]), &ctx)
            .await
            .unwrap_err();
        match err {
            DomainError::DependencyCycle(path) => assert_eq!(path, vec![ids[1], ids[0], ids[1]]),
            other => panic!("expected cycle, got {other:?}"),
        }
        assert_eq!(repo.edge_count().await, 1);
    }

    #[tokio::test]
    async fn test_missing_task_is_not_found() {
        let (repo, ids) = seeded(1, None).await;
        let service = DependencyService::new(Arc::clone(&repo));
        let ghost = Uuid::new_v4();

        let err = service
            .create_dependency(CreateDependencyRequest::new(ids[0], ghost), &TenantContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::TaskNotFound(id) if id == ghost));
    }

    #[tokio::test]
    async fn test_tenant_isolation() {
        let team_a = Uuid::new_v4();
        let team_b = Uuid::new_v4();
        let repo = Arc::new(InMemoryDependencyRepository::new());
        let a = TaskRef::new("a").with_tenant(team_a);
        let b = TaskRef::new("b").with_tenant(team_b);
        let a2 = TaskRef::new("a2").with_tenant(team_a);
        for t in [&a, &b, &a2] {
            repo.upsert_task(t).await;
        }
        let service = DependencyService::new(Arc::clone(&repo));

        let err = service
            .create_dependency(CreateDependencyRequest::new(a.id, b.id), &TenantContext::team(team_a))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        let err = service
            .create_dependency(CreateDependencyRequest::new(a.id, a2.id), &TenantContext::team(team_b))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        let err = service
            .create_dependency(CreateDependencyRequest::new(a.id, a2.id), &TenantContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        assert_eq!(repo.edge_count().await, 0);

        service
            .create_dependency(CreateDependencyRequest::new(a.id, a2.id), &TenantContext::team(team_a))
            .await
            .unwrap();
        assert_eq!(repo.edge_count().await, 1);
    }

    #[tokio::test]
    async fn test_tenancy_disabled_allows_cross_team_edges() {
        let repo = Arc::new(InMemoryDependencyRepository::new());
        let a = TaskRef::new("a").with_tenant(Uuid::new_v4());
        let b = TaskRef::new("b").with_tenant(Uuid::new_v4());
        repo.upsert_task(&a).await;
        repo.upsert_task(&b).await;

        let service = DependencyService::new(Arc::clone(&repo)).with_tenancy(false);
        service
            .create_dependency(CreateDependencyRequest::new(a.id, b.id), &TenantContext::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_is_idempotent_and_audited() {
        let (repo, ids) = seeded(2, None).await;
        let sink = Arc::new(RecordingSink::default());
        let service = DependencyService::new(Arc::clone(&repo)).with_audit_sink(sink.clone());
        let ctx = TenantContext::default();

        service
            .create_dependency(CreateDependencyRequest::new(ids[0], ids[1]), &ctx)
            .await
            .unwrap();
        for _ in 0..2 {
            service
                .delete_dependency(DeleteDependencyRequest::new(ids[0], ids[1]), &ctx)
                .await
                .unwrap();
        }
        assert_eq!(repo.edge_count().await, 0);

        let records = sink.records.lock().await;
        let actions: Vec<AuditAction> = records.iter().map(|r| r.action).collect();
        assert_eq!(
            actions,
            vec![
                AuditAction::DependencyCreated,
                AuditAction::DependencyRemoved,
                AuditAction::DependencyRemoved,
            ]
        );
        assert_eq!(records[0].blocker_id, ids[0]);
    }

    #[tokio::test]
    async fn test_audit_failure_does_not_fail_request() {
        let (repo, ids) = seeded(2, None).await;
        let service = DependencyService::new(Arc::clone(&repo)).with_audit_sink(Arc::new(FailingSink));

        service
            .create_dependency(CreateDependencyRequest::new(ids[0], ids[1]), &TenantContext::default())
            .await
            .unwrap();
        assert_eq!(repo.edge_count().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_reverse_creates_leave_one_edge() {
        let (repo, ids) = seeded(2, None).await;
        let service = Arc::new(DependencyService::new(Arc::clone(&repo)));
        let ctx = TenantContext::default();

        let forward = {
            let service = Arc::clone(&service);
            let request = CreateDependencyRequest::new(ids[0], ids[1]);
            tokio::spawn(async move { service.create_dependency(request, &ctx).await })
        };
        let backward = {
            let service = Arc::clone(&service);
            let request = CreateDependencyRequest::new(ids[1], ids[0]);
            tokio::spawn(async move { service.create_dependency(request, &ctx).await })
        };

        let results = [forward.await.unwrap(), backward.await.unwrap()];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(repo.edge_count().await, 1);
    }

    #[tokio::test]
    async fn test_tenant_locks_are_per_tenant() {
        let locks = TenantLocks::new();
        let team = Some(Uuid::new_v4());

        let held = locks.acquire(team).await;
        // a different tenant is not blocked
        let _other = locks.acquire(None).await;
        assert_eq!(locks.len(), 2);

        let same_tenant = tokio::time::timeout(std::time::Duration::from_millis(20), locks.acquire(team)).await;
        assert!(same_tenant.is_err());

        drop(held);
        let _again = locks.acquire(team).await;
    }

    #[tokio::test]
    async fn test_rejected_requests_do_not_grow_lock_map() {
        let team = Uuid::new_v4();
        let (repo, ids) = seeded(2, Some(team)).await;
        let service = DependencyService::new(Arc::clone(&repo));

        for _ in 0..200 {
            let ctx = TenantContext::team(Uuid::new_v4());
            let err = service
                .create_dependency(CreateDependencyRequest::new(Uuid::new_v4(), Uuid::new_v4()), &ctx)
                .await
                .unwrap_err();
            assert!(matches!(err, DomainError::TaskNotFound(_)));

            let err = service
                .create_dependency(CreateDependencyRequest::new(ids[0], ids[1]), &ctx)
                .await
                .unwrap_err();
            assert!(matches!(err, DomainError::Forbidden(_)));

            let err = service
                .delete_dependency(DeleteDependencyRequest::new(Uuid::new_v4(), ids[1]), &ctx)
                .await
                .unwrap_err();
            assert!(matches!(err, DomainError::TaskNotFound(_)));
        }
        assert!(service.locks.is_empty());

        // an authorized mutation locks under the tasks' own tenant
        service
            .create_dependency(CreateDependencyRequest::new(ids[0], ids[1]), &TenantContext::team(team))
            .await
            .unwrap();
        assert_eq!(service.locks.len(), 1);
    }
}
