//! Dependency service behavior against the SQLite store.

mod helpers;

use std::sync::Arc;
use uuid::Uuid;

use helpers::database::{seed_task, seed_task_with_status, setup_repository};
use helpers::rendezvous::RendezvousRepository;
use taskdeps::adapters::memory::InMemoryDependencyRepository;
use taskdeps::adapters::sqlite::{initialize_database, SqliteDependencyRepository};
use taskdeps::domain::models::{
    CreateDependencyRequest, DeleteDependencyRequest, TaskRef, TaskStatus, TenantContext,
};
use taskdeps::domain::ports::DependencyRepository;
use taskdeps::services::{DependencyQueryService, DependencyService};
use taskdeps::DomainError;

fn services(
    repo: &Arc<SqliteDependencyRepository>,
) -> (
    DependencyService<SqliteDependencyRepository>,
    DependencyQueryService<SqliteDependencyRepository>,
) {
    (
        DependencyService::new(Arc::clone(repo)),
        DependencyQueryService::new(Arc::clone(repo)),
    )
}

fn personal() -> TenantContext {
    TenantContext::default()
}

async fn create(
    service: &DependencyService<SqliteDependencyRepository>,
    blocker: Uuid,
    blocked: Uuid,
) -> Result<(), DomainError> {
    service
        .create_dependency(CreateDependencyRequest::new(blocker, blocked), &personal())
        .await
        .map(|_| ())
}

#[tokio::test]
async fn test_self_dependency_is_validation_error() {
    let repo = setup_repository().await;
    let (service, _) = services(&repo);
    let a = seed_task(&repo, "a", None).await;

    let err = create(&service, a, a).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
    assert_eq!(repo.edge_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_duplicate_create_is_conflict() {
    let repo = setup_repository().await;
    let (service, _) = services(&repo);
    let a = seed_task(&repo, "a", None).await;
    let b = seed_task(&repo, "b", None).await;

    create(&service, a, b).await.unwrap();
    let err = create(&service, a, b).await.unwrap_err();

    assert!(matches!(err, DomainError::DuplicateDependency { .. }));
    assert!(err.is_conflict());
    assert_eq!(repo.edge_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_direct_cycle_is_rejected_and_not_persisted() {
    let repo = setup_repository().await;
    let (service, _) = services(&repo);
    let a = seed_task(&repo, "a", None).await;
    let b = seed_task(&repo, "b", None).await;

    create(&service, a, b).await.unwrap();
    let err = create(&service, b, a).await.unwrap_err();

    assert!(matches!(err, DomainError::DependencyCycle(_)));
    assert!(!repo.edge_exists(b, a).await.unwrap());
}

#[tokio::test]
async fn test_transitive_cycle_is_rejected() {
    let repo = setup_repository().await;
    let (service, _) = services(&repo);
    let a = seed_task(&repo, "a", None).await;
    let b = seed_task(&repo, "b", None).await;
    let c = seed_task(&repo, "c", None).await;

    create(&service, a, b).await.unwrap();
    create(&service, b, c).await.unwrap();

    match create(&service, c, a).await.unwrap_err() {
        DomainError::DependencyCycle(path) => assert_eq!(path, vec![c, a, b, c]),
        other => panic!("expected cycle, got {other:?}"),
    }
}

#[tokio::test]
async fn test_diamond_closing_edge_is_accepted() {
    let repo = setup_repository().await;
    let (service, _) = services(&repo);
    let a = seed_task(&repo, "a", None).await;
    let b = seed_task(&repo, "b", None).await;
    let c = seed_task(&repo, "c", None).await;

    create(&service, a, b).await.unwrap();
    create(&service, b, c).await.unwrap();
    create(&service, a, c).await.unwrap();

    assert!(repo.edge_exists(a, c).await.unwrap());
    assert_eq!(repo.edge_count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_cross_tenant_edge_is_forbidden_before_other_checks() {
    let repo = setup_repository().await;
    let (service, _) = services(&repo);
    let team_1 = Uuid::new_v4();
    let team_2 = Uuid::new_v4();
    let a = seed_task(&repo, "a", Some(team_1)).await;
    let b = seed_task(&repo, "b", Some(team_2)).await;

    let err = service
        .create_dependency(CreateDependencyRequest::new(a, b), &TenantContext::team(team_1))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));

    // an existing edge written behind the service's back does not change the answer
    repo.insert_edge(a, b).await.unwrap();
    let err = service
        .create_dependency(CreateDependencyRequest::new(a, b), &TenantContext::team(team_1))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));

    let err = service
        .delete_dependency(DeleteDependencyRequest::new(a, b), &TenantContext::team(team_2))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));
    assert!(repo.edge_exists(a, b).await.unwrap());
}

#[tokio::test]
async fn test_delete_missing_edge_succeeds() {
    let repo = setup_repository().await;
    let (service, _) = services(&repo);
    let x = seed_task(&repo, "x", None).await;
    let y = seed_task(&repo, "y", None).await;
    let z = seed_task(&repo, "z", None).await;
    create(&service, y, z).await.unwrap();

    service
        .delete_dependency(DeleteDependencyRequest::new(x, y), &personal())
        .await
        .unwrap();

    assert_eq!(repo.edge_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_delete_then_recreate() {
    let repo = setup_repository().await;
    let (service, _) = services(&repo);
    let a = seed_task(&repo, "a", None).await;
    let b = seed_task(&repo, "b", None).await;

    create(&service, a, b).await.unwrap();
    service
        .delete_dependency(DeleteDependencyRequest::new(a, b), &personal())
        .await
        .unwrap();
    // the reverse direction is now legal
    create(&service, b, a).await.unwrap();
    assert!(repo.edge_exists(b, a).await.unwrap());
}

#[tokio::test]
async fn test_query_symmetry_and_enrichment() {
    let repo = setup_repository().await;
    let (service, queries) = services(&repo);
    let a = seed_task(&repo, "Buy paint", None).await;
    let b = seed_task_with_status(&repo, "Paint fence", None, TaskStatus::InProgress).await;

    create(&service, a, b).await.unwrap();

    let view_a = queries.get_dependencies(a, &personal()).await.unwrap();
    assert_eq!(view_a.blocks.len(), 1);
    assert_eq!(view_a.blocks[0].blocked_id, b);
    assert_eq!(view_a.blocks[0].task_text, "Paint fence");
    assert_eq!(view_a.blocks[0].task_status, TaskStatus::InProgress);
    assert!(view_a.blocked_by.is_empty());
    assert!(!view_a.is_blocked);

    let view_b = queries.get_dependencies(b, &personal()).await.unwrap();
    assert_eq!(view_b.blocked_by.len(), 1);
    assert_eq!(view_b.blocked_by[0].blocker_id, a);
    assert_eq!(view_b.blocked_by[0].task_text, "Buy paint");
    assert!(view_b.is_blocked);

    // enrichment reflects the current stored values
    let done = TaskRef {
        id: a,
        tenant_id: None,
        text: "Buy paint (white)".to_string(),
        status: TaskStatus::Done,
    };
    repo.upsert_task(&done).await.unwrap();
    let view_b = queries.get_dependencies(b, &personal()).await.unwrap();
    assert_eq!(view_b.blocked_by[0].task_text, "Buy paint (white)");
    assert!(!view_b.is_blocked);
}

#[tokio::test]
async fn test_deleted_task_shows_placeholder() {
    let repo = setup_repository().await;
    let (service, queries) = services(&repo);
    let a = seed_task(&repo, "a", None).await;
    let b = seed_task(&repo, "b", None).await;
    create(&service, a, b).await.unwrap();

    repo.delete_task(b).await.unwrap();

    let view = queries.get_dependencies(a, &personal()).await.unwrap();
    assert_eq!(view.blocks[0].task_text, "Unknown task");
    assert_eq!(view.blocks[0].task_status, TaskStatus::Todo);
}

#[tokio::test]
async fn test_malformed_blocker_makes_no_store_calls() {
    let repo = Arc::new(InMemoryDependencyRepository::new());
    let service = DependencyService::new(Arc::clone(&repo));

    let err = service
        .create_dependency(
            CreateDependencyRequest::new("not-a-uuid", Uuid::new_v4()),
            &personal(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::Validation(_)));
    assert_eq!(repo.store_calls(), 0);
}

#[tokio::test]
async fn test_design_migrate_deploy_scenario() {
    let repo = setup_repository().await;
    let (service, queries) = services(&repo);
    let t1 = seed_task(&repo, "Design schema", None).await;
    let t2 = seed_task(&repo, "Write migration", None).await;
    let t3 = seed_task(&repo, "Deploy", None).await;

    create(&service, t1, t2).await.unwrap();
    create(&service, t2, t3).await.unwrap();

    let err = create(&service, t3, t1).await.unwrap_err();
    assert!(matches!(err, DomainError::DependencyCycle(_)));
    assert!(err.to_string().starts_with("Dependency would create a cycle"));

    let view = queries.get_dependencies(t2, &personal()).await.unwrap();
    let blocks: Vec<Uuid> = view.blocks.iter().map(|e| e.blocked_id).collect();
    let blocked_by: Vec<Uuid> = view.blocked_by.iter().map(|e| e.blocker_id).collect();
    assert_eq!(blocks, vec![t3]);
    assert_eq!(blocked_by, vec![t1]);
    assert_eq!(view.blocks[0].task_text, "Deploy");
    assert_eq!(view.blocked_by[0].task_text, "Design schema");
}

#[tokio::test]
async fn test_concurrent_complementary_creates_never_form_two_cycle() {
    let repo = setup_repository().await;
    let service = Arc::new(DependencyService::new(Arc::clone(&repo)));
    let a = seed_task(&repo, "a", None).await;
    let b = seed_task(&repo, "b", None).await;

    let mut handles = Vec::new();
    for i in 0..8 {
        let service = Arc::clone(&service);
        let (blocker, blocked) = if i % 2 == 0 { (a, b) } else { (b, a) };
        handles.push(tokio::spawn(async move {
            service
                .create_dependency(CreateDependencyRequest::new(blocker, blocked), &TenantContext::default())
                .await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(e) => assert!(e.is_conflict(), "unexpected error: {e:?}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(repo.edge_count().await.unwrap(), 1);
    assert!(!(repo.edge_exists(a, b).await.unwrap() && repo.edge_exists(b, a).await.unwrap()));
}

/// Send `a -> b` and `b -> a` through two independent service instances
/// (separate lock maps, as in two processes). Both requests pass the cycle and
/// duplicate checks before either insert runs.
async fn race_reverse_creates<R: DependencyRepository + 'static>(
    repo: Arc<R>,
    a: Uuid,
    b: Uuid,
) -> (Vec<Result<(), DomainError>>, usize) {
    let gated = Arc::new(RendezvousRepository::new(repo, 2));
    let first = Arc::new(DependencyService::new(Arc::clone(&gated)));
    let second = Arc::new(DependencyService::new(Arc::clone(&gated)));

    let spawn = |service: Arc<DependencyService<RendezvousRepository<R>>>, blocker: Uuid, blocked: Uuid| {
        tokio::spawn(async move {
            service
                .create_dependency(CreateDependencyRequest::new(blocker, blocked), &TenantContext::default())
                .await
                .map(|_| ())
        })
    };
    let forward = spawn(first, a, b);
    let backward = spawn(second, b, a);

    let results = vec![forward.await.unwrap(), backward.await.unwrap()];
    (results, gated.inserts())
}

fn assert_one_store_rejection(results: &[Result<(), DomainError>], inserts: usize) {
    // both requests got past the service checks
    assert_eq!(inserts, 2);
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let rejected: Vec<&DomainError> = results.iter().filter_map(|r| r.as_ref().err()).collect();
    assert!(
        matches!(rejected.as_slice(), [DomainError::DependencyCycle(_)]),
        "expected one cycle rejection from the store, got {rejected:?}"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_overlapping_reverse_creates_rejected_by_memory_store() {
    let repo = Arc::new(InMemoryDependencyRepository::new());
    let a = TaskRef::new("a");
    let b = TaskRef::new("b");
    repo.upsert_task(&a).await;
    repo.upsert_task(&b).await;

    let (results, inserts) = race_reverse_creates(Arc::clone(&repo), a.id, b.id).await;

    assert_one_store_rejection(&results, inserts);
    assert_eq!(repo.edge_count().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_overlapping_reverse_creates_rejected_by_sqlite_store() {
    // file-backed so the two inserts run on separate pooled connections
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", dir.path().join("race.db").display());
    let pool = initialize_database(&url, None).await.unwrap();
    let repo = Arc::new(SqliteDependencyRepository::new(pool));
    let a = seed_task(&repo, "a", None).await;
    let b = seed_task(&repo, "b", None).await;

    let (results, inserts) = race_reverse_creates(Arc::clone(&repo), a, b).await;

    assert_one_store_rejection(&results, inserts);
    assert_eq!(repo.edge_count().await.unwrap(), 1);
    assert!(!(repo.edge_exists(a, b).await.unwrap() && repo.edge_exists(b, a).await.unwrap()));
}
