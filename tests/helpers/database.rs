use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

use taskdeps::adapters::sqlite::{create_migrated_test_pool, SqliteDependencyRepository};
use taskdeps::domain::models::{TaskRef, TaskStatus};

/// Create an in-memory SQLite database for testing
///
/// Each call creates a completely isolated database with all migrations
/// applied.
pub async fn setup_test_db() -> SqlitePool {
    create_migrated_test_pool()
        .await
        .expect("failed to create test database")
}

/// Teardown test database
pub async fn teardown_test_db(pool: SqlitePool) {
    pool.close().await;
}

/// Repository over a fresh test database.
pub async fn setup_repository() -> Arc<SqliteDependencyRepository> {
    Arc::new(SqliteDependencyRepository::new(setup_test_db().await))
}

/// Insert a `todo` task owned by `tenant` and return its id.
pub async fn seed_task(repo: &SqliteDependencyRepository, text: &str, tenant: Option<Uuid>) -> Uuid {
    seed_task_with_status(repo, text, tenant, TaskStatus::Todo).await
}

pub async fn seed_task_with_status(
    repo: &SqliteDependencyRepository,
    text: &str,
    tenant: Option<Uuid>,
    status: TaskStatus,
) -> Uuid {
    let mut task = TaskRef::new(text).with_status(status);
    task.tenant_id = tenant;
    repo.upsert_task(&task).await.expect("failed to seed task");
    task.id
}
