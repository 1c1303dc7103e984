//! SQLite implementation of the DependencyRepository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use super::{parse_datetime, parse_optional_uuid, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{DependencyEdge, TaskRef, TaskStatus};
use crate::domain::ports::DependencyRepository;

/// Upper bound on `IN (...)` placeholders per statement.
const MAX_IN_PARAMS: usize = 500;

/// Message raised by the reverse-edge trigger (migration 002).
const REVERSE_EDGE_TRIGGER_MESSAGE: &str = "reverse dependency exists";

/// `DependencyRepository` backed by SQLite.
#[derive(Clone)]
pub struct SqliteDependencyRepository {
    pool: SqlitePool,
}

impl SqliteDependencyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or refresh a task row. Tasks are owned by the todo application;
    /// this exists for seeding and tests.
    pub async fn upsert_task(&self, task: &TaskRef) -> DomainResult<()> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"INSERT INTO tasks (id, team_id, text, status, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                   team_id = excluded.team_id,
                   text = excluded.text,
                   status = excluded.status,
                   updated_at = excluded.updated_at"#
        )
        .bind(task.id.to_string())
        .bind(task.tenant_id.map(|id| id.to_string()))
        .bind(&task.text)
        .bind(task.status.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Hard-delete a task row, leaving its edges in place.
    pub async fn delete_task(&self, task_id: Uuid) -> DomainResult<()> {
        sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(task_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Number of stored edges.
    pub async fn edge_count(&self) -> DomainResult<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM task_dependencies")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn fetch_edges(&self, column: &str, task_id: Uuid) -> DomainResult<Vec<DependencyEdge>> {
        let query = format!(
            "SELECT blocker_id, blocked_id, created_at FROM task_dependencies
             WHERE {column} = ? ORDER BY created_at, blocker_id, blocked_id"
        );

        let rows: Vec<DependencyRow> = sqlx::query_as(&query)
            .bind(task_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[async_trait]
impl DependencyRepository for SqliteDependencyRepository {
    async fn find_edges_by_blocker(&self, task_id: Uuid) -> DomainResult<Vec<DependencyEdge>> {
        self.fetch_edges("blocker_id", task_id).await
    }

    async fn find_edges_by_blocked(&self, task_id: Uuid) -> DomainResult<Vec<DependencyEdge>> {
        self.fetch_edges("blocked_id", task_id).await
    }

    async fn find_edges_by_blockers(&self, task_ids: &[Uuid]) -> DomainResult<Vec<DependencyEdge>> {
        let mut edges = Vec::new();

        for chunk in task_ids.chunks(MAX_IN_PARAMS) {
            let query = format!(
                "SELECT blocker_id, blocked_id, created_at FROM task_dependencies
                 WHERE blocker_id IN ({}) ORDER BY created_at, blocker_id, blocked_id",
                placeholders(chunk.len())
            );

            let mut q = sqlx::query_as::<_, DependencyRow>(&query);
            for id in chunk {
                q = q.bind(id.to_string());
            }

            for row in q.fetch_all(&self.pool).await? {
                edges.push(row.try_into()?);
            }
        }

        Ok(edges)
    }

    async fn find_tasks_by_ids(&self, ids: &HashSet<Uuid>) -> DomainResult<HashMap<Uuid, TaskRef>> {
        let ids: Vec<Uuid> = ids.iter().copied().collect();
        let mut tasks = HashMap::with_capacity(ids.len());

        for chunk in ids.chunks(MAX_IN_PARAMS) {
            let query = format!(
                "SELECT id, team_id, text, status FROM tasks WHERE id IN ({})",
                placeholders(chunk.len())
            );

            let mut q = sqlx::query_as::<_, TaskRow>(&query);
            for id in chunk {
                q = q.bind(id.to_string());
            }

            for row in q.fetch_all(&self.pool).await? {
                let task: TaskRef = row.try_into()?;
                tasks.insert(task.id, task);
            }
        }

        Ok(tasks)
    }

    async fn edge_exists(&self, blocker_id: Uuid, blocked_id: Uuid) -> DomainResult<bool> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM task_dependencies WHERE blocker_id = ? AND blocked_id = ?"
        )
        .bind(blocker_id.to_string())
        .bind(blocked_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    async fn insert_edge(&self, blocker_id: Uuid, blocked_id: Uuid) -> DomainResult<DependencyEdge> {
        let edge = DependencyEdge::new(blocker_id, blocked_id);

        // The reachability predicate runs inside the INSERT itself, so it is
        // evaluated under SQLite's write lock together with the write.
        let result = sqlx::query(
            r#"INSERT INTO task_dependencies (blocker_id, blocked_id, created_at)
               SELECT ?1, ?2, ?3
               WHERE NOT EXISTS (
                   WITH RECURSIVE reachable(id) AS (
                       SELECT ?2
                       UNION
                       SELECT d.blocked_id FROM task_dependencies d
                       INNER JOIN reachable r ON d.blocker_id = r.id
                   )
                   SELECT 1 FROM reachable WHERE id = ?1
               )"#
        )
        .bind(blocker_id.to_string())
        .bind(blocked_id.to_string())
        .bind(edge.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, blocker_id, blocked_id))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::DependencyCycle(vec![blocker_id, blocked_id, blocker_id]));
        }

        Ok(edge)
    }

    async fn delete_edge(&self, blocker_id: Uuid, blocked_id: Uuid) -> DomainResult<()> {
        sqlx::query("DELETE FROM task_dependencies WHERE blocker_id = ? AND blocked_id = ?")
            .bind(blocker_id.to_string())
            .bind(blocked_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_task_tenant(&self, task_id: Uuid) -> DomainResult<Option<Option<Uuid>>> {
        let row: Option<(Option<String>,)> = sqlx::query_as("SELECT team_id FROM tasks WHERE id = ?")
            .bind(task_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|(team_id,)| parse_optional_uuid(team_id)).transpose()
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn map_insert_error(err: sqlx::Error, blocker_id: Uuid, blocked_id: Uuid) -> DomainError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return DomainError::DuplicateDependency { blocker_id, blocked_id };
        }
        if db_err.is_check_violation() {
            return DomainError::Validation("A task cannot depend on itself".to_string());
        }
        if db_err.message().contains(REVERSE_EDGE_TRIGGER_MESSAGE) {
            return DomainError::DependencyCycle(vec![blocker_id, blocked_id, blocker_id]);
        }
    }
    DomainError::from(err)
}

#[derive(sqlx::FromRow)]
struct DependencyRow {
    blocker_id: String,
    blocked_id: String,
    created_at: String,
}

impl TryFrom<DependencyRow> for DependencyEdge {
    type Error = DomainError;

    fn try_from(row: DependencyRow) -> Result<Self, Self::Error> {
        Ok(DependencyEdge {
            blocker_id: parse_uuid(&row.blocker_id)?,
            blocked_id: parse_uuid(&row.blocked_id)?,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: String,
    team_id: Option<String>,
    text: String,
    status: String,
}

impl TryFrom<TaskRow> for TaskRef {
    type Error = DomainError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let status = TaskStatus::from_str(&row.status)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid status: {}", row.status)))?;

        Ok(TaskRef {
            id: parse_uuid(&row.id)?,
            tenant_id: parse_optional_uuid(row.team_id)?,
            text: row.text,
            status,
        })
    }
}
