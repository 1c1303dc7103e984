//! Dependency edges, the derived dependency view and request DTOs.
//!
//! An edge `blocker -> blocked` means the blocker must be finished before
//! the blocked task can proceed. Edges are never updated in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task::TaskStatus;
use crate::domain::errors::{DomainError, DomainResult};

/// Text shown for an edge whose opposite task no longer exists.
pub const UNKNOWN_TASK_TEXT: &str = "Unknown task";

/// A persisted "blocker must finish before blocked" edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub blocker_id: Uuid,
    pub blocked_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl DependencyEdge {
    pub fn new(blocker_id: Uuid, blocked_id: Uuid) -> Self {
        Self {
            blocker_id,
            blocked_id,
            created_at: Utc::now(),
        }
    }
}

/// One row of a dependency view, enriched with the opposite task's details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEntry {
    pub blocker_id: Uuid,
    pub blocked_id: Uuid,
    pub task_text: String,
    pub task_status: TaskStatus,
}

/// What a task blocks and what blocks it. Recomputed on every query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyView {
    pub blocks: Vec<DependencyEntry>,
    #[serde(rename = "blockedBy")]
    pub blocked_by: Vec<DependencyEntry>,
    /// True while at least one blocker is not done.
    pub is_blocked: bool,
}

/// Caller identity as far as tenancy is concerned.
///
/// Set by the authentication layer in front of this service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TenantContext {
    pub tenant_id: Option<Uuid>,
}

impl TenantContext {
    pub fn new(tenant_id: Option<Uuid>) -> Self {
        Self { tenant_id }
    }

    pub fn team(tenant_id: Uuid) -> Self {
        Self {
            tenant_id: Some(tenant_id),
        }
    }
}

/// Body of `POST /dependencies`.
///
/// Ids arrive as raw strings so that missing and malformed values can be
/// reported as validation errors instead of body rejections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateDependencyRequest {
    #[serde(default)]
    pub blocker_id: Option<String>,
    #[serde(default)]
    pub blocked_id: Option<String>,
}

/// Body of `DELETE /dependencies`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteDependencyRequest {
    #[serde(default)]
    pub blocker_id: Option<String>,
    #[serde(default)]
    pub blocked_id: Option<String>,
}

impl CreateDependencyRequest {
    pub fn new(blocker_id: impl ToString, blocked_id: impl ToString) -> Self {
        Self {
            blocker_id: Some(blocker_id.to_string()),
            blocked_id: Some(blocked_id.to_string()),
        }
    }

    /// Parse both ids and reject self-dependencies.
    pub fn validate(&self) -> DomainResult<EdgeKey> {
        EdgeKey::parse(self.blocker_id.as_deref(), self.blocked_id.as_deref())
    }
}

impl DeleteDependencyRequest {
    pub fn new(blocker_id: impl ToString, blocked_id: impl ToString) -> Self {
        Self {
            blocker_id: Some(blocker_id.to_string()),
            blocked_id: Some(blocked_id.to_string()),
        }
    }

    pub fn validate(&self) -> DomainResult<EdgeKey> {
        EdgeKey::parse(self.blocker_id.as_deref(), self.blocked_id.as_deref())
    }
}

/// A validated (blocker, blocked) pair with distinct endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeKey {
    pub blocker_id: Uuid,
    pub blocked_id: Uuid,
}

impl EdgeKey {
    fn parse(blocker_id: Option<&str>, blocked_id: Option<&str>) -> DomainResult<Self> {
        let blocker_id = parse_task_id("blocker_id", blocker_id)?;
        let blocked_id = parse_task_id("blocked_id", blocked_id)?;

        if blocker_id == blocked_id {
            return Err(DomainError::Validation(
                "A task cannot depend on itself".to_string(),
            ));
        }

        Ok(Self {
            blocker_id,
            blocked_id,
        })
    }
}

/// Parse a task id in canonical hyphenated form (8-4-4-4-12 hex digits).
///
/// `Uuid::parse_str` also accepts the simple, braced and URN forms, which
/// the API does not.
pub fn parse_task_id(field: &str, raw: Option<&str>) -> DomainResult<Uuid> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| DomainError::Validation(format!("{field} is required")))?;

    if !is_canonical_uuid(raw) {
        return Err(DomainError::Validation(format!(
            "{field} must be a valid UUID"
        )));
    }

    Uuid::parse_str(raw).map_err(|_| DomainError::Validation(format!("{field} must be a valid UUID")))
}

fn is_canonical_uuid(s: &str) -> bool {
    const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];

    let parts: Vec<&str> = s.split('-').collect();
    parts.len() == GROUPS.len()
        && parts
            .iter()
            .zip(GROUPS)
            .all(|(part, len)| part.len() == len && part.bytes().all(|b| b.is_ascii_hexdigit()))
}
