//! Audit records for dependency mutations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Type of dependency mutation being audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    DependencyCreated,
    DependencyRemoved,
}

impl AuditAction {
    /// Stable name used in logs and audit files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DependencyCreated => "dependency_created",
            Self::DependencyRemoved => "dependency_removed",
        }
    }
}

/// Write-only record handed to an `AuditSink`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub action: AuditAction,
    pub blocker_id: Uuid,
    pub blocked_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(action: AuditAction, blocker_id: Uuid, blocked_id: Uuid, tenant_id: Option<Uuid>) -> Self {
        Self {
            action,
            blocker_id,
            blocked_id,
            tenant_id,
            timestamp: Utc::now(),
        }
    }
}
