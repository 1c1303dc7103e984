//! Task domain model.
//!
//! Tasks belong to the wider todo application. The dependency service only
//! reads their identity, owning team, display text and status.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a todo item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started
    #[default]
    Todo,
    /// Someone is working on it
    InProgress,
    /// Finished
    Done,
}

impl TaskStatus {
    /// Storage and wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    /// Parse a stored status name.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "todo" => Some(Self::Todo),
            "in_progress" | "in-progress" => Some(Self::InProgress),
            "done" | "completed" => Some(Self::Done),
            _ => None,
        }
    }

    /// Check if the task no longer holds up anything it blocks.
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The slice of a task the dependency graph needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRef {
    pub id: Uuid,
    /// Owning team; `None` for personal tasks.
    pub tenant_id: Option<Uuid>,
    pub text: String,
    pub status: TaskStatus,
}

impl TaskRef {
    /// Create a personal task with a fresh id and `todo` status.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: None,
            text: text.into(),
            status: TaskStatus::Todo,
        }
    }

    pub fn with_tenant(mut self, tenant_id: Uuid) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }
}
