//! Audit sinks for dependency mutations.
//!
//! Both sinks emit a structured `info!` event on the `audit` target. The
//! JSONL sink additionally appends one JSON object per line to a file.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::AuditRecord;
use crate::domain::ports::AuditSink;

fn emit(record: &AuditRecord) {
    info!(
        target: "audit",
        action = record.action.as_str(),
        blocker_id = %record.blocker_id,
        blocked_id = %record.blocked_id,
        tenant_id = ?record.tenant_id,
        timestamp = %record.timestamp.to_rfc3339(),
        "audit event"
    );
}

/// Sink that only writes to the tracing pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, record: AuditRecord) -> DomainResult<()> {
        emit(&record);
        Ok(())
    }
}

/// Append-only JSON lines audit trail.
#[derive(Clone)]
pub struct JsonlAuditSink {
    path: PathBuf,
    log_file: Arc<Mutex<File>>,
}

impl JsonlAuditSink {
    /// Open `log_path` for appending, creating parent directories.
    pub async fn new(log_path: impl AsRef<Path>) -> Result<Self> {
        let log_path = log_path.as_ref();

        if let Some(parent) = log_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .context("failed to create audit log directory")?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .with_context(|| format!("failed to open audit log file {}", log_path.display()))?;

        Ok(Self {
            path: log_path.to_path_buf(),
            log_file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditSink for JsonlAuditSink {
    async fn record(&self, record: AuditRecord) -> DomainResult<()> {
        let json = serde_json::to_string(&record)?;

        {
            let mut file = self
                .log_file
                .lock()
                .map_err(|e| DomainError::DatabaseError(format!("audit log mutex poisoned: {e}")))?;
            writeln!(file, "{json}")
                .and_then(|()| file.flush())
                .map_err(|e| DomainError::DatabaseError(format!("failed to write audit record: {e}")))?;
        }

        emit(&record);
        Ok(())
    }
}
