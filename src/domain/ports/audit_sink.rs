//! Port for recording committed mutations.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::AuditRecord;

/// Destination for dependency audit records.
///
/// The sink is write-only; the service never reads records back.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Record a single audit entry.
    async fn record(&self, record: AuditRecord) -> DomainResult<()>;
}

/// Sink that drops every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAuditSink;

#[async_trait]
impl AuditSink for NullAuditSink {
    async fn record(&self, _record: AuditRecord) -> DomainResult<()> {
        Ok(())
    }
}
