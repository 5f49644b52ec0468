use crate::{
    db_types::{AuditEntry, NewAuditEntry},
    traits::LedgerError,
};

/// Append-only audit sink.
#[allow(async_fn_in_trait)]
pub trait AuditLog {
    async fn append_audit_entry(&self, entry: NewAuditEntry) -> Result<AuditEntry, LedgerError>;

    async fn fetch_audit_entries_for(&self, target_entity: &str) -> Result<Vec<AuditEntry>, LedgerError>;
}
