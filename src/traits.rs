//! Traits for storage abstraction and the external ledger boundary

use async_trait::async_trait;
use uuid::Uuid;

use crate::types::*;

/// Storage abstraction for import batches, statement items and audit entries
///
/// This trait allows the reconciliation core to work with any storage backend
/// (PostgreSQL, MySQL, SQLite, in-memory, etc.) by implementing these methods.
#[async_trait]
pub trait ReconciliationStorage: Send + Sync {
    /// Persist a batch and its items in one atomic operation
    async fn save_import(&mut self, batch: &ImportBatch, items: &[StatementItem])
        -> ReconResult<()>;

    /// Get a batch by ID
    async fn get_batch(&self, batch_id: Uuid) -> ReconResult<Option<ImportBatch>>;

    /// Find a batch by account and content fingerprint
    async fn find_batch_by_fingerprint(
        &self,
        account_id: &str,
        fingerprint: &str,
    ) -> ReconResult<Option<ImportBatch>>;

    /// List batches for an account, newest first
    async fn list_batches(&self, account_id: &str) -> ReconResult<Vec<ImportBatch>>;

    /// Get an item by ID
    async fn get_item(&self, item_id: Uuid) -> ReconResult<Option<StatementItem>>;

    /// List items for a batch in stored order, optionally filtered by status
    async fn list_items(
        &self,
        batch_id: Uuid,
        status: Option<ReconciliationStatus>,
    ) -> ReconResult<Vec<StatementItem>>;

    /// Update a statement item's reconciliation fields
    async fn update_item(&mut self, item: &StatementItem) -> ReconResult<()>;

    /// Whether any currently-reconciled item links the given payable
    async fn is_payable_linked(&self, payable_id: Uuid) -> ReconResult<bool>;

    /// Append an audit entry; entries are never edited or deleted
    async fn append_audit(&mut self, entry: &AuditEntry) -> ReconResult<()>;

    /// Audit entries for an item, ordered by timestamp
    async fn list_audit(&self, item_id: Uuid) -> ReconResult<Vec<AuditEntry>>;
}

/// Read-only view of the external ledger's payable obligations
///
/// This subsystem never mutates payable amounts; it only reads them and
/// writes a linkage back onto its own statement items.
#[async_trait]
pub trait PayableLedger: Send + Sync {
    /// Open (not fully settled) payables for one bank account
    async fn list_open_payables(&self, account_id: &str) -> ReconResult<Vec<Payable>>;

    /// Get one payable by ID
    async fn get_payable(&self, payable_id: Uuid) -> ReconResult<Option<Payable>>;
}
