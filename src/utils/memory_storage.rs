//! In-memory storage implementation for testing and development

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::traits::*;
use crate::types::*;

/// In-memory reconciliation storage for testing and development
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    batches: Arc<RwLock<HashMap<Uuid, ImportBatch>>>,
    items: Arc<RwLock<HashMap<Uuid, StatementItem>>>,
    audit: Arc<RwLock<Vec<AuditEntry>>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        self.batches.write().unwrap().clear();
        self.items.write().unwrap().clear();
        self.audit.write().unwrap().clear();
    }
}

#[async_trait]
impl ReconciliationStorage for MemoryStorage {
    async fn save_import(
        &mut self,
        batch: &ImportBatch,
        items: &[StatementItem],
    ) -> ReconResult<()> {
        self.batches
            .write()
            .unwrap()
            .insert(batch.id, batch.clone());
        let mut store = self.items.write().unwrap();
        for item in items {
            store.insert(item.id, item.clone());
        }
        Ok(())
    }

    async fn get_batch(&self, batch_id: Uuid) -> ReconResult<Option<ImportBatch>> {
        Ok(self.batches.read().unwrap().get(&batch_id).cloned())
    }

    async fn find_batch_by_fingerprint(
        &self,
        account_id: &str,
        fingerprint: &str,
    ) -> ReconResult<Option<ImportBatch>> {
        Ok(self
            .batches
            .read()
            .unwrap()
            .values()
            .find(|b| b.account_id == account_id && b.fingerprint == fingerprint)
            .cloned())
    }

    async fn list_batches(&self, account_id: &str) -> ReconResult<Vec<ImportBatch>> {
        let mut batches: Vec<ImportBatch> = self
            .batches
            .read()
            .unwrap()
            .values()
            .filter(|b| b.account_id == account_id)
            .cloned()
            .collect();
        batches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(batches)
    }

    async fn get_item(&self, item_id: Uuid) -> ReconResult<Option<StatementItem>> {
        Ok(self.items.read().unwrap().get(&item_id).cloned())
    }

    async fn list_items(
        &self,
        batch_id: Uuid,
        status: Option<ReconciliationStatus>,
    ) -> ReconResult<Vec<StatementItem>> {
        let mut items: Vec<StatementItem> = self
            .items
            .read()
            .unwrap()
            .values()
            .filter(|i| i.batch_id == batch_id && status.is_none_or(|s| i.status == s))
            .cloned()
            .collect();
        items.sort_by_key(|i| i.position);
        Ok(items)
    }

    async fn update_item(&mut self, item: &StatementItem) -> ReconResult<()> {
        let mut store = self.items.write().unwrap();
        if store.contains_key(&item.id) {
            store.insert(item.id, item.clone());
            Ok(())
        } else {
            Err(ReconError::ItemNotFound(item.id))
        }
    }

    async fn is_payable_linked(&self, payable_id: Uuid) -> ReconResult<bool> {
        Ok(self.items.read().unwrap().values().any(|i| {
            i.status == ReconciliationStatus::Reconciled && i.payable_id == Some(payable_id)
        }))
    }

    async fn append_audit(&mut self, entry: &AuditEntry) -> ReconResult<()> {
        self.audit.write().unwrap().push(entry.clone());
        Ok(())
    }

    async fn list_audit(&self, item_id: Uuid) -> ReconResult<Vec<AuditEntry>> {
        let mut entries: Vec<AuditEntry> = self
            .audit
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.item_id == item_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.timestamp);
        Ok(entries)
    }
}

/// In-memory payable ledger standing in for the external ledger service
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    payables: Arc<RwLock<HashMap<Uuid, Payable>>>,
}

impl MemoryLedger {
    /// Create a new empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a payable
    pub fn put_payable(&self, payable: Payable) {
        self.payables.write().unwrap().insert(payable.id, payable);
    }

    /// Remove a payable, simulating settlement elsewhere
    pub fn remove_payable(&self, payable_id: Uuid) {
        self.payables.write().unwrap().remove(&payable_id);
    }
}

#[async_trait]
impl PayableLedger for MemoryLedger {
    async fn list_open_payables(&self, account_id: &str) -> ReconResult<Vec<Payable>> {
        let mut payables: Vec<Payable> = self
            .payables
            .read()
            .unwrap()
            .values()
            .filter(|p| {
                p.account_id == account_id && p.outstanding_minor().is_some_and(|o| o > 0)
            })
            .cloned()
            .collect();
        payables.sort_by_key(|p| p.id);
        Ok(payables)
    }

    async fn get_payable(&self, payable_id: Uuid) -> ReconResult<Option<Payable>> {
        Ok(self.payables.read().unwrap().get(&payable_id).cloned())
    }
}
