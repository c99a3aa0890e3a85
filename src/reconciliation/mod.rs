//! Reconciliation state machine and audit trail
//!
//! The authoritative per-item status logic. Two states, `Pending` and
//! `Reconciled`, and two transitions; neither state is terminal. Every
//! transition re-validates against the persisted payable at commit time (the
//! candidate scores may be stale by then) and appends an audit entry.

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::matching::{find_candidates, MatchingConfig};
use crate::traits::{PayableLedger, ReconciliationStorage};
use crate::types::*;

/// Principal recorded for commits made by the matching engine
pub const SYSTEM_PRINCIPAL: &str = "system";

/// Manager for reconciliation transitions and review queries
pub struct ReconciliationManager<S: ReconciliationStorage, L: PayableLedger> {
    storage: S,
    ledger: L,
}

impl<S: ReconciliationStorage, L: PayableLedger> ReconciliationManager<S, L> {
    /// Create a new manager over the given storage and ledger backends
    pub fn new(storage: S, ledger: L) -> Self {
        Self { storage, ledger }
    }

    /// Transition an item from pending to reconciled against one payable
    ///
    /// Fails with a validation error if the item is already reconciled, is
    /// a credit line, or the payable's outstanding amount no longer equals
    /// the item amount, and with a conflict error if another reconciled
    /// item already links the payable. Nothing is mutated on failure.
    pub async fn reconcile(
        &mut self,
        item_id: Uuid,
        payable_id: Uuid,
        origin: ReconciliationOrigin,
        principal: &str,
        note: Option<String>,
    ) -> ReconResult<StatementItem> {
        let mut item = self.get_item_required(item_id).await?;
        if !item.is_pending() {
            return Err(ReconError::Validation(format!(
                "item {item_id} is already reconciled"
            )));
        }

        // Payables are settled by outflows; the candidate finder never
        // proposes a credit line, and the manual path is held to the same rule
        if item.direction != Direction::Debit {
            return Err(ReconError::Validation(format!(
                "item {item_id} is a credit line and cannot settle a payable"
            )));
        }

        let payable = self
            .ledger
            .get_payable(payable_id)
            .await?
            .ok_or(ReconError::PayableNotFound(payable_id))?;

        let batch = self
            .storage
            .get_batch(item.batch_id)
            .await?
            .ok_or(ReconError::BatchNotFound(item.batch_id))?;
        if payable.account_id != batch.account_id {
            return Err(ReconError::Validation(format!(
                "payable {payable_id} belongs to account '{}', item to '{}'",
                payable.account_id, batch.account_id
            )));
        }

        // Re-validated here, not just at candidate-scoring time, to guard
        // against the payable changing under a concurrent run
        let outstanding = payable.outstanding_minor().ok_or_else(|| {
            ReconError::Validation(format!("payable {payable_id} amount out of range"))
        })?;
        if outstanding != item.amount_minor {
            return Err(ReconError::Validation(format!(
                "payable {payable_id} outstanding amount {} does not equal item amount {}",
                outstanding, item.amount_minor
            )));
        }

        if self.storage.is_payable_linked(payable_id).await? {
            return Err(ReconError::Conflict(format!(
                "payable {payable_id} is already linked to a reconciled item"
            )));
        }

        let now = Utc::now().naive_utc();
        item.status = ReconciliationStatus::Reconciled;
        item.payable_id = Some(payable_id);
        item.origin = Some(origin);
        item.reconciled_at = Some(now);
        item.reconciled_by = Some(principal.to_string());
        item.note = note.clone();
        self.storage.update_item(&item).await?;

        self.storage
            .append_audit(&AuditEntry {
                item_id,
                timestamp: now,
                principal: principal.to_string(),
                action: AuditAction::Reconciled,
                payable_id: Some(payable_id),
                note,
            })
            .await?;

        info!(%item_id, %payable_id, ?origin, "item reconciled");
        Ok(item)
    }

    /// Transition an item from reconciled back to pending
    ///
    /// Always permitted for reconciled items regardless of prior origin;
    /// reconciliation is advisory bookkeeping, not a ledger commitment.
    pub async fn unreconcile(
        &mut self,
        item_id: Uuid,
        principal: &str,
        note: Option<String>,
    ) -> ReconResult<StatementItem> {
        let mut item = self.get_item_required(item_id).await?;
        if item.is_pending() {
            return Err(ReconError::Validation(format!(
                "item {item_id} is not reconciled"
            )));
        }

        let unlinked = item.payable_id;
        item.status = ReconciliationStatus::Pending;
        item.payable_id = None;
        item.origin = None;
        item.reconciled_at = None;
        item.reconciled_by = None;
        item.note = None;
        self.storage.update_item(&item).await?;

        self.storage
            .append_audit(&AuditEntry {
                item_id,
                timestamp: Utc::now().naive_utc(),
                principal: principal.to_string(),
                action: AuditAction::Unreconciled,
                payable_id: unlinked,
                note,
            })
            .await?;

        info!(%item_id, payable_id = ?unlinked, "item unreconciled");
        Ok(item)
    }

    /// Ranked match candidates for one pending item, for manual review
    pub async fn list_candidates(
        &self,
        item_id: Uuid,
        config: &MatchingConfig,
    ) -> ReconResult<Vec<MatchCandidate>> {
        let item = self.get_item_required(item_id).await?;
        if !item.is_pending() {
            return Err(ReconError::Validation(format!(
                "item {item_id} is already reconciled"
            )));
        }

        let batch = self
            .storage
            .get_batch(item.batch_id)
            .await?
            .ok_or(ReconError::BatchNotFound(item.batch_id))?;
        let payables = self.ledger.list_open_payables(&batch.account_id).await?;

        let mut unlinked = Vec::with_capacity(payables.len());
        for payable in payables {
            if !self.storage.is_payable_linked(payable.id).await? {
                unlinked.push(payable);
            }
        }

        debug!(%item_id, payables = unlinked.len(), "listing candidates");
        Ok(find_candidates(&item, &unlinked, config))
    }

    /// Audit entries for one item, ordered by timestamp
    pub async fn audit_trail(&self, item_id: Uuid) -> ReconResult<Vec<AuditEntry>> {
        self.get_item_required(item_id).await?;
        self.storage.list_audit(item_id).await
    }

    async fn get_item_required(&self, item_id: Uuid) -> ReconResult<StatementItem> {
        self.storage
            .get_item(item_id)
            .await?
            .ok_or(ReconError::ItemNotFound(item_id))
    }
}
