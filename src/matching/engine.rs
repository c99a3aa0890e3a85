//! Automatic matching engine
//!
//! Orchestrates reconciliation for an entire import batch: greedy,
//! uniqueness-constrained assignment over pending items in stored order.
//! Deliberately not an optimal bipartite matching; the greedy pass is
//! deterministic and its decisions are explainable per item.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::matching::{find_candidates, MatchingConfig};
use crate::reconciliation::{ReconciliationManager, SYSTEM_PRINCIPAL};
use crate::traits::{PayableLedger, ReconciliationStorage};
use crate::types::*;

/// Outcome of one item's match attempt during an engine run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ItemOutcome {
    /// Committed automatically against the given payable
    Reconciled { payable_id: Uuid, score: f64 },
    /// Best candidate did not clear the acceptance threshold
    BelowThreshold { best_score: f64 },
    /// No payable survived the hard filter
    NoCandidates,
    /// Commit was rejected (validation or conflict); the item stays pending
    Failed { reason: String },
}

/// Per-item result of an engine run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMatchResult {
    pub item_id: Uuid,
    pub outcome: ItemOutcome,
}

/// Summary of one automatic matching run over a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingReport {
    /// Pending items examined
    pub analyzed: usize,
    /// Items committed during this run
    pub reconciled: usize,
    /// Items left pending after this run
    pub still_pending: usize,
    /// Per-item outcomes in stored item order
    pub results: Vec<ItemMatchResult>,
}

/// Automatic matching over one import batch
pub struct MatchingEngine<S: ReconciliationStorage, L: PayableLedger> {
    storage: S,
    ledger: L,
    manager: ReconciliationManager<S, L>,
}

impl<S, L> MatchingEngine<S, L>
where
    S: ReconciliationStorage + Clone,
    L: PayableLedger + Clone,
{
    /// Create a new engine over the given storage and ledger backends
    pub fn new(storage: S, ledger: L) -> Self {
        Self {
            storage: storage.clone(),
            ledger: ledger.clone(),
            manager: ReconciliationManager::new(storage, ledger),
        }
    }

    /// Run automatic matching for every pending item of a batch
    ///
    /// Items are processed in stable stored order and each accepted payable
    /// is removed from the in-run pool, so no payable is assigned twice in
    /// one run and reruns over the same inputs produce the same assignment.
    /// The authoritative uniqueness and amount checks happen again inside
    /// the state machine at commit time; a rejected commit leaves that item
    /// pending and never aborts the rest of the batch.
    pub async fn run(
        &mut self,
        batch_id: Uuid,
        config: &MatchingConfig,
    ) -> ReconResult<MatchingReport> {
        let batch = self
            .storage
            .get_batch(batch_id)
            .await?
            .ok_or(ReconError::BatchNotFound(batch_id))?;

        let pending = self
            .storage
            .list_items(batch_id, Some(ReconciliationStatus::Pending))
            .await?;

        // Read once at the start of the run; payables linked by other
        // batches drop out here, and commit-time checks close the rest of
        // the race window
        let mut pool = Vec::new();
        for payable in self.ledger.list_open_payables(&batch.account_id).await? {
            if !self.storage.is_payable_linked(payable.id).await? {
                pool.push(payable);
            }
        }

        info!(
            %batch_id,
            pending = pending.len(),
            open_payables = pool.len(),
            "starting automatic matching"
        );

        let mut results = Vec::with_capacity(pending.len());
        let mut reconciled = 0usize;

        for item in &pending {
            let outcome = self.match_item(item, &mut pool, config).await;
            if matches!(outcome, ItemOutcome::Reconciled { .. }) {
                reconciled += 1;
            }
            results.push(ItemMatchResult {
                item_id: item.id,
                outcome,
            });
        }

        let report = MatchingReport {
            analyzed: pending.len(),
            reconciled,
            still_pending: pending.len() - reconciled,
            results,
        };
        info!(
            %batch_id,
            analyzed = report.analyzed,
            reconciled = report.reconciled,
            still_pending = report.still_pending,
            "automatic matching finished"
        );
        Ok(report)
    }

    async fn match_item(
        &mut self,
        item: &StatementItem,
        pool: &mut Vec<Payable>,
        config: &MatchingConfig,
    ) -> ItemOutcome {
        let candidates = find_candidates(item, pool, config);
        let Some(top) = candidates.first() else {
            debug!(item_id = %item.id, "no candidates");
            return ItemOutcome::NoCandidates;
        };

        if top.score < config.acceptance_threshold {
            debug!(
                item_id = %item.id,
                best_score = top.score,
                threshold = config.acceptance_threshold,
                "best candidate below threshold"
            );
            return ItemOutcome::BelowThreshold {
                best_score: top.score,
            };
        }

        match self
            .manager
            .reconcile(
                item.id,
                top.payable_id,
                ReconciliationOrigin::Automatic,
                SYSTEM_PRINCIPAL,
                None,
            )
            .await
        {
            Ok(_) => {
                // Uniqueness within the run: the accepted payable leaves the pool
                let payable_id = top.payable_id;
                pool.retain(|p| p.id != payable_id);
                ItemOutcome::Reconciled {
                    payable_id,
                    score: top.score,
                }
            }
            Err(err) => {
                warn!(item_id = %item.id, payable_id = %top.payable_id, %err, "commit rejected");
                ItemOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }
}
