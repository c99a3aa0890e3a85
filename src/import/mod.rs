//! Statement import repository
//!
//! Creates one import batch plus its pending statement items from a parsed
//! file, idempotently: a byte-identical statement re-imported against the
//! same account returns the existing batch instead of duplicating items.

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use crate::parser::{self, DelimitedConfig};
use crate::traits::ReconciliationStorage;
use crate::types::*;

/// Result of submitting a statement for import
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOutcome {
    /// The created batch, or the pre-existing one on a duplicate upload
    pub batch: ImportBatch,
    /// Items created by this call; zero on a duplicate upload
    pub items_created: usize,
    /// Recoverable per-line problems from parsing
    pub parse_issues: Vec<ParseIssue>,
    /// Whether the file matched an existing batch's fingerprint
    pub deduplicated: bool,
}

/// Manager for import batch creation and listing
pub struct ImportManager<S: ReconciliationStorage> {
    storage: S,
}

impl<S: ReconciliationStorage> ImportManager<S> {
    /// Create a new import manager over the given storage backend
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Parse a submitted file and create its import batch
    ///
    /// Returns `ReconError::Parse` when no line of the file is usable;
    /// otherwise per-line problems ride along on the outcome.
    pub async fn import_statement(
        &mut self,
        account_id: &str,
        file_name: &str,
        format: StatementFormat,
        bytes: &[u8],
        config: &DelimitedConfig,
    ) -> ReconResult<ImportOutcome> {
        let parsed = parser::parse(bytes, format, config)?;
        let mut outcome = self
            .create_import(account_id, file_name, format, &parsed.lines)
            .await?;
        outcome.parse_issues = parsed.issues;
        Ok(outcome)
    }

    /// Create a batch and its pending items from already-parsed lines
    pub async fn create_import(
        &mut self,
        account_id: &str,
        file_name: &str,
        format: StatementFormat,
        lines: &[ParsedLine],
    ) -> ReconResult<ImportOutcome> {
        if lines.is_empty() {
            return Err(ReconError::Validation(
                "cannot create an import with no lines".to_string(),
            ));
        }

        let fingerprint = content_fingerprint(account_id, lines);
        if let Some(existing) = self
            .storage
            .find_batch_by_fingerprint(account_id, &fingerprint)
            .await?
        {
            debug!(account_id, batch_id = %existing.id, "duplicate upload, reusing batch");
            return Ok(ImportOutcome {
                batch: existing,
                items_created: 0,
                parse_issues: Vec::new(),
                deduplicated: true,
            });
        }

        let mut total_credit_minor = 0i64;
        let mut total_debit_minor = 0i64;
        for line in lines {
            match line.direction {
                Direction::Credit => total_credit_minor += line.amount_minor,
                Direction::Debit => total_debit_minor += line.amount_minor,
            }
        }

        let batch = ImportBatch {
            id: Uuid::new_v4(),
            account_id: account_id.to_string(),
            file_name: file_name.to_string(),
            format,
            fingerprint,
            line_count: lines.len(),
            total_credit_minor,
            total_debit_minor,
            earliest_date: lines.iter().map(|l| l.date).min(),
            latest_date: lines.iter().map(|l| l.date).max(),
            created_at: Utc::now().naive_utc(),
        };

        let items: Vec<StatementItem> = lines
            .iter()
            .enumerate()
            .map(|(position, line)| StatementItem::from_parsed(batch.id, position, line))
            .collect();

        self.storage.save_import(&batch, &items).await?;
        info!(
            account_id,
            batch_id = %batch.id,
            items = items.len(),
            "import batch created"
        );

        Ok(ImportOutcome {
            batch,
            items_created: items.len(),
            parse_issues: Vec::new(),
            deduplicated: false,
        })
    }

    /// List import batches for an account, newest first
    pub async fn list_imports(&self, account_id: &str) -> ReconResult<Vec<ImportBatch>> {
        self.storage.list_batches(account_id).await
    }

    /// List statement items for a batch in stored order
    pub async fn list_items(
        &self,
        batch_id: Uuid,
        status: Option<ReconciliationStatus>,
    ) -> ReconResult<Vec<StatementItem>> {
        self.get_batch_required(batch_id).await?;
        self.storage.list_items(batch_id, status).await
    }

    /// Get a batch by ID, returning an error if not found
    pub async fn get_batch_required(&self, batch_id: Uuid) -> ReconResult<ImportBatch> {
        self.storage
            .get_batch(batch_id)
            .await?
            .ok_or(ReconError::BatchNotFound(batch_id))
    }

    /// Get an item by ID, returning an error if not found
    pub async fn get_item_required(&self, item_id: Uuid) -> ReconResult<StatementItem> {
        self.storage
            .get_item(item_id)
            .await?
            .ok_or(ReconError::ItemNotFound(item_id))
    }
}

/// Hash of the account id plus the canonical parsed line set
fn content_fingerprint(account_id: &str, lines: &[ParsedLine]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(account_id.as_bytes());
    for line in lines {
        hasher.update(b"\x1e");
        hasher.update(line.date.to_string().as_bytes());
        hasher.update(match line.direction {
            Direction::Credit => b"C",
            Direction::Debit => b"D",
        });
        hasher.update(line.amount_minor.to_le_bytes());
        hasher.update(line.description.as_bytes());
        if let Some(reference) = &line.document_ref {
            hasher.update(b"\x1f");
            hasher.update(reference.as_bytes());
        }
    }
    hex::encode(hasher.finalize())
}
