//! Core types and data structures for statement reconciliation

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::amount::to_minor_units;

/// Declared format of an uploaded statement file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementFormat {
    /// Delimited text (CSV-style) export with one transaction per row
    Delimited,
    /// Structured financial-exchange text with repeated transaction blocks
    Exchange,
}

/// Direction of a statement line from the bank account's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Money into the account
    Credit,
    /// Money out of the account
    Debit,
}

/// Reconciliation status of a statement item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReconciliationStatus {
    /// Awaiting a payable linkage
    Pending,
    /// Linked to exactly one payable; always reversible
    Reconciled,
}

/// How a reconciliation was committed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReconciliationOrigin {
    /// Committed by the matching engine
    Automatic,
    /// Committed by a human reviewer
    Manual,
}

/// One canonical transaction line produced by the parser, before persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedLine {
    /// Transaction date
    pub date: NaiveDate,
    /// Free-text description from the source
    pub description: String,
    /// Document/reference number extracted from the source, if any
    pub document_ref: Option<String>,
    /// Credit or debit, derived uniformly regardless of source format
    pub direction: Direction,
    /// Non-negative magnitude in integer minor units
    pub amount_minor: i64,
    /// Running balance after the transaction, when the source carries one
    pub balance_minor: Option<i64>,
}

/// A recoverable per-line parse problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseIssue {
    /// 1-based source line number; for block formats, the line the
    /// enclosing block opens on
    pub line: usize,
    /// Field that failed to parse
    pub field: String,
    /// What went wrong, with expected vs actual where known
    pub message: String,
    /// Raw source text of the offending line
    pub raw: String,
}

/// Result of parsing one statement file: ordered lines plus recoverable issues
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseOutcome {
    /// Lines in source order
    pub lines: Vec<ParsedLine>,
    /// Per-line problems that did not abort the parse
    pub issues: Vec<ParseIssue>,
}

/// One ingested statement file and its aggregate metadata
///
/// Immutable once created; retained forever for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportBatch {
    /// Unique identifier
    pub id: Uuid,
    /// Owning bank account
    pub account_id: String,
    /// Source file name as uploaded
    pub file_name: String,
    /// Declared format of the source file
    pub format: StatementFormat,
    /// Content fingerprint used for idempotent re-import detection
    pub fingerprint: String,
    /// Number of successfully parsed lines
    pub line_count: usize,
    /// Sum of credit line amounts, minor units
    pub total_credit_minor: i64,
    /// Sum of debit line amounts, minor units
    pub total_debit_minor: i64,
    /// Earliest transaction date observed
    pub earliest_date: Option<NaiveDate>,
    /// Latest transaction date observed
    pub latest_date: Option<NaiveDate>,
    /// When the batch was created
    pub created_at: NaiveDateTime,
}

/// One transaction line extracted from a statement, with reconciliation state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementItem {
    /// Unique identifier
    pub id: Uuid,
    /// Owning import batch
    pub batch_id: Uuid,
    /// Stored order within the batch (source order)
    pub position: usize,
    /// Transaction date
    pub date: NaiveDate,
    /// Free-text description
    pub description: String,
    /// Document/reference number from the source, if any
    pub document_ref: Option<String>,
    /// Credit or debit
    pub direction: Direction,
    /// Non-negative magnitude in minor units
    pub amount_minor: i64,
    /// Running balance after the transaction, if the source carried one
    pub balance_minor: Option<i64>,
    /// Current reconciliation status
    pub status: ReconciliationStatus,
    /// Linked payable; `Some` iff status is `Reconciled`
    pub payable_id: Option<Uuid>,
    /// How the current linkage was committed
    pub origin: Option<ReconciliationOrigin>,
    /// When the current linkage was committed
    pub reconciled_at: Option<NaiveDateTime>,
    /// Who committed the current linkage ("system" for automatic)
    pub reconciled_by: Option<String>,
    /// Free-text note attached at commit time
    pub note: Option<String>,
}

impl StatementItem {
    /// Build a pending item from a parsed line
    pub fn from_parsed(batch_id: Uuid, position: usize, line: &ParsedLine) -> Self {
        Self {
            id: Uuid::new_v4(),
            batch_id,
            position,
            date: line.date,
            description: line.description.clone(),
            document_ref: line.document_ref.clone(),
            direction: line.direction,
            amount_minor: line.amount_minor,
            balance_minor: line.balance_minor,
            status: ReconciliationStatus::Pending,
            payable_id: None,
            origin: None,
            reconciled_at: None,
            reconciled_by: None,
            note: None,
        }
    }

    /// Whether the item still awaits reconciliation
    pub fn is_pending(&self) -> bool {
        self.status == ReconciliationStatus::Pending
    }
}

/// Criteria that can contribute to a candidate's score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchCriterion {
    /// Outstanding amount equals the item amount exactly (hard filter baseline)
    AmountExact,
    /// Transaction date within the tolerance window of the due/payment date
    DateProximity,
    /// Extracted document reference equals the payable's document number
    DocumentReference,
    /// Payable document number appears as a token of the item description
    DocumentInDescription,
    /// Token overlap between description and counterparty name
    DescriptionOverlap,
}

/// Descriptive snapshot of a payable, carried on candidates for review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayableSnapshot {
    /// Identifying document number (invoice number, bill number)
    pub document_number: String,
    /// Counterparty name
    pub counterparty: String,
    /// Due date of the obligation
    pub due_date: NaiveDate,
    /// Payment date, when one is recorded
    pub payment_date: Option<NaiveDate>,
    /// Total amount owed, minor units
    pub total_minor: i64,
    /// Amount already paid, minor units
    pub paid_minor: i64,
}

/// A scored, non-persisted proposal linking one item to one payable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    /// Proposed payable
    pub payable_id: Uuid,
    /// Total score across all fired criteria
    pub score: f64,
    /// Criteria that contributed, in scoring order
    pub criteria: Vec<MatchCriterion>,
    /// Absolute day difference used for date scoring and tie-breaking
    pub date_diff_days: i64,
    /// Payable snapshot for presentation to a reviewer
    pub payable: PayableSnapshot,
}

/// Action recorded by an audit entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditAction {
    Reconciled,
    Unreconciled,
}

/// Append-only record of one reconciliation event on one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Item the event belongs to
    pub item_id: Uuid,
    /// When the event happened
    pub timestamp: NaiveDateTime,
    /// Acting principal, or "system" for automatic commits
    pub principal: String,
    /// What happened
    pub action: AuditAction,
    /// Payable linked (on reconcile) or unlinked (on unreconcile)
    pub payable_id: Option<Uuid>,
    /// Free-text note supplied with the action
    pub note: Option<String>,
}

/// An outstanding obligation supplied by the external ledger service
///
/// Read-only from this subsystem: only its identifier is ever written back
/// into a statement item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payable {
    /// Unique identifier in the external ledger
    pub id: Uuid,
    /// Owning bank account
    pub account_id: String,
    /// Identifying document number
    pub document_number: String,
    /// Counterparty name
    pub counterparty: String,
    /// Due date
    pub due_date: NaiveDate,
    /// Payment date, when recorded
    pub payment_date: Option<NaiveDate>,
    /// Total amount owed
    pub total_amount: BigDecimal,
    /// Amount already paid
    pub paid_amount: BigDecimal,
}

impl Payable {
    /// Outstanding amount (total minus paid) in minor units
    ///
    /// Returns `None` when the decimal amounts do not fit minor units,
    /// which excludes the payable from matching rather than panicking.
    pub fn outstanding_minor(&self) -> Option<i64> {
        let outstanding = &self.total_amount - &self.paid_amount;
        to_minor_units(&outstanding)
    }

    /// Snapshot for candidate presentation
    pub fn snapshot(&self) -> PayableSnapshot {
        PayableSnapshot {
            document_number: self.document_number.clone(),
            counterparty: self.counterparty.clone(),
            due_date: self.due_date,
            payment_date: self.payment_date,
            total_minor: to_minor_units(&self.total_amount).unwrap_or(0),
            paid_minor: to_minor_units(&self.paid_amount).unwrap_or(0),
        }
    }

    /// Date the matcher compares against: payment date when set, else due date
    pub fn match_date(&self) -> NaiveDate {
        self.payment_date.unwrap_or(self.due_date)
    }
}

/// Errors that can occur in the reconciliation subsystem
#[derive(Debug, thiserror::Error)]
pub enum ReconError {
    /// No line of the file could be parsed
    #[error("statement could not be parsed: {} line error(s)", .issues.len())]
    Parse {
        /// Per-line problems collected before giving up
        issues: Vec<ParseIssue>,
    },
    /// Operation rejected; nothing was mutated
    #[error("validation failed: {0}")]
    Validation(String),
    /// Lost a commit-time race; the item stays pending and may be retried
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("import batch not found: {0}")]
    BatchNotFound(Uuid),
    #[error("statement item not found: {0}")]
    ItemNotFound(Uuid),
    #[error("payable not found: {0}")]
    PayableNotFound(Uuid),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Result type for reconciliation operations
pub type ReconResult<T> = Result<T, ReconError>;
