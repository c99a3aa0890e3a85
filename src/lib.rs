//! # Recon Core
//!
//! Bank statement ingestion and payables reconciliation.
//!
//! ## Features
//!
//! - **Statement parsing**: delimited-text and structured-exchange files
//!   resolve to one canonical line shape, with recoverable per-line errors
//! - **Idempotent imports**: a byte-identical re-upload returns the existing
//!   batch instead of duplicating items
//! - **Candidate scoring**: exact-amount hard filter plus weighted date,
//!   document and description criteria, explainable to a reviewer
//! - **Automatic matching**: greedy, uniqueness-constrained and
//!   deterministic over a batch's pending items
//! - **Reversible reconciliation**: a pending/reconciled state machine with
//!   commit-time re-validation and an append-only audit trail
//! - **Storage abstraction**: database-agnostic design with trait-based
//!   storage and a read-only external ledger boundary
//!
//! ## Quick Start
//!
//! ```rust
//! use recon_core::{ImportManager, StatementFormat};
//! use recon_core::parser::DelimitedConfig;
//! use recon_core::utils::MemoryStorage;
//!
//! # async fn demo() -> recon_core::ReconResult<()> {
//! let mut imports = ImportManager::new(MemoryStorage::new());
//! let outcome = imports
//!     .import_statement(
//!         "acct-1",
//!         "march.csv",
//!         StatementFormat::Delimited,
//!         b"date,description,amount\n2024-03-10,PAYMENT INV 4521,-150.00\n",
//!         &DelimitedConfig::default(),
//!     )
//!     .await?;
//! assert_eq!(outcome.items_created, 1);
//! # Ok(())
//! # }
//! ```

pub mod import;
pub mod matching;
pub mod parser;
pub mod reconciliation;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use import::{ImportManager, ImportOutcome};
pub use matching::{
    find_candidates, ItemMatchResult, ItemOutcome, MatchingConfig, MatchingEngine, MatchingReport,
};
pub use reconciliation::{ReconciliationManager, SYSTEM_PRINCIPAL};
pub use traits::*;
pub use types::*;
