//! Integration tests for recon-core

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use recon_core::parser::DelimitedConfig;
use recon_core::utils::{MemoryLedger, MemoryStorage};
use recon_core::{
    AuditAction, Direction, ImportManager, ItemOutcome, MatchCriterion, MatchingConfig,
    MatchingEngine, Payable, ReconciliationManager, ReconciliationOrigin, ReconciliationStatus,
    StatementFormat, SYSTEM_PRINCIPAL,
};
use std::str::FromStr;
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn payable(
    account_id: &str,
    document: &str,
    counterparty: &str,
    due: NaiveDate,
    total: &str,
) -> Payable {
    Payable {
        id: Uuid::new_v4(),
        account_id: account_id.to_string(),
        document_number: document.to_string(),
        counterparty: counterparty.to_string(),
        due_date: due,
        payment_date: None,
        total_amount: BigDecimal::from_str(total).unwrap(),
        paid_amount: BigDecimal::from(0),
    }
}

#[tokio::test]
async fn test_complete_reconciliation_workflow() {
    let storage = MemoryStorage::new();
    let ledger = MemoryLedger::new();

    let inv_payable = payable("acct-1", "4521", "ACME SUPPLIES", date(2024, 3, 8), "150.00");
    // Due three days off and with an unrelated description, the rent line
    // scores below the acceptance threshold and is left for manual review
    let rent_payable = payable("acct-1", "RENT-03", "CITY PROPERTIES", date(2024, 3, 15), "1200.00");
    ledger.put_payable(inv_payable.clone());
    ledger.put_payable(rent_payable.clone());

    // Import a statement with one automatic match, one manual-review line
    // and one credit line
    let csv = "date,description,amount\n\
        2024-03-10,PAYMENT INV 4521,-150.00\n\
        2024-03-12,STANDING ORDER 77812,-1200.00\n\
        2024-03-13,SALARY,2500.00\n";
    let mut imports = ImportManager::new(storage.clone());
    let outcome = imports
        .import_statement(
            "acct-1",
            "march.csv",
            StatementFormat::Delimited,
            csv.as_bytes(),
            &DelimitedConfig::default(),
        )
        .await
        .unwrap();
    assert_eq!(outcome.items_created, 3);
    assert_eq!(outcome.batch.total_debit_minor, 135000);
    assert_eq!(outcome.batch.total_credit_minor, 250000);

    // Automatic matching picks up the invoice line
    let mut engine = MatchingEngine::new(storage.clone(), ledger.clone());
    let report = engine
        .run(outcome.batch.id, &MatchingConfig::default())
        .await
        .unwrap();
    assert_eq!(report.analyzed, 3);
    assert_eq!(report.reconciled, 1);
    assert_eq!(report.still_pending, 2);
    assert!(matches!(
        report.results[0].outcome,
        ItemOutcome::Reconciled { payable_id, .. } if payable_id == inv_payable.id
    ));

    let items = imports.list_items(outcome.batch.id, None).await.unwrap();
    let invoice_item = &items[0];
    assert_eq!(invoice_item.status, ReconciliationStatus::Reconciled);
    assert_eq!(invoice_item.origin, Some(ReconciliationOrigin::Automatic));
    assert_eq!(invoice_item.reconciled_by.as_deref(), Some(SYSTEM_PRINCIPAL));

    // The reviewer resolves the standing order by hand
    let mut manager = ReconciliationManager::new(storage.clone(), ledger.clone());
    let rent_item = &items[1];
    let candidates = manager
        .list_candidates(rent_item.id, &MatchingConfig::default())
        .await
        .unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].payable_id, rent_payable.id);
    assert!(candidates[0].criteria.contains(&MatchCriterion::AmountExact));

    manager
        .reconcile(
            rent_item.id,
            rent_payable.id,
            ReconciliationOrigin::Manual,
            "alice",
            Some("rent for march".to_string()),
        )
        .await
        .unwrap();

    // The credit line never gets candidates
    let salary_item = &items[2];
    assert_eq!(salary_item.direction, Direction::Credit);
    let salary_candidates = manager
        .list_candidates(salary_item.id, &MatchingConfig::default())
        .await
        .unwrap();
    assert!(salary_candidates.is_empty());

    // No payable is linked from two reconciled items
    let reconciled = imports
        .list_items(outcome.batch.id, Some(ReconciliationStatus::Reconciled))
        .await
        .unwrap();
    let mut linked: Vec<Uuid> = reconciled.iter().filter_map(|i| i.payable_id).collect();
    linked.sort();
    linked.dedup();
    assert_eq!(linked.len(), reconciled.len());

    // Undo the manual match; the round trip leaves exactly two audit entries
    let reverted = manager.unreconcile(rent_item.id, "alice", None).await.unwrap();
    assert!(reverted.is_pending());
    assert_eq!(reverted.payable_id, None);
    let trail = manager.audit_trail(rent_item.id).await.unwrap();
    assert_eq!(trail.len(), 2);
    assert_eq!(trail[0].action, AuditAction::Reconciled);
    assert_eq!(trail[1].action, AuditAction::Unreconciled);
    assert_eq!(trail[1].payable_id, Some(rent_payable.id));
}

#[tokio::test]
async fn test_exchange_format_end_to_end() {
    let storage = MemoryStorage::new();
    let ledger = MemoryLedger::new();
    let p = payable("acct-1", "INV-88", "NORTHWIND", date(2024, 3, 10), "75.50");
    ledger.put_payable(p.clone());

    let ofx = "\
<OFX>
<BANKTRANLIST>
<STMTTRN>
<TRNTYPE>DEBIT
<DTPOSTED>20240310
<TRNAMT>-75.50
<NAME>NORTHWIND
<CHECKNUM>INV-88
</STMTTRN>
</BANKTRANLIST>
</OFX>";

    let mut imports = ImportManager::new(storage.clone());
    let outcome = imports
        .import_statement(
            "acct-1",
            "march.ofx",
            StatementFormat::Exchange,
            ofx.as_bytes(),
            &DelimitedConfig::default(),
        )
        .await
        .unwrap();

    let items = imports.list_items(outcome.batch.id, None).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].direction, Direction::Debit);
    assert_eq!(items[0].amount_minor, 7550);
    assert_eq!(items[0].document_ref.as_deref(), Some("INV-88"));

    let mut engine = MatchingEngine::new(storage.clone(), ledger);
    let report = engine
        .run(outcome.batch.id, &MatchingConfig::default())
        .await
        .unwrap();
    assert_eq!(report.reconciled, 1);
    assert!(matches!(
        report.results[0].outcome,
        ItemOutcome::Reconciled { payable_id, .. } if payable_id == p.id
    ));
}

#[tokio::test]
async fn test_reimport_never_duplicates_a_batch() {
    let storage = MemoryStorage::new();
    let csv = "date,description,amount\n2024-03-10,COFFEE,-4.50\n";
    let mut imports = ImportManager::new(storage);

    let first = imports
        .import_statement(
            "acct-1",
            "a.csv",
            StatementFormat::Delimited,
            csv.as_bytes(),
            &DelimitedConfig::default(),
        )
        .await
        .unwrap();
    let second = imports
        .import_statement(
            "acct-1",
            "a-copy.csv",
            StatementFormat::Delimited,
            csv.as_bytes(),
            &DelimitedConfig::default(),
        )
        .await
        .unwrap();

    assert!(second.deduplicated);
    assert_eq!(first.batch.id, second.batch.id);
    assert_eq!(imports.list_imports("acct-1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_rerunning_matching_changes_nothing() {
    let storage = MemoryStorage::new();
    let ledger = MemoryLedger::new();
    ledger.put_payable(payable(
        "acct-1",
        "4521",
        "ACME SUPPLIES",
        date(2024, 3, 8),
        "150.00",
    ));

    let csv = "date,description,amount\n\
        2024-03-10,PAYMENT INV 4521,-150.00\n\
        2024-03-11,MYSTERY DEBIT,-33.33\n";
    let mut imports = ImportManager::new(storage.clone());
    let outcome = imports
        .import_statement(
            "acct-1",
            "march.csv",
            StatementFormat::Delimited,
            csv.as_bytes(),
            &DelimitedConfig::default(),
        )
        .await
        .unwrap();

    let mut engine = MatchingEngine::new(storage.clone(), ledger);
    let first = engine
        .run(outcome.batch.id, &MatchingConfig::default())
        .await
        .unwrap();
    assert_eq!(first.reconciled, 1);
    assert_eq!(first.still_pending, 1);

    // The second run only sees the leftover pending item and leaves it alone
    let second = engine
        .run(outcome.batch.id, &MatchingConfig::default())
        .await
        .unwrap();
    assert_eq!(second.analyzed, 1);
    assert_eq!(second.reconciled, 0);
    assert_eq!(second.results[0].outcome, ItemOutcome::NoCandidates);

    let reconciled = imports
        .list_items(outcome.batch.id, Some(ReconciliationStatus::Reconciled))
        .await
        .unwrap();
    assert_eq!(reconciled.len(), 1);
}

#[tokio::test]
async fn test_manual_amount_mismatch_is_rejected() {
    let storage = MemoryStorage::new();
    let ledger = MemoryLedger::new();
    let p = payable("acct-1", "INV-5", "ACME", date(2024, 3, 10), "99.00");
    ledger.put_payable(p.clone());

    let csv = "date,description,amount\n2024-03-10,PAYMENT,-100.00\n";
    let mut imports = ImportManager::new(storage.clone());
    let outcome = imports
        .import_statement(
            "acct-1",
            "march.csv",
            StatementFormat::Delimited,
            csv.as_bytes(),
            &DelimitedConfig::default(),
        )
        .await
        .unwrap();
    let items = imports.list_items(outcome.batch.id, None).await.unwrap();

    let mut manager = ReconciliationManager::new(storage, ledger);
    let result = manager
        .reconcile(
            items[0].id,
            p.id,
            ReconciliationOrigin::Manual,
            "alice",
            None,
        )
        .await;
    assert!(result.is_err());

    let item = imports.get_item_required(items[0].id).await.unwrap();
    assert_eq!(item.status, ReconciliationStatus::Pending);
    assert_eq!(item.payable_id, None);
}
