//! End-to-end scan flow tests.
//!
//! Runs the batch scanner against the mock data source and a real
//! file-backed state store in a temp directory, covering the resume,
//! budget and ledger guarantees as whole-pipeline behavior.

mod mock_source;

use chrono::Utc;
use rust_decimal_macros::dec;
use tempfile::tempdir;

use brickscan::catalog::Catalog;
use brickscan::evaluator::{PartsParams, SimpleParams};
use brickscan::ledger::Ledger;
use brickscan::scanner::{BatchScanner, ScanMode};
use brickscan::source::PriceDataSource;
use brickscan::storage::{FileStore, StateStore};
use brickscan::types::{BudgetCounter, ItemType, PartsMode, PartsOpportunity, SimpleOpportunity};

use mock_source::{listing, MockSource};

fn simple_mode() -> ScanMode {
    ScanMode::Simple(SimpleParams {
        discount_rate: dec!(0.6),
        sell_through_min: dec!(0.4),
        min_intl_quantity: 1,
        min_intl_price: dec!(0.25),
        home_country: "US".to_string(),
    })
}

fn parts_mode() -> ScanMode {
    ScanMode::Parts(PartsParams {
        discount_rate: dec!(0.6),
        item_sell_through_min: dec!(0.4),
        part_sell_through_min: dec!(0.2),
        min_quantity: 1,
        min_item_price: dec!(0.25),
    })
}

fn catalog(ids: &[&str]) -> Catalog {
    Catalog::from_items(ids.iter().map(|s| s.to_string()).collect())
}

#[tokio::test]
async fn test_simple_scan_writes_ledger_cursor_and_budget() {
    let dir = tempdir().unwrap();
    let store = FileStore::new(dir.path()).unwrap();
    let cat = catalog(&["sw0001", "sw0002", "sw0003", "sw0004"]);
    let source = MockSource::new()
        .with_simple_hit("sw0001")
        .with_simple_miss("sw0002")
        .with_simple_hit("sw0003")
        .with_simple_miss("sw0004");

    let scanner = BatchScanner::new(&source, &store, &cat, simple_mode(), "all", 4, 8, 5000);
    let outcome = scanner.run_batch().await.unwrap();

    assert!(!outcome.interrupted);
    assert_eq!(outcome.items_attempted, 4);
    // 2 hit items, both conditions each.
    assert_eq!(outcome.opportunities_found, 4);
    // 4 items * 2 conditions * (2 guides + 2 sell-through calls).
    assert_eq!(outcome.calls_made, 32);

    // Everything landed on disk, not just in memory.
    assert_eq!(store.read_cursor("minifig_last_index").unwrap(), Some(0));
    assert_eq!(store.read_budget().unwrap().unwrap().count, 32);

    let raw = store.read_table("minifig_opportunities").unwrap().unwrap();
    assert_eq!(
        raw.lines().next().unwrap(),
        "ItemID,Condition,Intl Price,US Price,Intl Quantity,Sell Thru Rate,Timestamp"
    );

    let rows: Vec<SimpleOpportunity> =
        Ledger::new(&store, "minifig_opportunities").load().unwrap();
    assert_eq!(rows.len(), 4);
    assert!(rows.iter().all(|r| r.item_id == "sw0001" || r.item_id == "sw0003"));
    assert!(rows.iter().all(|r| r.intl_price == dec!(4.00) && r.us_price == dec!(10.00)));
}

#[tokio::test]
async fn test_budget_interruption_resumes_where_it_stopped() {
    let dir = tempdir().unwrap();
    let store = FileStore::new(dir.path()).unwrap();
    let cat = catalog(&["sw0001", "sw0002", "sw0003", "sw0004"]);

    // 8 calls per item; the 20th call dies inside item index 2.
    let source = MockSource::new()
        .with_simple_hit("sw0001")
        .with_simple_hit("sw0002")
        .with_simple_hit("sw0003")
        .with_simple_hit("sw0004")
        .with_budget_trip_at(20);

    let scanner = BatchScanner::new(&source, &store, &cat, simple_mode(), "all", 4, 8, 5000);
    let outcome = scanner.run_batch().await.unwrap();

    assert!(outcome.interrupted);
    assert_eq!(outcome.items_attempted, 3);
    assert_eq!(store.read_cursor("minifig_last_index").unwrap(), Some(2));

    // Findings from the completed items were not lost.
    let rows: Vec<SimpleOpportunity> =
        Ledger::new(&store, "minifig_opportunities").load().unwrap();
    assert_eq!(rows.len(), 4, "items 0 and 1, both conditions");

    // Next day: a fresh source against the same store picks up at index 2
    // and covers the remainder (and wraps over the already-done items).
    let source = MockSource::new()
        .with_simple_hit("sw0001")
        .with_simple_hit("sw0002")
        .with_simple_hit("sw0003")
        .with_simple_hit("sw0004");
    let scanner = BatchScanner::new(&source, &store, &cat, simple_mode(), "all", 4, 8, 5000);
    let outcome = scanner.run_batch().await.unwrap();

    assert!(!outcome.interrupted);
    assert_eq!(store.read_cursor("minifig_last_index").unwrap(), Some(2));

    let rows: Vec<SimpleOpportunity> =
        Ledger::new(&store, "minifig_opportunities").load().unwrap();
    assert_eq!(rows.len(), 8, "every (item, condition) pair exactly once");
}

#[tokio::test]
async fn test_preflight_abort_leaves_all_state_untouched() {
    let dir = tempdir().unwrap();
    let store = FileStore::new(dir.path()).unwrap();
    let stored = BudgetCounter {
        date: Utc::now().date_naive(),
        count: 4900,
    };
    store.write_budget(stored).unwrap();
    let cat = catalog(&["sw0001", "sw0002"]);
    let source = MockSource::new().with_simple_hit("sw0001");

    // 100 items * 6 calls projected = 600 against 100 remaining.
    let scanner = BatchScanner::new(&source, &store, &cat, simple_mode(), "all", 100, 6, 5000);
    let outcome = scanner.run_batch().await.unwrap();

    assert!(outcome.interrupted);
    assert_eq!(outcome.calls_made, 0);
    assert_eq!(source.calls_made(), 0, "no API call may be issued");
    assert_eq!(store.read_cursor("minifig_last_index").unwrap(), None);
    assert_eq!(store.read_budget().unwrap(), Some(stored));
    assert_eq!(store.read_table("minifig_opportunities").unwrap(), None);
}

#[tokio::test]
async fn test_repeated_full_passes_keep_ledger_deduplicated() {
    let dir = tempdir().unwrap();
    let store = FileStore::new(dir.path()).unwrap();
    let cat = catalog(&["sw0001", "sw0002", "sw0003"]);

    for _ in 0..2 {
        let source = MockSource::new()
            .with_simple_hit("sw0001")
            .with_simple_hit("sw0002")
            .with_simple_miss("sw0003");
        let scanner =
            BatchScanner::new(&source, &store, &cat, simple_mode(), "all", 3, 8, 5000);
        let outcome = scanner.run_batch().await.unwrap();
        assert!(!outcome.interrupted);
    }

    let rows: Vec<SimpleOpportunity> =
        Ledger::new(&store, "minifig_opportunities").load().unwrap();
    assert_eq!(rows.len(), 4, "rescans replace rows instead of duplicating them");
}

#[tokio::test]
async fn test_parts_scan_end_to_end() {
    let dir = tempdir().unwrap();
    let store = FileStore::new(dir.path()).unwrap();
    let cat = catalog(&["sw0239"]);

    // Whole item at 2.00 against a 5.00 break value.
    let source = MockSource::new()
        .with_bill("sw0239", vec![("970c00".to_string(), 48), ("3626b".to_string(), 3)])
        .with_guide(
            ItemType::Minifig,
            "sw0239",
            None,
            None,
            vec![listing(dec!(2.00), 3, "US")],
        )
        .with_guide(
            ItemType::Part,
            "970c00",
            None,
            Some(48),
            vec![listing(dec!(3.00), 5, "US")],
        )
        .with_guide(
            ItemType::Part,
            "3626b",
            None,
            Some(3),
            vec![listing(dec!(2.00), 5, "US")],
        )
        .with_rate(ItemType::Minifig, "sw0239", dec!(0.5))
        .with_rate(ItemType::Part, "970c00", dec!(0.3))
        .with_rate(ItemType::Part, "3626b", dec!(0.25));

    let scanner = BatchScanner::new(&source, &store, &cat, parts_mode(), "all", 1, 40, 5000);
    let outcome = scanner.run_batch().await.unwrap();

    assert!(!outcome.interrupted);
    // Break fires for both conditions; the parts ledger and cursor are
    // scoped separately from simple mode.
    assert_eq!(store.read_cursor("parts_minifig_last_index").unwrap(), Some(0));
    assert_eq!(store.read_cursor("minifig_last_index").unwrap(), None);

    let rows: Vec<PartsOpportunity> = Ledger::new(&store, "parts_minifig_opportunities")
        .load()
        .unwrap();
    assert_eq!(rows.len(), outcome.opportunities_found);
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.mode == PartsMode::Break));
    assert!(rows.iter().all(|r| r.parts_combined_price == dec!(5.00)));
    assert!(rows.iter().all(|r| r.parts_considered == "970c00, 3626b"));
}
