mod common;

use chrono::NaiveDate;
use common::{day, fixture_source, temp_db};
use sales_reporter::error::PipelineError;
use sales_reporter::loader;
use sales_reporter::models::DateRange;
use sales_reporter::source::{Cell, MemorySource};

fn text(s: &str) -> Cell {
    Cell::Text(s.to_string())
}

#[test]
fn test_load_inserts_all_fixture_rows() {
    let (_dir, db) = temp_db();
    let mut source = fixture_source();

    let summary = loader::load(&mut source, &db).expect("Load failed");

    assert_eq!(summary.customers.inserted, 2);
    assert_eq!(summary.products.inserted, 2);
    assert_eq!(summary.sales.inserted, 3);
    assert_eq!(summary.total_skipped(), 0);
}

#[test]
fn test_double_load_is_idempotent() {
    let (_dir, db) = temp_db();
    let mut source = fixture_source();

    loader::load(&mut source, &db).expect("First load failed");
    let counts_after_first = (
        db.count_rows("customers").expect("count"),
        db.count_rows("products").expect("count"),
        db.count_rows("sales").expect("count"),
    );

    let second = loader::load(&mut source, &db).expect("Second load failed");
    let counts_after_second = (
        db.count_rows("customers").expect("count"),
        db.count_rows("products").expect("count"),
        db.count_rows("sales").expect("count"),
    );

    assert_eq!(counts_after_first, counts_after_second);
    assert_eq!(second.customers.inserted, 0);
    assert_eq!(second.products.inserted, 0);
    assert_eq!(second.sales.inserted, 0);

    // Identical rows count as unchanged, not as updates
    assert_eq!(second.customers.updated, 0);
    assert_eq!(second.products.updated, 0);
    assert_eq!(second.sales.updated, 0);
    assert_eq!(second.customers.unchanged, 2);
    assert_eq!(second.products.unchanged, 2);
    assert_eq!(second.sales.unchanged, 3);
}

#[test]
fn test_double_load_preserves_field_values() {
    let (_dir, db) = temp_db();
    let mut source = fixture_source();

    loader::load(&mut source, &db).expect("First load failed");
    let range = DateRange {
        start: day(1),
        end: day(2),
    };
    let first_details = db.sales_between(&range).expect("query");

    loader::load(&mut source, &db).expect("Second load failed");
    let second_details = db.sales_between(&range).expect("query");

    assert_eq!(first_details, second_details);
}

#[test]
fn test_missing_sheet_is_fatal() {
    let (_dir, db) = temp_db();
    let mut source = MemorySource::new();
    source.add_sheet("customers", &["name"], vec![vec![text("A")]]);

    let err = loader::load(&mut source, &db).expect_err("Load should fail");
    assert!(matches!(err, PipelineError::MissingSheet(_)));

    // Nothing was written before the structural check failed
    assert_eq!(db.count_rows("customers").expect("count"), 0);
}

#[test]
fn test_missing_required_column_is_fatal() {
    let (_dir, db) = temp_db();
    let mut source = fixture_source();
    source.add_sheet("products", &["name", "category"], vec![vec![text("X"), text("alpha")]]);

    let err = loader::load(&mut source, &db).expect_err("Load should fail");
    match err {
        PipelineError::MissingColumn { sheet, column } => {
            assert_eq!(sheet, "products");
            assert_eq!(column, "price");
        }
        other => panic!("Expected MissingColumn, got {other:?}"),
    }

    assert_eq!(db.count_rows("customers").expect("count"), 0);
}

#[test]
fn test_malformed_rows_are_skipped_not_fatal() {
    let (_dir, db) = temp_db();
    let mut source = fixture_source();
    source.add_sheet(
        "products",
        &["name", "price", "category"],
        vec![
            vec![text("X"), Cell::Number(10.0), text("alpha")],
            // Negative price is out of range
            vec![text("Bad"), Cell::Number(-5.0), text("alpha")],
            // Price is not a number
            vec![text("Worse"), text("free"), text("alpha")],
            vec![text("Y"), Cell::Number(20.0), text("beta")],
        ],
    );

    let summary = loader::load(&mut source, &db).expect("Load failed");

    assert_eq!(summary.products.inserted, 2);
    assert_eq!(summary.products.skipped, 2);
    assert_eq!(db.count_rows("products").expect("count"), 2);
}

#[test]
fn test_sale_with_unknown_reference_is_skipped() {
    let (_dir, db) = temp_db();
    let mut source = fixture_source();
    source.add_sheet(
        "sales",
        &["customer", "product", "date", "quantity", "total"],
        vec![
            vec![text("A"), text("X"), Cell::Date(day(1)), Cell::Number(2.0), Cell::Number(20.0)],
            // Customer never declared in the customers sheet
            vec![text("Ghost"), text("X"), Cell::Date(day(1)), Cell::Number(1.0), Cell::Number(10.0)],
            // Product never declared in the products sheet
            vec![text("A"), text("Vapor"), Cell::Date(day(1)), Cell::Number(1.0), Cell::Number(10.0)],
        ],
    );

    let summary = loader::load(&mut source, &db).expect("Load failed");

    assert_eq!(summary.sales.inserted, 1);
    assert_eq!(summary.sales.skipped, 2);
    assert_eq!(db.count_rows("sales").expect("count"), 1);
}

#[test]
fn test_non_positive_quantity_is_skipped() {
    let (_dir, db) = temp_db();
    let mut source = fixture_source();
    source.add_sheet(
        "sales",
        &["customer", "product", "date", "quantity", "total"],
        vec![
            vec![text("A"), text("X"), Cell::Date(day(1)), Cell::Number(0.0), Cell::Number(0.0)],
            vec![text("A"), text("X"), Cell::Date(day(1)), Cell::Number(2.0), Cell::Number(20.0)],
        ],
    );

    let summary = loader::load(&mut source, &db).expect("Load failed");

    assert_eq!(summary.sales.inserted, 1);
    assert_eq!(summary.sales.skipped, 1);
}

#[test]
fn test_same_day_repeat_sales_get_distinct_sequence() {
    let (_dir, db) = temp_db();
    let mut source = fixture_source();
    source.add_sheet(
        "sales",
        &["customer", "product", "date", "quantity", "total"],
        vec![
            vec![text("A"), text("X"), Cell::Date(day(1)), Cell::Number(1.0), Cell::Number(10.0)],
            vec![text("A"), text("X"), Cell::Date(day(1)), Cell::Number(3.0), Cell::Number(30.0)],
        ],
    );

    loader::load(&mut source, &db).expect("First load failed");
    assert_eq!(db.count_rows("sales").expect("count"), 2);

    // Re-loading the identical file keeps both rows without duplication
    loader::load(&mut source, &db).expect("Second load failed");
    assert_eq!(db.count_rows("sales").expect("count"), 2);
}

#[test]
fn test_refreshed_price_updates_in_place() {
    let (_dir, db) = temp_db();
    let mut source = fixture_source();

    loader::load(&mut source, &db).expect("First load failed");

    source.add_sheet(
        "products",
        &["name", "price", "category"],
        vec![
            vec![text("X"), Cell::Number(12.5), text("alpha")],
            vec![text("Y"), Cell::Number(20.0), text("beta")],
        ],
    );

    let summary = loader::load(&mut source, &db).expect("Second load failed");

    assert_eq!(summary.products.inserted, 0);
    assert_eq!(summary.products.updated, 1);
    assert_eq!(summary.products.unchanged, 1);
    assert_eq!(db.count_rows("products").expect("count"), 2);
    let x = db.get_product("X", "alpha").expect("query").expect("X exists");
    assert!((x.price - 12.5).abs() < 1e-9);
}

#[test]
fn test_sale_date_from_iso_text_cell() {
    let (_dir, db) = temp_db();
    let mut source = fixture_source();
    source.add_sheet(
        "sales",
        &["customer", "product", "date", "quantity", "total"],
        vec![vec![
            text("A"),
            text("X"),
            text("2025-01-05"),
            Cell::Number(1.0),
            Cell::Number(10.0),
        ]],
    );

    let summary = loader::load(&mut source, &db).expect("Load failed");
    assert_eq!(summary.sales.inserted, 1);

    let range = DateRange {
        start: NaiveDate::from_ymd_opt(2025, 1, 5).expect("valid date"),
        end: NaiveDate::from_ymd_opt(2025, 1, 5).expect("valid date"),
    };
    assert_eq!(db.sales_between(&range).expect("query").len(), 1);
}
