//! Shared fixtures for integration tests.

use chrono::NaiveDate;
use tempfile::TempDir;

use sales_reporter::db::Database;
use sales_reporter::source::{Cell, MemorySource};

/// Create a scratch database in a temporary directory
pub fn temp_db() -> (TempDir, Database) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let db_path = dir.path().join("test.db");
    let db_url = format!("sqlite:{}", db_path.display());
    let db = Database::new(&db_url).expect("Failed to create database");
    (dir, db)
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, d).expect("valid fixture date")
}

fn text(s: &str) -> Cell {
    Cell::Text(s.to_string())
}

/// The metric fixture: customers {A, B}, products {X: 10, Y: 20}, sales
/// {A buys 2xX on day 1 = 20, B buys 1xY on day 2 = 20, A buys 1xY on day 2 = 20}
pub fn fixture_source() -> MemorySource {
    let mut source = MemorySource::new();

    source.add_sheet(
        "customers",
        &["name", "email", "address"],
        vec![
            vec![text("A"), text("a@example.com"), text("1 First St")],
            vec![text("B"), text("b@example.com"), Cell::Empty],
        ],
    );

    source.add_sheet(
        "products",
        &["name", "price", "category"],
        vec![
            vec![text("X"), Cell::Number(10.0), text("alpha")],
            vec![text("Y"), Cell::Number(20.0), text("beta")],
        ],
    );

    source.add_sheet(
        "sales",
        &["customer", "product", "date", "quantity", "total"],
        vec![
            vec![text("A"), text("X"), Cell::Date(day(1)), Cell::Number(2.0), Cell::Number(20.0)],
            vec![text("B"), text("Y"), Cell::Date(day(2)), Cell::Number(1.0), Cell::Number(20.0)],
            vec![text("A"), text("Y"), Cell::Date(day(2)), Cell::Number(1.0), Cell::Number(20.0)],
        ],
    );

    source
}
