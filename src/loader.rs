//! Loader stage: validates the source sheets and upserts their rows.
//!
//! Header validation happens for all three sheets before anything is written,
//! so a structurally broken workbook never results in a partial load. Row-level
//! problems are logged, counted as skipped and never abort the run.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::db::Database;
use crate::error::Result;
use crate::models::{LoadSummary, NewCustomer, NewProduct, NewSale, TableCounts};
use crate::source::{Sheet, TabularSource};
use crate::validation::InputValidator;

/// Sheet holding the customer table
pub const CUSTOMERS_SHEET: &str = "customers";
/// Sheet holding the product table
pub const PRODUCTS_SHEET: &str = "products";
/// Sheet holding the sale table
pub const SALES_SHEET: &str = "sales";

const CUSTOMER_REQUIRED: [&str; 1] = ["name"];
const PRODUCT_REQUIRED: [&str; 2] = ["name", "price"];
const SALE_REQUIRED: [&str; 5] = ["customer", "product", "date", "quantity", "total"];

/// Load all three sheets into the store with upsert semantics.
///
/// Safe to invoke repeatedly on identical input: the second run reports zero
/// inserts and leaves row counts untouched.
pub fn load(source: &mut dyn TabularSource, db: &Database) -> Result<LoadSummary> {
    // Validate every sheet before the first write; partial schema is unsafe
    let customers = source.sheet(CUSTOMERS_SHEET)?;
    customers.require_columns(&CUSTOMER_REQUIRED)?;
    let products = source.sheet(PRODUCTS_SHEET)?;
    products.require_columns(&PRODUCT_REQUIRED)?;
    let sales = source.sheet(SALES_SHEET)?;
    sales.require_columns(&SALE_REQUIRED)?;

    let mut summary = LoadSummary::default();
    load_customers(&customers, db, &mut summary.customers)?;
    load_products(&products, db, &mut summary.products)?;
    load_sales(&sales, db, &mut summary.sales)?;

    info!(
        customers_inserted = summary.customers.inserted,
        products_inserted = summary.products.inserted,
        sales_inserted = summary.sales.inserted,
        skipped = summary.total_skipped(),
        "Load complete"
    );

    Ok(summary)
}

fn load_customers(sheet: &Sheet, db: &Database, counts: &mut TableCounts) -> Result<()> {
    let name_col = sheet.column_index("name").unwrap_or_default();
    let email_col = sheet.column_index("email");
    let address_col = sheet.column_index("address");

    for (index, row) in sheet.rows.iter().enumerate() {
        let Some(name) = sheet.cell(row, name_col).as_text() else {
            warn!(sheet = CUSTOMERS_SHEET, row = index + 2, "Skipping row: missing name");
            counts.skipped += 1;
            continue;
        };

        if let Err(reason) = InputValidator::validate_name(&name) {
            warn!(sheet = CUSTOMERS_SHEET, row = index + 2, %reason, "Skipping row");
            counts.skipped += 1;
            continue;
        }

        let email = email_col.and_then(|col| sheet.cell(row, col).as_text());
        if let Some(ref email) = email {
            if let Err(reason) = InputValidator::validate_email(email) {
                warn!(sheet = CUSTOMERS_SHEET, row = index + 2, %reason, "Skipping row");
                counts.skipped += 1;
                continue;
            }
        }

        let address = address_col
            .and_then(|col| sheet.cell(row, col).as_text())
            .map(|a| InputValidator::sanitize_text(&a))
            .filter(|a| !a.is_empty());

        let (_, outcome) = db.upsert_customer(&NewCustomer { name, email, address })?;
        counts.record(outcome);
    }

    debug!(sheet = CUSTOMERS_SHEET, rows = sheet.rows.len(), "Sheet processed");
    Ok(())
}

fn load_products(sheet: &Sheet, db: &Database, counts: &mut TableCounts) -> Result<()> {
    let name_col = sheet.column_index("name").unwrap_or_default();
    let price_col = sheet.column_index("price").unwrap_or_default();
    let category_col = sheet.column_index("category");

    for (index, row) in sheet.rows.iter().enumerate() {
        let Some(name) = sheet.cell(row, name_col).as_text() else {
            warn!(sheet = PRODUCTS_SHEET, row = index + 2, "Skipping row: missing name");
            counts.skipped += 1;
            continue;
        };

        let Some(price) = sheet.cell(row, price_col).as_number() else {
            warn!(sheet = PRODUCTS_SHEET, row = index + 2, "Skipping row: price is not a number");
            counts.skipped += 1;
            continue;
        };

        if let Err(reason) =
            InputValidator::validate_name(&name).and_then(|()| InputValidator::validate_amount(price))
        {
            warn!(sheet = PRODUCTS_SHEET, row = index + 2, %reason, "Skipping row");
            counts.skipped += 1;
            continue;
        }

        let category = category_col
            .and_then(|col| sheet.cell(row, col).as_text())
            .unwrap_or_else(|| "uncategorized".to_string());

        let (_, outcome) = db.upsert_product(&NewProduct { name, price, category })?;
        counts.record(outcome);
    }

    debug!(sheet = PRODUCTS_SHEET, rows = sheet.rows.len(), "Sheet processed");
    Ok(())
}

fn load_sales(sheet: &Sheet, db: &Database, counts: &mut TableCounts) -> Result<()> {
    let customer_col = sheet.column_index("customer").unwrap_or_default();
    let product_col = sheet.column_index("product").unwrap_or_default();
    let date_col = sheet.column_index("date").unwrap_or_default();
    let quantity_col = sheet.column_index("quantity").unwrap_or_default();
    let total_col = sheet.column_index("total").unwrap_or_default();
    let seq_col = sheet.column_index("seq");

    // Occurrence index per natural key for rows without an explicit sequence,
    // stable across identical re-loads of the same file
    let mut occurrences: HashMap<(i64, i64, NaiveDate), i64> = HashMap::new();

    for (index, row) in sheet.rows.iter().enumerate() {
        let parsed = parse_sale_row(sheet, row, customer_col, product_col, date_col, quantity_col, total_col);
        let Some((customer_ref, product_ref, date, quantity, total)) = parsed else {
            warn!(sheet = SALES_SHEET, row = index + 2, "Skipping row: malformed values");
            counts.skipped += 1;
            continue;
        };

        // Referential integrity: both sides must already exist in the store
        let Some(customer) = db.resolve_customer_ref(&customer_ref)? else {
            warn!(
                sheet = SALES_SHEET,
                row = index + 2,
                customer = %customer_ref,
                "Skipping row: unknown customer"
            );
            counts.skipped += 1;
            continue;
        };

        let Some(product) = db.get_product_by_name(&product_ref)? else {
            warn!(
                sheet = SALES_SHEET,
                row = index + 2,
                product = %product_ref,
                "Skipping row: unknown product"
            );
            counts.skipped += 1;
            continue;
        };

        let expected = product.price * quantity as f64;
        if (total - expected).abs() > 0.01 * quantity as f64 {
            warn!(
                sheet = SALES_SHEET,
                row = index + 2,
                total,
                expected,
                "Total deviates from quantity x price; loading source value"
            );
        }

        let seq = match seq_col.and_then(|col| sheet.cell(row, col).as_integer()) {
            Some(explicit) => explicit,
            None => {
                let counter = occurrences.entry((customer.id, product.id, date)).or_insert(0);
                let seq = *counter;
                *counter += 1;
                seq
            }
        };

        let (_, outcome) = db.upsert_sale(&NewSale {
            customer_id: customer.id,
            product_id: product.id,
            sale_date: date,
            seq,
            quantity,
            total_amount: total,
        })?;
        counts.record(outcome);
    }

    debug!(sheet = SALES_SHEET, rows = sheet.rows.len(), "Sheet processed");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn parse_sale_row(
    sheet: &Sheet,
    row: &[crate::source::Cell],
    customer_col: usize,
    product_col: usize,
    date_col: usize,
    quantity_col: usize,
    total_col: usize,
) -> Option<(String, String, NaiveDate, i64, f64)> {
    let customer = sheet.cell(row, customer_col).as_text()?;
    let product = sheet.cell(row, product_col).as_text()?;
    let date = sheet.cell(row, date_col).as_date()?;
    let quantity = sheet.cell(row, quantity_col).as_integer()?;
    let total = sheet.cell(row, total_col).as_number()?;

    InputValidator::validate_quantity(quantity).ok()?;
    InputValidator::validate_amount(total).ok()?;

    Some((customer, product, date, quantity, total))
}
