//! Aggregator stage: windowed join queries and derived business metrics.
//!
//! Strictly read-only over the store. An empty window is a valid result with
//! zero totals and no winners, never an error.

use anyhow::Result;
use tracing::{debug, info};

use crate::db::Database;
use crate::models::{DateRange, ReportMetrics};
use crate::validation::InputValidator;

/// Compute report metrics over a date window.
///
/// When `range` is `None` the window is auto-detected as
/// [MIN(sale_date), MAX(sale_date)] over the stored sales. Bounds are
/// inclusive on both ends.
pub fn summarize(db: &Database, range: Option<DateRange>) -> Result<ReportMetrics> {
    let range = match range {
        Some(range) => Some(range),
        None => db.date_bounds()?,
    };

    let Some(range) = range else {
        info!("Store holds no sales; producing empty metrics");
        return Ok(ReportMetrics::empty(None));
    };

    InputValidator::validate_date_range(Some(range.start), Some(range.end))?;
    debug!(start = %range.start, end = %range.end, "Aggregating window");

    let details = db.sales_between(&range)?;
    if details.is_empty() {
        info!(start = %range.start, end = %range.end, "No sales in window");
        return Ok(ReportMetrics::empty(Some(range)));
    }

    let total_invoiced = details.iter().map(|d| d.amount).sum();
    let categories = db.category_breakdown(&range)?;
    let top_product = db.top_product(&range)?;
    let top_customer = db.top_customer(&range)?;

    info!(
        start = %range.start,
        end = %range.end,
        transactions = details.len(),
        total_invoiced,
        "Aggregation complete"
    );

    Ok(ReportMetrics {
        range: Some(range),
        total_invoiced,
        transactions: details.len(),
        top_product,
        top_customer,
        categories,
        details,
    })
}
