//! Data models for the sales reporting pipeline
//!
//! This module contains all data structures used throughout the application,
//! including persisted entities, load summaries and report metrics.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Database representation of a customer
#[derive(Debug, Clone, PartialEq)]
pub struct DbCustomer {
    /// Database primary key
    pub id: i64,
    /// Customer's display name
    pub name: String,
    /// Customer's email address (unique when present)
    pub email: Option<String>,
    /// Customer's postal address
    pub address: Option<String>,
}

/// Database representation of a product
#[derive(Debug, Clone, PartialEq)]
pub struct DbProduct {
    /// Database primary key
    pub id: i64,
    /// Product name
    pub name: String,
    /// Unit price (non-negative)
    pub price: f64,
    /// Product category
    pub category: String,
}

/// Database representation of a sale
#[derive(Debug, Clone, PartialEq)]
pub struct DbSale {
    /// Database primary key
    pub id: i64,
    /// Foreign key to customers table
    pub customer_id: i64,
    /// Foreign key to products table
    pub product_id: i64,
    /// Date of sale
    pub sale_date: NaiveDate,
    /// Sequence number disambiguating same-day repeat sales
    pub seq: i64,
    /// Units sold (positive)
    pub quantity: i64,
    /// Invoiced amount (non-negative)
    pub total_amount: f64,
}

/// Data for creating or refreshing a customer
#[derive(Debug, Clone)]
pub struct NewCustomer {
    /// Customer's display name
    pub name: String,
    /// Customer's email address
    pub email: Option<String>,
    /// Customer's postal address
    pub address: Option<String>,
}

/// Data for creating or refreshing a product
#[derive(Debug, Clone)]
pub struct NewProduct {
    /// Product name
    pub name: String,
    /// Unit price
    pub price: f64,
    /// Product category
    pub category: String,
}

/// Data for creating or refreshing a sale
#[derive(Debug, Clone)]
pub struct NewSale {
    /// Foreign key to customers table
    pub customer_id: i64,
    /// Foreign key to products table
    pub product_id: i64,
    /// Date of sale
    pub sale_date: NaiveDate,
    /// Sequence number within the natural key
    pub seq: i64,
    /// Units sold
    pub quantity: i64,
    /// Invoiced amount
    pub total_amount: f64,
}

/// Outcome of a lookup-then-branch upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No matching record existed; a new row was inserted
    Inserted,
    /// A matching record existed and its mutable fields were refreshed
    Updated,
    /// A matching record existed and already carried identical values
    Unchanged,
}

/// Per-table row counts produced by a load run
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TableCounts {
    /// Rows inserted as new records
    pub inserted: usize,
    /// Rows that matched an existing record and had fields refreshed
    pub updated: usize,
    /// Rows that matched an existing record with identical values
    pub unchanged: usize,
    /// Rows rejected by validation or referential checks
    pub skipped: usize,
}

impl TableCounts {
    /// Fold an upsert outcome into the counts
    pub fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::Updated => self.updated += 1,
            UpsertOutcome::Unchanged => self.unchanged += 1,
        }
    }
}

/// Summary of a full load run across the three sheets
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LoadSummary {
    /// Counts for the customers sheet
    pub customers: TableCounts,
    /// Counts for the products sheet
    pub products: TableCounts,
    /// Counts for the sales sheet
    pub sales: TableCounts,
}

impl LoadSummary {
    /// Total rows rejected across all sheets
    #[must_use]
    pub const fn total_skipped(&self) -> usize {
        self.customers.skipped + self.products.skipped + self.sales.skipped
    }
}

/// Inclusive date window for aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First day of the window (inclusive)
    pub start: NaiveDate,
    /// Last day of the window (inclusive)
    pub end: NaiveDate,
}

/// One joined sale row used for the report detail section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleDetail {
    /// Sale primary key
    pub sale_id: i64,
    /// Date of sale
    pub date: NaiveDate,
    /// Customer display name
    pub customer: String,
    /// Product name
    pub product: String,
    /// Product category
    pub category: String,
    /// Units sold
    pub quantity: i64,
    /// Invoiced amount
    pub amount: f64,
}

/// A winner entry (top product or top customer) with its summed amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopEntry {
    /// Product or customer name
    pub name: String,
    /// Summed amount over the window
    pub amount: f64,
}

/// Per-category aggregate line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    /// Category name
    pub category: String,
    /// Summed amount for the category
    pub total: f64,
    /// Number of transactions in the category
    pub transactions: usize,
    /// Average amount per transaction, rounded to 2 decimal places
    pub average: f64,
}

/// Aggregated business metrics for one report window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetrics {
    /// Window the metrics cover; `None` when the store holds no sales at all
    pub range: Option<DateRange>,
    /// Sum of sale totals in the window
    pub total_invoiced: f64,
    /// Number of sales in the window
    pub transactions: usize,
    /// Best-selling product by summed amount (ties broken by name)
    pub top_product: Option<TopEntry>,
    /// Top customer by summed spend (ties broken by name)
    pub top_customer: Option<TopEntry>,
    /// Per-category breakdown ordered by total amount descending
    pub categories: Vec<CategoryBreakdown>,
    /// Joined detail rows for the report table
    pub details: Vec<SaleDetail>,
}

impl ReportMetrics {
    /// Metrics for a window containing no sales
    #[must_use]
    pub fn empty(range: Option<DateRange>) -> Self {
        Self {
            range,
            total_invoiced: 0.0,
            transactions: 0,
            top_product: None,
            top_customer: None,
            categories: Vec::new(),
            details: Vec::new(),
        }
    }
}

/// Rendered report ready for persistence and delivery
#[derive(Debug, Clone, PartialEq)]
pub struct ReportArtifact {
    /// Attachment file name, derived from the report window
    pub file_name: String,
    /// Human-readable summary for the message body
    pub digest: String,
    /// CSV table: detail rows followed by a summary block
    pub table: String,
}

/// Result of a delivery attempt sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryResult {
    /// True when exactly one send succeeded
    pub delivered: bool,
    /// Attempts consumed, including the successful one
    pub attempts: u32,
    /// Last transport error when delivery did not succeed
    pub error: Option<String>,
}
