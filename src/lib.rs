//! Sales Reporter - Batch Sales Reporting Pipeline
//!
//! A Rust library for loading spreadsheet sales data into a relational store,
//! computing windowed business metrics and delivering a rendered report by
//! email.
//!
//! # Features
//!
//! - Schema-validated, idempotent load of customers, products and sales
//! - Date-windowed join aggregation (totals, winners, category breakdown)
//! - Deterministic CSV + digest rendering
//! - Bounded-retry email delivery
//! - Orchestrated end-to-end runs with per-stage failure handling

/// Windowed aggregation of business metrics
pub mod aggregator;
/// Configuration management
pub mod config;
/// Database operations and connection pooling
pub mod db;
/// Report delivery with bounded retry
pub mod dispatcher;
/// Error types
pub mod error;
/// Sheet validation and idempotent upsert loading
pub mod loader;
/// Logging setup and utilities
pub mod logging;
/// Data models and structures
pub mod models;
/// Stage sequencing and run state
pub mod orchestrator;
/// Report rendering and persistence
pub mod report;
/// Database schema definitions
pub mod schema;
/// Tabular source access (workbooks and fixtures)
pub mod source;
/// Input validation and sanitization
pub mod validation;

// Re-export key components for easier access
pub use config::AppConfig;
pub use db::Database;
pub use models::{DateRange, DeliveryResult, LoadSummary, ReportMetrics};
pub use orchestrator::{Orchestrator, RunReport, RunStage};
