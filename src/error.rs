//! Error types for the sales-reporter library.
//!
//! This module provides custom error types using `thiserror` for better error handling
//! and more specific error messages throughout the application.

use thiserror::Error;

/// Errors that can occur in the sales-reporter application.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Connection pool errors
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Error opening or reading the source workbook
    #[error("Source workbook error: {0}")]
    Source(String),

    /// Required sheet is missing from the workbook
    #[error("Missing sheet: {0}")]
    MissingSheet(String),

    /// Required column is missing from a sheet
    #[error("Sheet '{sheet}' is missing required column '{column}'")]
    MissingColumn {
        /// Sheet that failed header validation
        sheet: String,
        /// Column absent from the header row
        column: String,
    },

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV rendering errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// General error with context
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Result with PipelineError
pub type Result<T> = std::result::Result<T, PipelineError>;

impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        PipelineError::Other(err.to_string())
    }
}
