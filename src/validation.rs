use anyhow::{anyhow, Result};
use chrono::NaiveDate;

/// Validation utilities for input sanitization and edge case handling
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate a customer or product name
    pub fn validate_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(anyhow!("Name cannot be empty"));
        }

        if name.len() > 200 {
            return Err(anyhow!("Name too long (max 200 characters)"));
        }

        // Check for potentially dangerous characters
        if name.contains('\0') || name.contains('\r') || name.contains('\n') {
            return Err(anyhow!("Name contains invalid characters"));
        }

        Ok(())
    }

    /// Validate email format
    pub fn validate_email(email: &str) -> Result<()> {
        if email.trim().is_empty() {
            return Err(anyhow!("Email cannot be empty"));
        }

        if email.len() > 254 {
            return Err(anyhow!("Email too long (max 254 characters)"));
        }

        // Basic email validation
        if !email.contains('@') {
            return Err(anyhow!("Email must contain @ symbol"));
        }

        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() != 2 {
            return Err(anyhow!("Email must have exactly one @ symbol"));
        }

        let local_part = parts[0];
        let domain_part = parts[1];

        if local_part.is_empty() || local_part.len() > 64 {
            return Err(anyhow!("Email local part invalid"));
        }

        if domain_part.is_empty() || !domain_part.contains('.') {
            return Err(anyhow!("Email domain invalid"));
        }

        Ok(())
    }

    /// Validate a unit price or invoiced amount
    pub fn validate_amount(amount: f64) -> Result<()> {
        if !amount.is_finite() {
            return Err(anyhow!("Amount must be a finite number"));
        }

        if amount < 0.0 {
            return Err(anyhow!("Amount cannot be negative"));
        }

        Ok(())
    }

    /// Validate a sale quantity
    pub fn validate_quantity(quantity: i64) -> Result<()> {
        if quantity <= 0 {
            return Err(anyhow!("Quantity must be greater than 0"));
        }

        if quantity > 1_000_000 {
            return Err(anyhow!("Quantity too large (max 1,000,000)"));
        }

        Ok(())
    }

    /// Validate a report date window
    pub fn validate_date_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<()> {
        if let (Some(start_date), Some(end_date)) = (start, end) {
            if start_date > end_date {
                return Err(anyhow!("Start date cannot be after end date"));
            }

            // Warn about very large windows that may impact report size
            let days = (end_date - start_date).num_days();
            if days > 365 * 5 {
                tracing::warn!(
                    "Large date range ({} days / {:.1} years) may produce a very large report",
                    days,
                    days as f64 / 365.0
                );
            }
        }

        Ok(())
    }

    /// Validate a delivery recipient list
    pub fn validate_recipients(recipients: &[String]) -> Result<()> {
        if recipients.is_empty() {
            return Err(anyhow!("At least one recipient is required"));
        }

        for recipient in recipients {
            Self::validate_email(recipient)?;
        }

        Ok(())
    }

    /// Sanitize text input
    #[must_use]
    pub fn sanitize_text(text: &str) -> String {
        text.chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t' || *c == '\r')
            .collect::<String>()
            .trim()
            .to_string()
    }

    /// Validate database URL
    pub fn validate_database_url(url: &str) -> Result<()> {
        if url.trim().is_empty() {
            return Err(anyhow!("Database URL cannot be empty"));
        }

        if !url.starts_with("sqlite:") {
            return Err(anyhow!("Only SQLite databases are supported"));
        }

        if url.len() > 1000 {
            return Err(anyhow!("Database URL too long"));
        }

        Ok(())
    }
}
