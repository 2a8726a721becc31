//! Report rendering: turns metrics into a CSV table and a textual digest.
//!
//! Rendering is a pure transformation. The same metrics always produce
//! byte-identical output, so nothing derived from the wall clock goes into
//! the artifact. Persisting the table to disk is a separate step.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs::{create_dir_all, File};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::models::{ReportArtifact, ReportMetrics, SaleDetail};

/// Render metrics into a deliverable artifact.
///
/// Detail rows are ordered the way the breakdown ranks categories (total
/// amount descending), chronologically within a category, then by id.
pub fn render(metrics: &ReportMetrics) -> Result<ReportArtifact> {
    Ok(ReportArtifact {
        file_name: file_name(metrics),
        digest: render_digest(metrics),
        table: render_table(metrics)?,
    })
}

/// Persist the artifact's table under the output directory
pub fn write_artifact(artifact: &ReportArtifact, output_dir: &Path) -> Result<PathBuf> {
    create_dir_all(output_dir)?;

    let path = output_dir.join(&artifact.file_name);
    let mut file = File::create(&path)?;
    file.write_all(artifact.table.as_bytes())?;

    Ok(path)
}

fn file_name(metrics: &ReportMetrics) -> String {
    metrics.range.map_or_else(
        || "sales_report_empty.csv".to_string(),
        |range| {
            format!(
                "sales_report_{}_{}.csv",
                range.start.format("%Y%m%d"),
                range.end.format("%Y%m%d")
            )
        },
    )
}

fn render_digest(metrics: &ReportMetrics) -> String {
    let mut digest = String::new();

    // Infallible for String, but write! returns Result; funnel through a helper
    let _ = writeln_digest(&mut digest, metrics);

    digest
}

fn writeln_digest(out: &mut String, metrics: &ReportMetrics) -> std::fmt::Result {
    writeln!(out, "SALES REPORT - SUMMARY")?;
    writeln!(out, "======================")?;
    match metrics.range {
        Some(range) => writeln!(out, "PERIOD: {} to {}", range.start, range.end)?,
        None => writeln!(out, "PERIOD: no sales recorded")?,
    }
    writeln!(out)?;

    writeln!(out, "KEY METRICS")?;
    writeln!(out, "-----------")?;
    writeln!(out, "* TOTAL INVOICED: {:.2}", metrics.total_invoiced)?;
    match &metrics.top_product {
        Some(top) => writeln!(out, "* TOP PRODUCT: {} ({:.2})", top.name, top.amount)?,
        None => writeln!(out, "* TOP PRODUCT: n/a")?,
    }
    match &metrics.top_customer {
        Some(top) => writeln!(out, "* TOP CUSTOMER: {} ({:.2})", top.name, top.amount)?,
        None => writeln!(out, "* TOP CUSTOMER: n/a")?,
    }
    writeln!(out, "* TRANSACTIONS: {}", metrics.transactions)?;

    if !metrics.categories.is_empty() {
        writeln!(out)?;
        writeln!(out, "BY CATEGORY")?;
        writeln!(out, "-----------")?;
        for line in &metrics.categories {
            writeln!(
                out,
                "* {}: {:.2} over {} transactions (avg {:.2})",
                line.category, line.total, line.transactions, line.average
            )?;
        }
    }

    writeln!(out)?;
    writeln!(out, "The detailed report is attached.")?;
    Ok(())
}

fn render_table(metrics: &ReportMetrics) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(["Date", "Customer", "Product", "Category", "Quantity", "Amount"])?;

    for detail in ordered_details(metrics) {
        writer.write_record([
            detail.date.to_string(),
            detail.customer.clone(),
            detail.product.clone(),
            detail.category.clone(),
            detail.quantity.to_string(),
            format!("{:.2}", detail.amount),
        ])?;
    }

    // Summary block after the detail rows
    writer.write_record(["", "", "", "", "", ""])?;
    writer.write_record(["SUMMARY", "", "", "", "", ""])?;
    writer.write_record([
        "Total invoiced".to_string(),
        format!("{:.2}", metrics.total_invoiced),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
    ])?;
    writer.write_record([
        "Transactions".to_string(),
        metrics.transactions.to_string(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
    ])?;
    for line in &metrics.categories {
        writer.write_record([
            format!("Category: {}", line.category),
            format!("{:.2}", line.total),
            line.transactions.to_string(),
            format!("avg {:.2}", line.average),
            String::new(),
            String::new(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| PipelineError::Other(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| PipelineError::Other(e.to_string()))
}

fn ordered_details(metrics: &ReportMetrics) -> Vec<&SaleDetail> {
    let rank: HashMap<&str, usize> = metrics
        .categories
        .iter()
        .enumerate()
        .map(|(index, line)| (line.category.as_str(), index))
        .collect();

    let mut details: Vec<&SaleDetail> = metrics.details.iter().collect();
    details.sort_by(|a, b| {
        let rank_a = rank.get(a.category.as_str()).copied().unwrap_or(usize::MAX);
        let rank_b = rank.get(b.category.as_str()).copied().unwrap_or(usize::MAX);
        rank_a
            .cmp(&rank_b)
            .then(a.date.cmp(&b.date))
            .then(a.sale_id.cmp(&b.sale_id))
    });

    details
}
