use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use sales_reporter::config::AppConfig;
use sales_reporter::db::Database;
use sales_reporter::dispatcher::SmtpMailer;
use sales_reporter::logging::init_logging;
use sales_reporter::models::DateRange;
use sales_reporter::orchestrator::{Orchestrator, RunReport, RunStage};
use sales_reporter::source::XlsxSource;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load spreadsheet data into the store
    Load {
        /// Path to the source workbook (overrides configuration)
        #[arg(short, long)]
        workbook: Option<PathBuf>,
    },
    /// Aggregate stored sales, render the report and email it
    Report {
        /// Start date for the report window (YYYY-MM-DD)
        #[arg(short, long)]
        start_date: Option<String>,

        /// End date for the report window (YYYY-MM-DD)
        #[arg(short, long)]
        end_date: Option<String>,
    },
    /// Run the full pipeline: load, aggregate, render, send
    Run {
        /// Path to the source workbook (overrides configuration)
        #[arg(short, long)]
        workbook: Option<PathBuf>,

        /// Start date for the report window (YYYY-MM-DD)
        #[arg(short, long)]
        start_date: Option<String>,

        /// End date for the report window (YYYY-MM-DD)
        #[arg(short, long)]
        end_date: Option<String>,
    },
}

fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    let log_file = config.logging.file_path.clone();
    init_logging(
        Some(&config.get_log_level()),
        &config.logging.format,
        log_file.as_deref().map(Path::new),
    )?;

    info!("Starting sales-reporter");

    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize database with configuration
    let db = Database::with_pool_settings(
        &config.get_database_url(),
        config.database.max_connections,
        std::time::Duration::from_secs(config.database.connection_timeout_secs),
    )?;

    let orchestrator = Orchestrator::new(config.clone());

    // Process command
    let run = match &cli.command {
        Commands::Load { workbook } => {
            let mut source = open_workbook(&config, workbook.as_deref())?;
            orchestrator.run_load(&db, &mut source)
        }
        Commands::Report { start_date, end_date } => {
            let range = parse_date_range(start_date.as_deref(), end_date.as_deref())?;
            let mailer = SmtpMailer::from_config(&config.email, &config.get_smtp_password())?;
            orchestrator.run_report(&db, mailer, range)
        }
        Commands::Run {
            workbook,
            start_date,
            end_date,
        } => {
            let mut source = open_workbook(&config, workbook.as_deref())?;
            let range = parse_date_range(start_date.as_deref(), end_date.as_deref())?;
            let mailer = SmtpMailer::from_config(&config.email, &config.get_smtp_password())?;
            orchestrator.run_full(&db, &mut source, mailer, range)
        }
    };

    summarize_run(&run);

    let code = run.exit_code();
    if code != 0 {
        std::process::exit(code);
    }

    Ok(())
}

/// Open the source workbook, preferring the CLI path over configuration
fn open_workbook(config: &AppConfig, override_path: Option<&Path>) -> Result<XlsxSource> {
    let path = override_path.map_or_else(|| PathBuf::from(config.get_workbook_path()), Path::to_path_buf);

    info!("Using source workbook at: {}", path.display());
    XlsxSource::open(&path).context("Failed to open source workbook")
}

/// Parse the report window; both bounds or neither must be provided
fn parse_date_range(start_date: Option<&str>, end_date: Option<&str>) -> Result<Option<DateRange>> {
    match (start_date, end_date) {
        (None, None) => Ok(None),
        (Some(start), Some(end)) => {
            let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
                .context("Invalid start date format, use YYYY-MM-DD")?;
            let end = NaiveDate::parse_from_str(end, "%Y-%m-%d")
                .context("Invalid end date format, use YYYY-MM-DD")?;
            Ok(Some(DateRange { start, end }))
        }
        _ => Err(anyhow::anyhow!(
            "Provide both --start-date and --end-date, or neither to auto-detect the window"
        )),
    }
}

/// Log the terminal state of the run
fn summarize_run(run: &RunReport) {
    if let Some(summary) = &run.load {
        info!(
            customers = ?summary.customers,
            products = ?summary.products,
            sales = ?summary.sales,
            "Load summary"
        );
    }

    if let Some(path) = &run.report_path {
        info!(path = %path.display(), "Report artifact");
    }

    // Machine-readable outcome for log scrapers
    match serde_json::to_string(run) {
        Ok(json) => info!(target: "run_summary", %json),
        Err(e) => warn!("Failed to serialize run summary: {e}"),
    }

    match run.stage {
        RunStage::Done => {
            if let Some(delivery) = &run.delivery {
                if delivery.delivered {
                    info!(attempts = delivery.attempts, "Run complete; report delivered");
                } else {
                    warn!(
                        attempts = delivery.attempts,
                        error = ?delivery.error,
                        "Run complete, but delivery failed"
                    );
                }
            } else {
                info!("Run complete");
            }
        }
        _ => {
            warn!(error = ?run.error, "Run did not complete");
        }
    }
}
