mod common;

use std::time::Duration;

use common::{fixture_source, temp_db};
use sales_reporter::config::AppConfig;
use sales_reporter::dispatcher::{MailTransport, OutgoingMessage, TransportError};
use sales_reporter::orchestrator::{Orchestrator, RunStage};
use sales_reporter::source::MemorySource;
use tempfile::TempDir;

/// Transport that always succeeds and records what it was handed
#[derive(Default)]
struct RecordingTransport {
    sends: usize,
    last_subject: Option<String>,
}

impl MailTransport for &mut RecordingTransport {
    fn send(&mut self, message: &OutgoingMessage<'_>) -> Result<(), TransportError> {
        self.sends += 1;
        self.last_subject = Some(message.subject.to_string());
        Ok(())
    }
}

/// Transport that fails transiently forever
struct FlakyTransport;

impl MailTransport for FlakyTransport {
    fn send(&mut self, _message: &OutgoingMessage<'_>) -> Result<(), TransportError> {
        Err(TransportError::Transient("connection reset".to_string()))
    }
}

fn test_config(output_dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.report.output_directory = output_dir.path().display().to_string();
    config.email.retry_backoff_secs = 0;
    config
}

#[test]
fn test_full_run_ends_done_with_exit_code_zero() {
    let (_dir, db) = temp_db();
    let output_dir = TempDir::new().expect("temp dir");
    let orchestrator = Orchestrator::new(test_config(&output_dir));

    let mut transport = RecordingTransport::default();
    let run = orchestrator.run_full(&db, &mut fixture_source(), &mut transport, None);

    assert_eq!(run.stage, RunStage::Done);
    assert_eq!(run.exit_code(), 0);
    assert!(run.error.is_none());

    let load = run.load.expect("load summary");
    assert_eq!(load.customers.inserted, 2);
    assert_eq!(load.sales.inserted, 3);

    let delivery = run.delivery.expect("delivery result");
    assert!(delivery.delivered);
    assert_eq!(delivery.attempts, 1);
    assert_eq!(transport.sends, 1);
    assert_eq!(
        transport.last_subject.as_deref(),
        Some("SALES REPORT 2025-01-01 to 2025-01-02")
    );

    let path = run.report_path.expect("report path");
    assert!(path.exists());
}

#[test]
fn test_load_failure_halts_before_any_send() {
    let (_dir, db) = temp_db();
    let output_dir = TempDir::new().expect("temp dir");
    let orchestrator = Orchestrator::new(test_config(&output_dir));

    // No sheets at all: a structural load failure
    let mut transport = RecordingTransport::default();
    let run = orchestrator.run_full(&db, &mut MemorySource::new(), &mut transport, None);

    assert_eq!(run.stage, RunStage::Failed);
    assert_eq!(run.exit_code(), 1);
    assert!(run.error.is_some());
    assert!(run.delivery.is_none());
    assert_eq!(transport.sends, 0);
}

#[test]
fn test_exhausted_delivery_still_ends_done_with_exit_code_two() {
    let (_dir, db) = temp_db();
    let output_dir = TempDir::new().expect("temp dir");
    let orchestrator = Orchestrator::new(test_config(&output_dir));

    let start = std::time::Instant::now();
    let run = orchestrator.run_full(&db, &mut fixture_source(), FlakyTransport, None);

    // Zero backoff in the test config keeps the retries immediate
    assert!(start.elapsed() < Duration::from_secs(2));

    assert_eq!(run.stage, RunStage::Done);
    assert_eq!(run.exit_code(), 2);

    let delivery = run.delivery.expect("delivery result");
    assert!(!delivery.delivered);
    assert_eq!(delivery.attempts, 3);

    // The report was still rendered and persisted
    assert!(run.report_path.expect("report path").exists());
}

#[test]
fn test_report_only_run_on_an_empty_store() {
    let (_dir, db) = temp_db();
    let output_dir = TempDir::new().expect("temp dir");
    let orchestrator = Orchestrator::new(test_config(&output_dir));

    let mut transport = RecordingTransport::default();
    let run = orchestrator.run_report(&db, &mut transport, None);

    assert_eq!(run.stage, RunStage::Done);
    assert_eq!(run.exit_code(), 0);
    assert!(run.load.is_none());
    assert_eq!(
        transport.last_subject.as_deref(),
        Some("SALES REPORT (no sales recorded)")
    );
}

#[test]
fn test_load_only_run_skips_delivery() {
    let (_dir, db) = temp_db();
    let output_dir = TempDir::new().expect("temp dir");
    let orchestrator = Orchestrator::new(test_config(&output_dir));

    let run = orchestrator.run_load(&db, &mut fixture_source());

    assert_eq!(run.stage, RunStage::Done);
    assert_eq!(run.exit_code(), 0);
    assert!(run.load.is_some());
    assert!(run.delivery.is_none());
    assert!(run.report_path.is_none());
}
