use sales_reporter::logging::{init_logging, OperationTimer};
use tempfile::TempDir;
use tracing::info;

#[test]
fn test_init_with_text_console_and_file_layer() {
    let dir = TempDir::new().expect("temp dir");
    let log_path = dir.path().join("sales-reporter.log");

    init_logging(Some("debug"), "text", Some(&log_path)).expect("init failed");

    info!("logging smoke check");
    let timer = OperationTimer::new("smoke");
    let _elapsed = timer.finish();
}
