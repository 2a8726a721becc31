use anyhow::Result;
use std::path::Path;
use tracing::info;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

/// Initialize structured logging.
///
/// The console layer writes to stderr as human-readable text or JSON
/// depending on `format`; when `log_file` is given, a daily-rolling JSON
/// file layer is added alongside it.
pub fn init_logging(log_level: Option<&str>, format: &str, log_file: Option<&Path>) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level.unwrap_or("info")))
        .map_err(|e| anyhow::anyhow!("Failed to create log filter: {}", e))?;

    // Boxing erases each layer's concrete type so text and JSON console
    // variants compose onto the same stack
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = vec![env_filter.boxed()];

    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);
    if format == "json" {
        layers.push(console.json().boxed());
    } else {
        layers.push(console.with_ansi(true).boxed());
    }

    if let Some(log_path) = log_file {
        let file_appender = rolling::daily(
            log_path.parent().unwrap_or(Path::new(".")),
            "sales-reporter.log",
        );
        let (non_blocking_appender, guard) = non_blocking(file_appender);
        // Keep the appender flushing for the life of the process
        std::mem::forget(guard);

        layers.push(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking_appender)
                .with_ansi(false)
                .with_target(true)
                .json()
                .boxed(),
        );
    }

    Registry::default().with(layers).init();

    info!("Logging initialized");
    Ok(())
}

/// Performance timing for pipeline stages
pub struct OperationTimer {
    operation: String,
    start: std::time::Instant,
}

impl OperationTimer {
    #[must_use]
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: std::time::Instant::now(),
        }
    }

    pub fn finish(self) -> u128 {
        let duration = self.start.elapsed().as_millis();
        tracing::info!(
            operation = self.operation,
            duration_ms = duration,
            "Stage completed"
        );
        duration
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            let duration = self.start.elapsed().as_millis();
            tracing::debug!(
                operation = self.operation,
                duration_ms = duration,
                "Stage finished"
            );
        }
    }
}
