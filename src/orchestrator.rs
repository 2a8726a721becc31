//! Orchestrator: sequences the pipeline stages and tracks the run state.
//!
//! `Idle -> Loading -> Aggregating -> Rendering -> Dispatching -> Done`, with
//! `Failed` terminal from any stage. A fatal loader or aggregator error halts
//! the run before any message leaves (no partial or empty report is sent).
//! A delivery failure after the retry budget still ends in `Done`, flagged in
//! the run report, because the load and the report itself succeeded.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::db::Database;
use crate::dispatcher::{Dispatcher, MailTransport, RetryPolicy};
use crate::logging::OperationTimer;
use crate::models::{DateRange, DeliveryResult, LoadSummary, ReportMetrics};
use crate::source::TabularSource;
use crate::{aggregator, loader, report};

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStage {
    Idle,
    Loading,
    Aggregating,
    Rendering,
    Dispatching,
    Done,
    Failed,
}

/// Terminal record of one pipeline run
#[derive(Debug, Serialize)]
pub struct RunReport {
    /// Terminal stage: `Done` or `Failed`
    pub stage: RunStage,
    /// Load counts when the run included a load
    pub load: Option<LoadSummary>,
    /// Delivery outcome when the run included a dispatch
    pub delivery: Option<DeliveryResult>,
    /// Where the rendered table was written
    pub report_path: Option<PathBuf>,
    /// Fatal error message when the run failed
    pub error: Option<String>,
}

impl RunReport {
    fn done(load: Option<LoadSummary>, delivery: Option<DeliveryResult>, report_path: Option<PathBuf>) -> Self {
        Self {
            stage: RunStage::Done,
            load,
            delivery,
            report_path,
            error: None,
        }
    }

    fn failed(load: Option<LoadSummary>, stage: RunStage, error: String) -> Self {
        error!(?stage, %error, "Run failed");
        Self {
            stage: RunStage::Failed,
            load,
            delivery: None,
            report_path: None,
            error: Some(error),
        }
    }

    /// Process exit status: 0 clean, 2 done with failed delivery, 1 failed
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self.stage {
            RunStage::Failed => 1,
            _ => {
                if self.delivery.as_ref().is_some_and(|d| !d.delivered) {
                    2
                } else {
                    0
                }
            }
        }
    }
}

/// Owns configuration and hands it to each stage; no process-wide singletons
pub struct Orchestrator {
    config: AppConfig,
}

impl Orchestrator {
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    fn transition(from: RunStage, to: RunStage) {
        info!(?from, ?to, "Stage transition");
    }

    /// Load-only invocation
    pub fn run_load(&self, db: &Database, source: &mut dyn TabularSource) -> RunReport {
        Self::transition(RunStage::Idle, RunStage::Loading);
        let timer = OperationTimer::new("load");

        match loader::load(source, db) {
            Ok(summary) => {
                timer.finish();
                Self::transition(RunStage::Loading, RunStage::Done);
                RunReport::done(Some(summary), None, None)
            }
            Err(e) => RunReport::failed(None, RunStage::Loading, e.to_string()),
        }
    }

    /// Report-and-send invocation
    pub fn run_report<T: MailTransport>(
        &self,
        db: &Database,
        transport: T,
        range: Option<DateRange>,
    ) -> RunReport {
        self.report_stages(db, transport, range, None, RunStage::Idle)
    }

    /// Full end-to-end invocation: load, aggregate, render, dispatch
    pub fn run_full<T: MailTransport>(
        &self,
        db: &Database,
        source: &mut dyn TabularSource,
        transport: T,
        range: Option<DateRange>,
    ) -> RunReport {
        Self::transition(RunStage::Idle, RunStage::Loading);
        let timer = OperationTimer::new("load");

        let summary = match loader::load(source, db) {
            Ok(summary) => summary,
            Err(e) => return RunReport::failed(None, RunStage::Loading, e.to_string()),
        };
        timer.finish();

        self.report_stages(db, transport, range, Some(summary), RunStage::Loading)
    }

    fn report_stages<T: MailTransport>(
        &self,
        db: &Database,
        transport: T,
        range: Option<DateRange>,
        load: Option<LoadSummary>,
        from: RunStage,
    ) -> RunReport {
        Self::transition(from, RunStage::Aggregating);
        let metrics = match aggregator::summarize(db, range) {
            Ok(metrics) => metrics,
            Err(e) => return RunReport::failed(load, RunStage::Aggregating, e.to_string()),
        };

        Self::transition(RunStage::Aggregating, RunStage::Rendering);
        let artifact = match report::render(&metrics) {
            Ok(artifact) => artifact,
            Err(e) => return RunReport::failed(load, RunStage::Rendering, e.to_string()),
        };

        let report_path =
            match report::write_artifact(&artifact, std::path::Path::new(&self.config.report.output_directory)) {
                Ok(path) => {
                    info!(path = %path.display(), "Report written");
                    path
                }
                Err(e) => return RunReport::failed(load, RunStage::Rendering, e.to_string()),
            };

        info!("\n{}", artifact.digest);

        Self::transition(RunStage::Rendering, RunStage::Dispatching);
        let policy = RetryPolicy {
            max_attempts: self.config.email.max_attempts,
            backoff: Duration::from_secs(self.config.email.retry_backoff_secs),
        };
        let mut dispatcher = Dispatcher::new(transport, policy);
        let delivery = dispatcher.deliver(&artifact, &self.config.email.to, &subject(&metrics));

        Self::transition(RunStage::Dispatching, RunStage::Done);
        RunReport::done(load, Some(delivery), Some(report_path))
    }
}

fn subject(metrics: &ReportMetrics) -> String {
    metrics.range.map_or_else(
        || "SALES REPORT (no sales recorded)".to_string(),
        |range| format!("SALES REPORT {} to {}", range.start, range.end),
    )
}
