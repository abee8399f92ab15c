//! Outcome collection: turns each published outcome into counter increments
//! and one structured log record.

use std::sync::Arc;

use bridge::metrics::{ALL_PROJECTS, OP_OUTCOME, OP_RESPONSE, RESULT_TOTAL};
use bridge::{Counters, Outcome, StatusCategory};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::OutcomeHandle;

/// Result recorded when a handle resolves without an outcome.
pub const RESULT_ABANDONED: &str = "abandoned";

/// Consumes outcome handles and updates the shared counters.
#[derive(Debug, Clone)]
pub struct OutcomeCollector {
    counters: Arc<Counters>,
}

impl OutcomeCollector {
    pub fn new(counters: Arc<Counters>) -> Self {
        Self { counters }
    }

    /// Waits for the outcome behind `handle` and records it.
    pub async fn collect(&self, handle: OutcomeHandle) {
        let submission = handle.submission();
        match handle.wait().await {
            Some(outcome) => self.record(&outcome),
            None => {
                warn!(submission = %submission, "Outcome handle closed without an outcome");
                self.counters
                    .increment(OP_OUTCOME, ALL_PROJECTS, RESULT_ABANDONED);
            }
        }
    }

    /// Collects `handle` on its own task.
    pub fn spawn(&self, handle: OutcomeHandle) -> JoinHandle<()> {
        let collector = self.clone();
        tokio::spawn(async move { collector.collect(handle).await })
    }

    /// Applies one outcome to the counters and logs it.
    pub fn record(&self, outcome: &Outcome) {
        let project = outcome.project.as_str();
        self.counters.increment(OP_OUTCOME, ALL_PROJECTS, RESULT_TOTAL);
        self.counters
            .increment(OP_OUTCOME, project, outcome.status.as_str());
        if outcome.status == StatusCategory::Delivered {
            let result = if outcome.is_ok() { "ok" } else { "error" };
            self.counters.increment(OP_RESPONSE, project, result);
        }
        log_outcome(outcome);
    }
}

fn log_outcome(outcome: &Outcome) {
    let legacy_code = outcome.status.legacy_code();
    match outcome.status {
        StatusCategory::Delivered if outcome.is_ok() => info!(
            submission = %outcome.submission,
            project = %outcome.project,
            issue_id = %outcome.issue_id,
            endpoint = %outcome.endpoint,
            http_status = outcome.http_status,
            "Message delivered"
        ),
        StatusCategory::Delivered => warn!(
            submission = %outcome.submission,
            project = %outcome.project,
            issue_id = %outcome.issue_id,
            endpoint = %outcome.endpoint,
            http_status = outcome.http_status,
            "Destination answered with a non-200 status"
        ),
        StatusCategory::NotMapped | StatusCategory::TransportFailed => warn!(
            submission = %outcome.submission,
            project = %outcome.project,
            issue_id = %outcome.issue_id,
            endpoint = %outcome.endpoint,
            status = %outcome.status,
            legacy_code = ?legacy_code,
            error = %outcome.error_detail,
            "Message not delivered"
        ),
        StatusCategory::RenderFailed => error!(
            submission = %outcome.submission,
            project = %outcome.project,
            issue_id = %outcome.issue_id,
            legacy_code = ?legacy_code,
            error = %outcome.error_detail,
            "Message template failed to render"
        ),
    }
}
