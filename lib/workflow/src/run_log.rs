//! Run log emission.
//!
//! After each run the engine may hand a summary to a [`RunLogSink`]. The sink
//! is optional and its failures never change a run's outcome.

use crate::error::PersistenceError;
use crate::execution::{ExecutionState, RunReport, RunStatus};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value as JsonValue, json};
use switchyard_core::WorkflowRunId;

/// One run's summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunLogEntry {
    pub run_id: WorkflowRunId,
    pub status: ExecutionState,
    pub message: String,
    /// Plan, per-node statuses and failure detail.
    pub details: JsonValue,
}

impl RunLogEntry {
    /// Summarizes a finished run.
    #[must_use]
    pub fn from_report(report: &RunReport) -> Self {
        let succeeded = report
            .plan
            .iter()
            .filter(|id| report.status(id) == RunStatus::Success)
            .count();
        let total = report.plan.len();

        let message = match (&report.state, &report.failure) {
            (ExecutionState::Failed, Some(failure)) => format!(
                "run failed at {} after {succeeded} of {total} nodes: {}",
                failure.node_id, failure.message
            ),
            (ExecutionState::Cancelled, _) => {
                format!("run cancelled after {succeeded} of {total} nodes")
            }
            (ExecutionState::Failed, None) => {
                format!("run failed after {succeeded} of {total} nodes")
            }
            (ExecutionState::Running, _) => {
                format!("run in progress, {succeeded} of {total} nodes done")
            }
            (ExecutionState::Completed, _) => {
                format!("run completed with {succeeded} of {total} nodes succeeded")
            }
        };

        Self {
            run_id: report.run_id,
            status: report.state,
            message,
            details: json!({
                "plan": report.plan,
                "statuses": report.statuses,
                "failure": report.failure,
                "started_at": report.started_at,
                "finished_at": report.finished_at,
            }),
        }
    }
}

/// Receives run summaries.
#[async_trait]
pub trait RunLogSink: Send + Sync {
    async fn record_run_log(&self, entry: RunLogEntry) -> Result<(), PersistenceError>;
}
