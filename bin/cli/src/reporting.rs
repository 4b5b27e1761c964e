//! Run output: the run log sink, toast notifications and the status table.

use async_trait::async_trait;
use std::fmt::Write as _;
use switchyard_workflow::{
    ClientNotifier, ExecutionState, NodeId, PersistenceError, RunLogEntry, RunLogSink, RunReport,
    RunStatus, WorkflowGraph,
};
use tracing::{info, warn};

/// Writes run summaries to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRunLog;

#[async_trait]
impl RunLogSink for TracingRunLog {
    async fn record_run_log(&self, entry: RunLogEntry) -> Result<(), PersistenceError> {
        match entry.status {
            ExecutionState::Failed => {
                warn!(run_id = %entry.run_id, details = %entry.details, "{}", entry.message);
            }
            _ => info!(run_id = %entry.run_id, details = %entry.details, "{}", entry.message),
        }
        Ok(())
    }
}

/// Prints toast messages to standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

#[async_trait]
impl ClientNotifier for ConsoleNotifier {
    async fn notify(&self, node_id: &NodeId, message: &str) {
        println!("[toast {node_id}] {message}");
    }
}

fn status_label(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Idle => "idle",
        RunStatus::Running => "running",
        RunStatus::Success => "success",
        RunStatus::Error => "error",
    }
}

/// Renders the per-node outcome of a run, in plan order.
#[must_use]
pub fn render_report(report: &RunReport, graph: &WorkflowGraph) -> String {
    let mut out = String::new();
    for (index, node_id) in report.plan.iter().enumerate() {
        let title = graph
            .get_node(node_id)
            .map_or("Unknown Node", |node| node.title.as_str());
        let _ = write!(
            out,
            "{:>3}. {:<8} {title} ({node_id})",
            index + 1,
            status_label(report.status(node_id))
        );
        if let Some(failure) = report.failure.as_ref().filter(|f| &f.node_id == node_id) {
            let _ = write!(out, ": {}", failure.message);
        }
        out.push('\n');
    }

    let verdict = match report.state {
        ExecutionState::Completed => "completed",
        ExecutionState::Failed => "failed",
        ExecutionState::Cancelled => "cancelled",
        ExecutionState::Running => "running",
    };
    let _ = write!(out, "run {} {verdict}", report.run_id);
    if let Some(duration) = report.duration() {
        let _ = write!(out, " in {}ms", duration.num_milliseconds());
    }
    out
}
