//! Run state tracking.
//!
//! - [`RunStatus`]: per-node display status, reset at the start of every run
//! - [`RunBoard`]: the status map, per-node errors and the last-run flag
//! - [`RunReport`]: the outcome of one run, returned by the engine
//! - [`NodeFailure`]: why a node stopped the run

use crate::graph::WorkflowGraph;
use crate::node::NodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use switchyard_core::WorkflowRunId;

/// Display status of a node during and after a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Success,
    Error,
}

/// The overall state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    /// Run is actively executing.
    Running,
    /// Every planned node succeeded.
    Completed,
    /// A node failed and the run halted.
    Failed,
    /// The user stopped the run; not an error.
    Cancelled,
}

impl ExecutionState {
    /// Returns true if this is a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Category of a node failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The node is not `active`.
    Configuration,
    /// A required configuration field is empty after resolution.
    MissingField,
    /// The handler failed or reported failure.
    Handler,
    /// A polling node ran out of attempts.
    Timeout,
}

/// A failure that halted a run at a specific node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFailure {
    pub node_id: NodeId,
    pub kind: FailureKind,
    pub message: String,
}

impl NodeFailure {
    #[must_use]
    pub fn new(node_id: NodeId, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            node_id,
            kind,
            message: message.into(),
        }
    }

    /// The node is not configured for running.
    #[must_use]
    pub fn not_configured(node_id: NodeId) -> Self {
        Self::new(
            node_id,
            FailureKind::Configuration,
            "node must be configured before running",
        )
    }

    #[must_use]
    pub fn missing_field(node_id: NodeId, field: &str) -> Self {
        Self::new(
            node_id,
            FailureKind::MissingField,
            format!("missing required field: {field}"),
        )
    }

    #[must_use]
    pub fn handler(node_id: NodeId, message: impl Into<String>) -> Self {
        Self::new(node_id, FailureKind::Handler, message)
    }

    #[must_use]
    pub fn timed_out(node_id: NodeId, attempts: u32) -> Self {
        Self::new(
            node_id,
            FailureKind::Timeout,
            format!("timed out after {attempts} attempts without a change"),
        )
    }
}

impl fmt::Display for NodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node {} failed: {}", self.node_id, self.message)
    }
}

/// Live per-node run status, owned by the editor and written by the engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunBoard {
    statuses: HashMap<NodeId, RunStatus>,
    errors: HashMap<NodeId, String>,
    last_run_success: Option<bool>,
}

impl RunBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets every node of the graph to idle and clears errors and the
    /// last-run flag.
    pub fn reset(&mut self, graph: &WorkflowGraph) {
        self.statuses = graph
            .nodes()
            .iter()
            .map(|node| (node.id.clone(), RunStatus::Idle))
            .collect();
        self.errors.clear();
        self.last_run_success = None;
    }

    /// Returns a node's status; unknown nodes are idle.
    #[must_use]
    pub fn status(&self, node_id: &NodeId) -> RunStatus {
        self.statuses.get(node_id).copied().unwrap_or_default()
    }

    /// Returns every tracked status.
    #[must_use]
    pub fn statuses(&self) -> &HashMap<NodeId, RunStatus> {
        &self.statuses
    }

    /// Returns the error recorded for a node in the last run.
    #[must_use]
    pub fn error(&self, node_id: &NodeId) -> Option<&str> {
        self.errors.get(node_id).map(String::as_str)
    }

    /// Returns whether the last run succeeded, `None` before any run finished.
    #[must_use]
    pub fn last_run_success(&self) -> Option<bool> {
        self.last_run_success
    }

    pub fn mark_idle(&mut self, node_id: &NodeId) {
        self.statuses.insert(node_id.clone(), RunStatus::Idle);
    }

    pub fn mark_running(&mut self, node_id: &NodeId) {
        self.errors.remove(node_id);
        self.statuses.insert(node_id.clone(), RunStatus::Running);
    }

    pub fn mark_success(&mut self, node_id: &NodeId) {
        self.statuses.insert(node_id.clone(), RunStatus::Success);
    }

    pub fn mark_error(&mut self, node_id: &NodeId, message: impl Into<String>) {
        self.statuses.insert(node_id.clone(), RunStatus::Error);
        self.errors.insert(node_id.clone(), message.into());
    }

    /// Records the overall outcome of a run.
    pub fn finish(&mut self, success: bool) {
        self.last_run_success = Some(success);
    }
}

/// Outcome of one run of a workflow's plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: WorkflowRunId,
    pub state: ExecutionState,
    /// True only if every planned node succeeded.
    pub success: bool,
    /// Execution order used for this run.
    pub plan: Vec<NodeId>,
    /// Status of every planned node at the end of the run.
    pub statuses: HashMap<NodeId, RunStatus>,
    /// The failure that halted the run, if any.
    pub failure: Option<NodeFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunReport {
    /// Starts a report for the given plan.
    #[must_use]
    pub fn start(plan: Vec<NodeId>) -> Self {
        Self {
            run_id: WorkflowRunId::new(),
            state: ExecutionState::Running,
            success: false,
            plan,
            statuses: HashMap::new(),
            failure: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Marks the run as completed.
    pub fn complete(&mut self, board: &RunBoard) {
        self.finish(ExecutionState::Completed, board);
        self.success = true;
    }

    /// Marks the run as failed.
    pub fn fail(&mut self, failure: NodeFailure, board: &RunBoard) {
        self.finish(ExecutionState::Failed, board);
        self.failure = Some(failure);
    }

    /// Marks the run as cancelled.
    pub fn cancel(&mut self, board: &RunBoard) {
        self.finish(ExecutionState::Cancelled, board);
    }

    /// Returns a planned node's final status.
    #[must_use]
    pub fn status(&self, node_id: &NodeId) -> RunStatus {
        self.statuses.get(node_id).copied().unwrap_or_default()
    }

    /// Returns the duration of the run, if it has finished.
    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        Some(self.finished_at? - self.started_at)
    }

    fn finish(&mut self, state: ExecutionState, board: &RunBoard) {
        self.state = state;
        self.success = false;
        self.finished_at = Some(Utc::now());
        self.statuses = self
            .plan
            .iter()
            .map(|id| (id.clone(), board.status(id)))
            .collect();
    }
}
