//! Workflow execution engine.
//!
//! The engine runs a graph's plan strictly in order, one node at a time:
//! 1. Validate the graph and compute the plan
//! 2. Reset every node's run status to idle
//! 3. For each planned node: gate on config status, resolve placeholders,
//!    check required fields, dispatch, write the output back
//! 4. Halt on the first failure
//!
//! Later nodes read earlier outputs through placeholders, so there is never
//! more than one outstanding handler call.

use crate::dispatch::{ActionRegistry, ActionRequest, ChangeSource, ClientNotifier};
use crate::error::EngineError;
use crate::execution::{NodeFailure, RunReport};
use crate::graph::WorkflowGraph;
use crate::node::{NodeId, NodeType};
use crate::planner::execution_order;
use crate::run_log::{RunLogEntry, RunLogSink};
use crate::state::EditorState;
use crate::template::resolve_value;
use rootcause::prelude::Report;
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue, json};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Delay between polling attempts, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Number of checks before a polling trigger times out.
    #[serde(default = "default_poll_max_attempts")]
    pub poll_max_attempts: u32,
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_poll_max_attempts() -> u32 {
    30
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            poll_max_attempts: default_poll_max_attempts(),
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Result of testing a single node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeTestOutcome {
    Succeeded { output: JsonValue },
    Failed(NodeFailure),
    Cancelled,
}

/// Why a node step did not produce an output.
enum Interrupt {
    Failed(NodeFailure),
    Cancelled,
}

/// Drives workflow runs against registered handlers.
pub struct Engine {
    config: EngineConfig,
    actions: ActionRegistry,
    change_source: Option<Arc<dyn ChangeSource>>,
    notifier: Option<Arc<dyn ClientNotifier>>,
    run_log: Option<Arc<dyn RunLogSink>>,
}

impl Engine {
    /// Creates an engine with default settings.
    #[must_use]
    pub fn new(actions: ActionRegistry) -> Self {
        Self {
            config: EngineConfig::default(),
            actions,
            change_source: None,
            notifier: None,
            run_log: None,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the source watched by polling triggers.
    #[must_use]
    pub fn with_change_source(mut self, source: Arc<dyn ChangeSource>) -> Self {
        self.change_source = Some(source);
        self
    }

    /// Sets the receiver of client notifications.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn ClientNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Sets the run log sink.
    #[must_use]
    pub fn with_run_log(mut self, sink: Arc<dyn RunLogSink>) -> Self {
        self.run_log = Some(sink);
        self
    }

    /// Returns the engine settings.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs the whole plan of the editor's graph.
    ///
    /// Node failures and cancellation are part of the returned report, not
    /// errors.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidGraph`] if the graph fails validation;
    /// nothing is executed and run statuses are left as they were.
    #[instrument(name = "workflow_run", skip_all, fields(nodes = state.graph().node_count()))]
    pub async fn run(
        &self,
        state: &mut EditorState,
        cancel: &CancellationToken,
    ) -> Result<RunReport, Report<EngineError>> {
        state
            .graph()
            .validate()
            .map_err(|reason| EngineError::InvalidGraph { reason })?;

        let plan = execution_order(state.store.graph());
        state.run.reset(state.store.graph());
        let mut report = RunReport::start(plan.clone());
        info!(run_id = %report.run_id, planned = plan.len(), "workflow run started");

        for node_id in &plan {
            if cancel.is_cancelled() {
                report.cancel(&state.run);
                break;
            }

            match self.step(state, node_id, cancel).await {
                Ok(()) => {}
                Err(Interrupt::Failed(failure)) => {
                    state.run.finish(false);
                    report.fail(failure, &state.run);
                    break;
                }
                Err(Interrupt::Cancelled) => {
                    report.cancel(&state.run);
                    break;
                }
            }
        }

        if !report.state.is_terminal() {
            state.run.finish(true);
            report.complete(&state.run);
        }

        info!(
            run_id = %report.run_id,
            state = ?report.state,
            success = report.success,
            "workflow run finished"
        );
        self.emit_run_log(&report).await;
        Ok(report)
    }

    /// Runs a single node through the same path as a full run, without a plan.
    ///
    /// Only the tested node's run status changes.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NodeNotFound`] if the node does not exist.
    #[instrument(skip_all, fields(node_id = %node_id))]
    pub async fn test_node(
        &self,
        state: &mut EditorState,
        node_id: &NodeId,
        cancel: &CancellationToken,
    ) -> Result<NodeTestOutcome, Report<EngineError>> {
        if !state.graph().contains_node(node_id) {
            return Err(EngineError::NodeNotFound {
                node_id: node_id.clone(),
            }
            .into());
        }

        let outcome = match self.step(state, node_id, cancel).await {
            Ok(()) => NodeTestOutcome::Succeeded {
                output: state
                    .graph()
                    .get_node(node_id)
                    .and_then(|node| node.output().cloned())
                    .unwrap_or_else(|| json!({})),
            },
            Err(Interrupt::Failed(failure)) => NodeTestOutcome::Failed(failure),
            Err(Interrupt::Cancelled) => NodeTestOutcome::Cancelled,
        };
        Ok(outcome)
    }

    /// Executes one node and applies the result to the editor state.
    async fn step(
        &self,
        state: &mut EditorState,
        node_id: &NodeId,
        cancel: &CancellationToken,
    ) -> Result<(), Interrupt> {
        state.run.mark_running(node_id);
        debug!(node_id = %node_id, "node started");

        match self.attempt(state.store.graph(), node_id, cancel).await {
            Ok(output) => {
                if let Err(e) = state.store.record_output(node_id, output) {
                    let failure = NodeFailure::handler(node_id.clone(), e.to_string());
                    state.run.mark_error(node_id, &failure.message);
                    return Err(Interrupt::Failed(failure));
                }
                state.run.mark_success(node_id);
                debug!(node_id = %node_id, "node succeeded");
                Ok(())
            }
            Err(Interrupt::Failed(failure)) => {
                warn!(node_id = %node_id, kind = ?failure.kind, error = %failure.message, "node failed");
                state.run.mark_error(node_id, &failure.message);
                Err(Interrupt::Failed(failure))
            }
            Err(Interrupt::Cancelled) => {
                info!(node_id = %node_id, "node cancelled");
                state.run.mark_idle(node_id);
                Err(Interrupt::Cancelled)
            }
        }
    }

    /// Gates, resolves and dispatches a node, returning its output.
    async fn attempt(
        &self,
        graph: &WorkflowGraph,
        node_id: &NodeId,
        cancel: &CancellationToken,
    ) -> Result<JsonValue, Interrupt> {
        let node = graph.get_node(node_id).ok_or_else(|| {
            Interrupt::Failed(NodeFailure::handler(node_id.clone(), "node not found"))
        })?;

        // Checked before dispatch so an unconfigured node never causes side effects.
        if !node.config_status.is_runnable() {
            return Err(Interrupt::Failed(NodeFailure::not_configured(
                node_id.clone(),
            )));
        }

        let config: Map<String, JsonValue> = node
            .config()
            .iter()
            .map(|(key, value)| (key.clone(), resolve_value(value, graph)))
            .collect();
        let request = ActionRequest::for_node(node, config);

        match node.node_type {
            node_type if node_type.is_polling() => {
                let source = self.change_source.as_deref().ok_or_else(|| {
                    Interrupt::Failed(NodeFailure::handler(
                        node_id.clone(),
                        "no change source registered",
                    ))
                })?;
                check_required(&request, source.required_fields())?;
                self.poll(source, &request, cancel).await
            }
            // A toast needs a configured `message`; an empty resolved
            // message still succeeds.
            node_type if node_type.is_client_notification() => {
                let message = match request.field("message") {
                    None | Some(JsonValue::Null) => {
                        return Err(Interrupt::Failed(NodeFailure::missing_field(
                            node_id.clone(),
                            "message",
                        )));
                    }
                    Some(value) => value.as_str().unwrap_or_default(),
                };
                if let Some(notifier) = &self.notifier {
                    notifier.notify(node_id, message).await;
                }
                Ok(json!({ "message": message }))
            }
            node_type => self.dispatch(node_type, &request, cancel).await,
        }
    }

    async fn dispatch(
        &self,
        node_type: NodeType,
        request: &ActionRequest,
        cancel: &CancellationToken,
    ) -> Result<JsonValue, Interrupt> {
        let node_id = &request.node_id;
        let handler = self.actions.get(node_type).ok_or_else(|| {
            Interrupt::Failed(NodeFailure::handler(
                node_id.clone(),
                format!("no handler registered for {node_type}"),
            ))
        })?;
        check_required(request, handler.required_fields())?;

        let result = tokio::select! {
            () = cancel.cancelled() => return Err(Interrupt::Cancelled),
            result = handler.execute(request) => result,
        };

        match result {
            Ok(outcome) if outcome.success => Ok(outcome.output.unwrap_or_else(|| json!({}))),
            Ok(outcome) => Err(Interrupt::Failed(NodeFailure::handler(
                node_id.clone(),
                outcome
                    .error
                    .unwrap_or_else(|| "handler reported failure".to_string()),
            ))),
            Err(e) => Err(Interrupt::Failed(NodeFailure::handler(
                node_id.clone(),
                e.to_string(),
            ))),
        }
    }

    /// Checks the change source until it reports a change, the attempts run
    /// out, or the run is cancelled.
    async fn poll(
        &self,
        source: &dyn ChangeSource,
        request: &ActionRequest,
        cancel: &CancellationToken,
    ) -> Result<JsonValue, Interrupt> {
        let attempts = self.config.poll_max_attempts.max(1);

        for attempt in 1..=attempts {
            if cancel.is_cancelled() {
                return Err(Interrupt::Cancelled);
            }

            match source.check(request).await {
                Ok(Some(change)) => {
                    debug!(node_id = %request.node_id, attempt, "change detected");
                    return Ok(change);
                }
                Ok(None) => debug!(node_id = %request.node_id, attempt, "no change yet"),
                Err(e) => {
                    return Err(Interrupt::Failed(NodeFailure::handler(
                        request.node_id.clone(),
                        e.to_string(),
                    )));
                }
            }

            if attempt < attempts {
                tokio::select! {
                    () = cancel.cancelled() => return Err(Interrupt::Cancelled),
                    () = tokio::time::sleep(self.config.poll_interval()) => {}
                }
            }
        }

        Err(Interrupt::Failed(NodeFailure::timed_out(
            request.node_id.clone(),
            attempts,
        )))
    }

    async fn emit_run_log(&self, report: &RunReport) {
        let Some(sink) = &self.run_log else {
            return;
        };
        if let Err(e) = sink.record_run_log(RunLogEntry::from_report(report)).await {
            warn!(run_id = %report.run_id, error = %e, "failed to record run log");
        }
    }
}

/// Fails if any required field is absent, null or blank after resolution.
fn check_required(request: &ActionRequest, fields: &[&str]) -> Result<(), Interrupt> {
    let missing = fields.iter().find(|field| match request.field(field) {
        None | Some(JsonValue::Null) => true,
        Some(JsonValue::String(text)) => text.trim().is_empty(),
        Some(_) => false,
    });
    match missing {
        Some(field) => Err(Interrupt::Failed(NodeFailure::missing_field(
            request.node_id.clone(),
            field,
        ))),
        None => Ok(()),
    }
}
