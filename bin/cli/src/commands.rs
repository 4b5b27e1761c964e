//! Command implementations.
//!
//! Each command takes an already loaded workflow and returns the text to
//! print, so `main` only deals with arguments, I/O and exit codes.

use crate::config::CliConfig;
use crate::error::CliError;
use crate::reporting::{ConsoleNotifier, TracingRunLog};
use std::fmt::Write as _;
use std::sync::Arc;
use switchyard_core::Result;
use switchyard_integration::local_registry;
use switchyard_workflow::{
    EditorState, Engine, NodeId, RunReport, Workflow, capture, execution_order,
    value_has_placeholders, variable_options,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Checks the workflow's structure.
///
/// # Errors
///
/// Returns [`CliError::InvalidWorkflow`] naming the first problem found.
pub fn validate(workflow: &Workflow) -> Result<String, CliError> {
    workflow
        .validate()
        .map_err(|e| CliError::InvalidWorkflow {
            details: e.to_string(),
        })?;
    Ok(format!(
        "{} is valid: {} nodes, {} edges",
        workflow.name(),
        workflow.graph.node_count(),
        workflow.graph.edge_count()
    ))
}

/// Lists the execution order with node titles. Nodes whose configuration
/// references upstream outputs are marked.
#[must_use]
pub fn plan(workflow: &Workflow) -> String {
    let order = execution_order(&workflow.graph);
    let mut out = String::new();
    for (index, node_id) in order.iter().enumerate() {
        if let Some(node) = workflow.graph.get_node(node_id) {
            let _ = write!(
                out,
                "{:>3}. {} [{}] ({node_id})",
                index + 1,
                node.title,
                node.node_type
            );
            if node.config().values().any(value_has_placeholders) {
                out.push_str(" uses variables");
            }
            out.push('\n');
        }
    }
    let skipped = workflow.graph.node_count() - order.len();
    if skipped > 0 {
        let _ = writeln!(out, "{skipped} node(s) unreachable from any entry node");
    }
    out
}

/// Lists the placeholders a node may reference.
///
/// # Errors
///
/// Returns [`CliError::UnknownNode`] if the node does not exist.
pub fn vars(workflow: &Workflow, node_id: &str) -> Result<String, CliError> {
    let node_id = NodeId::from(node_id);
    if !workflow.graph.contains_node(&node_id) {
        return Err(CliError::UnknownNode {
            node_id: node_id.to_string(),
        }
        .into());
    }

    let options = variable_options(&workflow.graph, &node_id);
    if options.is_empty() {
        return Ok(format!("no variables available for {node_id}"));
    }
    let mut out = String::new();
    for option in options {
        let _ = writeln!(
            out,
            "{:<40} {}.{}",
            option.placeholder, option.node_title, option.field
        );
    }
    Ok(out)
}

/// Runs the workflow with the built-in handlers and captures the recorded
/// outputs back into it.
///
/// # Errors
///
/// Returns [`CliError::Run`] if the graph fails validation. Node failures and
/// cancellation are reported in the returned [`RunReport`].
pub async fn run(
    workflow: &mut Workflow,
    config: &CliConfig,
    cancel: &CancellationToken,
) -> Result<RunReport, CliError> {
    let mut state = EditorState::from_config(workflow.graph.clone(), config.editor);
    let engine = Engine::new(local_registry())
        .with_config(config.engine)
        .with_notifier(Arc::new(ConsoleNotifier))
        .with_run_log(Arc::new(TracingRunLog));

    info!(workflow_id = %workflow.id, name = %workflow.name(), "running workflow");
    let report = engine
        .run(&mut state, cancel)
        .await
        .map_err(|e| CliError::Run {
            details: e.to_string(),
        })?;

    capture(workflow, &state);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use switchyard_workflow::{Edge, ExecutionState, Node, NodeType, RunStatus, WorkflowGraph};

    fn id(raw: &str) -> NodeId {
        NodeId::from(raw)
    }

    fn workflow(nodes: Vec<Node>, edges: &[(&str, &str)]) -> Workflow {
        let edges = edges.iter().map(|(s, t)| Edge::new(id(s), id(t))).collect();
        Workflow::new("Test").with_graph(WorkflowGraph::from_parts(nodes, edges))
    }

    fn local_flow() -> Workflow {
        workflow(
            vec![
                Node::with_id("start", NodeType::Trigger, "Start").active(),
                Node::with_id("pause", NodeType::Wait, "Pause")
                    .with_config("durationMs", json!(1))
                    .active(),
                Node::with_id("store", NodeType::KvStorage, "Remember")
                    .with_config("operation", json!("set"))
                    .with_config("key", json!("started"))
                    .with_config("value", json!("{{start.triggeredAt}}"))
                    .active(),
                Node::with_id("done", NodeType::End, "Done").active(),
            ],
            &[("start", "pause"), ("pause", "store"), ("store", "done")],
        )
    }

    fn fast() -> CliConfig {
        let mut config = CliConfig::default();
        config.engine.poll_interval_ms = 1;
        config
    }

    #[test]
    fn validate_reports_counts() {
        let summary = validate(&local_flow()).expect("valid");
        assert_eq!(summary, "Test is valid: 4 nodes, 3 edges");
    }

    #[test]
    fn validate_rejects_cycles() {
        let flow = workflow(
            vec![
                Node::with_id("a", NodeType::Wait, "A"),
                Node::with_id("b", NodeType::Wait, "B"),
            ],
            &[("a", "b"), ("b", "a")],
        );
        assert!(validate(&flow).is_err());
    }

    #[test]
    fn plan_lists_titles_in_order() {
        let text = plan(&local_flow());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("Start"));
        assert!(lines[3].contains("Done"));
    }

    #[test]
    fn plan_marks_nodes_that_use_variables() {
        let text = plan(&local_flow());
        let marked: Vec<&str> = text
            .lines()
            .filter(|line| line.ends_with("uses variables"))
            .collect();
        assert_eq!(marked.len(), 1);
        assert!(marked[0].contains("Remember"));
    }

    #[test]
    fn plan_mentions_unreachable_nodes() {
        let flow = workflow(
            vec![
                Node::with_id("a", NodeType::Trigger, "A"),
                Node::with_id("x", NodeType::Wait, "X"),
                Node::with_id("y", NodeType::Wait, "Y"),
            ],
            &[("x", "y"), ("y", "x")],
        );
        assert!(plan(&flow).contains("2 node(s) unreachable"));
    }

    #[test]
    fn vars_for_unknown_node() {
        assert!(vars(&local_flow(), "ghost").is_err());
    }

    #[test]
    fn vars_lists_ancestor_outputs() {
        let mut flow = local_flow();
        if let Some(start) = flow.graph.get_node_mut(&id("start")) {
            start.set_output(json!({"triggeredAt": "2026-01-01T00:00:00Z"}));
        }
        let text = vars(&flow, "store").expect("vars");
        assert!(text.contains("{{start.triggeredAt}}"));
        assert!(text.contains("Start.triggeredAt"));
        assert_eq!(
            vars(&flow, "start").expect("vars"),
            "no variables available for start"
        );
    }

    #[tokio::test]
    async fn run_captures_outputs() {
        let mut flow = local_flow();

        let report = run(&mut flow, &fast(), &CancellationToken::new())
            .await
            .expect("run");

        assert_eq!(report.state, ExecutionState::Completed);
        assert_eq!(report.status(&id("done")), RunStatus::Success);
        let stored = flow
            .graph
            .get_node(&id("store"))
            .and_then(|node| node.output().cloned())
            .expect("output captured");
        assert_eq!(stored["key"], json!("started"));
        assert!(stored["value"].as_str().is_some_and(|v| !v.is_empty()));
    }

    #[tokio::test]
    async fn run_stops_at_unconfigured_node() {
        let mut flow = workflow(
            vec![
                Node::with_id("start", NodeType::Trigger, "Start").active(),
                Node::with_id("post", NodeType::Slack, "Post"),
            ],
            &[("start", "post")],
        );

        let report = run(&mut flow, &fast(), &CancellationToken::new())
            .await
            .expect("run");

        assert_eq!(report.state, ExecutionState::Failed);
        assert_eq!(report.status(&id("post")), RunStatus::Error);
    }
}
