//! Upstream node discovery.
//!
//! A node's ancestors are every node reachable by walking incoming edges
//! backwards. They bound which outputs a node's configuration may reference.

use crate::graph::WorkflowGraph;
use crate::node::{Node, NodeId};
use crate::template;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};

/// A field of an upstream node's output that can be inserted as a placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableOption {
    pub node_id: NodeId,
    pub node_title: String,
    pub field: String,
    /// The `{{nodeId.field}}` token to insert.
    pub placeholder: String,
}

/// Returns every ancestor of `node_id` in breadth-first discovery order.
///
/// The queried node is never included, even when the graph contains a cycle
/// through it; the visited set keeps the walk finite on any input.
#[must_use]
pub fn ancestors<'a>(graph: &'a WorkflowGraph, node_id: &NodeId) -> Vec<&'a Node> {
    let index = graph.index();
    let mut visited = HashSet::from([node_id]);
    let mut worklist: VecDeque<&NodeId> = index.predecessors(node_id).iter().copied().collect();
    let mut found = Vec::new();

    while let Some(current) = worklist.pop_front() {
        if !visited.insert(current) {
            continue;
        }
        if let Some(node) = index.node(current) {
            found.push(node);
        }
        worklist.extend(index.predecessors(current));
    }

    found
}

/// Returns true if `candidate` is upstream of `node_id`.
#[must_use]
pub fn is_ancestor(graph: &WorkflowGraph, candidate: &NodeId, node_id: &NodeId) -> bool {
    ancestors(graph, node_id)
        .iter()
        .any(|node| &node.id == candidate)
}

/// Lists the placeholders a node may reference: every top-level field of each
/// ancestor's recorded output.
#[must_use]
pub fn variable_options(graph: &WorkflowGraph, node_id: &NodeId) -> Vec<VariableOption> {
    ancestors(graph, node_id)
        .into_iter()
        .filter_map(|node| Some((node, node.output()?.as_object()?)))
        .flat_map(|(node, fields)| {
            fields.keys().map(move |field| VariableOption {
                node_id: node.id.clone(),
                node_title: node.title.clone(),
                field: field.clone(),
                placeholder: template::placeholder(&node.id, field),
            })
        })
        .collect()
}
