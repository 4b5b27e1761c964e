//! Execution order planning.
//!
//! The plan starts from every entry node (no incoming edge) at once and walks
//! outgoing edges breadth-first. A node is placed when first discovered, even
//! if some of its other predecessors have not been placed yet. Nodes that no
//! entry node reaches are left out.

use crate::graph::WorkflowGraph;
use crate::node::NodeId;
use std::collections::{HashSet, VecDeque};

/// Computes the run order for a graph.
///
/// Deterministic for a given node and edge order: entries are seeded in node
/// order and successors are queued in edge order.
#[must_use]
pub fn execution_order(graph: &WorkflowGraph) -> Vec<NodeId> {
    let index = graph.index();
    let mut queue: VecDeque<&NodeId> = graph
        .entry_nodes()
        .into_iter()
        .map(|node| &node.id)
        .collect();
    let mut visited = HashSet::new();
    let mut order = Vec::new();

    while let Some(current) = queue.pop_front() {
        if !visited.insert(current) {
            continue;
        }
        queue.extend(index.successors(current));
        order.push(current.clone());
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::Edge;
    use crate::node::{Node, NodeType};

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> WorkflowGraph {
        WorkflowGraph::from_parts(
            nodes
                .iter()
                .map(|raw| Node::with_id(*raw, NodeType::Wait, *raw))
                .collect(),
            edges
                .iter()
                .map(|(s, t)| Edge::new(NodeId::from(*s), NodeId::from(*t)))
                .collect(),
        )
    }

    fn order(g: &WorkflowGraph) -> Vec<String> {
        execution_order(g).iter().map(ToString::to_string).collect()
    }

    #[test]
    fn linear_chain_in_order() {
        let g = graph(&["c", "b", "a"], &[("a", "b"), ("b", "c")]);
        assert_eq!(order(&g), vec!["a", "b", "c"]);
    }

    #[test]
    fn branches_follow_edge_order() {
        let g = graph(
            &["t", "x", "y", "z"],
            &[("t", "y"), ("t", "x"), ("x", "z")],
        );
        assert_eq!(order(&g), vec!["t", "y", "x", "z"]);
    }

    #[test]
    fn fan_in_visited_once() {
        let g = graph(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
        );
        let planned = order(&g);
        assert_eq!(planned, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn multiple_entries_seed_together() {
        let g = graph(&["a", "b", "c", "d"], &[("a", "c"), ("b", "d")]);
        assert_eq!(order(&g), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn discovery_order_ignores_pending_predecessors() {
        // d is queued from c before b is walked and is still placed once.
        let g = graph(&["a", "c", "b", "d"], &[("a", "b"), ("b", "d"), ("c", "d")]);
        assert_eq!(order(&g), vec!["a", "c", "b", "d"]);
    }

    #[test]
    fn unreachable_cycle_is_never_planned() {
        let g = graph(&["a", "b", "x", "y"], &[("a", "b"), ("x", "y"), ("y", "x")]);
        assert_eq!(order(&g), vec!["a", "b"]);
    }

    #[test]
    fn every_reachable_node_exactly_once() {
        let g = graph(
            &["s", "a", "b", "c", "d", "e"],
            &[
                ("s", "a"),
                ("s", "b"),
                ("a", "c"),
                ("b", "c"),
                ("c", "d"),
                ("a", "d"),
                ("d", "e"),
            ],
        );
        let planned = order(&g);
        let unique: HashSet<_> = planned.iter().collect();
        assert_eq!(planned.len(), 6);
        assert_eq!(unique.len(), 6);
    }

    #[test]
    fn long_chain_listed_in_reverse_node_order() {
        let names: Vec<String> = (0..500).map(|i| format!("n{i}")).collect();
        let nodes: Vec<&str> = names.iter().rev().map(String::as_str).collect();
        let edges: Vec<(&str, &str)> = names
            .windows(2)
            .map(|pair| (pair[0].as_str(), pair[1].as_str()))
            .collect();

        assert_eq!(order(&graph(&nodes, &edges)), names);
    }

    #[test]
    fn empty_graph_has_empty_plan() {
        assert!(execution_order(&WorkflowGraph::new()).is_empty());
    }
}
