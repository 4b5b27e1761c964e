//! Workflow graph model.
//!
//! Workflows are directed acyclic graphs where:
//! - Nodes are typed workflow steps kept in insertion order
//! - Edges connect a source node to a target node, also kept in order
//!
//! Order matters: the planner's tie-break and the persisted JSON both follow
//! the node and edge sequences. petgraph is used for reachability and cycle
//! checks over a borrowed view of the edge set. Whole-graph walks build a
//! [`GraphIndex`] once instead of scanning the vectors per lookup.

use crate::edge::{Edge, EdgeId};
use crate::error::GraphError;
use crate::node::{Node, NodeId};
use petgraph::algo::{has_path_connecting, is_cyclic_directed};
use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A workflow graph: ordered nodes plus ordered edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowGraph {
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    edges: Vec<Edge>,
}

impl WorkflowGraph {
    /// Creates a new empty workflow graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from existing parts without validating it.
    #[must_use]
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    /// Returns all nodes in order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns all edges in order.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Returns the number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of edges in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns a reference to a node by its ID.
    #[must_use]
    pub fn get_node(&self, node_id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|node| &node.id == node_id)
    }

    /// Returns a mutable reference to a node by its ID.
    pub fn get_node_mut(&mut self, node_id: &NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|node| &node.id == node_id)
    }

    /// Returns true if the node exists.
    #[must_use]
    pub fn contains_node(&self, node_id: &NodeId) -> bool {
        self.get_node(node_id).is_some()
    }

    /// Returns a reference to an edge by its ID.
    #[must_use]
    pub fn get_edge(&self, edge_id: &EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|edge| &edge.id == edge_id)
    }

    /// Returns a mutable reference to an edge by its ID.
    pub fn get_edge_mut(&mut self, edge_id: &EdgeId) -> Option<&mut Edge> {
        self.edges.iter_mut().find(|edge| &edge.id == edge_id)
    }

    /// Returns true if an edge runs from `source` to `target`.
    #[must_use]
    pub fn has_edge(&self, source: &NodeId, target: &NodeId) -> bool {
        self.edges.iter().any(|edge| edge.connects(source, target))
    }

    /// Appends a node without enforcing any invariant.
    pub fn push_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    /// Appends an edge without enforcing any invariant.
    pub fn push_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    /// Removes a node together with every edge touching it.
    pub fn remove_node(&mut self, node_id: &NodeId) -> Option<Node> {
        let position = self.nodes.iter().position(|node| &node.id == node_id)?;
        self.edges.retain(|edge| !edge.touches(node_id));
        Some(self.nodes.remove(position))
    }

    /// Removes an edge.
    pub fn remove_edge(&mut self, edge_id: &EdgeId) -> Option<Edge> {
        let position = self.edges.iter().position(|edge| &edge.id == edge_id)?;
        Some(self.edges.remove(position))
    }

    /// Returns edges ending at the node, in edge order.
    pub fn incoming<'a>(&'a self, node_id: &'a NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |edge| &edge.target == node_id)
    }

    /// Returns edges starting at the node, in edge order.
    pub fn outgoing<'a>(&'a self, node_id: &'a NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |edge| &edge.source == node_id)
    }

    /// Returns the ids of the node's direct upstream neighbours.
    #[must_use]
    pub fn predecessors(&self, node_id: &NodeId) -> Vec<NodeId> {
        self.incoming(node_id).map(|edge| edge.source.clone()).collect()
    }

    /// Returns the ids of the node's direct downstream neighbours.
    #[must_use]
    pub fn successors(&self, node_id: &NodeId) -> Vec<NodeId> {
        self.outgoing(node_id).map(|edge| edge.target.clone()).collect()
    }

    /// Returns nodes that have no incoming edges (entry points).
    #[must_use]
    pub fn entry_nodes(&self) -> Vec<&Node> {
        let targets: HashSet<&NodeId> = self.edges.iter().map(|edge| &edge.target).collect();
        self.nodes
            .iter()
            .filter(|node| !targets.contains(&node.id))
            .collect()
    }

    /// Builds a lookup index over the current nodes and edges.
    #[must_use]
    pub fn index(&self) -> GraphIndex<'_> {
        GraphIndex::new(self)
    }

    /// Returns every trigger-class node.
    #[must_use]
    pub fn triggers(&self) -> Vec<&Node> {
        self.nodes.iter().filter(|node| node.is_trigger()).collect()
    }

    /// Checks whether an edge `source -> target` may be added.
    ///
    /// `replacing` names an existing edge to leave out of the duplicate and
    /// cycle checks, used when an edge's endpoints are being moved.
    ///
    /// # Errors
    ///
    /// Returns an error if either node is missing, the edge is a self-loop,
    /// the source is an end node, the edge already exists, or it would close
    /// a cycle.
    pub fn check_edge(
        &self,
        source: &NodeId,
        target: &NodeId,
        replacing: Option<&EdgeId>,
    ) -> Result<(), GraphError> {
        let source_node = self.get_node(source).ok_or_else(|| GraphError::NodeNotFound {
            node_id: source.clone(),
        })?;
        if !self.contains_node(target) {
            return Err(GraphError::NodeNotFound {
                node_id: target.clone(),
            });
        }
        if source == target {
            return Err(GraphError::SelfLoop {
                node_id: source.clone(),
            });
        }
        if source_node.node_type.is_terminal() {
            return Err(GraphError::EndNodeHasNoOutputs {
                node_id: source.clone(),
            });
        }

        let duplicate = self
            .edges
            .iter()
            .filter(|edge| Some(&edge.id) != replacing)
            .any(|edge| edge.connects(source, target));
        if duplicate {
            return Err(GraphError::DuplicateEdge {
                source: source.clone(),
                target: target.clone(),
            });
        }

        if self.would_create_cycle(source, target, replacing) {
            return Err(GraphError::WouldCreateCycle {
                source: source.clone(),
                target: target.clone(),
            });
        }

        Ok(())
    }

    /// Returns true if adding `source -> target` would close a cycle.
    #[must_use]
    pub fn would_create_cycle(
        &self,
        source: &NodeId,
        target: &NodeId,
        replacing: Option<&EdgeId>,
    ) -> bool {
        if source == target {
            return true;
        }
        let mut graph = self.dependency_graph(replacing);
        graph.add_node(source.as_str());
        graph.add_node(target.as_str());
        has_path_connecting(&graph, target.as_str(), source.as_str(), None)
    }

    /// Validates the workflow graph.
    ///
    /// Checks:
    /// - Node ids and edge ids are unique
    /// - Every edge references existing nodes
    /// - At most one trigger-class node
    /// - End nodes have no outgoing edges
    /// - No cycles (DAG validation)
    ///
    /// # Errors
    ///
    /// Returns an error describing the first validation failure.
    pub fn validate(&self) -> Result<(), GraphError> {
        let mut node_ids = HashSet::with_capacity(self.nodes.len());
        if let Some(node) = self.nodes.iter().find(|node| !node_ids.insert(&node.id)) {
            return Err(GraphError::DuplicateNodeId {
                node_id: node.id.clone(),
            });
        }

        let mut edge_ids = HashSet::with_capacity(self.edges.len());
        if let Some(edge) = self.edges.iter().find(|edge| !edge_ids.insert(&edge.id)) {
            return Err(GraphError::DuplicateEdgeId {
                edge_id: edge.id.clone(),
            });
        }

        if let Some(edge) = self
            .edges
            .iter()
            .find(|edge| !node_ids.contains(&edge.source) || !node_ids.contains(&edge.target))
        {
            return Err(GraphError::DanglingEdge {
                edge_id: edge.id.clone(),
            });
        }

        let trigger_count = self.triggers().len();
        if trigger_count > 1 {
            return Err(GraphError::MultipleTriggers {
                count: trigger_count,
            });
        }

        let index = self.index();
        if let Some(node) = self
            .nodes
            .iter()
            .filter(|node| node.node_type.is_terminal())
            .find(|node| !index.successors(&node.id).is_empty())
        {
            return Err(GraphError::EndNodeHasNoOutputs {
                node_id: node.id.clone(),
            });
        }

        if is_cyclic_directed(&self.dependency_graph(None)) {
            return Err(GraphError::CycleDetected);
        }

        Ok(())
    }

    /// Builds a petgraph view over node ids, optionally leaving one edge out.
    fn dependency_graph(&self, skip: Option<&EdgeId>) -> DiGraphMap<&str, ()> {
        let mut graph = DiGraphMap::new();
        for node in &self.nodes {
            graph.add_node(node.id.as_str());
        }
        for edge in self.edges.iter().filter(|edge| Some(&edge.id) != skip) {
            graph.add_edge(edge.source.as_str(), edge.target.as_str(), ());
        }
        graph
    }
}

/// Id lookups over a borrowed graph, built in one pass over its nodes and
/// edges.
///
/// When ids repeat, the first node with the id wins, matching
/// [`WorkflowGraph::get_node`].
#[derive(Debug)]
pub struct GraphIndex<'a> {
    graph: &'a WorkflowGraph,
    positions: HashMap<&'a NodeId, usize>,
    successors: HashMap<&'a NodeId, Vec<&'a NodeId>>,
    predecessors: HashMap<&'a NodeId, Vec<&'a NodeId>>,
}

impl<'a> GraphIndex<'a> {
    fn new(graph: &'a WorkflowGraph) -> Self {
        let mut positions = HashMap::with_capacity(graph.nodes.len());
        for (position, node) in graph.nodes.iter().enumerate() {
            positions.entry(&node.id).or_insert(position);
        }
        let mut successors: HashMap<&NodeId, Vec<&NodeId>> = HashMap::new();
        let mut predecessors: HashMap<&NodeId, Vec<&NodeId>> = HashMap::new();
        for edge in &graph.edges {
            successors.entry(&edge.source).or_default().push(&edge.target);
            predecessors.entry(&edge.target).or_default().push(&edge.source);
        }
        Self {
            graph,
            positions,
            successors,
            predecessors,
        }
    }

    /// Returns the node with the given id.
    #[must_use]
    pub fn node(&self, node_id: &NodeId) -> Option<&'a Node> {
        self.positions
            .get(node_id)
            .and_then(|&position| self.graph.nodes.get(position))
    }

    /// Returns direct downstream neighbours, in edge order.
    #[must_use]
    pub fn successors(&self, node_id: &NodeId) -> &[&'a NodeId] {
        self.successors
            .get(node_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns direct upstream neighbours, in edge order.
    #[must_use]
    pub fn predecessors(&self, node_id: &NodeId) -> &[&'a NodeId] {
        self.predecessors
            .get(node_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeType;

    fn node(id: &str, node_type: NodeType) -> Node {
        Node::with_id(id, node_type, id.to_uppercase())
    }

    fn edge(id: &str, source: &str, target: &str) -> Edge {
        Edge::with_id(id, NodeId::from(source), NodeId::from(target))
    }

    /// a -> b -> c
    fn chain() -> WorkflowGraph {
        WorkflowGraph::from_parts(
            vec![
                node("a", NodeType::Trigger),
                node("b", NodeType::HttpRequest),
                node("c", NodeType::Email),
            ],
            vec![edge("e1", "a", "b"), edge("e2", "b", "c")],
        )
    }

    #[test]
    fn get_node_by_id() {
        let graph = chain();
        let retrieved = graph.get_node(&NodeId::from("b"));
        assert_eq!(retrieved.map(|n| n.title.as_str()), Some("B"));
        assert!(graph.get_node(&NodeId::from("zz")).is_none());
    }

    #[test]
    fn remove_node_drops_touching_edges() {
        let mut graph = chain();
        let removed = graph.remove_node(&NodeId::from("b"));
        assert!(removed.is_some());
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn entry_nodes_returns_nodes_without_incoming() {
        let graph = chain();
        let entries = graph.entry_nodes();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, NodeId::from("a"));
    }

    #[test]
    fn neighbours_follow_edge_order() {
        let mut graph = chain();
        graph.push_node(node("d", NodeType::Slack));
        graph.push_edge(edge("e3", "a", "d"));

        assert_eq!(
            graph.successors(&NodeId::from("a")),
            vec![NodeId::from("b"), NodeId::from("d")]
        );
        assert_eq!(graph.predecessors(&NodeId::from("c")), vec![NodeId::from("b")]);
    }

    #[test]
    fn check_edge_rejects_back_edge() {
        let graph = chain();
        let err = graph
            .check_edge(&NodeId::from("c"), &NodeId::from("a"), None)
            .unwrap_err();
        assert!(matches!(err, GraphError::WouldCreateCycle { .. }));
    }

    #[test]
    fn check_edge_allows_forward_shortcut() {
        let graph = chain();
        assert!(
            graph
                .check_edge(&NodeId::from("a"), &NodeId::from("c"), None)
                .is_ok()
        );
    }

    #[test]
    fn check_edge_rejects_duplicates_and_self_loops() {
        let graph = chain();
        assert!(matches!(
            graph.check_edge(&NodeId::from("a"), &NodeId::from("b"), None),
            Err(GraphError::DuplicateEdge { .. })
        ));
        assert!(matches!(
            graph.check_edge(&NodeId::from("b"), &NodeId::from("b"), None),
            Err(GraphError::SelfLoop { .. })
        ));
    }

    #[test]
    fn check_edge_ignores_replaced_edge() {
        let graph = chain();
        // Moving e1 onto the same endpoints is not a duplicate of itself.
        assert!(
            graph
                .check_edge(&NodeId::from("a"), &NodeId::from("b"), Some(&EdgeId::from("e1")))
                .is_ok()
        );
        // Reversing e2 is fine once e2 itself is left out.
        assert!(
            graph
                .check_edge(&NodeId::from("c"), &NodeId::from("b"), Some(&EdgeId::from("e2")))
                .is_ok()
        );
    }

    #[test]
    fn check_edge_rejects_end_source() {
        let mut graph = chain();
        graph.push_node(node("end", NodeType::End));
        assert!(matches!(
            graph.check_edge(&NodeId::from("end"), &NodeId::from("c"), None),
            Err(GraphError::EndNodeHasNoOutputs { .. })
        ));
    }

    #[test]
    fn index_matches_linear_lookups() {
        let mut graph = chain();
        graph.push_node(node("d", NodeType::Slack));
        graph.push_edge(edge("e3", "a", "d"));
        let index = graph.index();

        for n in graph.nodes() {
            assert_eq!(index.node(&n.id), graph.get_node(&n.id));
            let successors: Vec<NodeId> =
                index.successors(&n.id).iter().map(|id| (*id).clone()).collect();
            let predecessors: Vec<NodeId> =
                index.predecessors(&n.id).iter().map(|id| (*id).clone()).collect();
            assert_eq!(successors, graph.successors(&n.id));
            assert_eq!(predecessors, graph.predecessors(&n.id));
        }
        assert!(index.node(&NodeId::from("zz")).is_none());
        assert!(index.successors(&NodeId::from("zz")).is_empty());
    }

    #[test]
    fn validate_detects_duplicate_node_ids() {
        let graph = WorkflowGraph::from_parts(
            vec![
                Node::with_id("a", NodeType::Trigger, "T"),
                Node::with_id("a", NodeType::Email, "Mail"),
            ],
            Vec::new(),
        );
        assert_eq!(
            graph.validate(),
            Err(GraphError::DuplicateNodeId {
                node_id: NodeId::from("a")
            })
        );
    }

    #[test]
    fn validate_detects_duplicate_edge_ids() {
        let mut graph = chain();
        graph.push_edge(edge("e1", "a", "c"));
        assert_eq!(
            graph.validate(),
            Err(GraphError::DuplicateEdgeId {
                edge_id: EdgeId::from("e1")
            })
        );
    }

    #[test]
    fn validate_accepts_chain() {
        assert!(chain().validate().is_ok());
    }

    #[test]
    fn validate_detects_cycle() {
        let mut graph = chain();
        graph.push_edge(edge("back", "c", "a"));
        assert_eq!(graph.validate(), Err(GraphError::CycleDetected));
    }

    #[test]
    fn validate_detects_dangling_edge() {
        let mut graph = chain();
        graph.push_edge(edge("ghost", "c", "missing"));
        assert_eq!(
            graph.validate(),
            Err(GraphError::DanglingEdge {
                edge_id: EdgeId::from("ghost")
            })
        );
    }

    #[test]
    fn validate_detects_multiple_triggers() {
        let mut graph = chain();
        graph.push_node(node("hook", NodeType::Webhook));
        assert_eq!(
            graph.validate(),
            Err(GraphError::MultipleTriggers { count: 2 })
        );
    }

    #[test]
    fn graph_serde_roundtrip() {
        let graph = chain();
        let json = serde_json::to_string(&graph).expect("serialize");
        let parsed: WorkflowGraph = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, graph);
    }
}
