//! Error types for the workflow crate.
//!
//! Errors are plain enums designed for layered context using rootcause:
//! - `GraphError`: structural graph and store operations
//! - `EngineError`: run-level failures that prevent a run from starting
//! - `PersistenceError`: loading and saving workflows
//!
//! Per-node execution failures are not errors of the engine; they are
//! recorded as [`NodeFailure`](crate::execution::NodeFailure) in the run report.

use crate::edge::EdgeId;
use crate::node::NodeId;
use std::fmt;
use switchyard_core::WorkflowId;

/// Errors from graph operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Node with the given ID was not found in the graph.
    NodeNotFound { node_id: NodeId },
    /// Edge with the given ID was not found in the graph.
    EdgeNotFound { edge_id: EdgeId },
    /// A node with this ID is already part of the graph.
    DuplicateNodeId { node_id: NodeId },
    /// An edge with this ID is already part of the graph.
    DuplicateEdgeId { edge_id: EdgeId },
    /// An edge may not connect a node to itself.
    SelfLoop { node_id: NodeId },
    /// The two nodes are already connected in this direction.
    DuplicateEdge { source: NodeId, target: NodeId },
    /// Adding this edge would create a path back to its own source.
    WouldCreateCycle { source: NodeId, target: NodeId },
    /// End nodes terminate a branch and accept no outgoing edges.
    EndNodeHasNoOutputs { node_id: NodeId },
    /// An edge refers to a node that is not part of the graph.
    DanglingEdge { edge_id: EdgeId },
    /// More than one trigger-class node is present.
    MultipleTriggers { count: usize },
    /// Graph contains cycles.
    CycleDetected,
    /// Paste was requested with nothing on the clipboard.
    EmptyClipboard,
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeNotFound { node_id } => write!(f, "node not found: {node_id}"),
            Self::EdgeNotFound { edge_id } => write!(f, "edge not found: {edge_id}"),
            Self::DuplicateNodeId { node_id } => write!(f, "node {node_id} already exists"),
            Self::DuplicateEdgeId { edge_id } => write!(f, "edge {edge_id} already exists"),
            Self::SelfLoop { node_id } => {
                write!(f, "node {node_id} cannot be connected to itself")
            }
            Self::DuplicateEdge { source, target } => {
                write!(f, "edge {source} -> {target} already exists")
            }
            Self::WouldCreateCycle { source, target } => {
                write!(f, "edge {source} -> {target} would create a cycle")
            }
            Self::EndNodeHasNoOutputs { node_id } => {
                write!(f, "end node {node_id} cannot have outgoing edges")
            }
            Self::DanglingEdge { edge_id } => {
                write!(f, "edge {edge_id} references a missing node")
            }
            Self::MultipleTriggers { count } => {
                write!(f, "graph has {count} trigger nodes, at most one is allowed")
            }
            Self::CycleDetected => write!(f, "graph contains cycles"),
            Self::EmptyClipboard => write!(f, "clipboard is empty"),
        }
    }
}

impl std::error::Error for GraphError {}

/// Errors that stop the engine before or outside a node step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The graph failed validation; nothing was executed.
    InvalidGraph { reason: GraphError },
    /// A single-node test referenced a node that does not exist.
    NodeNotFound { node_id: NodeId },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidGraph { reason } => write!(f, "workflow graph is invalid: {reason}"),
            Self::NodeNotFound { node_id } => write!(f, "node not found: {node_id}"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Errors from workflow persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// No stored workflow with this id.
    NotFound { workflow_id: WorkflowId },
    /// The backing store could not be read or written.
    Storage { details: String },
    /// Stored data could not be decoded.
    InvalidFormat { details: String },
    /// Stored data uses an envelope version this build does not understand.
    UnsupportedVersion { version: u32 },
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { workflow_id } => write!(f, "workflow not found: {workflow_id}"),
            Self::Storage { details } => write!(f, "workflow storage failed: {details}"),
            Self::InvalidFormat { details } => write!(f, "invalid workflow data: {details}"),
            Self::UnsupportedVersion { version } => {
                write!(f, "unsupported workflow envelope version {version}")
            }
        }
    }
}

impl std::error::Error for PersistenceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_error_display() {
        let err = GraphError::NodeNotFound {
            node_id: NodeId::from("n1"),
        };
        assert_eq!(err.to_string(), "node not found: n1");
    }

    #[test]
    fn duplicate_edge_id_display() {
        let err = GraphError::DuplicateEdgeId {
            edge_id: EdgeId::from("e1"),
        };
        assert_eq!(err.to_string(), "edge e1 already exists");
    }

    #[test]
    fn cycle_error_names_both_endpoints() {
        let err = GraphError::WouldCreateCycle {
            source: NodeId::from("c"),
            target: NodeId::from("a"),
        };
        let message = err.to_string();
        assert!(message.contains("c -> a"));
        assert!(message.contains("cycle"));
    }

    #[test]
    fn engine_error_wraps_graph_error() {
        let err = EngineError::InvalidGraph {
            reason: GraphError::CycleDetected,
        };
        assert!(err.to_string().contains("graph contains cycles"));
    }

    #[test]
    fn persistence_error_display() {
        let workflow_id = WorkflowId::new();
        let err = PersistenceError::NotFound { workflow_id };
        assert!(err.to_string().contains("workflow not found"));
    }
}
