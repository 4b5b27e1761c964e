//! Workflow graph editing and execution for switchyard.
//!
//! This crate provides the editor model and the run engine:
//!
//! - **Graph Model**: Nodes, edges and structural checks backed by petgraph
//! - **Graph Store**: Editing actions with bounded undo/redo and a clipboard
//! - **Templates**: `{{nodeId.field}}` placeholders resolved against earlier outputs
//! - **Ancestors**: Upstream discovery for the variable picker
//! - **Planner**: Breadth-first execution order from the entry nodes
//! - **Engine**: Sequential, fail-fast runs dispatched to registered handlers
//! - **Persistence**: Versioned envelopes and the repository seam

pub mod ancestors;
pub mod definition;
pub mod dispatch;
pub mod edge;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod execution;
pub mod graph;
pub mod history;
pub mod node;
pub mod persistence;
pub mod planner;
pub mod run_log;
pub mod state;
pub mod store;
pub mod template;

pub use ancestors::{VariableOption, ancestors, is_ancestor, variable_options};
pub use definition::{Workflow, WorkflowMetadata};
pub use dispatch::{
    ActionError, ActionHandler, ActionOutcome, ActionRegistry, ActionRequest, ChangeSource,
    ClientNotifier, MockHandler,
};
pub use edge::{Edge, EdgeId};
pub use engine::{Engine, EngineConfig, NodeTestOutcome};
pub use envelope::{CURRENT_VERSION, Envelope};
pub use error::{EngineError, GraphError, PersistenceError};
pub use execution::{
    ExecutionState, FailureKind, NodeFailure, RunBoard, RunReport, RunStatus,
};
pub use graph::{GraphIndex, WorkflowGraph};
pub use history::{History, HistoryConfig};
pub use node::{ConfigStatus, Node, NodeCategory, NodeId, NodeType, Position};
pub use persistence::{GraphRepository, capture};
pub use planner::execution_order;
pub use run_log::{RunLogEntry, RunLogSink};
pub use state::EditorState;
pub use store::{Dispatched, GraphAction, GraphStore, Insertion, NodePatch};
pub use template::{
    Placeholder, has_placeholders, placeholder, placeholders, render, resolve, resolve_value,
    value_has_placeholders,
};
