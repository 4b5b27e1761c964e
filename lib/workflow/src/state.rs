//! Explicit editor state container.
//!
//! The graph store and the run board are passed around together by mutable
//! reference instead of living in ambient global state.

use crate::execution::RunBoard;
use crate::graph::WorkflowGraph;
use crate::history::HistoryConfig;
use crate::store::GraphStore;

/// Everything the editor and the engine share for one open workflow.
#[derive(Debug, Clone, Default)]
pub struct EditorState {
    /// Graph, history, selection and clipboard.
    pub store: GraphStore,
    /// Live run statuses.
    pub run: RunBoard,
}

impl EditorState {
    /// Opens a graph with default history settings.
    #[must_use]
    pub fn new(graph: WorkflowGraph) -> Self {
        Self {
            store: GraphStore::new(graph),
            run: RunBoard::new(),
        }
    }

    /// Opens a graph with history settings from config.
    #[must_use]
    pub fn from_config(graph: WorkflowGraph, config: HistoryConfig) -> Self {
        Self {
            store: GraphStore::from_config(graph, config),
            run: RunBoard::new(),
        }
    }

    /// Returns the current graph.
    #[must_use]
    pub fn graph(&self) -> &WorkflowGraph {
        self.store.graph()
    }
}
