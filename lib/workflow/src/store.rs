//! Graph editing store.
//!
//! [`GraphStore`] owns the working graph, its undo/redo history, the selected
//! node and the clipboard. Every change goes through [`GraphStore::dispatch`]
//! (or the matching method), which gives each discrete user mutation exactly
//! one history step.
//!
//! Mutations run against a copy of the graph and are committed only when they
//! succeed, so a rejected operation leaves both the graph and the history
//! untouched.

use crate::edge::{Edge, EdgeId};
use crate::error::GraphError;
use crate::graph::WorkflowGraph;
use crate::history::{History, HistoryConfig};
use crate::node::{ConfigStatus, Node, NodeId, Position};
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

/// Offset applied to a duplicated node so it does not sit on its original.
const DUPLICATE_OFFSET: f64 = 40.0;

/// Where a new node is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insertion {
    /// No edges are added.
    Detached,
    /// One edge `source -> new` is added.
    After { source: NodeId },
    /// The edge is replaced by `source -> new` and `new -> target`.
    SplitEdge { edge: EdgeId },
}

/// A partial update of a node's editable fields.
///
/// Metadata entries are merged into the node; a `null` value removes the key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub config_status: Option<ConfigStatus>,
    pub metadata: Map<String, JsonValue>,
}

impl NodePatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn status(mut self, status: ConfigStatus) -> Self {
        self.config_status = Some(status);
        self
    }

    /// Sets (or, with `null`, removes) a metadata entry.
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    fn apply_to(self, node: &mut Node) {
        if let Some(title) = self.title {
            node.title = title;
        }
        if let Some(description) = self.description {
            node.description = description;
        }
        if let Some(status) = self.config_status {
            node.config_status = status;
        }
        for (key, value) in self.metadata {
            if value.is_null() {
                node.metadata.remove(&key);
            } else {
                node.metadata.insert(key, value);
            }
        }
    }
}

/// Editor actions understood by [`GraphStore::dispatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum GraphAction {
    AddNode { node: Node, insertion: Insertion },
    DeleteNode { node_id: NodeId },
    DuplicateNode { node_id: NodeId },
    CopyNode { node_id: NodeId },
    PasteNode { position: Position },
    Connect { source: NodeId, target: NodeId },
    ReconnectEdge {
        edge_id: EdgeId,
        source: NodeId,
        target: NodeId,
    },
    RemoveEdge { edge_id: EdgeId },
    UpdateNode { node_id: NodeId, patch: NodePatch },
    MoveNode { node_id: NodeId, position: Position },
    Select { node_id: Option<NodeId> },
    Undo,
    Redo,
    RecordOutput { node_id: NodeId, output: JsonValue },
}

/// What a dispatched action did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// The action was applied.
    Applied,
    /// A node was created with this id.
    NodeCreated(NodeId),
    /// An edge was created with this id.
    EdgeCreated(EdgeId),
    /// Nothing to do (undo or redo with an empty stack).
    Ignored,
}

/// The editor's graph state container.
#[derive(Debug, Clone)]
pub struct GraphStore {
    graph: WorkflowGraph,
    history: History<WorkflowGraph>,
    selected: Option<NodeId>,
    clipboard: Option<Node>,
}

impl GraphStore {
    /// Creates a store over the given graph with default history settings.
    #[must_use]
    pub fn new(graph: WorkflowGraph) -> Self {
        Self::with_history(graph, History::default())
    }

    /// Creates a store with history settings from config.
    #[must_use]
    pub fn from_config(graph: WorkflowGraph, config: HistoryConfig) -> Self {
        Self::with_history(graph, History::from_config(config))
    }

    /// Creates a store with an explicit history.
    #[must_use]
    pub fn with_history(graph: WorkflowGraph, history: History<WorkflowGraph>) -> Self {
        Self {
            graph,
            history,
            selected: None,
            clipboard: None,
        }
    }

    /// Returns the current graph.
    #[must_use]
    pub fn graph(&self) -> &WorkflowGraph {
        &self.graph
    }

    /// Consumes the store, returning the current graph.
    #[must_use]
    pub fn into_graph(self) -> WorkflowGraph {
        self.graph
    }

    /// Returns the selected node id.
    #[must_use]
    pub fn selected(&self) -> Option<&NodeId> {
        self.selected.as_ref()
    }

    /// Returns the selected node.
    #[must_use]
    pub fn selected_node(&self) -> Option<&Node> {
        self.selected.as_ref().and_then(|id| self.graph.get_node(id))
    }

    /// Returns the clipboard content.
    #[must_use]
    pub fn clipboard(&self) -> Option<&Node> {
        self.clipboard.as_ref()
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Applies an editor action.
    ///
    /// # Errors
    ///
    /// Returns the [`GraphError`] of the underlying operation; the store is
    /// unchanged in that case.
    pub fn dispatch(&mut self, action: GraphAction) -> Result<Dispatched, GraphError> {
        match action {
            GraphAction::AddNode { node, insertion } => {
                self.add_node(node, insertion).map(Dispatched::NodeCreated)
            }
            GraphAction::DeleteNode { node_id } => {
                self.delete_node(&node_id).map(|()| Dispatched::Applied)
            }
            GraphAction::DuplicateNode { node_id } => {
                self.duplicate_node(&node_id).map(Dispatched::NodeCreated)
            }
            GraphAction::CopyNode { node_id } => {
                self.copy_node(&node_id).map(|()| Dispatched::Applied)
            }
            GraphAction::PasteNode { position } => {
                self.paste_node(position).map(Dispatched::NodeCreated)
            }
            GraphAction::Connect { source, target } => {
                self.connect(source, target).map(Dispatched::EdgeCreated)
            }
            GraphAction::ReconnectEdge {
                edge_id,
                source,
                target,
            } => self
                .reconnect_edge(&edge_id, source, target)
                .map(|()| Dispatched::Applied),
            GraphAction::RemoveEdge { edge_id } => {
                self.remove_edge(&edge_id).map(|()| Dispatched::Applied)
            }
            GraphAction::UpdateNode { node_id, patch } => {
                self.update_node(&node_id, patch).map(|()| Dispatched::Applied)
            }
            GraphAction::MoveNode { node_id, position } => {
                self.move_node(&node_id, position).map(|()| Dispatched::Applied)
            }
            GraphAction::Select { node_id } => self.select(node_id).map(|()| Dispatched::Applied),
            GraphAction::Undo => Ok(if self.undo() {
                Dispatched::Applied
            } else {
                Dispatched::Ignored
            }),
            GraphAction::Redo => Ok(if self.redo() {
                Dispatched::Applied
            } else {
                Dispatched::Ignored
            }),
            GraphAction::RecordOutput { node_id, output } => self
                .record_output(&node_id, output)
                .map(|()| Dispatched::Applied),
        }
    }

    /// Inserts a node.
    ///
    /// A trigger-class node replaces any existing trigger-class node.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is taken, the insertion point does not
    /// exist, or the resulting edges are not allowed.
    pub fn add_node(&mut self, node: Node, insertion: Insertion) -> Result<NodeId, GraphError> {
        self.apply(|graph| insert(graph, node, insertion))
    }

    /// Removes a node and bridges its former neighbours.
    ///
    /// Every former incomer is connected to every former outgoer, skipping
    /// pairs that are already connected.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn delete_node(&mut self, node_id: &NodeId) -> Result<(), GraphError> {
        self.apply(|graph| {
            let incomers = graph.predecessors(node_id);
            let outgoers = graph.successors(node_id);
            graph
                .remove_node(node_id)
                .ok_or_else(|| GraphError::NodeNotFound {
                    node_id: node_id.clone(),
                })?;

            let mut bridged = 0usize;
            for source in &incomers {
                for target in &outgoers {
                    if source == target || graph.has_edge(source, target) {
                        continue;
                    }
                    graph.push_edge(Edge::new(source.clone(), target.clone()));
                    bridged += 1;
                }
            }
            debug!(node_id = %node_id, bridged, "deleted node");
            Ok(())
        })?;

        if self.selected.as_ref() == Some(node_id) {
            self.selected = None;
        }
        Ok(())
    }

    /// Inserts a detached copy of a node next to the original.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn duplicate_node(&mut self, node_id: &NodeId) -> Result<NodeId, GraphError> {
        let original = self
            .graph
            .get_node(node_id)
            .ok_or_else(|| GraphError::NodeNotFound {
                node_id: node_id.clone(),
            })?;
        let mut copy = original.cloned_with_fresh_id();
        copy.position = original.position.offset(DUPLICATE_OFFSET, DUPLICATE_OFFSET);
        self.add_node(copy, Insertion::Detached)
    }

    /// Puts a copy of the node on the clipboard. Does not touch history.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn copy_node(&mut self, node_id: &NodeId) -> Result<(), GraphError> {
        let node = self
            .graph
            .get_node(node_id)
            .ok_or_else(|| GraphError::NodeNotFound {
                node_id: node_id.clone(),
            })?;
        self.clipboard = Some(node.clone());
        Ok(())
    }

    /// Inserts the clipboard content under a fresh id at `position`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::EmptyClipboard`] when nothing was copied.
    pub fn paste_node(&mut self, position: Position) -> Result<NodeId, GraphError> {
        let mut node = self
            .clipboard
            .as_ref()
            .ok_or(GraphError::EmptyClipboard)?
            .cloned_with_fresh_id();
        node.position = position;
        self.add_node(node, Insertion::Detached)
    }

    /// Adds an edge `source -> target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge is not allowed (see
    /// [`WorkflowGraph::check_edge`]).
    pub fn connect(&mut self, source: NodeId, target: NodeId) -> Result<EdgeId, GraphError> {
        self.apply(|graph| {
            graph.check_edge(&source, &target, None)?;
            let edge = Edge::new(source, target);
            let edge_id = edge.id.clone();
            graph.push_edge(edge);
            Ok(edge_id)
        })
    }

    /// Moves an edge onto new endpoints, keeping its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge does not exist or the new endpoints are
    /// not allowed.
    pub fn reconnect_edge(
        &mut self,
        edge_id: &EdgeId,
        source: NodeId,
        target: NodeId,
    ) -> Result<(), GraphError> {
        self.apply(|graph| {
            if graph.get_edge(edge_id).is_none() {
                return Err(GraphError::EdgeNotFound {
                    edge_id: edge_id.clone(),
                });
            }
            graph.check_edge(&source, &target, Some(edge_id))?;
            if let Some(edge) = graph.get_edge_mut(edge_id) {
                edge.source = source;
                edge.target = target;
            }
            Ok(())
        })
    }

    /// Removes an edge.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge does not exist.
    pub fn remove_edge(&mut self, edge_id: &EdgeId) -> Result<(), GraphError> {
        self.apply(|graph| {
            graph
                .remove_edge(edge_id)
                .map(|_| ())
                .ok_or_else(|| GraphError::EdgeNotFound {
                    edge_id: edge_id.clone(),
                })
        })
    }

    /// Applies a patch to a node's editable fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn update_node(&mut self, node_id: &NodeId, patch: NodePatch) -> Result<(), GraphError> {
        self.apply(|graph| {
            let node = node_mut(graph, node_id)?;
            patch.apply_to(node);
            Ok(())
        })
    }

    /// Moves a node on the canvas.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn move_node(&mut self, node_id: &NodeId, position: Position) -> Result<(), GraphError> {
        self.apply(|graph| {
            node_mut(graph, node_id)?.position = position;
            Ok(())
        })
    }

    /// Changes the selection. Does not touch history.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn select(&mut self, node_id: Option<NodeId>) -> Result<(), GraphError> {
        if let Some(id) = &node_id
            && !self.graph.contains_node(id)
        {
            return Err(GraphError::NodeNotFound {
                node_id: id.clone(),
            });
        }
        self.selected = node_id;
        Ok(())
    }

    /// Restores the graph as it was before the last mutation.
    ///
    /// Returns `false` if there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.history.undo(self.graph.clone()) else {
            return false;
        };
        self.graph = previous;
        self.drop_stale_selection();
        true
    }

    /// Re-applies the last undone mutation.
    ///
    /// Returns `false` if there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.history.redo(self.graph.clone()) else {
            return false;
        };
        self.graph = next;
        self.drop_stale_selection();
        true
    }

    /// Stores a node's execution output as its `sampleData`.
    ///
    /// Run write-backs are not user edits and do not create a history step.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn record_output(&mut self, node_id: &NodeId, output: JsonValue) -> Result<(), GraphError> {
        node_mut(&mut self.graph, node_id)?.set_output(output);
        Ok(())
    }

    fn apply<R>(
        &mut self,
        mutation: impl FnOnce(&mut WorkflowGraph) -> Result<R, GraphError>,
    ) -> Result<R, GraphError> {
        let mut working = self.graph.clone();
        let result = mutation(&mut working)?;
        let prior = std::mem::replace(&mut self.graph, working);
        self.history.record(prior);
        Ok(result)
    }

    fn drop_stale_selection(&mut self) {
        if let Some(id) = &self.selected
            && !self.graph.contains_node(id)
        {
            self.selected = None;
        }
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new(WorkflowGraph::new())
    }
}

fn node_mut<'a>(graph: &'a mut WorkflowGraph, node_id: &NodeId) -> Result<&'a mut Node, GraphError> {
    graph
        .get_node_mut(node_id)
        .ok_or_else(|| GraphError::NodeNotFound {
            node_id: node_id.clone(),
        })
}

fn insert(graph: &mut WorkflowGraph, node: Node, insertion: Insertion) -> Result<NodeId, GraphError> {
    if graph.contains_node(&node.id) {
        return Err(GraphError::DuplicateNodeId { node_id: node.id });
    }

    if node.is_trigger() {
        let existing: Vec<NodeId> = graph.triggers().iter().map(|n| n.id.clone()).collect();
        for trigger_id in existing {
            graph.remove_node(&trigger_id);
            debug!(node_id = %trigger_id, replaced_by = %node.id, "replaced trigger node");
        }
    }

    let node_id = node.id.clone();
    graph.push_node(node);

    match insertion {
        Insertion::Detached => {}
        Insertion::After { source } => {
            graph.check_edge(&source, &node_id, None)?;
            graph.push_edge(Edge::new(source, node_id.clone()));
        }
        Insertion::SplitEdge { edge } => {
            let split = graph
                .remove_edge(&edge)
                .ok_or(GraphError::EdgeNotFound { edge_id: edge })?;
            graph.check_edge(&split.source, &node_id, None)?;
            graph.push_edge(Edge::new(split.source, node_id.clone()));
            graph.check_edge(&node_id, &split.target, None)?;
            graph.push_edge(Edge::new(node_id.clone(), split.target));
        }
    }

    Ok(node_id)
}
