//! Workflow persistence seam.
//!
//! The surrounding application saves the workflow before and after runs; the
//! engine itself never touches storage.

use crate::definition::Workflow;
use crate::error::PersistenceError;
use crate::state::EditorState;
use async_trait::async_trait;
use switchyard_core::WorkflowId;

/// Loads and stores workflows.
#[async_trait]
pub trait GraphRepository: Send + Sync {
    /// Stores a workflow, replacing any previous version with the same id.
    async fn save_graph(&self, workflow: &Workflow) -> Result<(), PersistenceError>;

    /// Loads a workflow by id.
    async fn load_graph(&self, id: WorkflowId) -> Result<Workflow, PersistenceError>;
}

/// Copies the editor's current graph (including recorded outputs) back into
/// the workflow definition.
pub fn capture(workflow: &mut Workflow, state: &EditorState) {
    workflow.graph = state.graph().clone();
    workflow.touch();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::Envelope;
    use crate::node::{Node, NodeType};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Stores enveloped JSON in memory, like a document store would.
    #[derive(Default)]
    struct InMemoryRepository {
        documents: Mutex<HashMap<WorkflowId, Vec<u8>>>,
    }

    #[async_trait]
    impl GraphRepository for InMemoryRepository {
        async fn save_graph(&self, workflow: &Workflow) -> Result<(), PersistenceError> {
            let bytes = Envelope::new(workflow).to_json_bytes()?;
            self.documents.lock().unwrap().insert(workflow.id, bytes);
            Ok(())
        }

        async fn load_graph(&self, id: WorkflowId) -> Result<Workflow, PersistenceError> {
            let documents = self.documents.lock().unwrap();
            let bytes = documents
                .get(&id)
                .ok_or(PersistenceError::NotFound { workflow_id: id })?;
            Ok(Envelope::<Workflow>::from_json_bytes(bytes)?.into_payload())
        }
    }

    #[tokio::test]
    async fn recorded_outputs_survive_save_and_load() {
        let repo = InMemoryRepository::default();
        let mut workflow = Workflow::new("Orders");
        let mut state = EditorState::default();
        let node = Node::with_id("fetch", NodeType::HttpRequest, "Fetch");
        state
            .store
            .add_node(node, crate::store::Insertion::Detached)
            .expect("add");
        state
            .store
            .record_output(&"fetch".into(), json!({"count": 2}))
            .expect("record");

        capture(&mut workflow, &state);
        repo.save_graph(&workflow).await.expect("save");
        let loaded = repo.load_graph(workflow.id).await.expect("load");

        assert_eq!(loaded.graph, workflow.graph);
        assert_eq!(
            loaded.graph.nodes()[0].output(),
            Some(&json!({"count": 2}))
        );
    }

    #[tokio::test]
    async fn missing_workflow_is_not_found() {
        let repo = InMemoryRepository::default();
        let id = WorkflowId::new();
        assert_eq!(
            repo.load_graph(id).await,
            Err(PersistenceError::NotFound { workflow_id: id })
        );
    }
}
