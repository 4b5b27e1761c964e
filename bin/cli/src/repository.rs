//! File-backed workflow storage.
//!
//! Every workflow document is a versioned [`Envelope`] of pretty-printed JSON.
//! [`FileRepository`] keeps one `<workflow-id>.json` per workflow in a
//! directory; single files are read and written with [`read_workflow`] and
//! [`write_workflow`].

use async_trait::async_trait;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use switchyard_core::WorkflowId;
use switchyard_workflow::{Envelope, GraphRepository, PersistenceError, Workflow};
use tracing::debug;

/// Reads a workflow document.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a supported envelope.
pub async fn read_workflow(path: &Path) -> Result<Workflow, PersistenceError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| PersistenceError::Storage {
            details: format!("{}: {e}", path.display()),
        })?;
    Ok(Envelope::<Workflow>::from_json_bytes(&bytes)?.into_payload())
}

/// Writes a workflow document, replacing the file in one step.
///
/// # Errors
///
/// Returns an error if serialization or any file operation fails.
pub async fn write_workflow(path: &Path, workflow: &Workflow) -> Result<(), PersistenceError> {
    let bytes = Envelope::new(workflow).to_json_bytes()?;
    let staging = path.with_extension("json.tmp");
    let storage = |e: std::io::Error| PersistenceError::Storage {
        details: format!("{}: {e}", path.display()),
    };

    tokio::fs::write(&staging, bytes).await.map_err(storage)?;
    tokio::fs::rename(&staging, path).await.map_err(storage)?;
    debug!(workflow_id = %workflow.id, path = %path.display(), "workflow written");
    Ok(())
}

/// Workflows stored as JSON files in one directory.
#[derive(Debug, Clone)]
pub struct FileRepository {
    root: PathBuf,
}

impl FileRepository {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the document path for a workflow.
    #[must_use]
    pub fn path_for(&self, id: WorkflowId) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }
}

#[async_trait]
impl GraphRepository for FileRepository {
    async fn save_graph(&self, workflow: &Workflow) -> Result<(), PersistenceError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| PersistenceError::Storage {
                details: format!("{}: {e}", self.root.display()),
            })?;
        write_workflow(&self.path_for(workflow.id), workflow).await
    }

    async fn load_graph(&self, id: WorkflowId) -> Result<Workflow, PersistenceError> {
        let path = self.path_for(id);
        match tokio::fs::try_exists(&path).await {
            Ok(true) => read_workflow(&path).await,
            Ok(false) => Err(PersistenceError::NotFound { workflow_id: id }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(PersistenceError::NotFound { workflow_id: id })
            }
            Err(e) => Err(PersistenceError::Storage {
                details: format!("{}: {e}", path.display()),
            }),
        }
    }
}

/// Where a command's workflow comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowSource {
    /// A document at a path.
    File(PathBuf),
    /// A workflow in the store, named by its `wf_` id.
    Stored(WorkflowId),
}

impl WorkflowSource {
    /// Interprets a command argument: prefixed workflow ids name stored
    /// workflows, anything else is a path.
    #[must_use]
    pub fn parse(arg: &str) -> Self {
        let prefix = format!("{}_", WorkflowId::PREFIX);
        match arg.strip_prefix(&prefix).and(arg.parse::<WorkflowId>().ok()) {
            Some(id) => Self::Stored(id),
            None => Self::File(PathBuf::from(arg)),
        }
    }

    /// Loads the workflow.
    ///
    /// # Errors
    ///
    /// Returns an error if the workflow cannot be found or decoded.
    pub async fn load(&self, store: &dyn GraphRepository) -> Result<Workflow, PersistenceError> {
        match self {
            Self::File(path) => read_workflow(path).await,
            Self::Stored(id) => store.load_graph(*id).await,
        }
    }

    /// Saves the workflow back where it came from.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub async fn save(
        &self,
        store: &dyn GraphRepository,
        workflow: &Workflow,
    ) -> Result<(), PersistenceError> {
        match self {
            Self::File(path) => write_workflow(path, workflow).await,
            Self::Stored(_) => store.save_graph(workflow).await,
        }
    }
}

impl fmt::Display for WorkflowSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Stored(id) => write!(f, "{id}"),
        }
    }
}
