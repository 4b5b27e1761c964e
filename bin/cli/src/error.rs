//! Error types for the CLI.

use std::fmt;
use std::path::PathBuf;

/// Errors surfaced by CLI commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliError {
    /// Configuration could not be loaded.
    Config { details: String },
    /// A workflow could not be read.
    Load { source: String, details: String },
    /// A workflow could not be written back.
    Save { path: PathBuf, details: String },
    /// The workflow has no node with this id.
    UnknownNode { node_id: String },
    /// The workflow failed structural validation.
    InvalidWorkflow { details: String },
    /// The run could not start.
    Run { details: String },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "failed to load configuration: {details}"),
            Self::Load { source, details } => {
                write!(f, "failed to load workflow '{source}': {details}")
            }
            Self::Save { path, details } => {
                write!(f, "failed to save workflow to '{}': {details}", path.display())
            }
            Self::UnknownNode { node_id } => write!(f, "no node with id '{node_id}'"),
            Self::InvalidWorkflow { details } => write!(f, "invalid workflow: {details}"),
            Self::Run { details } => write!(f, "run failed to start: {details}"),
        }
    }
}

impl std::error::Error for CliError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_names_source() {
        let err = CliError::Load {
            source: "orders.json".to_string(),
            details: "unsupported workflow envelope version 9".to_string(),
        };
        assert!(err.to_string().contains("orders.json"));
        assert!(err.to_string().contains("version 9"));
    }
}
