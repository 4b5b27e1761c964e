//! Node dispatch seam.
//!
//! The engine never talks to third-party services itself. Every node type that
//! is not engine-native is handed to an [`ActionHandler`] looked up in an
//! [`ActionRegistry`]. Polling triggers ask a [`ChangeSource`], and
//! client notifications go to a [`ClientNotifier`].
//!
//! Handlers own all I/O, retries and credential lookup for their integration.

use crate::node::{Node, NodeId, NodeType};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A node's resolved configuration, handed to a handler.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    pub node_id: NodeId,
    pub node_type: NodeType,
    pub title: String,
    /// Configuration with every placeholder already substituted.
    pub config: Map<String, JsonValue>,
}

impl ActionRequest {
    /// Builds a request for a node with the given resolved configuration.
    #[must_use]
    pub fn for_node(node: &Node, config: Map<String, JsonValue>) -> Self {
        Self {
            node_id: node.id.clone(),
            node_type: node.node_type,
            title: node.title.clone(),
            config,
        }
    }

    /// Returns a configuration entry.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&JsonValue> {
        self.config.get(key)
    }

    /// Returns a configuration entry as a string.
    #[must_use]
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(JsonValue::as_str)
    }

    /// Returns a required string entry.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::InvalidInput`] if the entry is absent, empty or
    /// not a string.
    pub fn require_str(&self, key: &str) -> Result<&str, ActionError> {
        match self.str_field(key) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(ActionError::InvalidInput {
                message: format!("missing required field: {key}"),
            }),
        }
    }
}

/// What a handler reports back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub success: bool,
    #[serde(default)]
    pub output: Option<JsonValue>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ActionOutcome {
    /// A successful outcome with an output record.
    #[must_use]
    pub fn success(output: JsonValue) -> Self {
        Self {
            success: true,
            output: Some(output),
            error: None,
        }
    }

    /// A successful outcome without output.
    #[must_use]
    pub fn done() -> Self {
        Self {
            success: true,
            output: None,
            error: None,
        }
    }

    /// A reported failure.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
        }
    }
}

/// Errors from handler execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionError {
    /// Configuration was rejected by the handler.
    InvalidInput { message: String },
    /// Execution failed.
    ExecutionFailed { message: String },
    /// No usable connection for the provider.
    MissingConnection { provider: String },
    /// External service error.
    ExternalService { service: String, message: String },
    /// Timeout.
    Timeout,
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput { message } => write!(f, "invalid input: {message}"),
            Self::ExecutionFailed { message } => write!(f, "execution failed: {message}"),
            Self::MissingConnection { provider } => {
                write!(f, "no connection for provider: {provider}")
            }
            Self::ExternalService { service, message } => {
                write!(f, "external service error ({service}): {message}")
            }
            Self::Timeout => write!(f, "execution timed out"),
        }
    }
}

impl std::error::Error for ActionError {}

/// Executes one node type's side effect.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Executes the node with its resolved configuration.
    async fn execute(&self, request: &ActionRequest) -> Result<ActionOutcome, ActionError>;

    /// Configuration keys that must be non-empty after resolution.
    ///
    /// The engine checks these before calling [`execute`](Self::execute).
    fn required_fields(&self) -> &[&'static str] {
        &[]
    }
}

/// Watches an external source for the polling trigger.
#[async_trait]
pub trait ChangeSource: Send + Sync {
    /// Checks once. `Some(change)` completes the trigger with `change` as output.
    async fn check(&self, request: &ActionRequest) -> Result<Option<JsonValue>, ActionError>;

    /// Configuration keys that must be non-empty after resolution.
    fn required_fields(&self) -> &[&'static str] {
        &[]
    }
}

/// Receives in-app notifications.
#[async_trait]
pub trait ClientNotifier: Send + Sync {
    async fn notify(&self, node_id: &NodeId, message: &str);
}

/// Maps node types to their handlers.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    handlers: HashMap<NodeType, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler, replacing any previous one for the type.
    pub fn register(&mut self, node_type: NodeType, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(node_type, handler);
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, node_type: NodeType, handler: Arc<dyn ActionHandler>) -> Self {
        self.register(node_type, handler);
        self
    }

    /// Returns the handler for a node type.
    #[must_use]
    pub fn get(&self, node_type: NodeType) -> Option<&Arc<dyn ActionHandler>> {
        self.handlers.get(&node_type)
    }

    #[must_use]
    pub fn contains(&self, node_type: NodeType) -> bool {
        self.handlers.contains_key(&node_type)
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("node_types", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A handler that can be configured to succeed or fail.
pub struct MockHandler {
    /// If set, all executions fail with this error.
    pub fail_with: Option<ActionError>,
    /// The outcome returned otherwise.
    pub outcome: ActionOutcome,
    /// Declared required fields.
    pub required: Vec<&'static str>,
}

impl MockHandler {
    /// Creates a mock handler that succeeds with the given output.
    #[must_use]
    pub fn succeeding(output: JsonValue) -> Self {
        Self {
            fail_with: None,
            outcome: ActionOutcome::success(output),
            required: Vec::new(),
        }
    }

    /// Creates a mock handler that reports failure without erroring.
    #[must_use]
    pub fn reporting_failure(message: impl Into<String>) -> Self {
        Self {
            fail_with: None,
            outcome: ActionOutcome::failure(message),
            required: Vec::new(),
        }
    }

    /// Creates a mock handler that fails with the given error.
    #[must_use]
    pub fn failing(error: ActionError) -> Self {
        Self {
            fail_with: Some(error),
            outcome: ActionOutcome::done(),
            required: Vec::new(),
        }
    }

    /// Declares required fields.
    #[must_use]
    pub fn requiring(mut self, fields: &[&'static str]) -> Self {
        self.required = fields.to_vec();
        self
    }
}

#[async_trait]
impl ActionHandler for MockHandler {
    async fn execute(&self, _request: &ActionRequest) -> Result<ActionOutcome, ActionError> {
        match &self.fail_with {
            Some(e) => Err(e.clone()),
            None => Ok(self.outcome.clone()),
        }
    }

    fn required_fields(&self) -> &[&'static str] {
        &self.required
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> ActionRequest {
        let node = Node::with_id("mail", NodeType::Email, "Mail")
            .with_config("to", json!("ops@example.com"))
            .with_config("subject", json!("  "));
        ActionRequest::for_node(&node, node.config())
    }

    #[test]
    fn require_str_rejects_blank_values() {
        let request = request();
        assert_eq!(request.require_str("to"), Ok("ops@example.com"));
        assert!(request.require_str("subject").is_err());
        assert!(request.require_str("body").is_err());
    }

    #[test]
    fn registry_lookup_by_type() {
        let registry = ActionRegistry::new()
            .with(NodeType::Slack, Arc::new(MockHandler::succeeding(json!({}))));
        assert!(registry.contains(NodeType::Slack));
        assert!(registry.get(NodeType::Discord).is_none());
    }

    #[test]
    fn missing_connection_message() {
        let err = ActionError::MissingConnection {
            provider: "notion".to_string(),
        };
        assert_eq!(err.to_string(), "no connection for provider: notion");
    }

    #[tokio::test]
    async fn mock_handler_outcomes() {
        let request = request();

        let ok = MockHandler::succeeding(json!({"sent": true}));
        assert_eq!(
            ok.execute(&request).await,
            Ok(ActionOutcome::success(json!({"sent": true})))
        );

        let reported = MockHandler::reporting_failure("quota exceeded");
        let outcome = reported.execute(&request).await.expect("outcome");
        assert!(!outcome.success);

        let failing = MockHandler::failing(ActionError::Timeout);
        assert_eq!(failing.execute(&request).await, Err(ActionError::Timeout));
    }
}
