//! Connector trait and its adapter into the engine.
//!
//! A connector speaks one provider's protocol. [`ConnectorHandler`] wraps a
//! connector as an [`ActionHandler`]: it looks the provider's connection up,
//! turns the node's resolved configuration into an [`Operation`], and maps the
//! [`OperationResult`] back into an [`ActionOutcome`].

use crate::connection::{Connection, ConnectionProvider};
use crate::error::ConnectorError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;
use switchyard_workflow::{ActionError, ActionHandler, ActionOutcome, ActionRequest};
use tracing::{debug, warn};

/// Configuration key naming the operation to perform.
pub const OPERATION_KEY: &str = "operation";

/// Information about a connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorInfo {
    /// Unique identifier for this connector type.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Provider whose connection the connector needs.
    pub provider: String,
    /// Operation used when the node does not name one.
    pub default_operation: String,
}

/// An operation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// The operation name.
    pub name: String,
    /// Operation parameters.
    pub parameters: Map<String, JsonValue>,
}

impl Operation {
    /// Creates a new operation.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Map::new(),
        }
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    /// Builds an operation from a node's resolved configuration.
    ///
    /// The `operation` entry selects the operation and is not passed on as a
    /// parameter.
    #[must_use]
    pub fn from_request(request: &ActionRequest, default_operation: &str) -> Self {
        let mut parameters = request.config.clone();
        let name = match parameters.remove(OPERATION_KEY) {
            Some(JsonValue::String(name)) if !name.trim().is_empty() => name,
            _ => default_operation.to_string(),
        };
        Self { name, parameters }
    }
}

/// The result of an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Output data (if successful).
    pub data: Option<JsonValue>,
    /// Error message (if failed).
    pub error: Option<String>,
}

impl OperationResult {
    /// Creates a successful result.
    #[must_use]
    pub fn success(data: JsonValue) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Creates a failed result.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

impl From<OperationResult> for ActionOutcome {
    fn from(result: OperationResult) -> Self {
        Self {
            success: result.success,
            output: result.data,
            error: result.error,
        }
    }
}

/// Trait for integration connectors.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Returns information about this connector.
    fn info(&self) -> ConnectorInfo;

    /// Executes an operation with the user's connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    async fn execute(
        &self,
        connection: &Connection,
        operation: Operation,
    ) -> Result<OperationResult, ConnectorError>;

    /// Configuration keys that must be non-empty after resolution.
    fn required_fields(&self) -> &[&'static str] {
        &[]
    }
}

/// Adapts a [`Connector`] into an [`ActionHandler`].
pub struct ConnectorHandler<C> {
    connector: C,
    connections: Arc<dyn ConnectionProvider>,
}

impl<C: Connector> ConnectorHandler<C> {
    #[must_use]
    pub fn new(connector: C, connections: Arc<dyn ConnectionProvider>) -> Self {
        Self {
            connector,
            connections,
        }
    }
}

#[async_trait]
impl<C: Connector> ActionHandler for ConnectorHandler<C> {
    async fn execute(&self, request: &ActionRequest) -> Result<ActionOutcome, ActionError> {
        let info = self.connector.info();

        let connection = self
            .connections
            .get_connection(&info.provider)
            .await
            .map_err(|e| {
                warn!(provider = %info.provider, error = %e, "connection lookup failed");
                ActionError::ExternalService {
                    service: info.provider.clone(),
                    message: e.to_string(),
                }
            })?
            .ok_or_else(|| ActionError::MissingConnection {
                provider: info.provider.clone(),
            })?;

        let operation = Operation::from_request(request, &info.default_operation);
        debug!(
            node_id = %request.node_id,
            connector = %info.id,
            operation = %operation.name,
            "executing connector operation"
        );

        self.connector
            .execute(&connection, operation)
            .await
            .map(ActionOutcome::from)
            .map_err(|e| e.into_action_error(&info.provider))
    }

    fn required_fields(&self) -> &[&'static str] {
        self.connector.required_fields()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::InMemoryConnections;
    use serde_json::json;
    use std::sync::Mutex;
    use switchyard_workflow::{Node, NodeType};

    /// Records the token and operation it was called with.
    #[derive(Default)]
    struct NotionConnector {
        calls: Mutex<Vec<(String, Operation)>>,
        fail_with: Option<ConnectorError>,
    }

    #[async_trait]
    impl Connector for NotionConnector {
        fn info(&self) -> ConnectorInfo {
            ConnectorInfo {
                id: "notion_pages".to_string(),
                name: "Notion Pages".to_string(),
                provider: "notion".to_string(),
                default_operation: "create_page".to_string(),
            }
        }

        async fn execute(
            &self,
            connection: &Connection,
            operation: Operation,
        ) -> Result<OperationResult, ConnectorError> {
            self.calls
                .lock()
                .unwrap()
                .push((connection.token.clone(), operation));
            match &self.fail_with {
                Some(e) => Err(e.clone()),
                None => Ok(OperationResult::success(json!({"pageId": "p1"}))),
            }
        }

        fn required_fields(&self) -> &[&'static str] {
            &["databaseId"]
        }
    }

    fn request() -> ActionRequest {
        let node = Node::with_id("page", NodeType::Notion, "Page")
            .with_config("databaseId", json!("db1"))
            .with_config("title", json!("Weekly report"));
        ActionRequest::for_node(&node, node.config())
    }

    #[test]
    fn operation_builder() {
        let op = Operation::new("fetch_emails")
            .with_param("folder", json!("inbox"))
            .with_param("limit", json!(10));

        assert_eq!(op.name, "fetch_emails");
        assert_eq!(op.parameters.get("folder"), Some(&json!("inbox")));
        assert_eq!(op.parameters.get("limit"), Some(&json!(10)));
    }

    #[test]
    fn operation_from_request_uses_named_operation() {
        let mut request = request();
        request
            .config
            .insert(OPERATION_KEY.to_string(), json!("append_block"));

        let op = Operation::from_request(&request, "create_page");
        assert_eq!(op.name, "append_block");
        assert!(!op.parameters.contains_key(OPERATION_KEY));
        assert_eq!(op.parameters.get("databaseId"), Some(&json!("db1")));
    }

    #[test]
    fn failed_result_maps_to_reported_failure() {
        let outcome = ActionOutcome::from(OperationResult::failure("page locked"));
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("page locked"));
    }

    #[tokio::test]
    async fn executes_with_the_provider_connection() {
        let connections = Arc::new(InMemoryConnections::new().with(Connection::new("notion", "secret")));
        let handler = ConnectorHandler::new(NotionConnector::default(), connections);

        let outcome = handler.execute(&request()).await.expect("execute");

        assert_eq!(outcome, ActionOutcome::success(json!({"pageId": "p1"})));
        let calls = handler.connector.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "secret");
        assert_eq!(calls[0].1.name, "create_page");
        assert_eq!(handler.required_fields(), &["databaseId"]);
    }

    #[tokio::test]
    async fn missing_connection_fails_before_calling_connector() {
        let handler = ConnectorHandler::new(
            NotionConnector::default(),
            Arc::new(InMemoryConnections::new()),
        );

        let result = handler.execute(&request()).await;

        assert_eq!(
            result,
            Err(ActionError::MissingConnection {
                provider: "notion".to_string()
            })
        );
        assert!(handler.connector.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn connector_errors_are_mapped() {
        let connector = NotionConnector {
            fail_with: Some(ConnectorError::Timeout),
            ..NotionConnector::default()
        };
        let connections = Arc::new(InMemoryConnections::new().with(Connection::new("notion", "secret")));
        let handler = ConnectorHandler::new(connector, connections);

        assert_eq!(handler.execute(&request()).await, Err(ActionError::Timeout));
    }
}
