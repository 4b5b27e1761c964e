//! Built-in handlers that run without any external service.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value as JsonValue, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use switchyard_workflow::{ActionError, ActionHandler, ActionOutcome, ActionRegistry, ActionRequest, NodeType};
use tracing::debug;

/// Emits trigger metadata for manually started runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualTriggerHandler;

#[async_trait]
impl ActionHandler for ManualTriggerHandler {
    async fn execute(&self, request: &ActionRequest) -> Result<ActionOutcome, ActionError> {
        Ok(ActionOutcome::success(json!({
            "triggeredAt": Utc::now().to_rfc3339(),
            "triggerType": request.node_type,
            "nodeId": request.node_id,
        })))
    }
}

/// Pauses for `durationMs` milliseconds.
#[derive(Debug, Clone, Copy)]
pub struct WaitHandler {
    max: Duration,
}

impl WaitHandler {
    /// Longest accepted pause unless configured otherwise.
    pub const DEFAULT_MAX: Duration = Duration::from_secs(3600);

    #[must_use]
    pub fn new() -> Self {
        Self {
            max: Self::DEFAULT_MAX,
        }
    }

    /// Sets the longest accepted pause.
    #[must_use]
    pub fn with_max(mut self, max: Duration) -> Self {
        self.max = max;
        self
    }
}

impl Default for WaitHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads a millisecond count from a number or a numeric string.
fn duration_ms(value: &JsonValue) -> Option<u64> {
    match value {
        JsonValue::Number(n) => n.as_u64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[async_trait]
impl ActionHandler for WaitHandler {
    async fn execute(&self, request: &ActionRequest) -> Result<ActionOutcome, ActionError> {
        let millis = request
            .field("durationMs")
            .and_then(duration_ms)
            .ok_or_else(|| ActionError::InvalidInput {
                message: "durationMs must be a non-negative whole number".to_string(),
            })?;
        let duration = Duration::from_millis(millis);
        if duration > self.max {
            return Err(ActionError::InvalidInput {
                message: format!("durationMs exceeds the maximum of {}", self.max.as_millis()),
            });
        }

        debug!(node_id = %request.node_id, millis, "waiting");
        tokio::time::sleep(duration).await;
        Ok(ActionOutcome::success(json!({ "waitedMs": millis })))
    }

    fn required_fields(&self) -> &[&'static str] {
        &["durationMs"]
    }
}

/// Reads and writes an in-memory key-value store.
///
/// `operation` is `get` (default), `set` or `delete`.
#[derive(Debug, Default, Clone)]
pub struct KeyValueHandler {
    entries: Arc<Mutex<HashMap<String, JsonValue>>>,
}

impl KeyValueHandler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a stored value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<JsonValue> {
        self.entries.lock().ok()?.get(key).cloned()
    }
}

#[async_trait]
impl ActionHandler for KeyValueHandler {
    async fn execute(&self, request: &ActionRequest) -> Result<ActionOutcome, ActionError> {
        let key = request.require_str("key")?;
        let operation = request.str_field("operation").unwrap_or("get");
        let mut entries = self.entries.lock().map_err(|e| ActionError::ExecutionFailed {
            message: e.to_string(),
        })?;

        let output = match operation {
            "get" => {
                let value = entries.get(key).cloned();
                json!({ "key": key, "found": value.is_some(), "value": value })
            }
            "set" => {
                let value = request.field("value").cloned().unwrap_or(JsonValue::Null);
                entries.insert(key.to_string(), value.clone());
                json!({ "key": key, "value": value })
            }
            "delete" => {
                let removed = entries.remove(key);
                json!({ "key": key, "deleted": removed.is_some() })
            }
            other => {
                return Err(ActionError::InvalidInput {
                    message: format!("unknown key-value operation: {other}"),
                });
            }
        };

        debug!(node_id = %request.node_id, key, operation, "key-value operation");
        Ok(ActionOutcome::success(output))
    }

    fn required_fields(&self) -> &[&'static str] {
        &["key"]
    }
}

/// Terminates a branch without doing anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct EndHandler;

#[async_trait]
impl ActionHandler for EndHandler {
    async fn execute(&self, _request: &ActionRequest) -> Result<ActionOutcome, ActionError> {
        Ok(ActionOutcome::done())
    }
}

/// A registry with every built-in handler.
///
/// Manual, schedule and webhook triggers all emit trigger metadata when run
/// locally.
#[must_use]
pub fn local_registry() -> ActionRegistry {
    let trigger = Arc::new(ManualTriggerHandler);
    ActionRegistry::new()
        .with(NodeType::Trigger, trigger.clone())
        .with(NodeType::Schedule, trigger.clone())
        .with(NodeType::Webhook, trigger)
        .with(NodeType::Wait, Arc::new(WaitHandler::new()))
        .with(NodeType::KvStorage, Arc::new(KeyValueHandler::new()))
        .with(NodeType::End, Arc::new(EndHandler))
}
