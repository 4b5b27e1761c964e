//! Workflow node types.
//!
//! A node is a typed, configurable unit of work. Each node has:
//! - An opaque string ID, unique within its graph
//! - A [`NodeType`] that selects the handler used at execution time
//! - A canvas position, title and description
//! - A [`ConfigStatus`] gating whether it may run
//! - A free-form metadata map holding type-specific configuration plus
//!   `sampleData`, the last recorded output that downstream placeholders read

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use ulid::Ulid;

/// Metadata key under which a node's last recorded output is stored.
pub const SAMPLE_DATA_KEY: &str = "sampleData";

/// A unique identifier for a node within a workflow graph.
///
/// Generated ids have the form `node_<ulid>` and never contain `.`, which
/// keeps them usable inside `{{nodeId.field}}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a new random node ID.
    #[must_use]
    pub fn new() -> Self {
        Self(format!("node_{}", Ulid::new()))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Broad grouping of node types, used for palettes and summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    /// Entry points that start a run.
    Trigger,
    /// Side-effecting integrations.
    Action,
    /// Control primitives (conditions, waits, transforms, end).
    Logic,
}

/// The concrete kind of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// Manually started trigger.
    Trigger,
    /// Time-based trigger.
    Schedule,
    /// Incoming webhook trigger.
    Webhook,
    /// Polling trigger watching a Google Drive folder for a change.
    GoogleDrive,
    /// Conditional check.
    Condition,
    /// Timed pause.
    Wait,
    /// Outgoing HTTP request.
    HttpRequest,
    /// Data reshaping.
    DataTransform,
    /// Key-value read/write.
    KvStorage,
    /// In-app notification shown to the user.
    Toast,
    /// Send an email.
    Email,
    /// Post to a Slack webhook.
    Slack,
    /// Post to a Discord webhook.
    Discord,
    /// Create a Notion database page.
    Notion,
    /// Terminates a branch.
    End,
}

impl NodeType {
    /// Every node type, in palette order.
    pub const ALL: [NodeType; 15] = [
        Self::Trigger,
        Self::Schedule,
        Self::Webhook,
        Self::GoogleDrive,
        Self::Condition,
        Self::Wait,
        Self::HttpRequest,
        Self::DataTransform,
        Self::KvStorage,
        Self::Toast,
        Self::Email,
        Self::Slack,
        Self::Discord,
        Self::Notion,
        Self::End,
    ];

    /// Returns true for types subject to the single-trigger rule.
    #[must_use]
    pub fn is_trigger(self) -> bool {
        matches!(
            self,
            Self::Trigger | Self::Schedule | Self::Webhook | Self::GoogleDrive
        )
    }

    /// Returns true for types the engine polls instead of dispatching once.
    #[must_use]
    pub fn is_polling(self) -> bool {
        matches!(self, Self::GoogleDrive)
    }

    /// Returns true for types that only notify the client and never touch the network.
    #[must_use]
    pub fn is_client_notification(self) -> bool {
        matches!(self, Self::Toast)
    }

    /// Returns true for types that may not have outgoing edges.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::End)
    }

    /// Returns the category of this type.
    #[must_use]
    pub fn category(self) -> NodeCategory {
        match self {
            Self::Trigger | Self::Schedule | Self::Webhook | Self::GoogleDrive => {
                NodeCategory::Trigger
            }
            Self::Condition | Self::Wait | Self::DataTransform | Self::End => NodeCategory::Logic,
            Self::HttpRequest
            | Self::KvStorage
            | Self::Toast
            | Self::Email
            | Self::Slack
            | Self::Discord
            | Self::Notion => NodeCategory::Action,
        }
    }

    /// Default title for a freshly added node of this type.
    #[must_use]
    pub fn default_title(self) -> &'static str {
        match self {
            Self::Trigger => "Manual Trigger",
            Self::Schedule => "Schedule",
            Self::Webhook => "Webhook",
            Self::GoogleDrive => "Google Drive",
            Self::Condition => "Condition",
            Self::Wait => "Wait",
            Self::HttpRequest => "HTTP Request",
            Self::DataTransform => "Data Transform",
            Self::KvStorage => "Key-Value Storage",
            Self::Toast => "Toast",
            Self::Email => "Send Email",
            Self::Slack => "Slack Message",
            Self::Discord => "Discord Message",
            Self::Notion => "Notion Page",
            Self::End => "End",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_title())
    }
}

/// Canvas position of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns this position shifted by the given delta.
    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Readiness of a node's configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigStatus {
    /// Not yet configured.
    #[default]
    Draft,
    /// Fully configured and allowed to run.
    Active,
    /// Configuration is known to be broken.
    Error,
    /// Configuration changed upstream and should be checked.
    NeedsReview,
}

impl ConfigStatus {
    /// Returns true if a node in this state may execute.
    #[must_use]
    pub fn is_runnable(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// A workflow node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier for this node within the graph.
    pub id: NodeId,
    /// The node's type.
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Canvas position.
    #[serde(default)]
    pub position: Position,
    /// Human-readable title, shown in rendered placeholders.
    pub title: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Configuration readiness.
    #[serde(default)]
    pub config_status: ConfigStatus,
    /// Type-specific configuration plus the recorded `sampleData` output.
    #[serde(default)]
    pub metadata: Map<String, JsonValue>,
}

impl Node {
    /// Creates a draft node of the given type with a fresh id.
    #[must_use]
    pub fn new(node_type: NodeType, title: impl Into<String>) -> Self {
        Self::with_id(NodeId::new(), node_type, title)
    }

    /// Creates a draft node with a specific id.
    #[must_use]
    pub fn with_id(id: impl Into<NodeId>, node_type: NodeType, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type,
            position: Position::default(),
            title: title.into(),
            description: String::new(),
            config_status: ConfigStatus::Draft,
            metadata: Map::new(),
        }
    }

    /// Sets the position.
    #[must_use]
    pub fn at(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Adds a configuration entry.
    #[must_use]
    pub fn with_config(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Sets the configuration status.
    #[must_use]
    pub fn with_status(mut self, status: ConfigStatus) -> Self {
        self.config_status = status;
        self
    }

    /// Marks the node as fully configured.
    #[must_use]
    pub fn active(self) -> Self {
        self.with_status(ConfigStatus::Active)
    }

    /// Returns true if this node is trigger-class.
    #[must_use]
    pub fn is_trigger(&self) -> bool {
        self.node_type.is_trigger()
    }

    /// Returns the last recorded output, if any.
    #[must_use]
    pub fn output(&self) -> Option<&JsonValue> {
        self.metadata.get(SAMPLE_DATA_KEY)
    }

    /// Records an output for downstream placeholders.
    pub fn set_output(&mut self, output: JsonValue) {
        self.metadata.insert(SAMPLE_DATA_KEY.to_string(), output);
    }

    /// Removes the recorded output.
    pub fn clear_output(&mut self) -> Option<JsonValue> {
        self.metadata.remove(SAMPLE_DATA_KEY)
    }

    /// Returns the configuration entries, excluding the recorded output.
    #[must_use]
    pub fn config(&self) -> Map<String, JsonValue> {
        self.metadata
            .iter()
            .filter(|(key, _)| key.as_str() != SAMPLE_DATA_KEY)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Returns a copy of this node's data under a fresh id.
    #[must_use]
    pub fn cloned_with_fresh_id(&self) -> Self {
        Self {
            id: NodeId::new(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn generated_ids_are_placeholder_safe() {
        let id = NodeId::new();
        assert!(id.as_str().starts_with("node_"));
        assert!(!id.as_str().contains('.'));
    }

    #[test]
    fn trigger_classification() {
        let triggers: Vec<_> = NodeType::ALL.iter().filter(|t| t.is_trigger()).collect();
        assert_eq!(triggers.len(), 4);
        assert!(NodeType::GoogleDrive.is_polling());
        assert!(!NodeType::Email.is_trigger());
        assert_eq!(NodeType::Slack.category(), NodeCategory::Action);
        assert_eq!(NodeType::End.category(), NodeCategory::Logic);
    }

    #[test]
    fn new_nodes_start_as_draft() {
        let node = Node::new(NodeType::Email, "Notify team");
        assert_eq!(node.config_status, ConfigStatus::Draft);
        assert!(!node.config_status.is_runnable());
        assert!(node.active().config_status.is_runnable());
    }

    #[test]
    fn config_excludes_recorded_output() {
        let mut node = Node::new(NodeType::Slack, "Post")
            .with_config("webhookUrl", json!("https://hooks.example"))
            .with_config("message", json!("hi"));
        node.set_output(json!({"ok": true}));

        let config = node.config();
        assert_eq!(config.len(), 2);
        assert!(!config.contains_key(SAMPLE_DATA_KEY));
        assert_eq!(node.output(), Some(&json!({"ok": true})));
    }

    #[test]
    fn fresh_id_copy_keeps_data() {
        let node = Node::new(NodeType::Wait, "Pause").with_config("durationMs", json!(10));
        let copy = node.cloned_with_fresh_id();
        assert_ne!(copy.id, node.id);
        assert_eq!(copy.metadata, node.metadata);
        assert_eq!(copy.title, node.title);
    }

    #[test]
    fn node_type_serializes_snake_case() {
        let node = Node::with_id("kv", NodeType::KvStorage, "Store");
        let json = serde_json::to_value(&node).expect("serialize");
        assert_eq!(json["type"], json!("kv_storage"));
        assert_eq!(json["config_status"], json!("draft"));
    }
}
