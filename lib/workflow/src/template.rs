//! Variable placeholders in node configuration.
//!
//! Configuration strings may embed `{{<nodeId>.<fieldKey>}}` tokens. The node
//! id contains no `.` and the field key contains no `}`. Tokens are stored raw
//! and only substituted when displayed ([`render`]) or executed ([`resolve`]).

use crate::graph::WorkflowGraph;
use crate::node::NodeId;
use regex::{Captures, Regex};
use serde_json::Value as JsonValue;
use std::ops::Range;
use std::sync::LazyLock;

/// Label shown in place of a node that no longer exists.
pub const UNKNOWN_NODE: &str = "Unknown Node";

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{([^.{}]+)\.([^}]+)\}\}").expect("placeholder pattern is valid")
});

/// A parsed `{{nodeId.field}}` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub node_id: NodeId,
    pub field: String,
    /// Byte range of the whole token in the source string.
    pub span: Range<usize>,
}

/// Parses every placeholder in `raw`, in order of appearance.
#[must_use]
pub fn placeholders(raw: &str) -> Vec<Placeholder> {
    PLACEHOLDER
        .captures_iter(raw)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(Placeholder {
                node_id: NodeId::from(&caps[1]),
                field: caps[2].to_string(),
                span: whole.range(),
            })
        })
        .collect()
}

/// Returns true if `raw` contains at least one placeholder.
#[must_use]
pub fn has_placeholders(raw: &str) -> bool {
    PLACEHOLDER.is_match(raw)
}

/// Returns true if any string inside `value` contains a placeholder.
#[must_use]
pub fn value_has_placeholders(value: &JsonValue) -> bool {
    match value {
        JsonValue::String(raw) => has_placeholders(raw),
        JsonValue::Array(items) => items.iter().any(value_has_placeholders),
        JsonValue::Object(entries) => entries.values().any(value_has_placeholders),
        _ => false,
    }
}

/// Serializes a single placeholder token.
#[must_use]
pub fn placeholder(node_id: &NodeId, field: &str) -> String {
    format!("{{{{{node_id}.{field}}}}}")
}

/// Produces the display form of `raw`: each token becomes `Title.field`.
///
/// Display only; the stored string is never modified.
#[must_use]
pub fn render(raw: &str, graph: &WorkflowGraph) -> String {
    PLACEHOLDER
        .replace_all(raw, |caps: &Captures<'_>| {
            let title = graph
                .get_node(&NodeId::from(&caps[1]))
                .map_or(UNKNOWN_NODE, |node| node.title.as_str());
            format!("{title}.{}", &caps[2])
        })
        .into_owned()
}

/// Substitutes every token with the current value from the referenced node's
/// recorded output.
///
/// Missing nodes, outputs and fields resolve to an empty string. Strings are
/// inserted verbatim and other JSON values as their JSON text.
#[must_use]
pub fn resolve(raw: &str, graph: &WorkflowGraph) -> String {
    PLACEHOLDER
        .replace_all(raw, |caps: &Captures<'_>| {
            lookup(graph, &NodeId::from(&caps[1]), &caps[2])
                .map(value_text)
                .unwrap_or_default()
        })
        .into_owned()
}

/// Resolves every string inside a JSON value, recursing into arrays and
/// objects.
#[must_use]
pub fn resolve_value(value: &JsonValue, graph: &WorkflowGraph) -> JsonValue {
    match value {
        JsonValue::String(raw) => JsonValue::String(resolve(raw, graph)),
        JsonValue::Array(items) => {
            JsonValue::Array(items.iter().map(|item| resolve_value(item, graph)).collect())
        }
        JsonValue::Object(entries) => JsonValue::Object(
            entries
                .iter()
                .map(|(key, item)| (key.clone(), resolve_value(item, graph)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Finds `field` in a node's output. A literal key wins; otherwise a dotted
/// key is followed as a path through objects and array indices.
fn lookup<'a>(graph: &'a WorkflowGraph, node_id: &NodeId, field: &str) -> Option<&'a JsonValue> {
    let output = graph.get_node(node_id)?.output()?;
    if let Some(value) = output.get(field) {
        return Some(value);
    }
    field.split('.').try_fold(output, |current, segment| match current {
        JsonValue::Object(map) => map.get(segment),
        JsonValue::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn value_text(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Node, NodeType};
    use serde_json::json;

    fn graph_with_output(output: JsonValue) -> WorkflowGraph {
        let mut fetch = Node::with_id("fetch", NodeType::HttpRequest, "Fetch Orders");
        fetch.set_output(output);
        let idle = Node::with_id("idle", NodeType::Email, "Mailer");
        WorkflowGraph::from_parts(vec![fetch, idle], Vec::new())
    }

    #[test]
    fn parses_tokens_in_order() {
        let raw = "Hi {{n1.name}}, total {{n2.order total}}";
        let found = placeholders(raw);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].node_id, NodeId::from("n1"));
        assert_eq!(found[0].field, "name");
        assert_eq!(found[1].field, "order total");
        assert_eq!(&raw[found[0].span.clone()], "{{n1.name}}");
    }

    #[test]
    fn ignores_malformed_tokens() {
        assert!(placeholders("{{nodot}} {single.brace} {{.field}}").is_empty());
        assert!(!has_placeholders("plain text"));
    }

    #[test]
    fn nested_values_are_searched_for_tokens() {
        assert!(value_has_placeholders(&json!({"to": ["a@x", "{{n1.email}}"]})));
        assert!(!value_has_placeholders(&json!({"count": 3, "tags": ["{{x}}"]})));
        assert!(!value_has_placeholders(&json!(null)));
    }

    #[test]
    fn serialized_token_parses_back() {
        let token = placeholder(&NodeId::from("node_1"), "email");
        assert_eq!(token, "{{node_1.email}}");
        assert_eq!(placeholders(&token)[0].field, "email");
    }

    #[test]
    fn render_uses_titles() {
        let graph = graph_with_output(json!({}));
        assert_eq!(
            render("From {{fetch.id}} and {{gone.x}}", &graph),
            "From Fetch Orders.id and Unknown Node.x"
        );
    }

    #[test]
    fn resolve_present_field() {
        let graph = graph_with_output(json!({"y": "hi"}));
        assert_eq!(resolve("{{fetch.y}}", &graph), "hi");
    }

    #[test]
    fn resolve_without_output_is_empty() {
        let graph = graph_with_output(json!({"y": "hi"}));
        assert_eq!(resolve("[{{idle.y}}]", &graph), "[]");
        assert_eq!(resolve("[{{missing.y}}]", &graph), "[]");
        assert_eq!(resolve("[{{fetch.nope}}]", &graph), "[]");
    }

    #[test]
    fn resolve_non_strings_as_json_text() {
        let graph = graph_with_output(json!({"count": 3, "ok": true, "tags": ["a"]}));
        assert_eq!(
            resolve("{{fetch.count}} {{fetch.ok}} {{fetch.tags}}", &graph),
            "3 true [\"a\"]"
        );
    }

    #[test]
    fn resolve_follows_dotted_paths() {
        let graph = graph_with_output(json!({
            "customer": {"email": "a@example.com"},
            "items": [{"sku": "X1"}],
            "literal.key": "direct"
        }));
        assert_eq!(resolve("{{fetch.customer.email}}", &graph), "a@example.com");
        assert_eq!(resolve("{{fetch.items.0.sku}}", &graph), "X1");
        assert_eq!(resolve("{{fetch.literal.key}}", &graph), "direct");
    }

    #[test]
    fn resolve_value_recurses() {
        let graph = graph_with_output(json!({"name": "Ada"}));
        let config = json!({
            "subject": "Hello {{fetch.name}}",
            "to": ["{{fetch.name}}@example.com"],
            "retries": 2
        });
        assert_eq!(
            resolve_value(&config, &graph),
            json!({
                "subject": "Hello Ada",
                "to": ["Ada@example.com"],
                "retries": 2
            })
        );
    }
}
