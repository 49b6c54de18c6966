//! Converts the compiler's standard-output JSON into arena nodes. Keys on
//! `nodeType`: an object carrying that key becomes a node of
//! the matching kind, lists recurse element-wise, and everything else rides
//! through as an opaque JSON value.

use serde_json::Value;

use crate::arena::Arena;
use crate::attr::AttrValue;
use crate::ids::NodeId;
use crate::kind::NodeKind;
use crate::span::SourceSpan;

/// Parses `json` as a standard-output object, `{"sources": {path: {"ast":
/// node}, ...}}`, returning one root `SourceUnit` per source file in
/// map-iteration order.
pub fn from_standard_output_str(arena: &mut Arena, json: &str) -> serde_json::Result<Vec<NodeId>> {
    let value: Value = serde_json::from_str(json)?;
    Ok(from_standard_output(arena, &value))
}

/// Same as [`from_standard_output_str`] but takes an already-parsed value.
pub fn from_standard_output(arena: &mut Arena, output: &Value) -> Vec<NodeId> {
    let mut roots = Vec::new();
    let Some(sources) = output.get("sources").and_then(Value::as_object) else {
        tracing::warn!("standard-output JSON has no `sources` object");
        return roots;
    };
    for entry in sources.values() {
        match entry.get("ast") {
            Some(ast) => roots.push(node_from_json(arena, ast)),
            None => tracing::warn!("source entry has no `ast` field, skipping"),
        }
    }
    roots
}

/// Converts a single solc AST node object into an arena node, recursing
/// into every field. Panics only if handed something that isn't a JSON
/// object -- callers only ever reach this through [`json_value_to_attr`] or
/// [`from_standard_output`], both of which only call it on node-shaped
/// values.
pub fn node_from_json(arena: &mut Arena, value: &Value) -> NodeId {
    let obj = value.as_object().expect("node_from_json: expected a JSON object");
    let node_type = obj.get("nodeType").and_then(Value::as_str).unwrap_or("");
    let kind = NodeKind::from_node_type(node_type);
    if let NodeKind::Unknown(tag) = &kind {
        tracing::warn!(node_type = %tag, "unsupported node type during ingestion, keeping opaque");
    }
    let span = SourceSpan::parse(obj.get("src"));

    let id = arena.alloc(kind, span);
    for (key, field_value) in obj {
        if key == "nodeType" || key == "src" {
            continue;
        }
        let attr = json_value_to_attr(arena, field_value);
        arena.set_field(id, key.clone(), attr);
    }
    id
}

fn is_node_object(value: &Value) -> bool {
    matches!(value, Value::Object(obj) if obj.contains_key("nodeType"))
}

fn json_value_to_attr(arena: &mut Arena, value: &Value) -> AttrValue {
    match value {
        Value::Object(_) if is_node_object(value) => AttrValue::Node(node_from_json(arena, value)),
        Value::Array(items) if !items.is_empty() && items.iter().all(is_node_object) => {
            AttrValue::NodeList(items.iter().map(|item| node_from_json(arena, item)).collect())
        }
        other => AttrValue::Json(other.clone()),
    }
}
