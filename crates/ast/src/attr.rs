use crate::ids::NodeId;
use indexmap::IndexMap;
use serde_json::Value;

/// One value a [`crate::node::Node`] field can hold (spec §3: "values are one
/// of: primitive ..., a Node, an ordered list of Nodes-or-primitives, or a
/// free-form sub-dictionary").
///
/// Primitives and free-form sub-dictionaries both ride as [`AttrValue::Json`]
/// -- there is no structural difference between `typeDescriptions` (a
/// side-car dict) and `visibility` (a primitive string) as far as the arena
/// is concerned; only the source builder and passes attach meaning to a
/// given field name.
#[derive(Debug, Clone)]
pub enum AttrValue {
    Node(NodeId),
    NodeList(Vec<NodeId>),
    Json(Value),
}

impl AttrValue {
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            AttrValue::Node(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_node_list(&self) -> Option<&[NodeId]> {
        match self {
            AttrValue::NodeList(ids) => Some(ids),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            AttrValue::Json(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Json(Value::Bool(b))
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Json(Value::String(s.to_string()))
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Json(Value::String(s))
    }
}

impl From<NodeId> for AttrValue {
    fn from(id: NodeId) -> Self {
        AttrValue::Node(id)
    }
}

impl From<Vec<NodeId>> for AttrValue {
    fn from(ids: Vec<NodeId>) -> Self {
        AttrValue::NodeList(ids)
    }
}

impl From<Value> for AttrValue {
    fn from(value: Value) -> Self {
        AttrValue::Json(value)
    }
}

pub type AttrMap = IndexMap<String, AttrValue>;
