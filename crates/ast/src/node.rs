use crate::attr::{AttrMap, AttrValue};
use crate::error::AstError;
use crate::ids::NodeId;
use crate::kind::NodeKind;
use crate::span::SourceSpan;

/// A single AST element. Attributes are kept in an ordered map so
/// re-serialization and debug output read the fields back in ingestion
/// order, matching solc's own JSON field order.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub span: SourceSpan,
    pub parent: Option<NodeId>,
    pub(crate) attrs: AttrMap,
}

impl Node {
    pub fn get(&self, field: &str) -> Option<&AttrValue> {
        self.attrs.get(field)
    }

    pub fn has(&self, field: &str) -> bool {
        self.attrs.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.attrs.keys().map(String::as_str)
    }

    pub fn node(&self, field: &str) -> Option<NodeId> {
        self.attrs.get(field).and_then(AttrValue::as_node)
    }

    pub fn expect_node(&self, field: &str) -> Result<NodeId, AstError> {
        self.node(field)
            .ok_or_else(|| AstError::malformed(self, format!("missing required node field `{field}`")))
    }

    pub fn node_list(&self, field: &str) -> &[NodeId] {
        self.attrs.get(field).and_then(AttrValue::as_node_list).unwrap_or(&[])
    }

    pub fn json(&self, field: &str) -> Option<&serde_json::Value> {
        self.attrs.get(field).and_then(AttrValue::as_json)
    }

    pub fn str_attr(&self, field: &str) -> Option<&str> {
        self.json(field).and_then(|v| v.as_str())
    }

    pub fn expect_str(&self, field: &str) -> Result<&str, AstError> {
        self.str_attr(field)
            .ok_or_else(|| AstError::malformed(self, format!("missing required string field `{field}`")))
    }

    pub fn bool_attr(&self, field: &str) -> Option<bool> {
        self.json(field).and_then(|v| v.as_bool())
    }

    /// Bare semantic children for `IterableNode` refinements (spec §3): the
    /// one field designated by [`NodeKind::body_field`].
    pub fn body(&self) -> &[NodeId] {
        match self.kind.body_field() {
            Some(field) => self.node_list(field),
            None => &[],
        }
    }

    pub fn type_identifier(&self) -> Option<&str> {
        self.json("typeDescriptions")
            .and_then(|v| v.get("typeIdentifier"))
            .and_then(|v| v.as_str())
    }

    pub fn type_string(&self) -> Option<&str> {
        self.json("typeDescriptions")
            .and_then(|v| v.get("typeString"))
            .and_then(|v| v.as_str())
    }
}
