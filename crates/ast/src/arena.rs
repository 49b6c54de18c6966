use std::collections::HashMap;

use crate::attr::AttrValue;
use crate::ids::NodeId;
use crate::kind::NodeKind;
use crate::node::Node;
use crate::span::SourceSpan;

/// Owns every [`Node`] in one obfuscation run and maintains the
/// parent/children invariants:
///
/// - every non-root node is reachable from its parent via `children[n]`
/// - assigning an already-parented node to a new owner clones it first
/// - removing a node from its owner clears its parent and the children entry
///
/// `children` maps a child back to the field name that owns it. For list
/// fields the map only records the field name, not the index -- finding a
/// node's position means scanning the owning list, which `replace_with` and
/// `remove_from_list` do explicitly.
#[derive(Debug, Default)]
pub struct Arena {
    nodes: Vec<Node>,
    children: HashMap<NodeId, String>,
}

impl Arena {
    pub fn new() -> Arena {
        Arena::default()
    }

    pub fn alloc(&mut self, kind: NodeKind, span: SourceSpan) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { id, kind, span, parent: None, attrs: Default::default() });
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The field name on `n.parent` that owns `n`, via the reverse
    /// `children` map. `None` for the root or a detached node.
    pub fn owning_field(&self, id: NodeId) -> Option<&str> {
        self.children.get(&id).map(String::as_str)
    }

    /// Binds `child` under `owner`'s `field`. If `child` already has a
    /// different parent, it is deep-copied first so the tree property is
    /// never violated by sharing one node between two owners.
    fn bind(&mut self, owner: NodeId, child: NodeId, field: &str) -> NodeId {
        let child = match self.node(child).parent {
            Some(p) if p != owner => self.deep_clone(child),
            _ => child,
        };
        self.node_mut(child).parent = Some(owner);
        self.children.insert(child, field.to_string());
        child
    }

    /// Clears `child`'s parent link and removes its children-map entry, iff
    /// it is currently owned by `owner`.
    fn unbind(&mut self, owner: NodeId, child: NodeId) {
        if self.node(child).parent == Some(owner) {
            self.node_mut(child).parent = None;
            self.children.remove(&child);
        }
    }

    fn unbind_value(&mut self, owner: NodeId, value: &AttrValue) {
        match value {
            AttrValue::Node(n) => self.unbind(owner, *n),
            AttrValue::NodeList(ns) => {
                for n in ns {
                    self.unbind(owner, *n);
                }
            }
            AttrValue::Json(_) => {}
        }
    }

    /// Assigns `owner.field = value`, unbinding whatever previously occupied
    /// that field and binding the nodes in `value`. Works uniformly for
    /// scalar fields, single-node fields, and whole list fields.
    pub fn set_field(&mut self, owner: NodeId, field: impl Into<String>, value: impl Into<AttrValue>) {
        let field = field.into();
        let value = value.into();
        if let Some(old) = self.node_mut(owner).attrs.shift_remove(&field) {
            self.unbind_value(owner, &old);
        }
        let value = match value {
            AttrValue::Node(n) => AttrValue::Node(self.bind(owner, n, &field)),
            AttrValue::NodeList(ns) => {
                AttrValue::NodeList(ns.into_iter().map(|n| self.bind(owner, n, &field)).collect())
            }
            other => other,
        };
        self.node_mut(owner).attrs.insert(field, value);
    }

    /// Replaces `old` with `new` in whatever slot `old` currently occupies
    /// (scalar field or list element).
    pub fn replace_with(&mut self, old: NodeId, new: NodeId) {
        let Some(parent) = self.node(old).parent else {
            tracing::warn!("replace_with called on a detached node {old}");
            return;
        };
        let field = self.owning_field(old).expect("parent/children invariant").to_string();
        match self.node(parent).attrs.get(&field) {
            Some(AttrValue::Node(_)) => self.set_field(parent, field, new),
            Some(AttrValue::NodeList(list)) => {
                let index = list.iter().position(|&n| n == old).expect("parent/children invariant");
                let new = self.bind(parent, new, &field);
                self.unbind(parent, old);
                if let Some(AttrValue::NodeList(list)) = self.node_mut(parent).attrs.get_mut(&field) {
                    list[index] = new;
                }
            }
            _ => unreachable!("children map points at a non-node field"),
        }
    }

    /// Inserts `value` at `index` in `owner`'s list field `field`, binding
    /// it to `owner`.
    pub fn insert_into_list(&mut self, owner: NodeId, field: &str, index: usize, value: NodeId) {
        let value = self.bind(owner, value, field);
        match self.node_mut(owner).attrs.get_mut(field) {
            Some(AttrValue::NodeList(list)) => list.insert(index, value),
            _ => {
                self.node_mut(owner).attrs.insert(field.to_string(), AttrValue::NodeList(vec![value]));
            }
        }
    }

    pub fn append_to_list(&mut self, owner: NodeId, field: &str, value: NodeId) {
        let index = self.node(owner).node_list(field).len();
        self.insert_into_list(owner, field, index, value);
    }

    pub fn remove_from_list(&mut self, owner: NodeId, field: &str, index: usize) -> NodeId {
        let removed = match self.node_mut(owner).attrs.get_mut(field) {
            Some(AttrValue::NodeList(list)) => list.remove(index),
            _ => panic!("remove_from_list: `{field}` is not a list field on {owner}"),
        };
        self.unbind(owner, removed);
        removed
    }

    /// Detaches `child` from its current owner without deep-copying it, so a
    /// pass can move a subtree to a new parent in one step. Auto-clone on
    /// reparent is a blunt instrument for that case; a pass that needs to
    /// relocate a subtree should detach it and then attach it elsewhere
    /// without paying for a copy.
    pub fn detach(&mut self, child: NodeId) {
        if let Some(parent) = self.node(child).parent {
            let field = self.owning_field(child).unwrap().to_string();
            match self.node_mut(parent).attrs.get_mut(&field) {
                Some(AttrValue::NodeList(list)) => list.retain(|&n| n != child),
                Some(slot @ AttrValue::Node(_)) => {
                    *slot = AttrValue::Json(serde_json::Value::Null);
                }
                _ => {}
            }
            self.unbind(parent, child);
        }
    }

    /// Attaches a detached (parentless) `child` into `owner`'s list field
    /// `field` at `index`, without the clone-on-reparent path -- callers are
    /// responsible for having detached it first.
    pub fn attach_into_list(&mut self, owner: NodeId, field: &str, index: usize, child: NodeId) {
        assert!(self.node(child).parent.is_none(), "attach_into_list: node still has a parent");
        self.node_mut(child).parent = Some(owner);
        self.children.insert(child, field.to_string());
        match self.node_mut(owner).attrs.get_mut(field) {
            Some(AttrValue::NodeList(list)) => list.insert(index, child),
            _ => {
                self.node_mut(owner).attrs.insert(field.to_string(), AttrValue::NodeList(vec![child]));
            }
        }
    }

    /// Recursively copies `id` and all of its (bound) children into fresh
    /// arena slots, returning the new, still-parentless root of the copy.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let kind = self.node(id).kind.clone();
        let span = self.node(id).span;
        let entries: Vec<(String, AttrValue)> =
            self.node(id).attrs.iter().map(|(k, v)| (k.clone(), v.clone())).collect();

        let new_id = self.alloc(kind, span);
        for (field, value) in entries {
            let cloned = match value {
                AttrValue::Node(child) => {
                    let new_child = self.deep_clone(child);
                    self.node_mut(new_child).parent = Some(new_id);
                    self.children.insert(new_child, field.clone());
                    AttrValue::Node(new_child)
                }
                AttrValue::NodeList(children) => {
                    let new_children = children
                        .into_iter()
                        .map(|c| {
                            let new_child = self.deep_clone(c);
                            self.node_mut(new_child).parent = Some(new_id);
                            self.children.insert(new_child, field.clone());
                            new_child
                        })
                        .collect();
                    AttrValue::NodeList(new_children)
                }
                json @ AttrValue::Json(_) => json,
            };
            self.node_mut(new_id).attrs.insert(field, cloned);
        }
        new_id
    }

    /// Breadth-first iterator over a subtree's bound child nodes (not
    /// side-car JSON), used by every pass's traversal.
    pub fn bfs(&self, root: NodeId) -> Bfs<'_> {
        Bfs { arena: self, queue: std::collections::VecDeque::from([root]) }
    }

    /// All bound children of `id`, in field-declaration order, flattening
    /// list fields in place.
    pub fn children_of(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        for value in self.node(id).attrs.values() {
            match value {
                AttrValue::Node(n) => out.push(*n),
                AttrValue::NodeList(ns) => out.extend(ns.iter().copied()),
                AttrValue::Json(_) => {}
            }
        }
        out
    }
}

pub struct Bfs<'a> {
    arena: &'a Arena,
    queue: std::collections::VecDeque<NodeId>,
}

impl<'a> Iterator for Bfs<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let next = self.queue.pop_front()?;
        self.queue.extend(self.arena.children_of(next));
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::SourceSpan;

    fn leaf(arena: &mut Arena, name: &str) -> NodeId {
        let id = arena.alloc(NodeKind::Identifier, SourceSpan::SYNTHETIC);
        arena.set_field(id, "name", name);
        id
    }

    #[test]
    fn set_field_binds_and_reparenting_clones() {
        let mut arena = Arena::new();
        let block_a = arena.alloc(NodeKind::Block, SourceSpan::SYNTHETIC);
        let block_b = arena.alloc(NodeKind::Block, SourceSpan::SYNTHETIC);
        let stmt = leaf(&mut arena, "x");

        arena.set_field(block_a, "statements", vec![stmt]);
        assert_eq!(arena.node(stmt).parent, Some(block_a));
        assert_eq!(arena.owning_field(stmt), Some("statements"));

        // Moving the already-parented node under a second owner must clone
        // it rather than steal it from block_a.
        arena.set_field(block_b, "statements", vec![stmt]);
        assert_eq!(arena.node(stmt).parent, Some(block_a));
        let cloned = arena.node(block_b).node_list("statements")[0];
        assert_ne!(cloned, stmt);
        assert_eq!(arena.node(cloned).parent, Some(block_b));
        assert_eq!(arena.node(cloned).str_attr("name"), Some("x"));
    }

    #[test]
    fn replace_with_swaps_a_list_element_in_place() {
        let mut arena = Arena::new();
        let block = arena.alloc(NodeKind::Block, SourceSpan::SYNTHETIC);
        let a = leaf(&mut arena, "a");
        let b = leaf(&mut arena, "b");
        arena.set_field(block, "statements", vec![a, b]);

        let c = leaf(&mut arena, "c");
        arena.replace_with(a, c);

        let statements = arena.node(block).node_list("statements").to_vec();
        assert_eq!(statements, vec![c, b]);
        assert_eq!(arena.node(a).parent, None);
    }

    #[test]
    fn remove_from_list_unbinds_the_removed_node() {
        let mut arena = Arena::new();
        let block = arena.alloc(NodeKind::Block, SourceSpan::SYNTHETIC);
        let a = leaf(&mut arena, "a");
        let b = leaf(&mut arena, "b");
        arena.set_field(block, "statements", vec![a, b]);

        let removed = arena.remove_from_list(block, "statements", 0);
        assert_eq!(removed, a);
        assert_eq!(arena.node(a).parent, None);
        assert_eq!(arena.node(block).node_list("statements"), &[b]);
    }

    #[test]
    fn deep_clone_duplicates_the_whole_subtree() {
        let mut arena = Arena::new();
        let block = arena.alloc(NodeKind::Block, SourceSpan::SYNTHETIC);
        let a = leaf(&mut arena, "a");
        arena.set_field(block, "statements", vec![a]);

        let clone = arena.deep_clone(block);
        assert_ne!(clone, block);
        assert_eq!(arena.node(clone).parent, None);
        let cloned_child = arena.node(clone).node_list("statements")[0];
        assert_ne!(cloned_child, a);
        assert_eq!(arena.node(cloned_child).str_attr("name"), Some("a"));
    }
}
