//! Identifier renaming, grounded in
//! `src/identifierRenaming.py`. Walks the whole tree and replaces every
//! user identifier with a SHA-1-derived alias, consistently: the same
//! original name always maps to the same replacement within one run.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::time::{SystemTime, UNIX_EPOCH};

use sha1::{Digest, Sha1};
use solobf_ast::{Arena, NodeId, NodeKind};

/// Identifiers the obfuscated source must not touch, either because they
/// name Solidity builtins or because renaming them would shadow a builtin
/// with the same spelling.
const GLOBAL_VARIABLES: [&str; 12] =
    ["block", "msg", "sender", "tx", "abi", "require", "length", "push", "this", "timestamp", "value", "transfer"];

/// Node kinds whose `name`/`memberName`/`names` fields are in scope for
/// renaming (`identifierRenaming.py`'s node-type allowlist). Uses
/// `ModifierDefinition`, the correctly spelled solc node type; the
/// original's `ModifierDeclaration` never matches any real AST.
fn is_renameable_kind(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::ContractDefinition
            | NodeKind::StructDefinition
            | NodeKind::FunctionDefinition
            | NodeKind::EventDefinition
            | NodeKind::VariableDeclaration
            | NodeKind::ModifierDefinition
            | NodeKind::IdentifierPath
            | NodeKind::MemberAccess
            | NodeKind::FunctionCall
            | NodeKind::Identifier
    )
}

/// SHA-1 of `<name>_<wall-clock time>`, hex-encoded, `_`-prefixed if it
/// would otherwise start with a digit (`make_valid_name`).
fn make_valid_name(name: &str) -> String {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    let salted = format!("{name}_{}.{}", now.as_secs(), now.subsec_nanos());

    let mut hasher = Sha1::new();
    hasher.update(salted.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        write!(hex, "{byte:02x}").expect("writing into a String never fails");
    }

    if hex.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{hex}")
    } else {
        hex
    }
}

/// Looks up (or allocates) the replacement for `name`, leaving reserved
/// words untouched.
fn replacement_for<'a>(replacements: &'a mut HashMap<String, String>, name: &str) -> Option<&'a str> {
    if GLOBAL_VARIABLES.contains(&name) {
        return None;
    }
    let entry = replacements.entry(name.to_string()).or_insert_with(|| make_valid_name(name));
    Some(entry.as_str())
}

/// Renames every in-scope identifier reachable from `root`, in place.
/// Traversal order doesn't affect the result: replacements are cached by
/// original name in `replacements`, so every occurrence of a name resolves
/// to the same alias regardless of visit order.
pub fn run(arena: &mut Arena, root: NodeId, _ctx: &mut crate::rng::PassContext) -> NodeId {
    let mut replacements: HashMap<String, String> = HashMap::new();

    for node in arena.bfs(root).collect::<Vec<_>>() {
        if !is_renameable_kind(&arena.node(node).kind) {
            continue;
        }

        if let Some(name) = arena.node(node).str_attr("name").map(str::to_string) {
            if !name.is_empty() {
                if let Some(renamed) = replacement_for(&mut replacements, &name) {
                    let renamed = renamed.to_string();
                    arena.set_field(node, "name", renamed);
                }
            }
            continue;
        }

        if let Some(member_name) = arena.node(node).str_attr("memberName").map(str::to_string) {
            if let Some(renamed) = replacement_for(&mut replacements, &member_name) {
                let renamed = renamed.to_string();
                arena.set_field(node, "memberName", renamed);
            }
            continue;
        }

        if let Some(names) = arena.node(node).json("names").and_then(|v| v.as_array()).cloned() {
            let renamed_names: Vec<serde_json::Value> = names
                .into_iter()
                .map(|value| match value.as_str() {
                    Some(name) => match replacement_for(&mut replacements, name) {
                        Some(renamed) => serde_json::Value::String(renamed.to_string()),
                        None => value,
                    },
                    None => value,
                })
                .collect();
            arena.set_field(node, "names", serde_json::Value::Array(renamed_names));
        }
    }

    root
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::PassContext;
    use solobf_ast::SourceSpan;

    fn identifier(arena: &mut Arena, name: &str) -> NodeId {
        let id = arena.alloc(NodeKind::Identifier, SourceSpan::SYNTHETIC);
        arena.set_field(id, "name", name);
        id
    }

    #[test]
    fn renames_consistently_and_skips_reserved_words() {
        let mut arena = Arena::new();
        let first = identifier(&mut arena, "balance");
        let second = identifier(&mut arena, "balance");
        let reserved = identifier(&mut arena, "msg");

        let func = arena.alloc(NodeKind::FunctionDefinition, SourceSpan::SYNTHETIC);
        arena.set_field(func, "name", "withdraw");
        arena.set_field(func, "nodes", vec![first, second, reserved]);

        let root = arena.alloc(NodeKind::SourceUnit, SourceSpan::SYNTHETIC);
        arena.set_field(root, "nodes", vec![func]);

        let mut ctx = PassContext::from_seed(1);
        run(&mut arena, root, &mut ctx);

        let first_name = arena.node(first).str_attr("name").unwrap().to_string();
        let second_name = arena.node(second).str_attr("name").unwrap().to_string();
        assert_eq!(first_name, second_name);
        assert_ne!(first_name, "balance");
        assert_eq!(arena.node(reserved).str_attr("name").unwrap(), "msg");

        let func_name = arena.node(func).str_attr("name").unwrap();
        assert_ne!(func_name, "withdraw");
    }

    #[test]
    fn renames_member_access_and_call_keyword_argument_names() {
        let mut arena = Arena::new();
        let member = arena.alloc(NodeKind::MemberAccess, SourceSpan::SYNTHETIC);
        arena.set_field(member, "memberName", "owner");

        let call = arena.alloc(NodeKind::FunctionCall, SourceSpan::SYNTHETIC);
        arena.set_field(call, "names", serde_json::json!(["owner", "value"]));
        arena.set_field(call, "expression", member);

        let root = arena.alloc(NodeKind::SourceUnit, SourceSpan::SYNTHETIC);
        arena.set_field(root, "nodes", vec![call]);

        let mut ctx = PassContext::from_seed(2);
        run(&mut arena, root, &mut ctx);

        let member_renamed = arena.node(member).str_attr("memberName").unwrap().to_string();
        assert_ne!(member_renamed, "owner");

        let names = arena.node(call).json("names").unwrap().as_array().unwrap().clone();
        assert_eq!(names[0].as_str().unwrap(), member_renamed);
        // "value" is reserved and must pass through unchanged.
        assert_eq!(names[1].as_str().unwrap(), "value");
    }

    #[test]
    fn generated_names_are_lexically_valid_identifiers() {
        let mut arena = Arena::new();
        let id = identifier(&mut arena, "x");
        let root = arena.alloc(NodeKind::SourceUnit, SourceSpan::SYNTHETIC);
        arena.set_field(root, "nodes", vec![id]);

        let mut ctx = PassContext::from_seed(3);
        run(&mut arena, root, &mut ctx);

        let name = arena.node(id).str_attr("name").unwrap();
        assert!(!name.starts_with(|c: char| c.is_ascii_digit()));
        assert!(name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    }
}
