//! Data-flow obfuscation, grounded in
//! `solo/plugins/dataFlowObfuscation.py`. Per contract, lifts every
//! top-level state-variable literal initializer into one of four
//! typed backing arrays (`uint256`/`string`/`address`/`bool`), replacing the
//! initializer with a call to a fresh accessor function that indexes into
//! the array.

use solobf_ast::{builders, Arena, NodeId, NodeKind};

use crate::rng::PassContext;

const SUPPORTED_TYPES: [&str; 4] = ["uint256", "string", "address", "bool"];

struct Pool {
    func_name: String,
    array: Vec<NodeId>,
}

/// Replaces each qualifying state variable's literal value with
/// `<pool_func>(<index>)`, stashing the original literal node (now
/// detached) in the matching pool. A type with no pool entry is left alone
/// (`dataFlowObfuscation.py`'s `except KeyError: logger.warning(...)`).
fn extract_literals(arena: &mut Arena, contract: NodeId, pools: &mut [(&'static str, Pool)]) {
    let members = arena.node(contract).body().to_vec();
    for member in members {
        if arena.node(member).kind != NodeKind::VariableDeclaration {
            continue;
        }
        let Some(value) = arena.node(member).node("value") else { continue };
        if arena.node(value).kind != NodeKind::Literal {
            continue;
        }
        let Some(type_name) = arena.node(member).node("typeName") else { continue };
        let Some(type_str) = arena.node(type_name).type_string().map(str::to_string) else { continue };

        let mut matched = false;
        for entry in pools.iter_mut() {
            if entry.0 != type_str {
                continue;
            }
            let index = entry.1.array.len();
            entry.1.array.push(value);
            let index_lit = builders::num_u64(arena, index as u64);
            let call = builders::funcall(arena, entry.1.func_name.clone(), vec![index_lit]);
            arena.set_field(member, "value", call);
            matched = true;
            break;
        }
        if !matched {
            tracing::warn!(%type_str, "variable type not supported for data-flow obfuscation");
        }
    }
}

/// Appends `_<func>` backing arrays for every pool, in pool-declaration
/// order: arrays are emitted after the accessor functions that read them.
fn generate_constant_arrays(arena: &mut Arena, contract: NodeId, pools: Vec<(&'static str, Pool)>) {
    for entry in pools {
        let (etype, pool) = entry;
        let array_name = format!("_{}", pool.func_name);
        let arr_dec = builders::arrdec(arena, array_name, pool.array, etype);
        arena.append_to_list(contract, "nodes", arr_dec);
    }
}

/// Appends one `internal view` accessor per pool: `function <func>(uint256
/// <idx>) internal view returns (<etype>) { return _<func>[<idx>]; }`. The
/// `string` accessor's return parameter uses the `storage` data location
/// (solc requires one for a `string` return); every other pool type keeps
/// the default location.
fn generate_functions(arena: &mut Arena, contract: NodeId, pools: &[(&'static str, Pool)], ctx: &mut PassContext) {
    for (etype, pool) in pools {
        let idx_var_name = ctx.random_name(4);
        let array_name = format!("_{}", pool.func_name);

        let index_param = builders::vardec(arena, idx_var_name.clone(), None, "uint256");
        let parameters = builders::parameter_list(arena, vec![index_param]);
        let return_param = builders::vardec(arena, "", None, etype);
        if *etype == "string" {
            arena.set_field(return_param, "storageLocation", "storage");
        }
        let return_parameters = builders::parameter_list(arena, vec![return_param]);

        let access = builders::index_access(arena, builders::sym(arena, array_name), Some(builders::sym(arena, idx_var_name)));
        let return_stmt = builders::return_stmt(arena, Some(access));
        let body = builders::block(arena, vec![return_stmt]);

        let func_dec = builders::function_def(
            arena,
            pool.func_name.clone(),
            parameters,
            "internal",
            "view",
            return_parameters,
            Some(body),
        );
        arena.append_to_list(contract, "nodes", func_dec);
    }
}

/// Rewrites every contract under `root`, lifting its literal-initialized
/// state variables into pool accessors.
pub fn run(arena: &mut Arena, root: NodeId, ctx: &mut PassContext) -> NodeId {
    let members = arena.node(root).body().to_vec();
    for contract in members {
        if arena.node(contract).kind != NodeKind::ContractDefinition {
            continue;
        }
        tracing::debug!(contract = %contract, "running data-flow obfuscation");

        let mut pools: Vec<(&'static str, Pool)> =
            SUPPORTED_TYPES.iter().map(|&t| (t, Pool { func_name: ctx.random_name(16), array: Vec::new() })).collect();

        extract_literals(arena, contract, &mut pools);
        generate_functions(arena, contract, &pools, ctx);
        generate_constant_arrays(arena, contract, pools);
    }

    root
}

#[cfg(test)]
mod tests {
    use super::*;
    use solobf_ast::SourceSpan;

    fn state_var(arena: &mut Arena, name: &str, etype_name: &str, value: u64) -> NodeId {
        let type_name = builders::etype(arena, etype_name);
        arena.set_field(type_name, "typeDescriptions", serde_json::json!({"typeString": etype_name}));
        let literal = builders::num_u64(arena, value);
        let id = arena.alloc(NodeKind::VariableDeclaration, SourceSpan::SYNTHETIC);
        arena.set_field(id, "typeName", type_name);
        arena.set_field(id, "name", name);
        arena.set_field(id, "value", literal);
        id
    }

    #[test]
    fn lifts_a_literal_initializer_into_an_accessor_and_array() {
        let mut arena = Arena::new();
        let var = state_var(&mut arena, "total", "uint256", 42);
        let contract = arena.alloc(NodeKind::ContractDefinition, SourceSpan::SYNTHETIC);
        arena.set_field(contract, "name", "A");
        arena.set_field(contract, "nodes", vec![var]);
        let root = arena.alloc(NodeKind::SourceUnit, SourceSpan::SYNTHETIC);
        arena.set_field(root, "nodes", vec![contract]);

        let mut ctx = PassContext::from_seed(5);
        run(&mut arena, root, &mut ctx);

        let value = arena.node(var).node("value").unwrap();
        assert_eq!(arena.node(value).kind, NodeKind::FunctionCall);

        let members = arena.node(contract).node_list("nodes").to_vec();
        // original var + 4 accessor functions + 4 backing arrays
        assert_eq!(members.len(), 9);
        let kinds: Vec<_> = members.iter().map(|&m| arena.node(m).kind.clone()).collect();
        assert_eq!(kinds.iter().filter(|k| **k == NodeKind::FunctionDefinition).count(), 4);
        assert_eq!(kinds.iter().filter(|k| **k == NodeKind::VariableDeclaration).count(), 5);
    }

    #[test]
    fn leaves_unsupported_types_untouched() {
        let mut arena = Arena::new();
        let var = state_var(&mut arena, "small", "uint8", 7);

        let contract = arena.alloc(NodeKind::ContractDefinition, SourceSpan::SYNTHETIC);
        arena.set_field(contract, "name", "A");
        arena.set_field(contract, "nodes", vec![var]);
        let root = arena.alloc(NodeKind::SourceUnit, SourceSpan::SYNTHETIC);
        arena.set_field(root, "nodes", vec![contract]);

        let mut ctx = PassContext::from_seed(6);
        run(&mut arena, root, &mut ctx);

        let value = arena.node(var).node("value").unwrap();
        assert_eq!(arena.node(value).kind, NodeKind::Literal);
    }
}
