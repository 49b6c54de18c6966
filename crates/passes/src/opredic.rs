//! Opaque predicates, grounded in `solo/plugins/opredic.py`.
//! Wraps every function/modifier body in `if (always_false) { junk } else {
//! original_statements }`, guarded by one of a small pool of predicates that
//! are always false but not obviously so from the guard's shape alone.

use std::collections::VecDeque;

use rand::Rng;
use solobf_ast::{builders, Arena, NodeId, NodeKind};

use crate::rng::PassContext;

/// Pool of predicates that are always false for any `x`, `y`, mirroring the
/// reference's `OPAQUE_FALSE` tuple. Each reads as a plausible runtime
/// check; none can ever hold.
fn opaque_false(arena: &mut Arena, index: u8, x_name: &str, y_name: &str) -> NodeId {
    match index {
        // (x-y)^2 != x^2 - 2xy + y^2 -- always false, it's the binomial identity.
        0 => {
            let diff1 = builders::sub(arena, builders::sym(arena, x_name), builders::sym(arena, y_name));
            let diff2 = builders::sub(arena, builders::sym(arena, x_name), builders::sym(arena, y_name));
            let squared_diff = builders::mul(arena, diff1, diff2);

            let xx = builders::mul(arena, builders::sym(arena, x_name), builders::sym(arena, x_name));
            let two_xy = builders::mul(
                arena,
                builders::mul(arena, builders::num_u64(arena, 2), builders::sym(arena, x_name)),
                builders::sym(arena, y_name),
            );
            let yy = builders::mul(arena, builders::sym(arena, y_name), builders::sym(arena, y_name));
            let expanded = builders::add(arena, builders::sub(arena, xx, two_xy), yy);

            builders::ne(arena, squared_diff, expanded)
        }
        // x % 2 == 0 && x % 2 == 1 -- contradiction.
        1 => {
            let x_mod_2a = builders::modulo(arena, builders::sym(arena, x_name), builders::num_u64(arena, 2));
            let even = builders::eq(arena, x_mod_2a, builders::num_u64(arena, 0));
            let x_mod_2b = builders::modulo(arena, builders::sym(arena, x_name), builders::num_u64(arena, 2));
            let odd = builders::eq(arena, x_mod_2b, builders::num_u64(arena, 1));
            builders::land(arena, even, odd)
        }
        // x >= y && x < y -- contradiction.
        _ => {
            let ge = builders::ge(arena, builders::sym(arena, x_name), builders::sym(arena, y_name));
            let lt = builders::lt(arena, builders::sym(arena, x_name), builders::sym(arena, y_name));
            builders::land(arena, ge, lt)
        }
    }
}

/// `length` `require(<fresh random> == <same random>);` statements, each
/// trivially true so the dead branch still typechecks and "does something",
/// matching the reference's `garbage_code`.
fn garbage_code(arena: &mut Arena, ctx: &mut PassContext, length: usize) -> NodeId {
    let mut statements = Vec::with_capacity(length);
    for _ in 0..length {
        let value = ctx.random_number(128);
        let lhs = builders::num(arena, &value);
        let rhs = builders::num(arena, &value);
        let cond = builders::eq(arena, lhs, rhs);
        let call = builders::funcall(arena, "require", vec![cond]);
        statements.push(builders::exprstmt(arena, call));
    }
    builders::block(arena, statements)
}

/// Rewrites every function/modifier body under `root`, wrapping each in an
/// opaque-false guard with a dead junk branch. `junk_statement_count` is the
/// number of `require` statements generated per guarded dead branch
/// (default 4, configurable via `--junk-count`).
pub fn run(arena: &mut Arena, root: NodeId, ctx: &mut PassContext, junk_statement_count: usize) -> NodeId {
    let mut queue = VecDeque::from([root]);

    while let Some(n) = queue.pop_front() {
        let kind = arena.node(n).kind.clone();
        match kind {
            NodeKind::FunctionDefinition | NodeKind::ModifierDefinition => {
                let Some(body_id) = arena.node(n).node("body") else { continue };
                tracing::debug!(node = %n, "inserting opaque predicate guard");

                let x = ctx.random_number(128);
                let y = ctx.random_number(128);
                let x_name = ctx.random_name(16);
                let y_name = ctx.random_name(16);

                let x_lit = builders::num(arena, &x);
                let y_lit = builders::num(arena, &y);
                let x_dec_stmt = builders::varstmt(arena, "int", x_name.clone(), x_lit);
                let y_dec_stmt = builders::varstmt(arena, "int", y_name.clone(), y_lit);

                let original_statements = arena.node(body_id).node_list("statements").to_vec();
                let false_body = builders::block(arena, original_statements);

                let predicate_index = ctx.inner().random_range(0..3u8);
                let cond = opaque_false(arena, predicate_index, &x_name, &y_name);
                let true_body = garbage_code(arena, ctx, junk_statement_count);
                let guard = builders::if_stmt(arena, cond, true_body, Some(false_body));

                arena.set_field(body_id, "statements", vec![x_dec_stmt, y_dec_stmt, guard]);
            }
            NodeKind::ContractDefinition | NodeKind::SourceUnit => {
                queue.extend(arena.node(n).body().to_vec());
            }
            _ => {}
        }
    }

    root
}

#[cfg(test)]
mod tests {
    use super::*;
    use solobf_ast::SourceSpan;

    fn empty_function(arena: &mut Arena) -> NodeId {
        let body = builders::block(arena, vec![]);
        let params = builders::parameter_list(arena, vec![]);
        let returns = builders::parameter_list(arena, vec![]);
        builders::function_def(arena, "f", params, "public", "nonpayable", returns, Some(body))
    }

    #[test]
    fn guards_a_function_body_with_a_dead_branch() {
        let mut arena = Arena::new();
        let func = empty_function(&mut arena);
        let contract = arena.alloc(NodeKind::ContractDefinition, SourceSpan::SYNTHETIC);
        arena.set_field(contract, "name", "A");
        arena.set_field(contract, "nodes", vec![func]);
        let root = arena.alloc(NodeKind::SourceUnit, SourceSpan::SYNTHETIC);
        arena.set_field(root, "nodes", vec![contract]);

        let mut ctx = PassContext::from_seed(9);
        run(&mut arena, root, &mut ctx, 4);

        let body = arena.node(func).node("body").unwrap();
        let statements = arena.node(body).node_list("statements").to_vec();
        assert_eq!(statements.len(), 3);
        assert_eq!(arena.node(statements[0]).kind, NodeKind::VariableDeclarationStatement);
        assert_eq!(arena.node(statements[1]).kind, NodeKind::VariableDeclarationStatement);
        assert_eq!(arena.node(statements[2]).kind, NodeKind::IfStatement);

        let guard = statements[2];
        let true_body = arena.node(guard).node("trueBody").unwrap();
        let junk = arena.node(true_body).node_list("statements");
        assert_eq!(junk.len(), 4);

        let false_body = arena.node(guard).node("falseBody").unwrap();
        assert!(arena.node(false_body).node_list("statements").is_empty());
    }

    #[test]
    fn does_not_descend_into_struct_or_event_members() {
        let mut arena = Arena::new();
        let unrelated = arena.alloc(NodeKind::StructDefinition, SourceSpan::SYNTHETIC);
        let contract = arena.alloc(NodeKind::ContractDefinition, SourceSpan::SYNTHETIC);
        arena.set_field(contract, "name", "A");
        arena.set_field(contract, "nodes", vec![unrelated]);
        let root = arena.alloc(NodeKind::SourceUnit, SourceSpan::SYNTHETIC);
        arena.set_field(root, "nodes", vec![contract]);

        let mut ctx = PassContext::from_seed(10);
        let out = run(&mut arena, root, &mut ctx, 4);
        assert_eq!(out, root);
    }
}
