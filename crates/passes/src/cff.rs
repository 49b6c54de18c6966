//! Control-flow flattening. For every function body present in
//! the source unit, builds a transient control-flow graph by breadth-first
//! segmentation of the statement list, then lowers the graph into a single
//! `while (state != end_state) { if (state == ...) { ...; continue; } ... }`
//! dispatcher, matching `solo/plugins/controlFlowFlatten.py`'s `CFG.gen_cfg`
//! and `run`.

use std::collections::{HashSet, VecDeque};

use indexmap::IndexMap;
use num_bigint::BigUint;
use solobf_ast::{builders, Arena, NodeId, NodeKind};

use crate::error::{PassError, PassResult};
use crate::rng::PassContext;

/// One arc of the flattened dispatch: `state`'s straight-line `body` runs,
/// then control goes to `next_state` -- or, if `cond` is present, to
/// `jump_state` when `cond` is truthy.
struct CffBlock {
    next_state: u128,
    body: Vec<NodeId>,
    cond: Option<NodeId>,
    jump_state: Option<u128>,
}

struct Cfg {
    init_state: u128,
    end_state: u128,
    states: HashSet<u128>,
    blocks: IndexMap<u128, CffBlock>,
}

impl Cfg {
    fn new(ctx: &mut PassContext) -> Cfg {
        let mut cfg = Cfg { init_state: 0, end_state: 0, states: HashSet::new(), blocks: IndexMap::new() };
        cfg.init_state = cfg.gen_state(ctx);
        cfg.end_state = cfg.gen_state(ctx);
        cfg
    }

    /// Distinct within this CFG: resample on collision.
    fn gen_state(&mut self, ctx: &mut PassContext) -> u128 {
        loop {
            let candidate = ctx.random_state();
            if self.states.insert(candidate) {
                return candidate;
            }
        }
    }

    fn add_bb(
        &mut self,
        state: u128,
        next_state: u128,
        body: Vec<NodeId>,
        cond: Option<NodeId>,
        jump_state: Option<u128>,
    ) -> PassResult<()> {
        if self.blocks.contains_key(&state) {
            return Err(PassError::ConflictingState);
        }
        self.blocks.insert(state, CffBlock { next_state, body, cond, jump_state });
        Ok(())
    }
}

/// A pending unit of BFS work: a run of statements still to classify, the
/// state its basic block will dispatch on, the state normal fall-through
/// reaches, and the enclosing loop's `continue`/`break` targets (`None`
/// outside any loop).
struct Segment {
    state: u128,
    next_state: u128,
    body: Vec<NodeId>,
    continue_at: Option<u128>,
    break_to: Option<u128>,
}

fn is_branch(kind: &NodeKind) -> bool {
    matches!(kind, NodeKind::IfStatement | NodeKind::ForStatement | NodeKind::WhileStatement | NodeKind::DoWhileStatement)
}

/// The semantic statement list of a statement-or-block node: a `Block`'s
/// `statements`, or the single statement itself for a brace-less body
/// (`if (c) x = 1;` has a bare `ExpressionStatement` as `trueBody`).
fn stmt_list(arena: &Arena, id: NodeId) -> Vec<NodeId> {
    if arena.node(id).kind == NodeKind::Block {
        arena.node(id).node_list("statements").to_vec()
    } else {
        vec![id]
    }
}

/// Builds the CFG for one function body. `fallback_true` is a pre-allocated
/// synthetic boolean literal, spent on a conditionless `for(;;)` loop if one
/// is encountered; every other call here only needs shared access to the
/// arena, so the one `&mut Arena` borrow the caller holds is used just once,
/// up front, in `run`.
fn gen_cfg(arena: &Arena, ctx: &mut PassContext, body: Vec<NodeId>, fallback_true: NodeId) -> PassResult<Cfg> {
    let mut cfg = Cfg::new(ctx);
    let mut queue = VecDeque::from([Segment {
        state: cfg.init_state,
        next_state: cfg.end_state,
        body,
        continue_at: None,
        break_to: None,
    }]);

    while let Some(ss) = queue.pop_front() {
        let continue_at = ss.continue_at;
        let break_to = ss.break_to;
        let mut handled = false;

        for i in 0..ss.body.len() {
            let x = ss.body[i];
            let kind = arena.node(x).kind.clone();

            match kind {
                NodeKind::Continue => {
                    let target = continue_at.ok_or(PassError::ContinueOutsideLoop)?;
                    cfg.add_bb(ss.state, target, ss.body[..i].to_vec(), None, None)?;
                    handled = true;
                    break;
                }
                NodeKind::Break => {
                    let target = break_to.ok_or(PassError::BreakOutsideLoop)?;
                    cfg.add_bb(ss.state, target, ss.body[..i].to_vec(), None, None)?;
                    handled = true;
                    break;
                }
                ref k if is_branch(k) => {
                    let prefix = ss.body[..i].to_vec();
                    let final_state = if i == ss.body.len() - 1 {
                        ss.next_state
                    } else {
                        let fs = cfg.gen_state(ctx);
                        queue.push_back(Segment {
                            state: fs,
                            next_state: ss.next_state,
                            body: ss.body[i + 1..].to_vec(),
                            continue_at,
                            break_to,
                        });
                        fs
                    };

                    match k {
                        NodeKind::IfStatement => lower_if(
                            arena, &mut cfg, ctx, &mut queue, x, ss.state, prefix, final_state, continue_at, break_to,
                        )?,
                        NodeKind::ForStatement => lower_for(
                            arena, &mut cfg, ctx, &mut queue, x, ss.state, prefix, final_state, fallback_true,
                        )?,
                        NodeKind::WhileStatement => lower_while(
                            arena, &mut cfg, ctx, &mut queue, x, ss.state, prefix, final_state, false,
                        )?,
                        NodeKind::DoWhileStatement => lower_while(
                            arena, &mut cfg, ctx, &mut queue, x, ss.state, prefix, final_state, true,
                        )?,
                        _ => unreachable!(),
                    }

                    handled = true;
                    break;
                }
                _ => {}
            }
        }

        if !handled {
            cfg.add_bb(ss.state, ss.next_state, ss.body, None, None)?;
        }
    }

    Ok(cfg)
}

#[allow(clippy::too_many_arguments)]
fn lower_if(
    arena: &Arena,
    cfg: &mut Cfg,
    ctx: &mut PassContext,
    queue: &mut VecDeque<Segment>,
    if_node: NodeId,
    state: u128,
    prefix: Vec<NodeId>,
    final_state: u128,
    continue_at: Option<u128>,
    break_to: Option<u128>,
) -> PassResult<()> {
    let node = arena.node(if_node);
    let condition = node.expect_node("condition")?;
    let true_body = node.expect_node("trueBody")?;
    let true_stmts = stmt_list(arena, true_body);

    let true_state = if true_stmts.is_empty() {
        final_state
    } else {
        let ts = cfg.gen_state(ctx);
        queue.push_back(Segment { state: ts, next_state: final_state, body: true_stmts, continue_at, break_to });
        ts
    };

    let false_stmts = node.node("falseBody").map(|f| stmt_list(arena, f)).unwrap_or_default();
    let false_state = if false_stmts.is_empty() {
        final_state
    } else {
        let fs = cfg.gen_state(ctx);
        queue.push_back(Segment { state: fs, next_state: final_state, body: false_stmts, continue_at, break_to });
        fs
    };

    cfg.add_bb(state, false_state, prefix, Some(condition), Some(true_state))
}

#[allow(clippy::too_many_arguments)]
fn lower_for(
    arena: &Arena,
    cfg: &mut Cfg,
    ctx: &mut PassContext,
    queue: &mut VecDeque<Segment>,
    for_node: NodeId,
    state: u128,
    prefix: Vec<NodeId>,
    final_state: u128,
    fallback_true: NodeId,
) -> PassResult<()> {
    let node = arena.node(for_node);
    let init = node.node("initializationExpression");
    let cond = node.node("condition").or(Some(fallback_true));
    let loop_expr = node.node("loopExpression");
    let body = node.expect_node("body")?;
    let body_stmts = stmt_list(arena, body);

    let cond_state = cfg.gen_state(ctx);
    let loop_state = cfg.gen_state(ctx);
    let true_state = cfg.gen_state(ctx);

    // Matches the original's `StateSegment(body=[*x.body, x.loopExpression],
    // next_state=loop_state, ...)`: the loop expression both ends the body
    // segment and fronts the separate loop-increment block below, so it runs
    // twice per iteration in the non-`continue` path. Replicated faithfully
    // rather than "fixed" -- it is the reference tool's own CFF behavior.
    let mut true_body = body_stmts;
    if let Some(le) = loop_expr {
        true_body.push(le);
    }
    queue.push_back(Segment {
        state: true_state,
        next_state: loop_state,
        body: true_body,
        continue_at: Some(loop_state),
        break_to: Some(final_state),
    });

    let mut entry_body = prefix;
    if let Some(init) = init {
        entry_body.push(init);
    }
    cfg.add_bb(state, cond_state, entry_body, None, None)?;
    cfg.add_bb(cond_state, final_state, Vec::new(), cond, Some(true_state))?;

    let loop_body = match loop_expr {
        Some(le) => vec![le],
        None => Vec::new(),
    };
    cfg.add_bb(loop_state, cond_state, loop_body, None, None)
}

#[allow(clippy::too_many_arguments)]
fn lower_while(
    arena: &Arena,
    cfg: &mut Cfg,
    ctx: &mut PassContext,
    queue: &mut VecDeque<Segment>,
    while_node: NodeId,
    state: u128,
    prefix: Vec<NodeId>,
    final_state: u128,
    is_do_while: bool,
) -> PassResult<()> {
    let node = arena.node(while_node);
    let condition = node.expect_node("condition")?;
    let body = node.expect_node("body")?;
    let body_stmts = stmt_list(arena, body);

    let cond_state = cfg.gen_state(ctx);
    let true_state = if body_stmts.is_empty() {
        cond_state
    } else {
        let ts = cfg.gen_state(ctx);
        queue.push_back(Segment {
            state: ts,
            next_state: cond_state,
            body: body_stmts,
            continue_at: Some(cond_state),
            break_to: Some(final_state),
        });
        ts
    };

    if is_do_while {
        cfg.add_bb(state, true_state, prefix, None, None)?;
    } else {
        cfg.add_bb(state, cond_state, prefix, None, None)?;
    }

    cfg.add_bb(cond_state, final_state, Vec::new(), Some(condition), Some(true_state))
}

fn num128(arena: &mut Arena, value: u128) -> NodeId {
    builders::num(arena, &BigUint::from(value))
}

/// Every `FunctionDefinition` (free function, contract method, constructor)
/// in `root` that carries a `body`.
fn function_bodies(arena: &Arena, root: NodeId) -> Vec<(NodeId, NodeId)> {
    arena
        .bfs(root)
        .filter(|&id| arena.node(id).kind == NodeKind::FunctionDefinition)
        .filter_map(|id| arena.node(id).node("body").map(|body| (id, body)))
        .collect()
}

/// Flattens every function body under `root`, returning the (unchanged)
/// root id.
pub fn run(arena: &mut Arena, root: NodeId, ctx: &mut PassContext) -> PassResult<NodeId> {
    for (func_id, body_id) in function_bodies(arena, root) {
        tracing::debug!(function = %func_id, "flattening control flow");

        let statements = arena.node(body_id).node_list("statements").to_vec();
        let fallback_true = builders::bool_literal(arena, true);
        let cfg = gen_cfg(arena, ctx, statements, fallback_true)?;

        let state_name = ctx.random_name(16);
        let state_decl = {
            let init_lit = num128(arena, cfg.init_state);
            builders::evar(arena, "uint", state_name.clone(), init_lit)
        };

        let mut switch_body = Vec::with_capacity(cfg.blocks.len());
        for (&state, bb) in cfg.blocks.iter() {
            if state == cfg.end_state {
                continue;
            }

            let mut case_body = bb.body.clone();

            let state_update = match (bb.cond, bb.jump_state) {
                (Some(cond), Some(jump_state)) => {
                    let true_val = num128(arena, jump_state);
                    let false_val = num128(arena, bb.next_state);
                    let true_assign = builders::exprstmt(arena, builders::assign(arena, builders::sym(arena, state_name.clone()), true_val));
                    let false_assign = builders::exprstmt(arena, builders::assign(arena, builders::sym(arena, state_name.clone()), false_val));
                    builders::if_stmt(arena, cond, true_assign, Some(false_assign))
                }
                _ => {
                    let next_val = num128(arena, bb.next_state);
                    builders::exprstmt(arena, builders::assign(arena, builders::sym(arena, state_name.clone()), next_val))
                }
            };
            case_body.push(state_update);
            case_body.push(builders::continue_stmt(arena));

            let case_block = builders::block(arena, case_body);
            let case_cond = {
                let lhs = builders::sym(arena, state_name.clone());
                let rhs = num128(arena, state);
                builders::eq(arena, lhs, rhs)
            };
            switch_body.push(builders::if_stmt(arena, case_cond, case_block, None));
        }

        let exit_cond = {
            let lhs = builders::sym(arena, state_name.clone());
            let rhs = num128(arena, cfg.end_state);
            builders::ne(arena, lhs, rhs)
        };
        let while_body = builders::block(arena, switch_body);
        let while_stmt = builders::while_stmt(arena, exit_cond, while_body);

        arena.set_field(body_id, "statements", vec![state_decl, while_stmt]);
    }

    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use solobf_ast::{builders, NodeKind, SourceSpan};

    fn simple_if_function(arena: &mut Arena) -> (NodeId, NodeId) {
        let cond = builders::eq(arena, builders::sym(arena, "msg_sender"), builders::num_u64(arena, 0));
        let revert_call = builders::funcall(arena, "revert", vec![]);
        let revert_stmt = builders::exprstmt(arena, revert_call);
        let true_block = builders::block(arena, vec![revert_stmt]);
        let if_stmt = builders::if_stmt(arena, cond, true_block, None);
        let body = builders::block(arena, vec![if_stmt]);

        let params = builders::parameter_list(arena, vec![]);
        let returns = builders::parameter_list(arena, vec![]);
        let func = builders::function_def(arena, "f", params, "public", "nonpayable", returns, Some(body));
        (func, body)
    }

    #[test]
    fn flattens_a_single_if_into_one_while_loop() {
        let mut arena = Arena::new();
        let (func, _body) = simple_if_function(&mut arena);
        let contract = arena.alloc(NodeKind::ContractDefinition, SourceSpan::SYNTHETIC);
        arena.set_field(contract, "name", "A");
        arena.set_field(contract, "nodes", vec![func]);
        let root = arena.alloc(NodeKind::SourceUnit, SourceSpan::SYNTHETIC);
        arena.set_field(root, "nodes", vec![contract]);

        let mut ctx = PassContext::from_seed(1);
        run(&mut arena, root, &mut ctx).unwrap();

        let new_body = arena.node(func).node("body").unwrap();
        let statements = arena.node(new_body).node_list("statements");
        assert_eq!(statements.len(), 2);
        assert_eq!(arena.node(statements[0]).kind, NodeKind::VariableDeclarationStatement);
        assert_eq!(arena.node(statements[1]).kind, NodeKind::WhileStatement);

        let while_body = arena.node(statements[1]).node("body").unwrap();
        let cases = arena.node(while_body).node_list("statements");
        // entry block + true-branch block + merge block == 3 dispatch cases
        assert_eq!(cases.len(), 3);
        for &case in cases {
            assert_eq!(arena.node(case).kind, NodeKind::IfStatement);
        }
    }

    #[test]
    fn continue_outside_a_loop_is_a_structural_error() {
        let mut arena = Arena::new();
        let continue_stmt = builders::continue_stmt(&mut arena);
        let body = builders::block(&mut arena, vec![continue_stmt]);
        let params = builders::parameter_list(&mut arena, vec![]);
        let returns = builders::parameter_list(&mut arena, vec![]);
        let func = builders::function_def(&mut arena, "f", params, "public", "nonpayable", returns, Some(body));
        let root = arena.alloc(NodeKind::SourceUnit, SourceSpan::SYNTHETIC);
        arena.set_field(root, "nodes", vec![func]);

        let mut ctx = PassContext::from_seed(2);
        let err = run(&mut arena, root, &mut ctx).unwrap_err();
        assert!(matches!(err, PassError::ContinueOutsideLoop));
    }
}
