//! Typed constructors for synthetic nodes. Every pass that introduces new code -- control-flow
//! flattening's dispatcher, opaque constants' Bezout expressions, opaque
//! predicates' guards, data-flow obfuscation's accessor functions -- goes
//! through this module rather than hand-assembling `Node`s, so precedence
//! and field-shape invariants are enforced in one place.

use num_bigint::BigUint;
use num_traits::Zero;

use crate::arena::Arena;
use crate::ids::NodeId;
use crate::kind::NodeKind;
use crate::precedence::{needs_left_parens, needs_right_parens, precedence};
use crate::span::SourceSpan;

fn alloc(arena: &mut Arena, kind: NodeKind) -> NodeId {
    arena.alloc(kind, SourceSpan::SYNTHETIC)
}

/// `Identifier` referencing `name`.
pub fn sym(arena: &mut Arena, name: impl Into<String>) -> NodeId {
    let id = alloc(arena, NodeKind::Identifier);
    arena.set_field(id, "name", name.into());
    id
}

/// Number literal for `value`. Mirrors the original's lexical convention:
/// values above 255 render in hex, smaller values in decimal, matching what
/// solc itself emits for `hexValue`/`value` on number literals.
pub fn num(arena: &mut Arena, value: &BigUint) -> NodeId {
    let id = alloc(arena, NodeKind::Literal);
    arena.set_field(id, "kind", "number");
    arena.set_field(id, "hexValue", format!("{:x}", value));
    let decimal_threshold = BigUint::from(255u32);
    let rendered = if *value > decimal_threshold { format!("0x{:x}", value) } else { value.to_string() };
    arena.set_field(id, "value", rendered);
    id
}

pub fn num_u64(arena: &mut Arena, value: u64) -> NodeId {
    num(arena, &BigUint::from(value))
}

pub fn bool_literal(arena: &mut Arena, value: bool) -> NodeId {
    let id = alloc(arena, NodeKind::Literal);
    arena.set_field(id, "kind", "bool");
    arena.set_field(id, "value", if value { "true" } else { "false" });
    id
}

/// Wraps `expr` in a single-element `TupleExpression`, which the source
/// builder renders as parenthesization.
pub fn paren(arena: &mut Arena, expr: NodeId) -> NodeId {
    let id = alloc(arena, NodeKind::TupleExpression);
    arena.set_field(id, "components", vec![expr]);
    id
}

fn operator_of(arena: &Arena, id: NodeId) -> Option<String> {
    let node = arena.node(id);
    if node.kind != NodeKind::BinaryOperation {
        return None;
    }
    node.str_attr("operator").map(str::to_string)
}

fn wrap_if(arena: &mut Arena, operand: NodeId, should_wrap: bool) -> NodeId {
    if should_wrap {
        paren(arena, operand)
    } else {
        operand
    }
}

/// `BinaryOperation` with precedence-aware parenthesization of operands: a
/// left operand wraps when its own operator binds strictly looser, a right
/// operand wraps when its own binds looser-or-equal.
pub fn bop(arena: &mut Arena, operator: &str, left: NodeId, right: NodeId) -> NodeId {
    let context = precedence(operator);
    let left_wrap = operator_of(arena, left).is_some_and(|op| needs_left_parens(context, precedence(&op)));
    let right_wrap = operator_of(arena, right).is_some_and(|op| needs_right_parens(context, precedence(&op)));
    let left = wrap_if(arena, left, left_wrap);
    let right = wrap_if(arena, right, right_wrap);

    let id = alloc(arena, NodeKind::BinaryOperation);
    arena.set_field(id, "operator", operator.to_string());
    arena.set_field(id, "leftExpression", left);
    arena.set_field(id, "rightExpression", right);
    id
}

/// `UnaryOperation`. Negation, logical-not, and bitwise-not always wrap a
/// `BinaryOperation` operand regardless of its precedence.
pub fn uop(arena: &mut Arena, operator: &str, sub_expr: NodeId) -> NodeId {
    let should_wrap = arena.node(sub_expr).kind == NodeKind::BinaryOperation;
    let sub_expr = wrap_if(arena, sub_expr, should_wrap);

    let id = alloc(arena, NodeKind::UnaryOperation);
    arena.set_field(id, "operator", operator.to_string());
    arena.set_field(id, "prefix", true);
    arena.set_field(id, "subExpression", sub_expr);
    id
}

macro_rules! binary_op_helper {
    ($name:ident, $op:literal) => {
        pub fn $name(arena: &mut Arena, left: NodeId, right: NodeId) -> NodeId {
            bop(arena, $op, left, right)
        }
    };
}

binary_op_helper!(add, "+");
binary_op_helper!(sub, "-");
binary_op_helper!(mul, "*");
binary_op_helper!(bitand, "&");
binary_op_helper!(bitor, "|");
binary_op_helper!(bitxor, "^");
binary_op_helper!(modulo, "%");
binary_op_helper!(shl, "<<");
binary_op_helper!(shr, ">>");
binary_op_helper!(eq, "==");
binary_op_helper!(ne, "!=");
binary_op_helper!(le, "<=");
binary_op_helper!(ge, ">=");
binary_op_helper!(lt, "<");
binary_op_helper!(gt, ">");
binary_op_helper!(land, "&&");
binary_op_helper!(lor, "||");

pub fn bitnot(arena: &mut Arena, sub: NodeId) -> NodeId {
    uop(arena, "~", sub)
}

pub fn neg(arena: &mut Arena, sub: NodeId) -> NodeId {
    uop(arena, "-", sub)
}

pub fn lnot(arena: &mut Arena, sub: NodeId) -> NodeId {
    uop(arena, "!", sub)
}

/// Bare `ElementaryTypeName`, e.g. `uint256`.
pub fn etype(arena: &mut Arena, name: impl Into<String>) -> NodeId {
    let id = alloc(arena, NodeKind::ElementaryTypeName);
    arena.set_field(id, "name", name.into());
    id
}

/// `ElementaryTypeNameExpression`, the `uint256(...)`-style conversion head.
pub fn etypexpr(arena: &mut Arena, name: impl Into<String>) -> NodeId {
    let name = name.into();
    let type_name = etype(arena, name);
    let id = alloc(arena, NodeKind::ElementaryTypeNameExpression);
    arena.set_field(id, "typeName", type_name);
    id
}

/// An explicit type-conversion call, e.g. `uint256(x)`.
pub fn etypeconv(arena: &mut Arena, type_name: impl Into<String>, expr: NodeId) -> NodeId {
    let callee = etypexpr(arena, type_name);
    let id = alloc(arena, NodeKind::FunctionCall);
    arena.set_field(id, "expression", callee);
    arena.set_field(id, "arguments", vec![expr]);
    arena.set_field(id, "names", serde_json::Value::Array(Vec::new()));
    id
}

/// A call to the identifier `name` with positional `args`.
pub fn funcall(arena: &mut Arena, name: impl Into<String>, args: Vec<NodeId>) -> NodeId {
    let callee = sym(arena, name);
    let id = alloc(arena, NodeKind::FunctionCall);
    arena.set_field(id, "expression", callee);
    arena.set_field(id, "arguments", args);
    arena.set_field(id, "names", serde_json::Value::Array(Vec::new()));
    id
}

pub fn exprstmt(arena: &mut Arena, expr: NodeId) -> NodeId {
    let id = alloc(arena, NodeKind::ExpressionStatement);
    arena.set_field(id, "expression", expr);
    id
}

/// `VariableDeclaration` for `name` of elementary type `etype_name`, with an
/// optional initializer. Used both as a local/state declaration and, with no
/// `storageLocation` meaning for the target context, as a parameter-list
/// entry or struct member -- the source builder chooses the right rendering
/// from the declaration's parent kind.
pub fn var(arena: &mut Arena, name: impl Into<String>, value: Option<NodeId>, const_: bool, etype_name: &str) -> NodeId {
    let type_name = etype(arena, etype_name);
    let id = alloc(arena, NodeKind::VariableDeclaration);
    arena.set_field(id, "typeName", type_name);
    arena.set_field(id, "constant", const_);
    arena.set_field(id, "storageLocation", "default");
    arena.set_field(id, "name", name.into());
    if let Some(value) = value {
        arena.set_field(id, "value", value);
    }
    id
}

/// Alias for [`var`] used where a declaration sits in a `ParameterList` or
/// return-parameter list, matching the distinct builder name the passes use
/// at those call sites even though the produced shape is identical -- the
/// source builder, not the builder function, is what varies the rendering.
pub fn vardec(arena: &mut Arena, name: impl Into<String>, value: Option<NodeId>, etype_name: &str) -> NodeId {
    var(arena, name, value, false, etype_name)
}

/// State-variable array declaration with an inline-array initializer, e.g.
/// `uint256[] private _xyz = [1, 2, 3];`. Not present verbatim in the
/// reference implementation's retrieved sources (its `ARRDEC` helper's body
/// was not recovered); built here the way [`var`] builds a scalar
/// declaration, with the array shape following solc's own
/// `ArrayTypeName`/inline-array-`TupleExpression` encoding.
pub fn arrdec(arena: &mut Arena, name: impl Into<String>, values: Vec<NodeId>, etype_name: &str) -> NodeId {
    let base_type = etype(arena, etype_name);
    let array_type = alloc(arena, NodeKind::ArrayTypeName);
    arena.set_field(array_type, "baseType", base_type);

    let initializer = alloc(arena, NodeKind::TupleExpression);
    arena.set_field(initializer, "isInlineArray", true);
    arena.set_field(initializer, "components", values);

    let id = alloc(arena, NodeKind::VariableDeclaration);
    arena.set_field(id, "typeName", array_type);
    arena.set_field(id, "constant", false);
    arena.set_field(id, "visibility", "private");
    arena.set_field(id, "storageLocation", "default");
    arena.set_field(id, "name", name.into());
    arena.set_field(id, "value", initializer);
    id
}

/// Local `<etype> <name> = <value>;` declaration statement, e.g. the fresh
/// `int x = <random>;` CFF/OPREDIC prepend to a function body.
pub fn evar(arena: &mut Arena, etype_name: &str, name: impl Into<String>, value: NodeId) -> NodeId {
    let decl = var(arena, name, None, false, etype_name);
    let id = alloc(arena, NodeKind::VariableDeclarationStatement);
    arena.set_field(id, "declarations", vec![decl]);
    arena.set_field(id, "initialValue", value);
    id
}

/// Alias for [`evar`] used at OPREDIC's anchor-declaration call sites
/// (`int x = <random>; int y = <random>;`).
pub fn varstmt(arena: &mut Arena, etype_name: &str, name: impl Into<String>, value: NodeId) -> NodeId {
    evar(arena, etype_name, name, value)
}

/// `lhs = rhs;`-style `Assignment` expression (not itself a statement --
/// wrap with [`exprstmt`] when used as one).
pub fn assign(arena: &mut Arena, lhs: NodeId, rhs: NodeId) -> NodeId {
    let id = alloc(arena, NodeKind::Assignment);
    arena.set_field(id, "operator", "=");
    arena.set_field(id, "leftHandSide", lhs);
    arena.set_field(id, "rightHandSide", rhs);
    id
}

/// String literal, e.g. for DFO's lifted `string` pool entries.
pub fn str_literal(arena: &mut Arena, value: impl Into<String>) -> NodeId {
    let id = alloc(arena, NodeKind::Literal);
    arena.set_field(id, "kind", "string");
    arena.set_field(id, "value", value.into());
    id
}

/// `base[index]`, or bare `base[]` when `index` is `None`.
pub fn index_access(arena: &mut Arena, base: NodeId, index: Option<NodeId>) -> NodeId {
    let id = alloc(arena, NodeKind::IndexAccess);
    arena.set_field(id, "baseExpression", base);
    if let Some(index) = index {
        arena.set_field(id, "indexExpression", index);
    }
    id
}

/// `return <expr>;`, or bare `return;` when `expr` is `None`.
pub fn return_stmt(arena: &mut Arena, expr: Option<NodeId>) -> NodeId {
    let id = alloc(arena, NodeKind::Return);
    if let Some(expr) = expr {
        arena.set_field(id, "expression", expr);
    }
    id
}

/// `ParameterList` wrapping `params` (each itself built by [`var`]/[`vardec`]).
pub fn parameter_list(arena: &mut Arena, params: Vec<NodeId>) -> NodeId {
    let id = alloc(arena, NodeKind::ParameterList);
    arena.set_field(id, "parameters", params);
    id
}

/// A free-standing `function` definition, e.g. DFO's per-pool accessor:
/// `function <name>(uint256 <idx>) internal view returns (<etype>) { return
/// _pool[<idx>]; }`. Not present verbatim in the reference implementation's
/// retrieved sources (its `FunctionDefinition(...)` call site survived but
/// the constructor's defaults did not); built here following the same
/// field set the call site passes.
#[allow(clippy::too_many_arguments)]
pub fn function_def(
    arena: &mut Arena,
    name: impl Into<String>,
    parameters: NodeId,
    visibility: &str,
    state_mutability: &str,
    return_parameters: NodeId,
    body: Option<NodeId>,
) -> NodeId {
    let id = alloc(arena, NodeKind::FunctionDefinition);
    arena.set_field(id, "kind", "function");
    arena.set_field(id, "name", name.into());
    arena.set_field(id, "parameters", parameters);
    arena.set_field(id, "visibility", visibility.to_string());
    arena.set_field(id, "stateMutability", state_mutability.to_string());
    arena.set_field(id, "modifiers", Vec::<NodeId>::new());
    arena.set_field(id, "virtual", false);
    arena.set_field(id, "returnParameters", return_parameters);
    if let Some(body) = body {
        arena.set_field(id, "body", body);
    }
    id
}

pub fn block(arena: &mut Arena, statements: Vec<NodeId>) -> NodeId {
    let id = alloc(arena, NodeKind::Block);
    arena.set_field(id, "statements", statements);
    id
}

pub fn for_stmt(
    arena: &mut Arena,
    init: Option<NodeId>,
    cond: Option<NodeId>,
    loop_expr: Option<NodeId>,
    body: NodeId,
) -> NodeId {
    let id = alloc(arena, NodeKind::ForStatement);
    if let Some(init) = init {
        arena.set_field(id, "initializationExpression", init);
    }
    if let Some(cond) = cond {
        arena.set_field(id, "condition", cond);
    }
    if let Some(loop_expr) = loop_expr {
        arena.set_field(id, "loopExpression", loop_expr);
    }
    arena.set_field(id, "body", body);
    id
}

pub fn if_stmt(arena: &mut Arena, cond: NodeId, true_body: NodeId, false_body: Option<NodeId>) -> NodeId {
    let id = alloc(arena, NodeKind::IfStatement);
    arena.set_field(id, "condition", cond);
    arena.set_field(id, "trueBody", true_body);
    if let Some(false_body) = false_body {
        arena.set_field(id, "falseBody", false_body);
    }
    id
}

pub fn while_stmt(arena: &mut Arena, cond: NodeId, body: NodeId) -> NodeId {
    let id = alloc(arena, NodeKind::WhileStatement);
    arena.set_field(id, "condition", cond);
    arena.set_field(id, "body", body);
    id
}

pub fn do_while_stmt(arena: &mut Arena, cond: NodeId, body: NodeId) -> NodeId {
    let id = alloc(arena, NodeKind::DoWhileStatement);
    arena.set_field(id, "condition", cond);
    arena.set_field(id, "body", body);
    id
}

pub fn continue_stmt(arena: &mut Arena) -> NodeId {
    alloc(arena, NodeKind::Continue)
}

pub fn break_stmt(arena: &mut Arena) -> NodeId {
    alloc(arena, NodeKind::Break)
}

/// Zero as a `BigUint`, for callers that need a concrete zero literal
/// without importing `num-bigint` themselves.
pub fn zero() -> BigUint {
    BigUint::zero()
}
