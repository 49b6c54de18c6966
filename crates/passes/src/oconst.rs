//! Opaque constants, grounded in `solo/plugins/oconst.py`.
//! Draws one coprime pair `(x, y)` per source unit, inserts them as
//! file-level constants, then rewrites every literal solc folded to a
//! `t_rational_*_by_1` integer type into a Bezout-identity expression in `x`
//! and `y` that evaluates to the same bit pattern.

use std::collections::VecDeque;

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{Signed, Zero};
use rand::Rng;
use solobf_ast::{builders, Arena, NodeId, NodeKind};

use crate::rng::PassContext;

/// `m == 0` has no linear-combination solution, so it is represented by one
/// of two fixed bitwise identities instead (`solo/plugins/oconst.py`'s
/// `OPAQUE0` tuple). Add more here if the obfuscation needs to defend
/// against pattern-matching on these two shapes.
fn opaque_zero_xor_identity(arena: &mut Arena, x_name: &str, y_name: &str) -> NodeId {
    // x^y == x&~y | ~x&y
    let xor = builders::bitxor(arena, builders::sym(arena, x_name), builders::sym(arena, y_name));
    let not_y = builders::bitnot(arena, builders::sym(arena, y_name));
    let and1 = builders::bitand(arena, builders::sym(arena, x_name), not_y);
    let not_x = builders::bitnot(arena, builders::sym(arena, x_name));
    let and2 = builders::bitand(arena, not_x, builders::sym(arena, y_name));
    let or_ = builders::bitor(arena, and1, and2);
    builders::sub(arena, xor, or_)
}

fn opaque_zero_demorgan_identity(arena: &mut Arena, x_name: &str, y_name: &str) -> NodeId {
    // De Morgan's law: ~x|y == ~(x&~y)
    let not_x = builders::bitnot(arena, builders::sym(arena, x_name));
    let or_ = builders::bitor(arena, not_x, builders::sym(arena, y_name));
    let not_y = builders::bitnot(arena, builders::sym(arena, y_name));
    let and_ = builders::bitand(arena, builders::sym(arena, x_name), not_y);
    let not_and = builders::bitnot(arena, and_);
    builders::sub(arena, or_, not_and)
}

fn mask_biguint(bits: u32) -> BigUint {
    (BigUint::from(1u32) << bits) - BigUint::from(1u32)
}

/// Builds an expression in `x_name`/`y_name` whose value equals `m`, via
/// Bezout's identity (`x*a + y*b == gcd(x, y) == 1`, scaled by `m` and
/// blinded with a random multiple of the coprime pair). Assumes `x` and `y`
/// are positive and coprime.
fn opaque_int(
    arena: &mut Arena,
    ctx: &mut PassContext,
    m: &BigInt,
    x_name: &str,
    x: &BigUint,
    y_name: &str,
    y: &BigUint,
    bits: u32,
) -> NodeId {
    if m.is_zero() {
        return if ctx.inner().random_range(0..2u8) == 0 {
            opaque_zero_xor_identity(arena, x_name, y_name)
        } else {
            opaque_zero_demorgan_identity(arena, x_name, y_name)
        };
    }

    let x_i = BigInt::from(x.clone());
    let y_i = BigInt::from(y.clone());
    let egcd = x_i.extended_gcd(&y_i);
    let (mut a, mut b) = (egcd.x, egcd.y);

    // Normalize so a*x - b*y == 1 (sign true) or == -1 (sign false), matching
    // `oconst.py`'s sign bookkeeping around `gcdext`.
    let mut sign = true;
    if a.is_negative() && b.is_positive() {
        a = -a;
        sign = false;
    } else if a.is_positive() && b.is_negative() {
        b = -b;
    }

    let modulus = BigInt::from(1u32) << bits;
    let k = BigInt::from(ctx.random_number(bits));
    let aa = (m * &a + &k * &y_i).mod_floor(&modulus).to_biguint().expect("mod_floor is non-negative");
    let bb = (m * &b + &k * &x_i).mod_floor(&modulus).to_biguint().expect("mod_floor is non-negative");

    let term_a = builders::mul(arena, builders::num(arena, &aa), builders::sym(arena, x_name));
    let term_b = builders::mul(arena, builders::num(arena, &bb), builders::sym(arena, y_name));

    if sign {
        builders::sub(arena, term_a, term_b)
    } else {
        builders::sub(arena, term_b, term_a)
    }
}

/// Builds the opaque expression for a folded constant `value`, splitting
/// across the low/high 128-bit halves when it doesn't fit in one
/// [`opaque_int`] call: values wider than 127 bits split into two 128-bit
/// halves joined with a shift-and-or.
fn rational_value_expr(
    arena: &mut Arena,
    ctx: &mut PassContext,
    value: &BigInt,
    x_name: &str,
    x: &BigUint,
    y_name: &str,
    y: &BigUint,
) -> NodeId {
    let modulus128 = BigInt::from(1u32) << 128u32;
    let high = value.div_floor(&modulus128);
    let mask128 = mask_biguint(128);

    if high.is_zero() {
        let expr = opaque_int(arena, ctx, value, x_name, x, y_name, y, 128);
        builders::bitand(arena, expr, builders::num(arena, &mask128))
    } else if high == BigInt::from(-1) {
        let expr = opaque_int(arena, ctx, value, x_name, x, y_name, y, 128);
        let neg_one = builders::neg(arena, builders::num_u64(arena, 1));
        let shifted = builders::shl(arena, neg_one, builders::num_u64(arena, 128));
        builders::bitor(arena, expr, shifted)
    } else {
        let value_low = BigInt::from(value.mod_floor(&modulus128));
        let expr_low = opaque_int(arena, ctx, &value_low, x_name, x, y_name, y, 128);
        let expr_low = builders::bitand(arena, expr_low, builders::num(arena, &mask128));
        let expr_high = opaque_int(arena, ctx, &high, x_name, x, y_name, y, 128);
        let shifted_high = builders::shl(arena, expr_high, builders::num_u64(arena, 128));
        builders::bitor(arena, expr_low, shifted_high)
    }
}

/// Parses solc's `t_rational_[minus_]<numerator>_by_<denominator>` type
/// identifier, returning the signed numerator only when the denominator is
/// 1 (a folded integer literal). Fixed-point (`denominator != 1`) rational
/// constants are left untouched -- `opaque_fixed` in the reference is an
/// unimplemented stub, and this rework leaves the same gap rather than
/// inventing new semantics for it.
fn parse_folded_integer(type_identifier: &str) -> Option<BigInt> {
    let parts: Vec<&str> = type_identifier.split('_').collect();
    if parts.len() < 5 || parts[0] != "t" || parts[1] != "rational" {
        return None;
    }
    let denominator: i64 = parts.last()?.parse().ok()?;
    if denominator != 1 {
        return None;
    }
    let (magnitude_str, negative) =
        if parts[2] == "minus" { (*parts.get(3)?, true) } else { (parts[2], false) };
    let magnitude: BigInt = magnitude_str.parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

fn is_leading_directive(kind: &NodeKind) -> bool {
    matches!(kind, NodeKind::PragmaDirective)
        || matches!(kind, NodeKind::Unknown(tag) if tag == "ImportDirective" || tag == "UsingForDirective")
}

fn draw_coprime_pair(ctx: &mut PassContext) -> (BigUint, BigUint) {
    let x = ctx.random_number(128);
    loop {
        let y = ctx.random_number(128);
        if x.gcd(&y) == BigUint::from(1u32) {
            return (x, y);
        }
    }
}

/// Draws one opaque-constant anchor pair and rewrites every folded integer
/// literal under `root` into a Bezout-identity expression in them. A no-op
/// on anything other than a `SourceUnit` root, mirroring `oconst.py`'s own
/// top-level guard.
pub fn run(arena: &mut Arena, root: NodeId, ctx: &mut PassContext) -> NodeId {
    if arena.node(root).kind != NodeKind::SourceUnit {
        return root;
    }

    let (x, y) = draw_coprime_pair(ctx);
    let x_name = ctx.random_name(16);
    let y_name = ctx.random_name(16);
    tracing::debug!(x = %x_name, y = %y_name, "drew opaque-constant anchor pair");

    let x_lit = builders::num(arena, &x);
    let y_lit = builders::num(arena, &y);
    let x_dec = builders::var(arena, x_name.clone(), Some(x_lit), true, "uint256");
    let y_dec = builders::var(arena, y_name.clone(), Some(y_lit), true, "uint256");

    let top = arena.node(root).node_list("nodes").to_vec();
    let mut idx = 0;
    for &n in &top {
        if is_leading_directive(&arena.node(n).kind) {
            idx += 1;
        } else {
            break;
        }
    }
    // Matches the reference's two single-element inserts at the same index:
    // y_dec lands first, then x_dec is inserted in front of it.
    arena.insert_into_list(root, "nodes", idx, y_dec);
    arena.insert_into_list(root, "nodes", idx, x_dec);

    let mut queue = VecDeque::from([root]);
    while let Some(curr) = queue.pop_front() {
        for child in arena.children_of(curr) {
            let type_identifier = arena.node(child).type_identifier().map(str::to_string);
            if let Some(type_identifier) = type_identifier {
                if type_identifier.starts_with("t_rational") {
                    if let Some(value) = parse_folded_integer(&type_identifier) {
                        let expr = rational_value_expr(arena, ctx, &value, &x_name, &x, &y_name, &y);
                        let wrapped = builders::etypeconv(arena, "uint", expr);
                        arena.replace_with(child, wrapped);
                    }
                    continue;
                }
            }
            queue.push_back(child);
        }
    }

    root
}

#[cfg(test)]
mod tests {
    use super::*;
    use solobf_ast::SourceSpan;

    #[test]
    fn inserts_a_coprime_constant_pair_before_other_members() {
        let mut arena = Arena::new();
        let root = arena.alloc(NodeKind::SourceUnit, SourceSpan::SYNTHETIC);
        let contract = arena.alloc(NodeKind::ContractDefinition, SourceSpan::SYNTHETIC);
        arena.set_field(contract, "name", "A");
        arena.set_field(root, "nodes", vec![contract]);

        let mut ctx = PassContext::from_seed(3);
        let out = run(&mut arena, root, &mut ctx);
        assert_eq!(out, root);

        let top = arena.node(root).node_list("nodes").to_vec();
        assert_eq!(top.len(), 3);
        assert_eq!(arena.node(top[0]).kind, NodeKind::VariableDeclaration);
        assert_eq!(arena.node(top[1]).kind, NodeKind::VariableDeclaration);
        assert_eq!(top[2], contract);
    }

    #[test]
    fn replaces_a_folded_integer_literal_with_an_opaque_expression() {
        let mut arena = Arena::new();
        let root = arena.alloc(NodeKind::SourceUnit, SourceSpan::SYNTHETIC);
        let literal = arena.alloc(NodeKind::Literal, SourceSpan::SYNTHETIC);
        arena.set_field(literal, "kind", "number");
        arena.set_field(literal, "value", "5");
        arena.set_field(
            literal,
            "typeDescriptions",
            serde_json::json!({"typeIdentifier": "t_rational_5_by_1", "typeString": "int_const 5"}),
        );
        let contract = arena.alloc(NodeKind::ContractDefinition, SourceSpan::SYNTHETIC);
        arena.set_field(contract, "name", "A");
        arena.set_field(contract, "nodes", vec![literal]);
        arena.set_field(root, "nodes", vec![contract]);

        let mut ctx = PassContext::from_seed(4);
        run(&mut arena, root, &mut ctx);

        let contract_children = arena.node(contract).node_list("nodes").to_vec();
        assert_eq!(contract_children.len(), 1);
        assert_eq!(arena.node(contract_children[0]).kind, NodeKind::FunctionCall);
    }

    #[test]
    fn parses_both_positive_and_minus_rational_identifiers() {
        assert_eq!(parse_folded_integer("t_rational_5_by_1"), Some(BigInt::from(5)));
        assert_eq!(parse_folded_integer("t_rational_minus_7_by_1"), Some(BigInt::from(-7)));
        assert_eq!(parse_folded_integer("t_rational_1_by_3"), None);
    }
}
