//! Binary-operator precedence table and the parenthesization rule builders
//! use when they synthesize expressions. solc's own AST already carries
//! source-accurate grouping for existing code; this table
//! only matters for nodes we construct from scratch.

/// Binds tighter as the number gets smaller. Indices follow Solidity's
/// grammar precedence levels, not C's.
pub fn precedence(operator: &str) -> u8 {
    match operator {
        "**" => 3,
        "*" | "/" | "%" => 4,
        "+" | "-" => 5,
        "<<" | ">>" | ">>>" => 6,
        "&" => 7,
        "^" => 8,
        "|" => 9,
        "<" | ">" | "<=" | ">=" => 10,
        "==" | "!=" => 11,
        "&&" => 12,
        "||" => 13,
        other => panic!("precedence: unknown binary operator `{other}`"),
    }
}

/// A left operand is wrapped when its own operator binds strictly looser
/// than `context` (a greater precedence number).
pub fn needs_left_parens(context: u8, operand_operator: u8) -> bool {
    operand_operator > context
}

/// A right operand is wrapped when its own operator binds looser than or
/// equal to `context`, to stay correct under left-associativity.
pub fn needs_right_parens(context: u8, operand_operator: u8) -> bool {
    operand_operator >= context
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_solidity_grammar_levels() {
        assert_eq!(precedence("**"), 3);
        assert_eq!(precedence("*"), precedence("/"));
        assert_eq!(precedence("/"), precedence("%"));
        assert_eq!(precedence("+"), precedence("-"));
        assert!(precedence("*") < precedence("+"));
        assert!(precedence("+") < precedence("<<"));
        assert!(precedence("<<") < precedence("&"));
        assert!(precedence("&") < precedence("^"));
        assert!(precedence("^") < precedence("|"));
        assert!(precedence("|") < precedence("<"));
        assert!(precedence("<") < precedence("=="));
        assert!(precedence("==") < precedence("&&"));
        assert!(precedence("&&") < precedence("||"));
    }

    #[test]
    #[should_panic(expected = "unknown binary operator")]
    fn unknown_operator_panics() {
        precedence("@@");
    }

    #[test]
    fn additive_left_operand_of_multiplication_wraps() {
        // (a+b)*c: '+' (5) is looser than '*' (4), so the left side wraps.
        let context = precedence("*");
        assert!(needs_left_parens(context, precedence("+")));
    }

    #[test]
    fn same_precedence_left_operand_does_not_wrap() {
        // a-b+c stays unparenthesized on the left: same precedence level,
        // left-associative, so the existing left-to-right grouping is safe.
        let context = precedence("+");
        assert!(!needs_left_parens(context, precedence("-")));
    }

    #[test]
    fn same_precedence_right_operand_wraps_for_left_associativity() {
        // a-(b-c) must stay parenthesized: folding it to a-b-c would change
        // the result under left-associative evaluation.
        let context = precedence("-");
        assert!(needs_right_parens(context, precedence("-")));
    }

    #[test]
    fn tighter_right_operand_does_not_wrap() {
        // a+b*c: '*' (4) binds tighter than '+' (5), so the right side is safe bare.
        let context = precedence("+");
        assert!(!needs_right_parens(context, precedence("*")));
    }
}
