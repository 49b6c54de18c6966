//! End-to-end single-pass scenarios, driven from hand-written solc
//! standard-output JSON fixtures (the real `solc` binary isn't assumed to be
//! installed wherever these tests run) through ingestion, a single pass, and
//! the source builder.

use solobf_ast::ingest::from_standard_output_str;
use solobf_ast::{Arena, SourceBuilder};
use solobf_passes::rng::PassContext;
use solobf_passes::{dfo, oconst, opredic};

const OCONST_FIXTURE: &str = r#"
{
  "sources": {
    "A.sol": {
      "ast": {
        "nodeType": "SourceUnit",
        "src": "0:1:0",
        "nodes": [
          { "nodeType": "PragmaDirective", "src": "0:1:0", "literals": ["solidity", "^0.8.0"] },
          {
            "nodeType": "ContractDefinition",
            "src": "0:1:0",
            "name": "A",
            "abstract": false,
            "contractKind": "contract",
            "baseContracts": [],
            "nodes": [
              {
                "nodeType": "VariableDeclaration",
                "src": "0:1:0",
                "name": "x",
                "constant": false,
                "storageLocation": "default",
                "visibility": "public",
                "mutability": "mutable",
                "typeName": { "nodeType": "ElementaryTypeName", "src": "0:1:0", "name": "uint256" },
                "value": {
                  "nodeType": "Literal",
                  "src": "0:1:0",
                  "kind": "number",
                  "value": "42",
                  "typeDescriptions": { "typeIdentifier": "t_rational_42_by_1", "typeString": "int_const 42" }
                }
              }
            ]
          }
        ]
      }
    }
  }
}
"#;

/// `--jobs oconst` inserts two top-level constants and replaces the folded
/// `42` with a `uint(...)` conversion of an opaque arithmetic expression.
#[test]
fn oconst_scenario_lifts_a_folded_literal_into_two_anchor_constants() {
    let mut arena = Arena::new();
    let roots = from_standard_output_str(&mut arena, OCONST_FIXTURE).unwrap();
    let root = roots[0];

    let mut ctx = PassContext::from_seed(100);
    oconst::run(&mut arena, root, &mut ctx);

    let top = arena.node(root).node_list("nodes").to_vec();
    assert_eq!(top.len(), 4, "pragma + two anchor constants + contract");
    let const_decls: Vec<_> = top
        .iter()
        .filter(|&&n| arena.node(n).kind == solobf_ast::NodeKind::VariableDeclaration)
        .collect();
    assert_eq!(const_decls.len(), 2);
    for &&decl in &const_decls {
        assert_eq!(arena.node(decl).bool_attr("constant"), Some(true));
    }

    let source = SourceBuilder::new(false, 0).build(&arena, root);
    assert!(source.contains("x=uint("), "initializer became a uint(...) conversion: {source}");
    assert!(!source.contains("=42"), "the bare literal no longer appears: {source}");
}

const OPREDIC_FIXTURE: &str = r#"
{
  "sources": {
    "A.sol": {
      "ast": {
        "nodeType": "SourceUnit",
        "src": "0:1:0",
        "nodes": [
          {
            "nodeType": "ContractDefinition",
            "src": "0:1:0",
            "name": "A",
            "abstract": false,
            "contractKind": "contract",
            "baseContracts": [],
            "nodes": [
              {
                "nodeType": "FunctionDefinition",
                "src": "0:1:0",
                "name": "f",
                "kind": "function",
                "visibility": "internal",
                "stateMutability": "nonpayable",
                "virtual": false,
                "modifiers": [],
                "parameters": { "nodeType": "ParameterList", "src": "0:1:0", "parameters": [] },
                "returnParameters": { "nodeType": "ParameterList", "src": "0:1:0", "parameters": [] },
                "body": {
                  "nodeType": "Block",
                  "src": "0:1:0",
                  "statements": [ { "nodeType": "Return", "src": "0:1:0" } ]
                }
              }
            ]
          }
        ]
      }
    }
  }
}
"#;

/// `--jobs opredic` turns `f`'s body into two declarations and a single
/// guarded `if`/`else`, with the junk branch holding `junk_statement_count`
/// `require(k==k)` calls and the original `return;` preserved verbatim in
/// the live `else`.
#[test]
fn opredic_scenario_wraps_the_body_in_a_guarded_dead_branch() {
    let mut arena = Arena::new();
    let roots = from_standard_output_str(&mut arena, OPREDIC_FIXTURE).unwrap();
    let root = roots[0];

    let mut ctx = PassContext::from_seed(200);
    opredic::run(&mut arena, root, &mut ctx, 4);

    let source = SourceBuilder::new(false, 0).build(&arena, root);
    assert!(source.contains("else{return;}"), "original body survives in the else branch: {source}");
    assert_eq!(source.matches("require(").count(), 4);
}

const DFO_FIXTURE: &str = r#"
{
  "sources": {
    "A.sol": {
      "ast": {
        "nodeType": "SourceUnit",
        "src": "0:1:0",
        "nodes": [
          {
            "nodeType": "ContractDefinition",
            "src": "0:1:0",
            "name": "A",
            "abstract": false,
            "contractKind": "contract",
            "baseContracts": [],
            "nodes": [
              {
                "nodeType": "VariableDeclaration",
                "src": "0:1:0",
                "name": "s",
                "constant": false,
                "storageLocation": "default",
                "visibility": "public",
                "mutability": "mutable",
                "typeName": {
                  "nodeType": "ElementaryTypeName",
                  "src": "0:1:0",
                  "name": "string",
                  "typeDescriptions": { "typeString": "string" }
                },
                "value": { "nodeType": "Literal", "src": "0:1:0", "kind": "string", "value": "hello" }
              }
            ]
          }
        ]
      }
    }
  }
}
"#;

/// `--jobs dfo` lifts `s`'s literal into a fresh `string[]` pool fronted by
/// an `internal view` accessor, and rewrites `s`'s initializer into a call
/// to that accessor at index 0.
#[test]
fn dfo_scenario_lifts_a_string_literal_into_a_pool_accessor() {
    let mut arena = Arena::new();
    let roots = from_standard_output_str(&mut arena, DFO_FIXTURE).unwrap();
    let root = roots[0];

    let mut ctx = PassContext::from_seed(300);
    dfo::run(&mut arena, root, &mut ctx);

    let source = SourceBuilder::new(false, 0).build(&arena, root);
    assert!(source.contains("internal view"), "an accessor function was added: {source}");
    assert!(source.contains("string[]"), "a backing array was added: {source}");
    assert!(source.contains("\"hello\""), "the original string survives in the backing array: {source}");
    assert!(!source.contains("s=\"hello\""), "the inline initializer is gone: {source}");
    assert!(
        source.contains("returns(string storage)"),
        "the string accessor's return parameter carries a storage data location: {source}"
    );
}
