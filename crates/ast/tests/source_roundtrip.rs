use solobf_ast::builders::{add, eq, funcall, if_stmt, mul, num_u64, sym, var};
use solobf_ast::ingest::from_standard_output_str;
use solobf_ast::{Arena, SourceBuilder};

const CONTRACT_OUTPUT: &str = r#"
{
  "sources": {
    "Counter.sol": {
      "ast": {
        "nodeType": "SourceUnit",
        "src": "0:100:0",
        "license": "MIT",
        "nodes": [
          {
            "nodeType": "PragmaDirective",
            "src": "0:10:0",
            "literals": ["solidity", "^0.8.28"]
          },
          {
            "nodeType": "ContractDefinition",
            "src": "10:90:0",
            "name": "Counter",
            "abstract": false,
            "contractKind": "contract",
            "baseContracts": [],
            "nodes": [
              {
                "nodeType": "VariableDeclaration",
                "src": "30:20:0",
                "name": "count",
                "constant": false,
                "storageLocation": "default",
                "visibility": "internal",
                "mutability": "mutable",
                "typeName": {
                  "nodeType": "ElementaryTypeName",
                  "src": "30:7:0",
                  "name": "uint256"
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

#[test]
fn ingests_and_rebuilds_a_small_contract() {
    let mut arena = Arena::new();
    let roots = from_standard_output_str(&mut arena, CONTRACT_OUTPUT).expect("valid standard output json");
    assert_eq!(roots.len(), 1);

    let mut builder = SourceBuilder::new(false, 0);
    let source = builder.build(&arena, roots[0]);

    assert!(source.starts_with("//SPDX-License-Identifier:MIT"));
    assert!(source.contains("pragma solidity^0.8.28;"));
    assert!(source.contains("contract Counter{"));
    assert!(source.contains("uint256 count;"));
}

#[test]
fn synthetic_declaration_renders_with_initializer() {
    let mut arena = Arena::new();
    let contract = arena.alloc(solobf_ast::NodeKind::ContractDefinition, solobf_ast::SourceSpan::SYNTHETIC);
    arena.set_field(contract, "name", "Synthetic");
    arena.set_field(contract, "abstract", false);
    arena.set_field(contract, "contractKind", "contract");
    arena.set_field(contract, "baseContracts", Vec::<solobf_ast::NodeId>::new());

    let value = num_u64(&mut arena, 42);
    let decl = var(&mut arena, "answer", Some(value), true, "uint256");
    arena.append_to_list(contract, "nodes", decl);

    let mut builder = SourceBuilder::new(false, 0);
    let source = builder.build(&arena, contract);
    assert!(source.contains("uint256 constant answer=42;"));
}

#[test]
fn binary_operation_parenthesizes_looser_operand() {
    let mut arena = Arena::new();
    let a = sym(&mut arena, "a");
    let b = sym(&mut arena, "b");
    let c = sym(&mut arena, "c");

    let inner = add(&mut arena, a, b); // a+b, precedence 5
    let outer = mul(&mut arena, inner, c); // (a+b)*c, precedence 4 < 5 so left wraps

    let mut builder = SourceBuilder::new(false, 0);
    let source = builder.build(&arena, outer);
    assert_eq!(source, "(a+b)*c");
}

#[test]
fn if_statement_wraps_junk_branch() {
    let mut arena = Arena::new();
    let k = sym(&mut arena, "k");
    let cond = eq(&mut arena, k, k);
    let true_body = solobf_ast::builders::block(&mut arena, vec![]);
    let call = funcall(&mut arena, "require", vec![cond]);
    let stmt = solobf_ast::builders::exprstmt(&mut arena, call);
    let junk_body = solobf_ast::builders::block(&mut arena, vec![stmt]);

    let guard = sym(&mut arena, "false");
    let if_node = if_stmt(&mut arena, guard, true_body, Some(junk_body));

    let mut builder = SourceBuilder::new(false, 0);
    let source = builder.build(&arena, if_node);
    assert_eq!(source, "if(false){}else{require(k==k);}");
}

#[test]
fn elementary_type_name_collapses_address_payable_in_conversion() {
    let mut arena = Arena::new();
    let x = sym(&mut arena, "x");
    let conv = solobf_ast::builders::etypeconv(&mut arena, "address", x);
    // Mark the underlying type as payable and move it into a conversion head.
    let type_name = arena.node(conv).expect_node("expression").unwrap();
    let type_name = arena.node(type_name).expect_node("typeName").unwrap();
    arena.set_field(type_name, "stateMutability", "payable");

    let mut builder = SourceBuilder::new(false, 0);
    let source = builder.build(&arena, conv);
    assert_eq!(source, "payable(x)");
}
