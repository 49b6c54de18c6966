//! Serializes an arena tree back to Solidity source. A stack-based
//! pre-order walk: each node expands into a short sequence of
//! literal tokens and child-node references, pushed onto the work stack in
//! reverse so popping from the back reproduces the node's own left-to-right
//! emission order. A single space is inserted between two adjacent tokens
//! iff the last character of the left one and the first of the right one
//! are both identifier characters -- otherwise `function foo` would collapse
//! into `functionfoo`.

use crate::arena::Arena;
use crate::ids::NodeId;
use crate::kind::NodeKind;

const IDENT_CHARS: fn(char) -> bool = |c: char| c.is_ascii_alphanumeric() || c == '$' || c == '_';

enum Token {
    Str(String),
    Node(NodeId),
}

impl From<&str> for Token {
    fn from(s: &str) -> Token {
        Token::Str(s.to_string())
    }
}

impl From<String> for Token {
    fn from(s: String) -> Token {
        Token::Str(s)
    }
}

impl From<NodeId> for Token {
    fn from(id: NodeId) -> Token {
        Token::Node(id)
    }
}

/// One node's token sequence, built up in natural left-to-right call order
/// with a chained builder, mirroring the reference's own `add`/`add_all`
/// fluent style. Carries the verbose flag so `;`/`,`/`{`/`}` pick their
/// newline-bearing variant directly, matching what `SourceBuilder::build`'s
/// indent tracking expects to see.
struct Emit {
    tokens: Vec<Token>,
    verbose: bool,
}

impl Emit {
    fn new(verbose: bool) -> Emit {
        Emit { tokens: Vec::new(), verbose }
    }

    fn semicolon(&self) -> &'static str {
        if self.verbose { ";\n" } else { ";" }
    }

    fn comma(&self) -> &'static str {
        if self.verbose { ",\n" } else { "," }
    }

    fn left_brace(&self) -> &'static str {
        if self.verbose { "{\n" } else { "{" }
    }

    fn right_brace(&self) -> &'static str {
        if self.verbose { "}\n" } else { "}" }
    }

    fn add(mut self, item: impl Into<Token>) -> Emit {
        self.tokens.push(item.into());
        self
    }

    fn add_all(mut self, items: &[NodeId]) -> Emit {
        self.tokens.extend(items.iter().map(|&id| Token::Node(id)));
        self
    }

    /// Wraps `elements` in `open`/`close` (both empty for a bare
    /// comma-separated run, e.g. the `is A, B` base-contract list) with
    /// commas between them. Plain `,` regardless of verbose mode.
    fn tuple(mut self, elements: &[NodeId], open: &str, close: &str) -> Emit {
        if !open.is_empty() {
            self.tokens.push(Token::Str(open.to_string()));
        }
        for (i, &id) in elements.iter().enumerate() {
            if i > 0 {
                self.tokens.push(Token::Str(",".to_string()));
            }
            self.tokens.push(Token::Node(id));
        }
        if !close.is_empty() {
            self.tokens.push(Token::Str(close.to_string()));
        }
        self
    }

    /// `{v0,v1,...}` or, with `keys`, `{k0:v0,k1:v1,...}` -- used for enum
    /// bodies and Solidity's named-argument call syntax `f({a: 1, b: 2})`.
    fn dict(mut self, values: &[NodeId], keys: Option<&[String]>) -> Emit {
        let comma = self.comma().to_string();
        self.tokens.push(Token::Str(self.left_brace().to_string()));
        for (i, &id) in values.iter().enumerate() {
            if i > 0 {
                self.tokens.push(Token::Str(comma.clone()));
            }
            if let Some(keys) = keys {
                self.tokens.push(Token::Str(keys[i].clone()));
                self.tokens.push(Token::Str(":".to_string()));
            }
            self.tokens.push(Token::Node(id));
        }
        self.tokens.push(Token::Str(self.right_brace().to_string()));
        self
    }

    fn blk(mut self, body: &[NodeId]) -> Emit {
        self.tokens.push(Token::Str(self.left_brace().to_string()));
        self.tokens.extend(body.iter().map(|&id| Token::Node(id)));
        self.tokens.push(Token::Str(self.right_brace().to_string()));
        self
    }

    fn semi(mut self) -> Emit {
        let semi = self.semicolon().to_string();
        self.tokens.push(Token::Str(semi));
        self
    }
}

/// Emits a Solidity `escape`d string literal. Solidity source uses
/// double-quoted strings; non-printable and non-ASCII characters render as
/// `\xHH`/unicode escapes.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_ascii_graphic() || c == ' ' => out.push(c),
            c if (c as u32) <= 0xff => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
        }
    }
    out.push('"');
    out
}

/// Builds Solidity source from an arena tree.
pub struct SourceBuilder {
    verbose: bool,
    indent: usize,
    tokens: Vec<String>,
}

impl SourceBuilder {
    pub fn new(verbose: bool, indent: usize) -> SourceBuilder {
        SourceBuilder { verbose, indent, tokens: Vec::new() }
    }

    fn push_raw(&mut self, token: &str) {
        if token.is_empty() {
            return;
        }
        if let Some(last) = self.tokens.last() {
            let left_ok = last.chars().next_back().is_some_and(IDENT_CHARS);
            let right_ok = token.chars().next().is_some_and(IDENT_CHARS);
            if left_ok && right_ok {
                self.tokens.push(" ".to_string());
            }
        }
        self.tokens.push(token.to_string());
    }

    /// Walks `root` and returns the serialized Solidity source.
    pub fn build(&mut self, arena: &Arena, root: NodeId) -> String {
        let mut stack: Vec<Token> = vec![Token::Node(root)];
        let mut shift: usize = 0;
        let mut new_line = false;

        while let Some(tok) = stack.pop() {
            match tok {
                Token::Str(s) => {
                    if self.verbose {
                        if s == "{" || s == "{\n" {
                            shift += self.indent;
                        } else if s == "}" || s == "}\n" {
                            shift = shift.saturating_sub(self.indent);
                        }
                        if new_line {
                            if shift > 0 {
                                self.push_raw(&" ".repeat(shift));
                            }
                            new_line = false;
                        }
                        if s.ends_with('\n') {
                            new_line = true;
                        }
                    }
                    self.push_raw(&s);
                }
                Token::Node(id) => {
                    let emitted = self.tokenize(arena, id).tokens;
                    stack.extend(emitted.into_iter().rev());
                }
            }
        }

        self.tokens.concat()
    }

    /// Per-kind emission, one node at a time, following the key non-obvious
    /// rendering contracts solc's own grammar imposes (declaration shape by
    /// parent kind, `address payable` collapse, for-loop semicolon
    /// suppression, `else` iff a `falseBody` exists).
    fn tokenize(&self, arena: &Arena, id: NodeId) -> Emit {
        let node = arena.node(id);
        match &node.kind {
            NodeKind::SourceUnit => {
                let mut e = Emit::new(self.verbose);
                if let Some(license) = node.str_attr("license") {
                    e = e.add("//SPDX-License-Identifier:").add(license.to_string()).add("\n");
                }
                e.add_all(node.body())
            }

            NodeKind::PragmaDirective => {
                let literals = node.node_list("literals");
                // `literals` carries raw strings, not nodes; re-read from the
                // opaque JSON side-car rather than the node-typed helper.
                let mut e = Emit::new(self.verbose).add("pragma");
                if let Some(serde_json::Value::Array(items)) = node.json("literals") {
                    for item in items {
                        if let Some(s) = item.as_str() {
                            e = e.add(s.to_string());
                        }
                    }
                } else {
                    e = e.add_all(literals);
                }
                e.semi()
            }

            NodeKind::ContractDefinition => {
                let mut e = Emit::new(self.verbose);
                if node.bool_attr("abstract") == Some(true) {
                    e = e.add("abstract");
                }
                if let Some(kind) = node.str_attr("contractKind") {
                    e = e.add(kind.to_string());
                }
                e = e.add(node.expect_str("name").unwrap_or_default().to_string());
                let bases = node.node_list("baseContracts");
                if !bases.is_empty() {
                    e = e.add("is").tuple(bases, "", "");
                }
                e.blk(node.body())
            }

            NodeKind::Block => Emit::new(self.verbose).blk(node.body()),

            NodeKind::InheritanceSpecifier => Emit::new(self.verbose).add(node.expect_node("baseName").unwrap()),

            NodeKind::UserDefinedValueTypeDefinition => Emit::new(self.verbose)
                .add("type")
                .add(node.expect_str("name").unwrap_or_default().to_string())
                .add("is")
                .add(node.expect_node("underlyingType").unwrap())
                .semi(),

            NodeKind::FunctionDefinition => self.tokenize_function(arena, node),

            NodeKind::ModifierInvocation => {
                let mut e = Emit::new(self.verbose).add(node.expect_node("modifierName").unwrap());
                e.tuple(node.node_list("arguments"), "(", ")")
            }

            NodeKind::OverrideSpecifier => {
                Emit::new(self.verbose).add("override").tuple(node.node_list("overrides"), "(", ")")
            }

            NodeKind::ModifierDefinition => {
                let mut e = Emit::new(self.verbose)
                    .add("modifier")
                    .add(node.expect_str("name").unwrap_or_default().to_string())
                    .add(node.expect_node("parameters").unwrap());
                if node.bool_attr("virtual") == Some(true) {
                    e = e.add("virtual");
                }
                if let Some(overrides) = node.node("overrides") {
                    e = e.add(overrides);
                }
                match node.node("body") {
                    Some(body) => e.add(body),
                    None => e.semi(),
                }
            }

            NodeKind::ParameterList => Emit::new(self.verbose).tuple(node.body(), "(", ")"),

            NodeKind::EventDefinition => {
                let mut e = Emit::new(self.verbose)
                    .add("event")
                    .add(node.expect_str("name").unwrap_or_default().to_string())
                    .add(node.expect_node("parameters").unwrap());
                if node.bool_attr("anonymous") == Some(true) {
                    e = e.add("anonymous");
                }
                e.semi()
            }

            NodeKind::ErrorDefinition => Emit::new(self.verbose)
                .add("error")
                .add(node.expect_str("name").unwrap_or_default().to_string())
                .add(node.expect_node("parameters").unwrap())
                .semi(),

            NodeKind::EnumDefinition => {
                let mut e = Emit::new(self.verbose).add("enum").add(node.expect_str("name").unwrap_or_default().to_string());
                e.dict(node.body(), None)
            }

            NodeKind::EnumValue => Emit::new(self.verbose).add(node.expect_str("name").unwrap_or_default().to_string()),

            NodeKind::StructDefinition => Emit::new(self.verbose)
                .add("struct")
                .add(node.expect_str("name").unwrap_or_default().to_string())
                .blk(node.body()),

            NodeKind::VariableDeclaration => self.tokenize_variable_declaration(arena, id),

            NodeKind::ElementaryTypeNameExpression => {
                Emit::new(self.verbose).add(node.expect_node("typeName").unwrap())
            }

            NodeKind::ElementaryTypeName => self.tokenize_elementary_type_name(arena, id),

            NodeKind::UserDefinedTypeName => match node.node("pathNode") {
                Some(path) => Emit::new(self.verbose).add(path),
                None => Emit::new(self.verbose).add(node.expect_str("name").unwrap_or_default().to_string()),
            },

            NodeKind::ArrayTypeName => {
                let mut e = Emit::new(self.verbose).add(node.expect_node("baseType").unwrap()).add("[");
                if let Some(length) = node.node("length") {
                    e = e.add(length);
                }
                e.add("]")
            }

            NodeKind::IdentifierPath => Emit::new(self.verbose).add(node.expect_str("name").unwrap_or_default().to_string()),

            NodeKind::Mapping => Emit::new(self.verbose)
                .add("mapping")
                .add("(")
                .add(node.expect_node("keyType").unwrap())
                .add("=>")
                .add(node.expect_node("valueType").unwrap())
                .add(")"),

            NodeKind::PlaceholderStatement => Emit::new(self.verbose).add("_").semi(),

            NodeKind::VariableDeclarationStatement => self.tokenize_var_decl_statement(arena, id),

            NodeKind::ExpressionStatement => {
                let mut e = Emit::new(self.verbose).add(node.expect_node("expression").unwrap());
                if !self.is_for_loop_expr(arena, id) {
                    e = e.semi();
                }
                e
            }

            NodeKind::EmitStatement => Emit::new(self.verbose).add("emit").add(node.expect_node("eventCall").unwrap()).semi(),

            NodeKind::RevertStatement => Emit::new(self.verbose).add("revert").add(node.expect_node("errorCall").unwrap()).semi(),

            NodeKind::IfStatement => {
                let mut e = Emit::new(self.verbose)
                    .add("if")
                    .add("(")
                    .add(node.expect_node("condition").unwrap())
                    .add(")")
                    .add(node.expect_node("trueBody").unwrap());
                if let Some(false_body) = node.node("falseBody") {
                    e = e.add("else").add(false_body);
                }
                e
            }

            NodeKind::ForStatement => {
                let mut e = Emit::new(self.verbose).add("for").add("(");
                if let Some(init) = node.node("initializationExpression") {
                    e = e.add(init);
                } else {
                    e = e.add(";");
                }
                e = e.add(";");
                if let Some(cond) = node.node("condition") {
                    e = e.add(cond);
                }
                e = e.add(";");
                if let Some(step) = node.node("loopExpression") {
                    e = e.add(step);
                }
                e = e.add(")").add(node.expect_node("body").unwrap());
                e
            }

            NodeKind::WhileStatement => Emit::new(self.verbose)
                .add("while")
                .add("(")
                .add(node.expect_node("condition").unwrap())
                .add(")")
                .add(node.expect_node("body").unwrap()),

            NodeKind::DoWhileStatement => Emit::new(self.verbose)
                .add("do")
                .add(node.expect_node("body").unwrap())
                .add("while")
                .add("(")
                .add(node.expect_node("condition").unwrap())
                .add(")")
                .semi(),

            NodeKind::Return => {
                let mut e = Emit::new(self.verbose).add("return");
                if let Some(expr) = node.node("expression") {
                    e = e.add(expr);
                }
                e.semi()
            }

            NodeKind::Break => Emit::new(self.verbose).add("break").semi(),
            NodeKind::Continue => Emit::new(self.verbose).add("continue").semi(),

            NodeKind::TupleExpression => {
                let (open, close) =
                    if node.bool_attr("isInlineArray") == Some(true) { ("[", "]") } else { ("(", ")") };
                Emit::new(self.verbose).tuple(node.body(), open, close)
            }

            NodeKind::FunctionCall => self.tokenize_function_call(node),

            NodeKind::MemberAccess => Emit::new(self.verbose)
                .add(node.expect_node("expression").unwrap())
                .add(".")
                .add(node.expect_str("memberName").unwrap_or_default().to_string()),

            NodeKind::IndexAccess => {
                let mut e = Emit::new(self.verbose).add(node.expect_node("baseExpression").unwrap()).add("[");
                if let Some(index) = node.node("indexExpression") {
                    e = e.add(index);
                }
                e.add("]")
            }

            NodeKind::IndexRangeAccess => {
                let mut e = Emit::new(self.verbose).add(node.expect_node("baseExpression").unwrap()).add("[");
                if let Some(start) = node.node("startExpression") {
                    e = e.add(start);
                }
                e = e.add(":");
                if let Some(end) = node.node("endExpression") {
                    e = e.add(end);
                }
                e.add("]")
            }

            NodeKind::UnaryOperation => {
                let prefix = node.bool_attr("prefix").unwrap_or(true);
                let operator = node.expect_str("operator").unwrap_or_default().to_string();
                let sub = node.expect_node("subExpression").unwrap();
                if prefix {
                    Emit::new(self.verbose).add(operator).add(sub)
                } else {
                    Emit::new(self.verbose).add(sub).add(operator)
                }
            }

            NodeKind::BinaryOperation => Emit::new(self.verbose)
                .add(node.expect_node("leftExpression").unwrap())
                .add(node.expect_str("operator").unwrap_or_default().to_string())
                .add(node.expect_node("rightExpression").unwrap()),

            NodeKind::Assignment => Emit::new(self.verbose)
                .add(node.expect_node("leftHandSide").unwrap())
                .add(node.expect_str("operator").unwrap_or_default().to_string())
                .add(node.expect_node("rightHandSide").unwrap()),

            NodeKind::Literal => self.tokenize_literal(node),

            NodeKind::Identifier => Emit::new(self.verbose).add(node.expect_str("name").unwrap_or_default().to_string()),

            NodeKind::Unknown(tag) => {
                tracing::warn!(node_type = %tag, "no emission rule for this node kind, emitting nothing");
                Emit::new(self.verbose)
            }
        }
    }

    fn tokenize_function(&self, arena: &Arena, node: &crate::node::Node) -> Emit {
        let kind = node.str_attr("kind").unwrap_or("function");
        let mut e = Emit::new(self.verbose);

        if kind == "constructor" {
            e = e.add("constructor").add(node.expect_node("parameters").unwrap());
            let modifiers = node.node_list("modifiers");
            if !modifiers.is_empty() {
                e = e.add_all(modifiers);
            }
            if node.str_attr("stateMutability") == Some("payable") {
                e = e.add("payable");
            }
            return e.add(node.expect_node("body").unwrap());
        }

        e = e.add("function").add(node.expect_str("name").unwrap_or_default().to_string());
        e = e.add(node.expect_node("parameters").unwrap());
        if kind != "freeFunction" {
            if let Some(v) = node.str_attr("visibility") {
                e = e.add(v.to_string());
            }
        }
        if node.str_attr("stateMutability").is_some_and(|m| m != "nonpayable") {
            e = e.add(node.str_attr("stateMutability").unwrap().to_string());
        }
        let modifiers = node.node_list("modifiers");
        if !modifiers.is_empty() {
            e = e.add_all(modifiers);
        }
        if node.bool_attr("virtual") == Some(true) {
            e = e.add("virtual");
        }
        if let Some(overrides) = node.node("overrides") {
            e = e.add(overrides);
        }
        if let Some(return_params) = node.node("returnParameters") {
            if !arena.node(return_params).node_list("parameters").is_empty() {
                e = e.add("returns").add(return_params);
            }
        }
        match node.node("body") {
            Some(body) => e.add(body),
            None => e.semi(),
        }
    }

    fn tokenize_elementary_type_name(&self, arena: &Arena, id: NodeId) -> Emit {
        let node = arena.node(id);
        let name = node.expect_str("name").unwrap_or_default().to_string();
        if node.str_attr("stateMutability") == Some("payable") {
            let in_expr = node
                .parent
                .is_some_and(|p| arena.node(p).kind == NodeKind::ElementaryTypeNameExpression);
            if in_expr {
                Emit::new(self.verbose).add("payable")
            } else {
                Emit::new(self.verbose).add(name).add("payable")
            }
        } else {
            Emit::new(self.verbose).add(name)
        }
    }

    fn tokenize_variable_declaration(&self, arena: &Arena, id: NodeId) -> Emit {
        let node = arena.node(id);
        let parent_kind = node.parent.map(|p| arena.node(p).kind.clone());

        match parent_kind {
            Some(NodeKind::ContractDefinition) | Some(NodeKind::SourceUnit) => {
                let mut e = Emit::new(self.verbose).add(node.expect_node("typeName").unwrap());
                if node.bool_attr("constant") == Some(true) {
                    e = e.add("constant");
                } else {
                    if let Some(visibility) = node.str_attr("visibility") {
                        if visibility != "internal" {
                            e = e.add(visibility.to_string());
                        }
                    }
                    if node.str_attr("mutability") == Some("immutable") {
                        e = e.add("immutable");
                    } else if node.str_attr("storageLocation").is_some_and(|l| l != "default") {
                        e = e.add(node.str_attr("storageLocation").unwrap().to_string());
                    }
                    if let Some(overrides) = node.node("overrides") {
                        e = e.add(overrides);
                    }
                }
                e = e.add(node.expect_str("name").unwrap_or_default().to_string());
                if let Some(value) = node.node("value") {
                    e = e.add("=").add(value);
                }
                e.semi()
            }

            Some(NodeKind::StructDefinition) => Emit::new(self.verbose)
                .add(node.expect_node("typeName").unwrap())
                .add(node.expect_str("name").unwrap_or_default().to_string())
                .semi(),

            Some(NodeKind::ParameterList) => {
                let mut e = Emit::new(self.verbose).add(node.expect_node("typeName").unwrap());
                if node.bool_attr("indexed") == Some(true) {
                    e = e.add("indexed");
                }
                if node.str_attr("storageLocation").is_some_and(|l| l != "default") {
                    e = e.add(node.str_attr("storageLocation").unwrap().to_string());
                }
                let name = node.expect_str("name").unwrap_or_default();
                if !name.is_empty() {
                    e = e.add(name.to_string());
                }
                e
            }

            _ => {
                let mut e = Emit::new(self.verbose).add(node.expect_node("typeName").unwrap());
                if node.str_attr("storageLocation").is_some_and(|l| l != "default") {
                    e = e.add(node.str_attr("storageLocation").unwrap().to_string());
                }
                e.add(node.expect_str("name").unwrap_or_default().to_string())
            }
        }
    }

    fn tokenize_var_decl_statement(&self, arena: &Arena, id: NodeId) -> Emit {
        let node = arena.node(id);
        let declarations = node.node_list("declarations");
        let mut e = Emit::new(self.verbose);
        e = if declarations.len() > 1 {
            e.tuple(declarations, "(", ")")
        } else {
            e.add(declarations[0])
        };
        if let Some(value) = node.node("initialValue") {
            e = e.add("=").add(value);
        }
        if !self.is_for_loop_init(arena, id) {
            e = e.semi();
        }
        e
    }

    fn tokenize_function_call(&self, node: &crate::node::Node) -> Emit {
        let mut e = Emit::new(self.verbose).add(node.expect_node("expression").unwrap());
        let args = node.node_list("arguments");
        let names: Vec<String> = match node.json("names") {
            Some(serde_json::Value::Array(items)) => {
                items.iter().map(|v| v.as_str().unwrap_or_default().to_string()).collect()
            }
            _ => Vec::new(),
        };
        if !names.is_empty() {
            e = e.add("(").dict(args, Some(&names)).add(")");
        } else {
            e = e.tuple(args, "(", ")");
        }
        e
    }

    fn tokenize_literal(&self, node: &crate::node::Node) -> Emit {
        match node.str_attr("kind") {
            Some("string") => Emit::new(self.verbose).add(quote(node.str_attr("value").unwrap_or_default())),
            Some("unicodeString") => {
                Emit::new(self.verbose).add("unicode").add(quote(node.str_attr("value").unwrap_or_default()))
            }
            Some("hexString") => {
                Emit::new(self.verbose).add(format!("hex\"{}\"", node.str_attr("hexValue").unwrap_or_default()))
            }
            Some("number") => {
                let mut e = Emit::new(self.verbose).add(node.str_attr("value").unwrap_or_default().to_string());
                if let Some(sub) = node.str_attr("subdenomination") {
                    e = e.add(sub.to_string());
                }
                e
            }
            _ => Emit::new(self.verbose).add(node.str_attr("value").unwrap_or_default().to_string()),
        }
    }

    fn is_for_loop_init(&self, arena: &Arena, id: NodeId) -> bool {
        node_is_field_of_for(arena, id, "initializationExpression")
    }

    fn is_for_loop_expr(&self, arena: &Arena, id: NodeId) -> bool {
        node_is_field_of_for(arena, id, "loopExpression")
    }
}

fn node_is_field_of_for(arena: &Arena, id: NodeId, field: &str) -> bool {
    let Some(parent) = arena.node(id).parent else { return false };
    arena.node(parent).kind == NodeKind::ForStatement && arena.owning_field(id) == Some(field)
}
