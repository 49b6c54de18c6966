/// The closed set of Solidity AST node kinds this engine understands,
/// mirroring solc's `nodeType` tag. Anything outside this set ingests as
/// [`NodeKind::Unknown`] carrying the original tag string, so ingestion never
/// has to fail on a construct we don't rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    SourceUnit,
    ContractDefinition,
    FunctionDefinition,
    Block,
    IfStatement,
    ForStatement,
    WhileStatement,
    DoWhileStatement,
    VariableDeclaration,
    VariableDeclarationStatement,
    ExpressionStatement,
    Assignment,
    BinaryOperation,
    UnaryOperation,
    TupleExpression,
    FunctionCall,
    Identifier,
    Literal,
    ElementaryTypeName,
    ElementaryTypeNameExpression,
    ArrayTypeName,
    Mapping,
    IdentifierPath,
    MemberAccess,
    IndexAccess,
    IndexRangeAccess,
    ParameterList,
    Return,
    Break,
    Continue,
    EmitStatement,
    RevertStatement,
    StructDefinition,
    EnumDefinition,
    EnumValue,
    EventDefinition,
    ErrorDefinition,
    ModifierDefinition,
    ModifierInvocation,
    OverrideSpecifier,
    InheritanceSpecifier,
    PragmaDirective,
    UserDefinedTypeName,
    UserDefinedValueTypeDefinition,
    PlaceholderStatement,
    /// A `nodeType` this engine has no rewrite rules for (e.g.
    /// `ImportDirective`, `UsingForDirective`). Ingested opaquely and
    /// emitted via [`crate::error::AstError::UnsupportedConstruct`]
    /// best-effort handling.
    Unknown(String),
}

impl NodeKind {
    pub fn from_node_type(tag: &str) -> NodeKind {
        match tag {
            "SourceUnit" => NodeKind::SourceUnit,
            "ContractDefinition" => NodeKind::ContractDefinition,
            "FunctionDefinition" => NodeKind::FunctionDefinition,
            "Block" | "UncheckedBlock" => NodeKind::Block,
            "IfStatement" => NodeKind::IfStatement,
            "ForStatement" => NodeKind::ForStatement,
            "WhileStatement" => NodeKind::WhileStatement,
            "DoWhileStatement" => NodeKind::DoWhileStatement,
            "VariableDeclaration" => NodeKind::VariableDeclaration,
            "VariableDeclarationStatement" => NodeKind::VariableDeclarationStatement,
            "ExpressionStatement" => NodeKind::ExpressionStatement,
            "Assignment" => NodeKind::Assignment,
            "BinaryOperation" => NodeKind::BinaryOperation,
            "UnaryOperation" => NodeKind::UnaryOperation,
            "TupleExpression" => NodeKind::TupleExpression,
            "FunctionCall" => NodeKind::FunctionCall,
            "Identifier" => NodeKind::Identifier,
            "Literal" => NodeKind::Literal,
            "ElementaryTypeName" => NodeKind::ElementaryTypeName,
            "ElementaryTypeNameExpression" => NodeKind::ElementaryTypeNameExpression,
            "ArrayTypeName" => NodeKind::ArrayTypeName,
            "Mapping" => NodeKind::Mapping,
            "IdentifierPath" => NodeKind::IdentifierPath,
            "MemberAccess" => NodeKind::MemberAccess,
            "IndexAccess" => NodeKind::IndexAccess,
            "IndexRangeAccess" => NodeKind::IndexRangeAccess,
            "ParameterList" => NodeKind::ParameterList,
            "Return" => NodeKind::Return,
            "Break" => NodeKind::Break,
            "Continue" => NodeKind::Continue,
            "EmitStatement" => NodeKind::EmitStatement,
            "RevertStatement" => NodeKind::RevertStatement,
            "StructDefinition" => NodeKind::StructDefinition,
            "EnumDefinition" => NodeKind::EnumDefinition,
            "EnumValue" => NodeKind::EnumValue,
            "EventDefinition" => NodeKind::EventDefinition,
            "ErrorDefinition" => NodeKind::ErrorDefinition,
            "ModifierDefinition" => NodeKind::ModifierDefinition,
            "ModifierInvocation" => NodeKind::ModifierInvocation,
            "OverrideSpecifier" => NodeKind::OverrideSpecifier,
            "InheritanceSpecifier" => NodeKind::InheritanceSpecifier,
            "PragmaDirective" => NodeKind::PragmaDirective,
            "UserDefinedTypeName" => NodeKind::UserDefinedTypeName,
            "UserDefinedValueTypeDefinition" => NodeKind::UserDefinedValueTypeDefinition,
            "PlaceholderStatement" => NodeKind::PlaceholderStatement,
            other => NodeKind::Unknown(other.to_string()),
        }
    }

    /// Field holding the ordered semantic children for node kinds that
    /// refine `IterableNode` in the spec (§3). `None` for everything else.
    pub fn body_field(&self) -> Option<&'static str> {
        match self {
            NodeKind::SourceUnit | NodeKind::ContractDefinition => Some("nodes"),
            NodeKind::Block => Some("statements"),
            NodeKind::ParameterList => Some("parameters"),
            NodeKind::TupleExpression => Some("components"),
            NodeKind::FunctionCall => Some("arguments"),
            NodeKind::StructDefinition | NodeKind::EnumDefinition => Some("members"),
            _ => None,
        }
    }
}
