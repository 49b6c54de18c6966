use crate::node::Node;

/// Error taxonomy for the AST layer. `MalformedAst` is the only variant the
/// arena itself returns; an unsupported node kind is a best-effort-continue
/// situation the source builder logs through `tracing` rather than
/// surfacing as an `Err` -- it's logged as a warning, the builder emits
/// nothing for that node, and traversal continues.
#[derive(Debug, thiserror::Error)]
pub enum AstError {
    #[error("malformed AST node {kind:?} at {span:?}: {message}")]
    MalformedAst { kind: String, span: String, message: String },
}

impl AstError {
    pub fn malformed(node: &Node, message: impl Into<String>) -> AstError {
        AstError::MalformedAst {
            kind: format!("{:?}", node.kind),
            span: format!("{:?}", node.span),
            message: message.into(),
        }
    }
}
