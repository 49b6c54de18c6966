//! Pass-layer error taxonomy. Distinct from
//! [`solobf_ast::AstError`]: these are structural failures specific to a
//! pass's own algorithm, not malformed-ingestion problems.

use solobf_ast::AstError;

#[derive(Debug, thiserror::Error)]
pub enum PassError {
    #[error("continue statement outside any loop")]
    ContinueOutsideLoop,

    #[error("break statement outside any loop or switch")]
    BreakOutsideLoop,

    #[error("control-flow-flattening generated a duplicate state token")]
    ConflictingState,

    #[error("unknown pass name `{0}`")]
    UnknownPass(String),

    #[error(transparent)]
    Ast(#[from] AstError),
}

pub type PassResult<T> = Result<T, PassError>;
