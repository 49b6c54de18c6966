//! The ordered AST-rewrite passes: control-flow
//! flattening, opaque constants, opaque predicates, data-flow obfuscation,
//! and identifier renaming, plus the pipeline that threads a root through a
//! user-chosen subset of them in order.

pub mod cff;
pub mod dfo;
pub mod error;
pub mod oconst;
pub mod opredic;
pub mod pipeline;
pub mod rename;
pub mod rng;

pub use error::{PassError, PassResult};
pub use pipeline::{run_pipeline, PassName, PipelineConfig};
pub use rng::PassContext;
