//! The typed Solidity AST model: an arena of nodes addressed by stable ids,
//! synthetic-node builders, JSON ingestion from the compiler's standard
//! output, and the source builder that serializes a tree back to Solidity.

pub mod arena;
pub mod attr;
pub mod builders;
pub mod error;
pub mod ids;
pub mod ingest;
pub mod kind;
pub mod node;
pub mod precedence;
pub mod source_builder;
pub mod span;

pub use arena::Arena;
pub use attr::{AttrMap, AttrValue};
pub use error::AstError;
pub use ids::NodeId;
pub use kind::NodeKind;
pub use node::Node;
pub use source_builder::SourceBuilder;
pub use span::SourceSpan;
