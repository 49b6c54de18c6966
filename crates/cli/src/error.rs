//! CLI-boundary error taxonomy. `solobf_ast::AstError` and
//! `solobf_passes::PassError` already cover malformed-AST and
//! unsupported-construct cases; this enum adds the kinds that only make
//! sense at the process boundary: external-compiler failure and
//! configuration errors.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("failed to read input file {path}: {source}")]
    ReadInput { path: PathBuf, #[source] source: std::io::Error },

    #[error("failed to write output file {path}: {source}")]
    WriteOutput { path: PathBuf, #[source] source: std::io::Error },

    #[error("could not launch solc binary `{binary}`: {source}")]
    SolcSpawn { binary: String, #[source] source: std::io::Error },

    #[error("solc exited with status {status}: {stderr}")]
    SolcFailed { status: i32, stderr: String },

    #[error("solc produced output that isn't valid JSON: {0}")]
    SolcOutputNotJson(#[from] serde_json::Error),

    #[error("solc standard-output JSON has no `sources` entries")]
    SolcNoSources,

    #[error("invalid configuration file {path}: {source}")]
    ConfigFile { path: PathBuf, #[source] source: toml::de::Error },

    #[error(transparent)]
    Pass(#[from] solobf_passes::PassError),
}

pub type CliResult<T> = Result<T, CliError>;
