//! Ordered pass orchestration. The reference implementation resolves
//! plugins by dynamic module import (`importlib.import_module`,
//! `solo/obfuscator.py`'s `Obfuscator.__init__`); a systems rework trades
//! that for a static registry keyed by pass name, so this module is a
//! closed `match` instead.

use solobf_ast::{Arena, NodeId};

use crate::error::{PassError, PassResult};
use crate::rng::PassContext;
use crate::{cff, dfo, oconst, opredic, rename};

/// The closed set of pass names accepted by the `--jobs` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassName {
    Cff,
    Oconst,
    Opredic,
    Dfo,
    Rename,
}

impl PassName {
    pub fn as_str(self) -> &'static str {
        match self {
            PassName::Cff => "cff",
            PassName::Oconst => "oconst",
            PassName::Opredic => "opredic",
            PassName::Dfo => "dfo",
            PassName::Rename => "rename",
        }
    }
}

impl std::str::FromStr for PassName {
    type Err = PassError;

    fn from_str(s: &str) -> Result<PassName, PassError> {
        match s {
            "cff" => Ok(PassName::Cff),
            "oconst" => Ok(PassName::Oconst),
            "opredic" => Ok(PassName::Opredic),
            "dfo" => Ok(PassName::Dfo),
            "rename" => Ok(PassName::Rename),
            other => Err(PassError::UnknownPass(other.to_string())),
        }
    }
}

/// Knobs shared by more than one pass; resolved from CLI flags/config file
/// by the CLI crate and threaded down here rather than read from process-wide
/// state.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub seed: Option<u64>,
    pub junk_statement_count: usize,
}

impl Default for PipelineConfig {
    fn default() -> PipelineConfig {
        PipelineConfig { seed: None, junk_statement_count: 4 }
    }
}

/// Runs `jobs` in order over `root`, each pass mutating the arena in place
/// and passing its root straight to the next -- the orchestrator never
/// copies the tree between passes.
pub fn run_pipeline(
    arena: &mut Arena,
    root: NodeId,
    jobs: &[PassName],
    config: &PipelineConfig,
) -> PassResult<NodeId> {
    let mut root = root;
    for &job in jobs {
        let mut ctx = match config.seed {
            Some(seed) => PassContext::from_seed(seed ^ pass_salt(job)),
            None => PassContext::from_entropy(),
        };
        tracing::debug!(pass = job.as_str(), "running pass");
        root = match job {
            PassName::Cff => cff::run(arena, root, &mut ctx)?,
            PassName::Oconst => oconst::run(arena, root, &mut ctx),
            PassName::Opredic => opredic::run(arena, root, &mut ctx, config.junk_statement_count),
            PassName::Dfo => dfo::run(arena, root, &mut ctx),
            PassName::Rename => rename::run(arena, root, &mut ctx),
        };
        tracing::debug!(pass = job.as_str(), "pass done");
    }
    Ok(root)
}

/// Distinct passes given the same `--seed` should not draw from identical
/// RNG streams; each pass's context is salted by a fixed per-pass constant
/// before seeding.
fn pass_salt(name: PassName) -> u64 {
    match name {
        PassName::Cff => 0x0001,
        PassName::Oconst => 0x0002,
        PassName::Opredic => 0x0003,
        PassName::Dfo => 0x0004,
        PassName::Rename => 0x0005,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_the_closed_set_and_rejects_anything_else() {
        assert_eq!(PassName::from_str("cff").unwrap(), PassName::Cff);
        assert_eq!(PassName::from_str("rename").unwrap(), PassName::Rename);
        assert!(PassName::from_str("packer").is_err());
    }

    #[test]
    fn empty_job_list_returns_the_root_unchanged() {
        let mut arena = Arena::new();
        let root = arena.alloc(solobf_ast::NodeKind::SourceUnit, solobf_ast::SourceSpan::SYNTHETIC);
        let config = PipelineConfig::default();
        let out = run_pipeline(&mut arena, root, &[], &config).unwrap();
        assert_eq!(out, root);
    }
}
