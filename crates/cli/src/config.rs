//! Configuration resolution: a small `ObfuscatorConfig` layered as CLI
//! flags over an optional `solobf.toml` project file, the same "flags
//! override file" precedence `foundry.toml` uses.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{CliError, CliResult};

/// The lowest solc version this tool has been validated against. A version
/// lower than this emits a warning at startup but the run continues.
pub const MIN_SOLC_VERSION: &str = "0.8.28";

/// Everything a run needs beyond the input/output paths, all independently
/// overridable from `solobf.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObfuscatorConfig {
    /// Path (or bare name resolved against `PATH`) of the solc binary.
    pub solc: String,
    /// Lowest solc version to accept without a warning.
    pub min_solc_version: String,
    /// RNG seed; `None` draws from system entropy each run.
    pub seed: Option<u64>,
    /// `require(k==k)` statements per OPREDIC dead branch.
    pub junk_statement_count: usize,
}

impl Default for ObfuscatorConfig {
    fn default() -> ObfuscatorConfig {
        ObfuscatorConfig {
            solc: "solc".to_string(),
            min_solc_version: MIN_SOLC_VERSION.to_string(),
            seed: None,
            junk_statement_count: 4,
        }
    }
}

impl ObfuscatorConfig {
    /// Reads `path` (if it exists) and layers its fields over the
    /// defaults; a missing file is not an error, only an empty file's
    /// absence of overrides.
    pub fn load(path: &Path) -> CliResult<ObfuscatorConfig> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                toml::from_str(&contents).map_err(|source| CliError::ConfigFile { path: path.to_path_buf(), source })
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(ObfuscatorConfig::default()),
            Err(err) => Err(CliError::ReadInput { path: path.to_path_buf(), source: err }),
        }
    }

    /// The conventional project config file, `solobf.toml` in the current
    /// directory.
    pub fn default_path() -> PathBuf {
        PathBuf::from("solobf.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = ObfuscatorConfig::load(Path::new("/nonexistent/solobf.toml")).unwrap();
        assert_eq!(config.solc, "solc");
        assert_eq!(config.junk_statement_count, 4);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn partial_toml_overrides_only_its_own_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solobf.toml");
        std::fs::write(&path, "seed = 7\njunk_statement_count = 9\n").unwrap();

        let config = ObfuscatorConfig::load(&path).unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.junk_statement_count, 9);
        assert_eq!(config.solc, "solc");
    }
}
