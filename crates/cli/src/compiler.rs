//! The external `solc` subprocess, grounded in `solo/obfuscator.py`'s
//! `subprocess.run([solc, "--standard-json"], ...)` call: one blocking
//! invocation before the pipeline starts, stdin/stdout JSON, no retries.

use std::path::Path;
use std::process::Command;

use serde_json::{json, Value};

use crate::config::ObfuscatorConfig;
use crate::error::{CliError, CliResult};

/// Runs `solc --version` and warns (but doesn't fail) if it's older than
/// `config.min_solc_version`.
pub fn check_version(config: &ObfuscatorConfig) -> CliResult<()> {
    let output = Command::new(&config.solc)
        .arg("--version")
        .output()
        .map_err(|source| CliError::SolcSpawn { binary: config.solc.clone(), source })?;

    let text = String::from_utf8_lossy(&output.stdout);
    let Some(version_str) = extract_version(&text) else {
        tracing::warn!(output = %text, "could not parse solc version from `solc --version`");
        return Ok(());
    };

    let min = semver::Version::parse(&config.min_solc_version).expect("MIN_SOLC_VERSION is a valid semver string");
    match semver::Version::parse(&version_str) {
        Ok(version) if version < min => {
            tracing::warn!(%version, minimum = %min, "solc is older than the version this tool was validated against");
        }
        Ok(version) => tracing::debug!(%version, "solc version check passed"),
        Err(_) => tracing::warn!(raw = %version_str, "could not parse solc version as semver"),
    }
    Ok(())
}

fn extract_version(text: &str) -> Option<String> {
    // `solc --version` prints a line like "Version: 0.8.28+commit.7893614a...".
    let line = text.lines().find(|l| l.contains("Version:"))?;
    let after = line.split("Version:").nth(1)?.trim();
    let core = after.split(['+', '-']).next()?;
    Some(core.trim().to_string())
}

/// Builds the standard-input JSON document and invokes solc, returning the
/// parsed standard-output document.
pub fn compile(config: &ObfuscatorConfig, input_path: &Path) -> CliResult<Value> {
    let absolute = std::fs::canonicalize(input_path)
        .map_err(|source| CliError::ReadInput { path: input_path.to_path_buf(), source })?;

    let request = json!({
        "language": "Solidity",
        "sources": { "temp.sol": { "urls": [absolute.to_string_lossy()] } },
        "settings": { "outputSelection": { "*": { "": ["ast"] } } },
    });

    let mut child = Command::new(&config.solc)
        .arg("--standard-json")
        .arg("--allow-paths")
        .arg(absolute.parent().unwrap_or_else(|| Path::new(".")))
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .map_err(|source| CliError::SolcSpawn { binary: config.solc.clone(), source })?;

    {
        use std::io::Write;
        let stdin = child.stdin.take().expect("stdin was piped");
        let mut stdin = stdin;
        stdin
            .write_all(request.to_string().as_bytes())
            .map_err(|source| CliError::SolcSpawn { binary: config.solc.clone(), source })?;
    }

    let output =
        child.wait_with_output().map_err(|source| CliError::SolcSpawn { binary: config.solc.clone(), source })?;

    if !output.status.success() {
        return Err(CliError::SolcFailed {
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    let value: Value = serde_json::from_slice(&output.stdout)?;
    if let Some(errors) = value.get("errors").and_then(Value::as_array) {
        let fatal: Vec<&str> =
            errors.iter().filter(|e| e.get("severity").and_then(Value::as_str) == Some("error")).filter_map(|e| e.get("formattedMessage").and_then(Value::as_str)).collect();
        if !fatal.is_empty() {
            return Err(CliError::SolcFailed { status: 0, stderr: fatal.join("\n") });
        }
    }
    if value.get("sources").and_then(Value::as_object).is_none_or(|m| m.is_empty()) {
        return Err(CliError::SolcNoSources);
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_the_release_version_ignoring_the_commit_suffix() {
        let text = "solc, the solidity compiler commandline interface\nVersion: 0.8.28+commit.7893614a.Linux.g++\n";
        assert_eq!(extract_version(text).as_deref(), Some("0.8.28"));
    }

    #[test]
    fn returns_none_when_the_version_line_is_absent() {
        assert_eq!(extract_version("garbage output"), None);
    }
}
