//! The `solobf` command-line front end. Parses a Solidity file path and a
//! pass list, invokes solc for the AST, runs the chosen passes in order,
//! and writes the obfuscated source back out.

mod compiler;
mod config;
mod error;
mod logging;

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser};
use eyre::Result;

use config::ObfuscatorConfig;
use error::CliError;
use solobf_ast::{ingest, SourceBuilder};
use solobf_passes::{run_pipeline, PassName, PipelineConfig};

/// A Solidity source-to-source obfuscator: AST in, AST rewritten, Solidity
/// out. Flags mirror `solo`'s own CLI surface, with `-V` for verbose and
/// `-v` reserved for `--version` rather than the other way around,
/// matching the reference tool's argument parser.
#[derive(Debug, Parser)]
#[command(name = "solobf", disable_version_flag = true)]
struct Cli {
    /// Solidity source file to obfuscate.
    input: PathBuf,

    /// Output path. Defaults to the input path with its extension replaced
    /// by `.out.sol`.
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    output: Option<PathBuf>,

    /// Passes to run, in the order given. Repeatable: `-j cff -j rename` and
    /// `-j cff rename` both queue `cff` then `rename`.
    #[arg(short = 'j', long = "jobs", value_name = "PASS", action = ArgAction::Append, num_args = 1..)]
    jobs: Vec<PassName>,

    /// Enable debug logging and indented, newline-delimited output.
    #[arg(short = 'V', long = "verbose")]
    verbose: bool,

    /// Print the version and exit.
    #[arg(short = 'v', long = "version", action = ArgAction::SetTrue)]
    version: bool,
}

fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("out.sol")
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let config = ObfuscatorConfig::load(&ObfuscatorConfig::default_path())?;

    if let Err(err) = compiler::check_version(&config) {
        tracing::warn!(error = %err, "could not determine solc version, continuing");
    }

    let standard_output = compiler::compile(&config, &cli.input)?;

    let mut arena = solobf_ast::Arena::new();
    let roots = ingest::from_standard_output(&mut arena, &standard_output);
    let Some(&root) = roots.first() else {
        return Err(CliError::SolcNoSources);
    };

    let pipeline_config =
        PipelineConfig { seed: config.seed, junk_statement_count: config.junk_statement_count };
    let root = run_pipeline(&mut arena, root, &cli.jobs, &pipeline_config)?;

    let indent = if cli.verbose { 4 } else { 0 };
    let source = SourceBuilder::new(cli.verbose, indent).build(&arena, root);

    let output_path = cli.output.clone().unwrap_or_else(|| default_output_path(&cli.input));
    std::fs::write(&output_path, source)
        .map_err(|source| CliError::WriteOutput { path: output_path.clone(), source })?;

    tracing::info!(output = %output_path.display(), "wrote obfuscated source");
    Ok(())
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    if cli.version {
        println!("solobf {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    logging::init_tracing(cli.verbose);
    run(&cli)?;
    Ok(())
}
