//! Operating-system simulator CLI.
//!
//! Reads a configuration file, reads the metadata (opcode) file it names,
//! and then displays and/or runs the parsed simulation according to the
//! flags given. Every failure is reported as a message on stderr; the
//! process always exits `0` — a parse failure is the simulated machine's
//! problem, not the OS's.

mod error;

use clap::Parser;
use error::CliError;
use ossim_core::{ConfigData, ConfigError, MetadataError, OpCode};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Parser, Debug)]
#[command(
    name = "ossim",
    author,
    version,
    about = "Discrete-event simulator of a single-CPU operating system"
)]
struct Cli {
    /// Path to the simulator configuration file.
    config_path: PathBuf,
}

/// The three action switches, recognized as the literal single-dash
/// tokens `-dc`/`-dm`/`-rs` rather than clap's short/long conventions —
/// clap's `long` always renders two dashes and `short` is a single
/// character, so neither matches a one-dash multi-character flag.
#[derive(Debug, Default)]
struct Actions {
    display_config: bool,
    display_metadata: bool,
    run_sim: bool,
}

/// Pulls `-dc`/`-dm`/`-rs` out of the raw argument list before clap ever
/// sees it, leaving everything else (the program name and the config
/// path) for `Cli::parse_from`.
fn take_actions(args: impl Iterator<Item = String>) -> (Actions, Vec<String>) {
    let mut actions = Actions::default();
    let mut rest = Vec::new();
    for arg in args {
        match arg.as_str() {
            "-dc" => actions.display_config = true,
            "-dm" => actions.display_metadata = true,
            "-rs" => actions.run_sim = true,
            _ => rest.push(arg),
        }
    }
    (actions, rest)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut argv = env::args();
    let program = argv.next().unwrap_or_else(|| "ossim".to_string());
    let (actions, rest) = take_actions(argv);

    if !(actions.display_config || actions.display_metadata || actions.run_sim) {
        eprintln!("at least one of -dc, -dm, -rs is required");
        return;
    }

    let cli = Cli::parse_from(std::iter::once(program).chain(rest));

    let config = match read_config(&cli.config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };

    if actions.display_config {
        println!("{config}");
    }

    let opcodes = match read_metadata(&config.metadata_path) {
        Ok(opcodes) => opcodes,
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };

    if actions.display_metadata {
        for op in &opcodes {
            println!("{op}");
        }
    }

    if actions.run_sim {
        debug!(processes = %opcodes.len(), "starting simulation");
        ossim_core::run(config, opcodes);
    }
}

fn read_config(path: &Path) -> Result<ConfigData, CliError> {
    let text = fs::read_to_string(path).map_err(|err| {
        warn!(%err, path = %path.display(), "failed to read configuration file");
        CliError::from(ConfigError::Open { path: path.to_path_buf() })
    })?;
    Ok(ossim_core::config::parse(&text)?)
}

fn read_metadata(path: &str) -> Result<Vec<OpCode>, CliError> {
    let path = Path::new(path);
    let text = fs::read_to_string(path).map_err(|err| {
        warn!(%err, path = %path.display(), "failed to read metadata file");
        CliError::from(MetadataError::Open { path: path.to_path_buf() })
    })?;
    Ok(ossim_core::metadata::parse(&text)?)
}
