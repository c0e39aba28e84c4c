//! Top-level CLI error: the core's own parse error taxonomy, unwrapped and
//! printed to stderr by `main`.

use ossim_core::{ConfigError, MetadataError};

/// Everything that can abort `main` before the simulation runs.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Failure opening or parsing the configuration file.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Failure opening or parsing the metadata file.
    #[error(transparent)]
    Metadata(#[from] MetadataError),
}
