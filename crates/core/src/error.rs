//! Error taxonomy for input parsing.
//!
//! Configuration and metadata errors are both "abort early with one message
//! line" failures: neither leaves partially-constructed simulator
//! state behind, and both render through [`std::fmt::Display`] as
//! `"<kind>, program aborted"`. Simulation-time failures (memory allocate/access)
//! are not part of this taxonomy — they are display events handled inline by
//! [`crate::sim`], not `Result::Err`s.

use std::path::PathBuf;

/// Failure while reading or parsing the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be opened for reading.
    #[error("cannot access configuration file {}, program aborted", path.display())]
    Open {
        /// Path that failed to open.
        path: PathBuf,
    },

    /// The file does not open with `Start Simulator Configuration File:`.
    #[error("corrupt configuration leader, program aborted")]
    BadLeader,

    /// The file does not close with `End Simulator Configuration File.`.
    #[error("corrupt configuration trailer, program aborted")]
    BadTrailer,

    /// A line's prompt does not match any of the ten recognized prompts.
    #[error("corrupt configuration prompt '{prompt}', program aborted")]
    UnknownPrompt {
        /// The unrecognized prompt text.
        prompt: String,
    },

    /// A recognized prompt's value fell outside its declared range or enum.
    #[error("configuration value for '{prompt}' out of range, program aborted")]
    OutOfRange {
        /// The prompt whose value is invalid.
        prompt: String,
    },
}

/// Failure while reading or parsing the metadata (opcode) file.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// The metadata file could not be opened for reading.
    #[error("cannot access metadata file {}, program aborted", path.display())]
    Open {
        /// Path that failed to open.
        path: PathBuf,
    },

    /// The file does not open with `Start Program Meta-Data Code:`.
    #[error("corrupt metadata leader, program aborted")]
    BadLeader,

    /// The file does not close with `End Program Meta-Data Code.`.
    #[error("corrupt metadata trailer, program aborted")]
    BadTrailer,

    /// An opcode entry does not match the `cmd(io)arg1,int2[,int3]` grammar.
    #[error("corrupt opcode '{text}', program aborted")]
    BadOpcodeForm {
        /// The raw opcode text that failed to parse.
        text: String,
    },

    /// An opcode's `command` or `strArg1` is outside the fixed vocabulary.
    #[error("invalid opcode argument '{arg}', program aborted")]
    BadArg {
        /// The offending argument text.
        arg: String,
    },

    /// An `app start` was not matched by a following `app end` (or vice versa).
    #[error("unbalanced app start/end, program aborted")]
    UnbalancedAppEnd,
}
