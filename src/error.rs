//! Error types for the command line front end

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised before or around a core operation
#[derive(Debug, Error)]
pub enum CliError {
    /// Failed to read an input file
    #[error("Failed to read {path}: {source}", path = path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write an output file
    #[error("Failed to write {path}: {source}", path = path.display())]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Programmer name not compiled in
    #[error(
        "Unknown programmer: {name}\n\n{help}\nUse 'capflash list-programmers' for more details"
    )]
    UnknownProgrammer { name: String, help: String },

    /// Invalid programmer parameter
    #[cfg(feature = "dummy")]
    #[error("Invalid value '{value}' for programmer parameter '{key}'")]
    InvalidParameter { key: String, value: String },

    /// Programmer parameter the programmer does not know
    #[cfg(feature = "dummy")]
    #[error("Unknown programmer parameter '{0}'")]
    UnknownParameter(String),

    /// --dump used with a programmer that has no emulated contents
    #[error("--dump is only supported by the dummy programmer")]
    DumpUnsupported,

    /// Failure reported by the core library
    #[error(transparent)]
    Core(#[from] capflash_core::Error),

    /// Image header problem reported by the core library
    #[error(transparent)]
    Header(#[from] capflash_core::error::HeaderError),
}
