//! CLI command implementations

mod inspect;
mod list;
mod seal;
mod update;

pub use inspect::run_inspect;
pub use list::list_programmers;
pub use seal::run_seal;
pub use update::{run_update, UpdateArgs};

use crate::error::CliError;
use std::path::Path;

/// Read a whole file into memory
fn read_file(path: &Path) -> Result<Vec<u8>, CliError> {
    std::fs::read(path).map_err(|source| CliError::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `data` to `path`, replacing any existing file
fn write_file(path: &Path, data: &[u8]) -> Result<(), CliError> {
    std::fs::write(path, data).map_err(|source| CliError::WriteFile {
        path: path.to_path_buf(),
        source,
    })
}
