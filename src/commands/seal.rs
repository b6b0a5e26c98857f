//! Seal command implementation

use capflash_core::error::HeaderError;
use capflash_core::header::{seal_header, FirmwareImageHeader};
use std::path::Path;

use super::{read_file, write_file};
use crate::error::CliError;

/// Seal `image` in memory, returning the old and new checksum
fn seal_image(image: &mut [u8]) -> Result<(u32, u32), CliError> {
    let old = FirmwareImageHeader::from_image(image)
        .map(|header| header.prolog_checksum())
        .ok_or(HeaderError::TooShort { len: image.len() })?;
    let new = seal_header(image)?;
    Ok((old, new))
}

/// Run the seal command
///
/// Writes the sealed image to `output`, or back to `input` if none is given.
pub fn run_seal(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let mut image = read_file(input)?;
    let (old, new) = seal_image(&mut image)?;

    let target = output.unwrap_or(input);
    if old == new {
        println!("Prolog checksum already correct (0x{:08x})", new);
        if target == input {
            return Ok(());
        }
    } else {
        println!("Prolog checksum 0x{:08x} -> 0x{:08x}", old, new);
    }

    write_file(target, &image)?;
    println!("Sealed image written to {}", target.display());
    Ok(())
}
