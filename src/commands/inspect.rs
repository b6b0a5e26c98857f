//! Inspect command implementation

use capflash_core::header::{
    compute_prolog_checksum, validate_header, FirmwareImageHeader, HEADER_SIZE,
};
use std::path::Path;

use super::read_file;
use crate::error::CliError;

/// Render the header fields of `image`, or `None` if it is too short
fn describe_header(image: &[u8]) -> Option<String> {
    let header = FirmwareImageHeader::from_image(image)?;
    let mut out = String::new();

    out.push_str(&format!("  Magic:               0x{:08x}", header.magic()));
    if !header.has_valid_magic() {
        out.push_str(" (unknown)");
    }
    out.push('\n');
    out.push_str(&format!("  Prolog size:         {} bytes\n", header.prolog_size()));
    out.push_str(&format!(
        "  Prolog checksum:     0x{:08x}\n",
        header.prolog_checksum()
    ));
    out.push_str(&format!(
        "  Boot image size:     {} bytes\n",
        header.boot_image_size()
    ));
    out.push_str(&format!(
        "  Boot image checksum: 0x{:08x}\n",
        header.boot_image_checksum()
    ));
    out.push_str(&format!("  Load address:        0x{:08x}\n", header.load_addr()));
    out.push_str(&format!("  Exec address:        0x{:08x}\n", header.exec_addr()));
    out.push_str(&format!("  Extensions:          {}\n", header.ext_count));
    let io_args: Vec<String> = (0..4)
        .filter_map(|i| header.io_arg(i))
        .map(|arg| format!("0x{:x}", arg))
        .collect();
    out.push_str(&format!("  IO arguments:        {}\n", io_args.join(" ")));

    Some(out)
}

/// Run the inspect command
///
/// Fails if the header does not validate.
pub fn run_inspect(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let image = read_file(input)?;

    println!("{} ({} bytes)", input.display(), image.len());
    match describe_header(&image) {
        Some(text) => print!("{}", text),
        None => println!("  Image is shorter than the {} byte header", HEADER_SIZE),
    }

    if let Ok(computed) = compute_prolog_checksum(&image) {
        println!("  Computed checksum:   0x{:08x}", computed);
    }

    match validate_header(&image) {
        Ok(_) => {
            println!("Header is valid");
            Ok(())
        }
        Err(e) => {
            println!("Header is invalid: {}", e);
            Err(CliError::Header(e).into())
        }
    }
}
