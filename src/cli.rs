//! CLI argument parsing

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u64
fn parse_hex_u64(s: &str) -> Result<u64, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u64>().map_err(|e| format!("Invalid number: {}", e))
    }
}

const PROGRAMMER_HELP: &str = "Programmer to use, as name[:key=value,...] (see list-programmers)";

#[derive(Parser)]
#[command(name = "capflash")]
#[command(author, version, about = "Boot flash firmware updater", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Firmware carried by the image
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FirmwareTypeArg {
    /// Platform system firmware
    #[default]
    System,
    /// Non-volatile variable store
    Nvram,
}

/// Interpretation of --address
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressTypeArg {
    /// Absolute flash offset
    #[default]
    Absolute,
    /// Offset relative to the firmware region
    Relative,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a firmware image to the boot flash
    Update {
        /// Programmer to use
        #[arg(short, long, help = PROGRAMMER_HELP)]
        programmer: String,

        /// Firmware image to write
        #[arg(short, long)]
        input: PathBuf,

        /// Kind of firmware in the image
        #[arg(long, value_enum, default_value_t)]
        firmware_type: FirmwareTypeArg,

        /// Requested flash address (hex or decimal). Images are always
        /// written at offset 0
        #[arg(long, value_parser = parse_hex_u64, default_value = "0")]
        address: u64,

        /// How the address is interpreted
        #[arg(long, value_enum, default_value_t)]
        address_type: AddressTypeArg,

        /// Save the emulated flash contents here afterwards (dummy only)
        #[arg(long)]
        dump: Option<PathBuf>,
    },

    /// Show and validate the header of a firmware image
    Inspect {
        /// Firmware image to inspect
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Recompute and store the prolog checksum of a firmware image
    Seal {
        /// Firmware image to seal
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (defaults to rewriting the input in place)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List compiled-in programmers
    ListProgrammers,
}
