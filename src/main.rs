//! capflash - Boot flash firmware updater
//!
//! Validates the main header of a firmware image and writes the image to
//! the boot SPI flash through a pair of SPI master / SPI flash drivers.
//!
//! # Architecture
//!
//! The update sequence itself lives in `capflash-core` and only talks to
//! the `SpiMaster` and `SpiFlash` traits. This binary picks a programmer,
//! installs its drivers into a protocol table and hands the table to the
//! core for one update.

mod cli;
mod commands;
mod error;
mod programmers;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match cli.command {
        Commands::Update {
            programmer,
            input,
            firmware_type,
            address,
            address_type,
            dump,
        } => commands::run_update(&commands::UpdateArgs {
            programmer,
            input,
            firmware_type,
            address,
            address_type,
            dump,
        }),
        Commands::Inspect { input } => commands::run_inspect(&input),
        Commands::Seal { input, output } => commands::run_seal(&input, output.as_deref()),
        Commands::ListProgrammers => {
            commands::list_programmers();
            Ok(())
        }
    }
}
