//! Update command implementation

use capflash_core::driver::JedecId;
use capflash_core::header::FirmwareImageHeader;
use capflash_core::update::{
    perform_flash_write_with_progress, FirmwareType, FlashAddressType, UpdateProgress, UpdateReport,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

use super::{read_file, write_file};
use crate::cli::{AddressTypeArg, FirmwareTypeArg};
use crate::error::CliError;
use crate::programmers::{self, ProgrammerHandle};

/// Arguments of the update command
pub struct UpdateArgs {
    pub programmer: String,
    pub input: PathBuf,
    pub firmware_type: FirmwareTypeArg,
    pub address: u64,
    pub address_type: AddressTypeArg,
    pub dump: Option<PathBuf>,
}

fn firmware_type(arg: FirmwareTypeArg) -> FirmwareType {
    match arg {
        FirmwareTypeArg::System => FirmwareType::SystemFirmware,
        FirmwareTypeArg::Nvram => FirmwareType::NvRam,
    }
}

fn address_type(arg: AddressTypeArg) -> FlashAddressType {
    match arg {
        AddressTypeArg::Absolute => FlashAddressType::AbsoluteAddress,
        AddressTypeArg::Relative => FlashAddressType::RelativeAddress,
    }
}

/// Progress reporter showing a single indicatif spinner
struct SpinnerProgress {
    spinner: ProgressBar,
}

impl SpinnerProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message("Checking image header...");
        spinner.enable_steady_tick(Duration::from_millis(100));
        Self { spinner }
    }

    fn abandon(&self) {
        self.spinner.abandon_with_message("Update failed");
    }
}

impl UpdateProgress for SpinnerProgress {
    fn header_validated(&mut self, header: &FirmwareImageHeader) {
        self.spinner.set_message(format!(
            "Header ok (prolog {} bytes), probing flash...",
            header.prolog_size()
        ));
    }

    fn device_probed(&mut self, id: JedecId, size: Option<u32>) {
        match size {
            Some(size) => self
                .spinner
                .println(format!("Found flash {} ({} bytes)", id, size)),
            None => self.spinner.println(format!("Found flash {}", id)),
        }
    }

    fn writing(&mut self, offset: u32, bytes_to_write: usize) {
        self.spinner.set_message(format!(
            "Writing {} bytes at 0x{:x}...",
            bytes_to_write, offset
        ));
    }

    fn complete(&mut self, report: &UpdateReport) {
        self.spinner.finish_with_message(format!(
            "Update complete: {} bytes at 0x{:x}",
            report.bytes_written, report.offset
        ));
    }
}

/// Run one update against an opened programmer
fn update_image<R: UpdateProgress + ?Sized>(
    handle: &mut ProgrammerHandle,
    image: &[u8],
    args: &UpdateArgs,
    progress: &mut R,
) -> Result<UpdateReport, CliError> {
    let report = perform_flash_write_with_progress(
        &mut handle.protocols,
        firmware_type(args.firmware_type),
        args.address,
        address_type(args.address_type),
        image,
        progress,
    )?;
    Ok(report)
}

/// Run the update command
pub fn run_update(args: &UpdateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let image = read_file(&args.input)?;
    log::info!("Loaded {} ({} bytes)", args.input.display(), image.len());

    let mut handle = programmers::open_programmer(&args.programmer)?;
    if args.dump.is_some() && handle.contents().is_none() {
        return Err(CliError::DumpUnsupported.into());
    }

    let mut progress = SpinnerProgress::new();
    if let Err(e) = update_image(&mut handle, &image, args, &mut progress) {
        progress.abandon();
        return Err(e.into());
    }

    if let Some(path) = &args.dump {
        if let Some(contents) = handle.contents() {
            write_file(path, &contents)?;
            println!("Flash contents saved to {}", path.display());
        }
    }

    Ok(())
}
