//! Flash update sequencing
//!
//! This module performs one complete firmware update transaction against
//! the drivers found through a [`ProtocolProvider`](crate::driver::ProtocolProvider).

mod guard;
mod operations;
mod progress;

pub use guard::DeviceGuard;
pub use operations::{perform_flash_write, perform_flash_write_with_progress};
pub use progress::{NoProgress, UpdateProgress};

/// SPI bus the boot flash sits on
pub const DEFAULT_BUS: u8 = 0;

/// Chip-select line of the boot flash
pub const DEFAULT_CHIP_SELECT: u8 = 0;

/// Flash offset the image is written to
pub const UPDATE_OFFSET: u32 = 0;

/// Kind of firmware carried by an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirmwareType {
    /// Platform system firmware
    SystemFirmware,
    /// Non-volatile variable store
    NvRam,
}

/// How the flash address of an update is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashAddressType {
    /// Offset relative to the firmware region
    RelativeAddress,
    /// Absolute flash offset
    AbsoluteAddress,
}

/// Outcome of a successful update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateReport {
    /// Flash offset the image was written to
    pub offset: u32,
    /// Number of bytes written
    pub bytes_written: usize,
}
