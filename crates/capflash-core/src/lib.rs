//! capflash-core - Firmware image validation and SPI flash update sequencing
//!
//! This crate checks the main header of a firmware image and drives a
//! platform SPI flash driver through one complete update transaction:
//! locate the driver protocols, validate the image, allocate the flash
//! device, probe it, write the image and release the device again.
//!
//! The SPI flash and SPI master drivers themselves are not part of this
//! crate. They are described by the [`driver::SpiFlash`] and
//! [`driver::SpiMaster`] traits and installed by the caller into a
//! [`driver::ProtocolTable`] (or any other [`driver::ProtocolProvider`]).
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc`)
//! - `alloc` - Enable driver implementations for boxed trait objects
//!
//! # Example
//!
//! ```ignore
//! use capflash_core::driver::ProtocolTable;
//! use capflash_core::update::{perform_flash_write, FirmwareType, FlashAddressType};
//!
//! let mut protocols = ProtocolTable::with(flash, master);
//! let report = perform_flash_write(
//!     &mut protocols,
//!     FirmwareType::SystemFirmware,
//!     0,
//!     FlashAddressType::AbsoluteAddress,
//!     &image,
//! )?;
//! println!("Wrote {} bytes", report.bytes_written);
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod driver;
pub mod error;
pub mod header;
pub mod update;

pub use error::{Error, ErrorKind, Result};
