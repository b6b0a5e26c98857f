//! Firmware image header
//!
//! Every image starts with a 64-byte main header identified by a magic
//! number and protected by an additive checksum over the prolog.

mod checksum;
mod types;

pub use checksum::{compute_prolog_checksum, seal_header, sum32, validate_header};
pub use types::{FirmwareImageHeader, HEADER_SIZE, MAIN_HEADER_MAGIC, PROLOG_CHECKSUM_OFFSET};
