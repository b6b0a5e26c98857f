//! Driver traits and protocol lookup
//!
//! This module defines the interface the update sequence expects from the
//! platform's SPI drivers, and how those drivers are handed to it.

mod table;
mod traits;

pub use table::{Protocol, ProtocolProvider, ProtocolTable, Protocols};
pub use traits::{JedecId, SpiDevice, SpiFlash, SpiMaster};
