//! Protocol lookup
//!
//! Drivers are looked up by capability when an update starts instead of
//! being cached in globals. [`ProtocolTable`] is the plain implementation:
//! the caller installs one flash and one master driver and lends the table
//! to the update for the duration of the call.

use core::fmt;

use super::traits::{SpiFlash, SpiMaster};

/// Driver protocol a caller can install
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// SPI flash command set driver
    SpiFlash,
    /// SPI bus master driver
    SpiMaster,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpiFlash => write!(f, "SpiFlash"),
            Self::SpiMaster => write!(f, "SpiMaster"),
        }
    }
}

/// Both drivers needed for an update, borrowed together
pub struct Protocols<'a, F: ?Sized, M: ?Sized> {
    /// SPI flash driver
    pub flash: &'a mut F,
    /// SPI master driver
    pub master: &'a mut M,
}

/// Source of the driver protocols
pub trait ProtocolProvider {
    /// Flash driver type
    type Flash: SpiFlash + ?Sized;
    /// Master driver type
    type Master: SpiMaster + ?Sized;

    /// Locate both drivers
    ///
    /// The flash driver is looked up first. The error names the first
    /// protocol that is missing.
    fn locate(&mut self) -> Result<Protocols<'_, Self::Flash, Self::Master>, Protocol>;
}

/// Table holding at most one driver per protocol
pub struct ProtocolTable<F, M> {
    flash: Option<F>,
    master: Option<M>,
}

impl<F, M> ProtocolTable<F, M> {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            flash: None,
            master: None,
        }
    }

    /// Create a table with both drivers installed
    pub fn with(flash: F, master: M) -> Self {
        Self {
            flash: Some(flash),
            master: Some(master),
        }
    }

    /// Install the flash driver, returning the previous one
    pub fn install_flash(&mut self, flash: F) -> Option<F> {
        self.flash.replace(flash)
    }

    /// Install the master driver, returning the previous one
    pub fn install_master(&mut self, master: M) -> Option<M> {
        self.master.replace(master)
    }

    /// Remove the flash driver
    pub fn uninstall_flash(&mut self) -> Option<F> {
        self.flash.take()
    }

    /// Remove the master driver
    pub fn uninstall_master(&mut self) -> Option<M> {
        self.master.take()
    }

    /// Installed flash driver
    pub fn flash(&self) -> Option<&F> {
        self.flash.as_ref()
    }

    /// Installed master driver
    pub fn master(&self) -> Option<&M> {
        self.master.as_ref()
    }
}

impl<F, M> Default for ProtocolTable<F, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: SpiFlash, M: SpiMaster> ProtocolProvider for ProtocolTable<F, M> {
    type Flash = F;
    type Master = M;

    fn locate(&mut self) -> Result<Protocols<'_, F, M>, Protocol> {
        let flash = self.flash.as_mut().ok_or(Protocol::SpiFlash)?;
        let master = self.master.as_mut().ok_or(Protocol::SpiMaster)?;
        Ok(Protocols { flash, master })
    }
}
