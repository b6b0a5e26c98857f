//! Driver trait definitions
//!
//! The SPI master driver owns bus access and hands out device handles; the
//! SPI flash driver speaks the flash command set through such a handle.
//! Both are implemented outside this crate.

use core::fmt;

use crate::error::DriverResult;

/// JEDEC identification of a flash chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JedecId {
    /// Manufacturer ID
    pub manufacturer: u8,
    /// Device ID
    pub device: u16,
}

impl fmt::Display for JedecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}:{:04X}", self.manufacturer, self.device)
    }
}

/// Handle to a configured SPI flash target
///
/// Created by [`SpiMaster::setup_device`] and given back through
/// [`SpiMaster::free_device`]. The handle is neither `Clone` nor `Copy`, so
/// it can only be released once.
#[derive(Debug, PartialEq, Eq)]
pub struct SpiDevice {
    bus: u8,
    chip_select: u8,
    token: u32,
    size: Option<u32>,
}

impl SpiDevice {
    /// Create a handle
    ///
    /// `token` is private to the master driver that issued the handle.
    pub fn new(bus: u8, chip_select: u8, token: u32) -> Self {
        Self {
            bus,
            chip_select,
            token,
            size: None,
        }
    }

    /// SPI bus number
    pub fn bus(&self) -> u8 {
        self.bus
    }

    /// Chip-select line
    pub fn chip_select(&self) -> u8 {
        self.chip_select
    }

    /// Driver token
    pub fn token(&self) -> u32 {
        self.token
    }

    /// Flash size in bytes, known once the flash driver initialized the device
    pub fn size(&self) -> Option<u32> {
        self.size
    }

    /// Record the flash size (called by flash drivers from `init`)
    pub fn set_size(&mut self, size: u32) {
        self.size = Some(size);
    }
}

/// SPI master driver
pub trait SpiMaster {
    /// Set up a device on `bus` / `chip_select`
    ///
    /// Returns `None` if the device cannot be allocated.
    fn setup_device(&mut self, bus: u8, chip_select: u8) -> Option<SpiDevice>;

    /// Release a device obtained from [`setup_device`](Self::setup_device)
    fn free_device(&mut self, device: SpiDevice);
}

/// SPI flash driver
pub trait SpiFlash {
    /// Read the JEDEC ID of the flash behind `device`
    fn read_id(&mut self, device: &SpiDevice) -> DriverResult<JedecId>;

    /// Initialize the flash behind `device`
    ///
    /// Drivers should record the flash size with [`SpiDevice::set_size`].
    fn init(&mut self, device: &mut SpiDevice) -> DriverResult<()>;

    /// Replace `data.len()` bytes of flash starting at `offset`
    ///
    /// The driver erases whatever it needs to before programming.
    fn update(&mut self, device: &SpiDevice, offset: u32, data: &[u8]) -> DriverResult<()>;
}

impl<T: SpiMaster + ?Sized> SpiMaster for &mut T {
    fn setup_device(&mut self, bus: u8, chip_select: u8) -> Option<SpiDevice> {
        (**self).setup_device(bus, chip_select)
    }

    fn free_device(&mut self, device: SpiDevice) {
        (**self).free_device(device)
    }
}

impl<T: SpiFlash + ?Sized> SpiFlash for &mut T {
    fn read_id(&mut self, device: &SpiDevice) -> DriverResult<JedecId> {
        (**self).read_id(device)
    }

    fn init(&mut self, device: &mut SpiDevice) -> DriverResult<()> {
        (**self).init(device)
    }

    fn update(&mut self, device: &SpiDevice, offset: u32, data: &[u8]) -> DriverResult<()> {
        (**self).update(device, offset, data)
    }
}

// Boxed drivers allow a registry to pick an implementation at runtime
#[cfg(feature = "alloc")]
impl<T: SpiMaster + ?Sized> SpiMaster for alloc::boxed::Box<T> {
    fn setup_device(&mut self, bus: u8, chip_select: u8) -> Option<SpiDevice> {
        (**self).setup_device(bus, chip_select)
    }

    fn free_device(&mut self, device: SpiDevice) {
        (**self).free_device(device)
    }
}

#[cfg(feature = "alloc")]
impl<T: SpiFlash + ?Sized> SpiFlash for alloc::boxed::Box<T> {
    fn read_id(&mut self, device: &SpiDevice) -> DriverResult<JedecId> {
        (**self).read_id(device)
    }

    fn init(&mut self, device: &mut SpiDevice) -> DriverResult<()> {
        (**self).init(device)
    }

    fn update(&mut self, device: &SpiDevice, offset: u32, data: &[u8]) -> DriverResult<()> {
        (**self).update(device, offset, data)
    }
}
