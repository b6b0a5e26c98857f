//! capflash-dummy - In-memory SPI flash emulator for testing
//!
//! This crate provides a dummy SPI master and SPI flash driver pair backed by
//! a byte vector. It's useful for exercising the update sequence without real
//! hardware, and for checking how the sequence treats its drivers: every
//! driver call is counted and every driver entry point can be made to fail.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;

use bitflags::bitflags;
use capflash_core::driver::{JedecId, ProtocolTable, SpiDevice, SpiFlash, SpiMaster};
use capflash_core::error::{DriverError, DriverResult};

/// The erased value for flash memory (all bits set)
const ERASED_VALUE: u8 = 0xFF;

bitflags! {
    /// Driver entry points that should fail
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Faults: u8 {
        /// `setup_device` returns no device
        const ALLOC   = 1 << 0;
        /// `read_id` fails with a transfer error
        const READ_ID = 1 << 1;
        /// `init` times out
        const INIT    = 1 << 2;
        /// `update` fails with a transfer error
        const UPDATE  = 1 << 3;
    }
}

impl Default for Faults {
    fn default() -> Self {
        Faults::empty()
    }
}

impl Faults {
    /// Parse a `+`-separated list of fault names (`alloc+init`)
    ///
    /// Returns `None` if a name is unknown.
    pub fn from_names(names: &str) -> Option<Self> {
        let mut faults = Faults::empty();
        for name in names.split('+').map(str::trim).filter(|n| !n.is_empty()) {
            faults |= match name {
                "alloc" => Faults::ALLOC,
                "read_id" | "readid" => Faults::READ_ID,
                "init" => Faults::INIT,
                "update" | "write" => Faults::UPDATE,
                _ => return None,
            };
        }
        Some(faults)
    }
}

/// Configuration for the dummy flash
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// JEDEC manufacturer ID
    pub manufacturer_id: u8,
    /// JEDEC device ID
    pub device_id: u16,
    /// Flash size in bytes
    pub size: usize,
    /// Erase sector size
    pub sector_size: usize,
    /// Page size for programming
    pub page_size: usize,
    /// Bus the flash is attached to
    pub bus: u8,
    /// Chip-select the flash is attached to
    pub chip_select: u8,
    /// Entry points that should fail
    pub faults: Faults,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            manufacturer_id: 0xC2, // Macronix
            device_id: 0x2018,     // MX25L12835F
            size: 16 * 1024 * 1024,
            sector_size: 4096,
            page_size: 256,
            bus: 0,
            chip_select: 0,
            faults: Faults::empty(),
        }
    }
}

/// Number of calls made into each driver entry point
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// `SpiMaster::setup_device`
    pub setup_device: usize,
    /// `SpiMaster::free_device`
    pub free_device: usize,
    /// `SpiFlash::read_id`
    pub read_id: usize,
    /// `SpiFlash::init`
    pub init: usize,
    /// `SpiFlash::update`
    pub update: usize,
}

/// A completed `update` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRecord {
    /// Flash offset
    pub offset: u32,
    /// Bytes written
    pub len: usize,
    /// Sectors that had to be erased
    pub sectors_erased: usize,
    /// Pages programmed
    pub pages_programmed: usize,
}

struct DeviceSlot {
    token: u32,
    initialized: bool,
}

struct State {
    config: DummyConfig,
    data: Vec<u8>,
    devices: Vec<DeviceSlot>,
    next_token: u32,
    calls: CallCounts,
    writes: Vec<WriteRecord>,
}

impl State {
    fn slot_mut(&mut self, device: &SpiDevice) -> DriverResult<&mut DeviceSlot> {
        self.devices
            .iter_mut()
            .find(|slot| slot.token == device.token())
            .ok_or(DriverError::NotReady)
    }

    fn erase_sector(&mut self, start: usize, end: usize) {
        for byte in &mut self.data[start..end] {
            *byte = ERASED_VALUE;
        }
    }

    /// Program `bytes` at `addr` page by page, returning the number of pages
    fn program(&mut self, addr: usize, bytes: &[u8]) -> usize {
        let page_size = self.config.page_size;
        let mut pages = 0;
        let mut offset = 0;

        while offset < bytes.len() {
            let pos = addr + offset;
            let step = core::cmp::min(page_size - (pos % page_size), bytes.len() - offset);

            // Flash programming: can only change 1 -> 0
            for (i, &byte) in bytes[offset..offset + step].iter().enumerate() {
                self.data[pos + i] &= byte;
            }

            pages += 1;
            offset += step;
        }

        pages
    }

    /// Read-modify-write every sector touched by `[offset, offset + data.len())`
    ///
    /// Sectors that already hold the wanted bytes are left alone.
    fn update(&mut self, offset: usize, data: &[u8]) -> WriteRecord {
        let sector_size = self.config.sector_size;
        let end = offset + data.len();
        let mut record = WriteRecord {
            offset: offset as u32,
            len: data.len(),
            sectors_erased: 0,
            pages_programmed: 0,
        };

        let mut sector = offset - offset % sector_size;
        while sector < end {
            let sector_end = core::cmp::min(sector + sector_size, self.data.len());
            let lo = core::cmp::max(sector, offset);
            let hi = core::cmp::min(sector_end, end);
            let want = &data[lo - offset..hi - offset];

            if self.data[lo..hi] != *want {
                let mut merged = self.data[sector..sector_end].to_vec();
                merged[lo - sector..hi - sector].copy_from_slice(want);

                self.erase_sector(sector, sector_end);
                record.sectors_erased += 1;
                record.pages_programmed += self.program(sector, &merged);
            }

            sector = sector_end;
        }

        record
    }
}

/// Dummy SPI flash driver
pub struct DummyFlash {
    state: Rc<RefCell<State>>,
}

/// Dummy SPI master driver
pub struct DummyMaster {
    state: Rc<RefCell<State>>,
}

/// Inspection handle onto the emulated flash
///
/// Shares state with the [`DummyFlash`] / [`DummyMaster`] pair it was
/// created with.
#[derive(Clone)]
pub struct DummyMonitor {
    state: Rc<RefCell<State>>,
}

/// Create a connected flash driver, master driver and monitor
///
/// The flash starts out erased.
pub fn new_dummy(config: DummyConfig) -> (DummyFlash, DummyMaster, DummyMonitor) {
    log::debug!(
        "Dummy flash: JEDEC {:02X}:{:04X}, {} bytes, {} byte sectors, {} byte pages",
        config.manufacturer_id,
        config.device_id,
        config.size,
        config.sector_size,
        config.page_size
    );

    let data = vec![ERASED_VALUE; config.size];
    let state = Rc::new(RefCell::new(State {
        config,
        data,
        devices: Vec::new(),
        next_token: 0,
        calls: CallCounts::default(),
        writes: Vec::new(),
    }));

    (
        DummyFlash {
            state: state.clone(),
        },
        DummyMaster {
            state: state.clone(),
        },
        DummyMonitor { state },
    )
}

/// Create a protocol table with both dummy drivers installed
pub fn dummy_protocols(
    config: DummyConfig,
) -> (ProtocolTable<DummyFlash, DummyMaster>, DummyMonitor) {
    let (flash, master, monitor) = new_dummy(config);
    (ProtocolTable::with(flash, master), monitor)
}

impl DummyMonitor {
    /// Calls made so far
    pub fn calls(&self) -> CallCounts {
        self.state.borrow().calls
    }

    /// Completed updates, oldest first
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.state.borrow().writes.clone()
    }

    /// Copy of the flash contents
    pub fn contents(&self) -> Vec<u8> {
        self.state.borrow().data.clone()
    }

    /// Number of devices set up and not yet freed
    pub fn live_devices(&self) -> usize {
        self.state.borrow().devices.len()
    }

    /// Replace the set of failing entry points
    pub fn set_faults(&self, faults: Faults) {
        self.state.borrow_mut().config.faults = faults;
    }

    /// Overwrite flash contents at `offset` without going through a driver
    ///
    /// Data past the end of the flash is dropped.
    pub fn preload(&self, offset: usize, bytes: &[u8]) {
        let mut state = self.state.borrow_mut();
        let size = state.data.len();
        if offset >= size {
            return;
        }
        let len = core::cmp::min(bytes.len(), size - offset);
        state.data[offset..offset + len].copy_from_slice(&bytes[..len]);
    }
}

impl SpiMaster for DummyMaster {
    fn setup_device(&mut self, bus: u8, chip_select: u8) -> Option<SpiDevice> {
        let mut state = self.state.borrow_mut();
        state.calls.setup_device += 1;

        if state.config.faults.contains(Faults::ALLOC) {
            return None;
        }

        if bus != state.config.bus || chip_select != state.config.chip_select {
            log::warn!("Dummy: no flash on bus {} chip-select {}", bus, chip_select);
            return None;
        }

        state.next_token += 1;
        let token = state.next_token;
        state.devices.push(DeviceSlot {
            token,
            initialized: false,
        });
        log::debug!(
            "Dummy: set up device {} (bus {}, cs {})",
            token,
            bus,
            chip_select
        );

        Some(SpiDevice::new(bus, chip_select, token))
    }

    fn free_device(&mut self, device: SpiDevice) {
        let mut state = self.state.borrow_mut();
        state.calls.free_device += 1;

        let before = state.devices.len();
        state.devices.retain(|slot| slot.token != device.token());
        if state.devices.len() == before {
            log::warn!("Dummy: freeing unknown device {}", device.token());
        } else {
            log::debug!("Dummy: freed device {}", device.token());
        }
    }
}

impl SpiFlash for DummyFlash {
    fn read_id(&mut self, device: &SpiDevice) -> DriverResult<JedecId> {
        let mut state = self.state.borrow_mut();
        state.calls.read_id += 1;

        if state.config.faults.contains(Faults::READ_ID) {
            return Err(DriverError::Transfer);
        }
        state.slot_mut(device)?;

        Ok(JedecId {
            manufacturer: state.config.manufacturer_id,
            device: state.config.device_id,
        })
    }

    fn init(&mut self, device: &mut SpiDevice) -> DriverResult<()> {
        let mut state = self.state.borrow_mut();
        state.calls.init += 1;

        if state.config.faults.contains(Faults::INIT) {
            return Err(DriverError::Timeout);
        }
        if state.config.sector_size == 0 || state.config.page_size == 0 {
            return Err(DriverError::Unsupported);
        }

        let size = u32::try_from(state.data.len()).map_err(|_| DriverError::Unsupported)?;
        state.slot_mut(device)?.initialized = true;
        device.set_size(size);

        Ok(())
    }

    fn update(&mut self, device: &SpiDevice, offset: u32, data: &[u8]) -> DriverResult<()> {
        let mut state = self.state.borrow_mut();
        state.calls.update += 1;

        if state.config.faults.contains(Faults::UPDATE) {
            return Err(DriverError::Transfer);
        }
        if !state.slot_mut(device)?.initialized {
            return Err(DriverError::NotReady);
        }

        let offset = offset as usize;
        let end = offset
            .checked_add(data.len())
            .ok_or(DriverError::AddressOutOfBounds)?;
        if end > state.data.len() {
            return Err(DriverError::AddressOutOfBounds);
        }

        let record = state.update(offset, data);
        log::debug!(
            "Dummy: wrote {} bytes at 0x{:x} ({} sectors erased, {} pages programmed)",
            record.len,
            record.offset,
            record.sectors_erased,
            record.pages_programmed
        );
        state.writes.push(record);

        Ok(())
    }
}
