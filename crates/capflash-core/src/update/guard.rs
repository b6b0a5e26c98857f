//! Scoped device ownership

use crate::driver::{SpiDevice, SpiMaster};

/// Owns an allocated [`SpiDevice`] and frees it through its master on drop
///
/// Every exit from the scope holding the guard, including early returns
/// through `?`, releases the device exactly once.
pub struct DeviceGuard<'a, M: SpiMaster + ?Sized> {
    master: &'a mut M,
    device: Option<SpiDevice>,
}

impl<'a, M: SpiMaster + ?Sized> DeviceGuard<'a, M> {
    /// Take ownership of `device`, which must have been issued by `master`
    pub fn new(master: &'a mut M, device: SpiDevice) -> Self {
        Self {
            master,
            device: Some(device),
        }
    }

    /// The guarded device
    pub fn device(&self) -> &SpiDevice {
        match &self.device {
            Some(device) => device,
            None => unreachable!("device taken before drop"),
        }
    }

    /// The guarded device, mutably
    pub fn device_mut(&mut self) -> &mut SpiDevice {
        match &mut self.device {
            Some(device) => device,
            None => unreachable!("device taken before drop"),
        }
    }
}

impl<M: SpiMaster + ?Sized> Drop for DeviceGuard<'_, M> {
    fn drop(&mut self) {
        let Some(device) = self.device.take() else {
            return;
        };
        log::debug!(
            "Releasing SPI device (bus {}, cs {})",
            device.bus(),
            device.chip_select()
        );
        self.master.free_device(device);
    }
}
