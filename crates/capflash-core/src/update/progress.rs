//! Update progress reporting

use crate::driver::JedecId;
use crate::header::FirmwareImageHeader;

use super::UpdateReport;

/// Progress callback for flash updates
pub trait UpdateProgress {
    /// Called once the image header passed validation
    fn header_validated(&mut self, header: &FirmwareImageHeader);

    /// Called once the flash device was identified and initialized
    fn device_probed(&mut self, id: JedecId, size: Option<u32>);

    /// Called right before the image is handed to the flash driver
    fn writing(&mut self, offset: u32, bytes_to_write: usize);

    /// Called when the update succeeded
    fn complete(&mut self, report: &UpdateReport);
}

/// A no-op progress reporter
pub struct NoProgress;

impl UpdateProgress for NoProgress {
    fn header_validated(&mut self, _header: &FirmwareImageHeader) {}
    fn device_probed(&mut self, _id: JedecId, _size: Option<u32>) {}
    fn writing(&mut self, _offset: u32, _bytes_to_write: usize) {}
    fn complete(&mut self, _report: &UpdateReport) {}
}
