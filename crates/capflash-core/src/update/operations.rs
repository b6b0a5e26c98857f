//! The update transaction

use crate::driver::{JedecId, ProtocolProvider, Protocols, SpiDevice, SpiFlash, SpiMaster};
use crate::error::{Error, Parameter, ProbeStep, Result};
use crate::header::validate_header;

use super::guard::DeviceGuard;
use super::progress::{NoProgress, UpdateProgress};
use super::{
    FirmwareType, FlashAddressType, UpdateReport, DEFAULT_BUS, DEFAULT_CHIP_SELECT, UPDATE_OFFSET,
};

/// Reject requests this platform cannot serve
fn check_request(firmware_type: FirmwareType, address_type: FlashAddressType) -> Result<()> {
    if address_type != FlashAddressType::AbsoluteAddress {
        log::error!("Only absolute flash addresses are supported");
        return Err(Error::InvalidParameter(Parameter::AddressType));
    }

    if firmware_type != FirmwareType::SystemFirmware {
        log::error!("Only system firmware updates are supported");
        return Err(Error::InvalidParameter(Parameter::FirmwareType));
    }

    Ok(())
}

/// Identify and initialize the flash behind `device`
fn probe<F: SpiFlash + ?Sized>(flash: &mut F, device: &mut SpiDevice) -> Result<JedecId> {
    let id = flash.read_id(device).map_err(|cause| Error::ProbeFailed {
        step: ProbeStep::ReadId,
        cause,
    })?;
    log::debug!("SPI flash JEDEC ID {}", id);

    flash.init(device).map_err(|cause| {
        log::error!("Cannot initialize flash device: {}", cause);
        Error::ProbeFailed {
            step: ProbeStep::Init,
            cause,
        }
    })?;

    Ok(id)
}

/// Write a firmware image to the boot flash
///
/// Equivalent to [`perform_flash_write_with_progress`] with [`NoProgress`].
pub fn perform_flash_write<P: ProtocolProvider + ?Sized>(
    protocols: &mut P,
    firmware_type: FirmwareType,
    address: u64,
    address_type: FlashAddressType,
    image: &[u8],
) -> Result<UpdateReport> {
    perform_flash_write_with_progress(
        protocols,
        firmware_type,
        address,
        address_type,
        image,
        &mut NoProgress,
    )
}

/// Write a firmware image to the boot flash, reporting progress
///
/// The sequence is:
/// 1. Check the firmware and address type (no driver is touched on failure)
/// 2. Locate the SPI flash and SPI master drivers
/// 3. Validate the image header
/// 4. Set up the flash device on bus 0, chip-select 0
/// 5. Read the flash ID and initialize the flash
/// 6. Write the whole image at offset 0
///
/// Once the device is set up it is released on every path out of this
/// function. Nothing is retried.
///
/// The image is always written at [`UPDATE_OFFSET`]. `address` is accepted
/// for interface compatibility only.
///
/// # Arguments
/// * `protocols` - Where to find the drivers
/// * `firmware_type` - Must be [`FirmwareType::SystemFirmware`]
/// * `address` - Requested flash address (ignored)
/// * `address_type` - Must be [`FlashAddressType::AbsoluteAddress`]
/// * `image` - Complete firmware image, starting with its main header
/// * `progress` - Progress callback (use `NoProgress` if not needed)
pub fn perform_flash_write_with_progress<P, R>(
    protocols: &mut P,
    firmware_type: FirmwareType,
    address: u64,
    address_type: FlashAddressType,
    image: &[u8],
    progress: &mut R,
) -> Result<UpdateReport>
where
    P: ProtocolProvider + ?Sized,
    R: UpdateProgress + ?Sized,
{
    check_request(firmware_type, address_type)?;

    if address != u64::from(UPDATE_OFFSET) {
        log::warn!(
            "Requested flash address 0x{:x} ignored, writing at offset 0x{:x}",
            address,
            UPDATE_OFFSET
        );
    }

    let Protocols { flash, master } = protocols.locate().map_err(|protocol| {
        log::error!("Cannot locate {} protocol", protocol);
        Error::ProtocolNotFound(protocol)
    })?;

    let header = validate_header(image).map_err(|err| {
        log::error!("Rejecting image: {}", err);
        Error::BadHeader(err)
    })?;
    progress.header_validated(header);

    let device = master
        .setup_device(DEFAULT_BUS, DEFAULT_CHIP_SELECT)
        .ok_or_else(|| {
            log::error!("Cannot allocate SPI device!");
            Error::DeviceAllocationFailed {
                bus: DEFAULT_BUS,
                chip_select: DEFAULT_CHIP_SELECT,
            }
        })?;
    let mut guard = DeviceGuard::new(master, device);

    let id = probe(&mut *flash, guard.device_mut()).inspect_err(|err| {
        log::error!("Error while performing SPI flash probe: {}", err);
    })?;
    progress.device_probed(id, guard.device().size());

    progress.writing(UPDATE_OFFSET, image.len());
    let status = flash.update(guard.device(), UPDATE_OFFSET, image);
    drop(guard);

    status.map_err(|cause| {
        log::error!("Error while performing flash update: {}", cause);
        Error::WriteFailed(cause)
    })?;

    let report = UpdateReport {
        offset: UPDATE_OFFSET,
        bytes_written: image.len(),
    };
    log::info!(
        "Update {} bytes at offset 0x{:x} succeeded!",
        report.bytes_written,
        report.offset
    );
    progress.complete(&report);

    Ok(report)
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::driver::{Protocol, ProtocolTable};
    use crate::error::{DriverError, ErrorKind, HeaderError};
    use crate::header::{seal_header, FirmwareImageHeader, HEADER_SIZE, MAIN_HEADER_MAGIC};
    use core::cell::RefCell;
    use std::rc::Rc;
    use std::vec;
    use std::vec::Vec;
    use zerocopy::IntoBytes;

    /// Every driver call, in order
    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Setup { bus: u8, chip_select: u8 },
        Free { token: u32 },
        ReadId,
        Init,
        Update { offset: u32, len: usize },
    }

    #[derive(Default)]
    struct Script {
        fail_setup: bool,
        fail_read_id: Option<DriverError>,
        fail_init: Option<DriverError>,
        fail_update: Option<DriverError>,
    }

    type Log = Rc<RefCell<Vec<Call>>>;

    struct MockFlash {
        log: Log,
        script: Rc<Script>,
        written: Vec<u8>,
    }

    struct MockMaster {
        log: Log,
        script: Rc<Script>,
        next_token: u32,
    }

    impl SpiFlash for MockFlash {
        fn read_id(&mut self, _device: &SpiDevice) -> crate::error::DriverResult<JedecId> {
            self.log.borrow_mut().push(Call::ReadId);
            match self.script.fail_read_id {
                Some(err) => Err(err),
                None => Ok(JedecId {
                    manufacturer: 0xC2,
                    device: 0x2018,
                }),
            }
        }

        fn init(&mut self, device: &mut SpiDevice) -> crate::error::DriverResult<()> {
            self.log.borrow_mut().push(Call::Init);
            match self.script.fail_init {
                Some(err) => Err(err),
                None => {
                    device.set_size(16 * 1024 * 1024);
                    Ok(())
                }
            }
        }

        fn update(
            &mut self,
            _device: &SpiDevice,
            offset: u32,
            data: &[u8],
        ) -> crate::error::DriverResult<()> {
            self.log.borrow_mut().push(Call::Update {
                offset,
                len: data.len(),
            });
            match self.script.fail_update {
                Some(err) => Err(err),
                None => {
                    self.written = data.to_vec();
                    Ok(())
                }
            }
        }
    }

    impl SpiMaster for MockMaster {
        fn setup_device(&mut self, bus: u8, chip_select: u8) -> Option<SpiDevice> {
            self.log.borrow_mut().push(Call::Setup { bus, chip_select });
            if self.script.fail_setup {
                return None;
            }
            self.next_token += 1;
            Some(SpiDevice::new(bus, chip_select, self.next_token))
        }

        fn free_device(&mut self, device: SpiDevice) {
            self.log.borrow_mut().push(Call::Free {
                token: device.token(),
            });
        }
    }

    fn mock_drivers(script: Script) -> (MockFlash, MockMaster, Log) {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let script = Rc::new(script);
        let flash = MockFlash {
            log: log.clone(),
            script: script.clone(),
            written: Vec::new(),
        };
        let master = MockMaster {
            log: log.clone(),
            script,
            next_token: 0,
        };
        (flash, master, log)
    }

    fn mock_protocols(script: Script) -> (ProtocolTable<MockFlash, MockMaster>, Log) {
        let (flash, master, log) = mock_drivers(script);
        let mut protocols = ProtocolTable::new();
        assert!(protocols.install_flash(flash).is_none());
        assert!(protocols.install_master(master).is_none());
        (protocols, log)
    }

    /// 64-byte header, everything zero except magic, prolog size and
    /// checksum, followed by a payload
    fn make_image(payload_len: usize) -> Vec<u8> {
        let mut image = vec![0u8; HEADER_SIZE + payload_len];
        image[..HEADER_SIZE].copy_from_slice(FirmwareImageHeader::new(64).as_bytes());
        for (i, byte) in image[HEADER_SIZE..].iter_mut().enumerate() {
            *byte = (i % 251) as u8;
        }
        seal_header(&mut image).unwrap();
        image
    }

    fn write_system(
        protocols: &mut ProtocolTable<MockFlash, MockMaster>,
        image: &[u8],
    ) -> Result<UpdateReport> {
        perform_flash_write(
            protocols,
            FirmwareType::SystemFirmware,
            0,
            FlashAddressType::AbsoluteAddress,
            image,
        )
    }

    fn count(log: &Log, pred: impl Fn(&Call) -> bool) -> usize {
        log.borrow().iter().filter(|call| pred(call)).count()
    }

    #[test]
    fn test_successful_update() {
        let (mut protocols, log) = mock_protocols(Script::default());
        let image = make_image(1000);

        let report = write_system(&mut protocols, &image).unwrap();
        assert_eq!(
            report,
            UpdateReport {
                offset: 0,
                bytes_written: image.len()
            }
        );

        assert_eq!(
            *log.borrow(),
            vec![
                Call::Setup {
                    bus: 0,
                    chip_select: 0
                },
                Call::ReadId,
                Call::Init,
                Call::Update {
                    offset: 0,
                    len: image.len()
                },
                Call::Free { token: 1 },
            ]
        );
        assert_eq!(protocols.flash().unwrap().written, image);
    }

    #[test]
    fn test_non_absolute_address_rejected() {
        let (mut protocols, log) = mock_protocols(Script::default());
        let image = make_image(16);

        let err = perform_flash_write(
            &mut protocols,
            FirmwareType::SystemFirmware,
            0,
            FlashAddressType::RelativeAddress,
            &image,
        )
        .unwrap_err();

        assert_eq!(err, Error::InvalidParameter(Parameter::AddressType));
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_non_system_firmware_rejected() {
        let (mut protocols, log) = mock_protocols(Script::default());
        let image = make_image(16);

        let err = perform_flash_write(
            &mut protocols,
            FirmwareType::NvRam,
            0,
            FlashAddressType::AbsoluteAddress,
            &image,
        )
        .unwrap_err();

        assert_eq!(err, Error::InvalidParameter(Parameter::FirmwareType));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_address_type_checked_first() {
        let (mut protocols, _log) = mock_protocols(Script::default());
        let err = perform_flash_write(
            &mut protocols,
            FirmwareType::NvRam,
            0,
            FlashAddressType::RelativeAddress,
            &[],
        )
        .unwrap_err();
        assert_eq!(err, Error::InvalidParameter(Parameter::AddressType));
    }

    #[test]
    fn test_missing_protocols() {
        let image = make_image(16);

        let (mut protocols, log) = mock_protocols(Script::default());
        protocols.uninstall_flash();
        let err = write_system(&mut protocols, &image).unwrap_err();
        assert_eq!(err, Error::ProtocolNotFound(Protocol::SpiFlash));
        assert_eq!(err.kind(), ErrorKind::DeviceError);
        assert!(log.borrow().is_empty());

        let (mut protocols, log) = mock_protocols(Script::default());
        protocols.uninstall_master();
        let err = write_system(&mut protocols, &image).unwrap_err();
        assert_eq!(err, Error::ProtocolNotFound(Protocol::SpiMaster));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_reinstalled_drivers_replace_previous() {
        let (mut protocols, old_log) = mock_protocols(Script::default());
        let (flash, master, log) = mock_drivers(Script::default());

        let old_flash = protocols.install_flash(flash).unwrap();
        assert!(Rc::ptr_eq(&old_flash.log, &old_log));
        let old_master = protocols.install_master(master).unwrap();
        assert!(Rc::ptr_eq(&old_master.log, &old_log));

        let image = make_image(64);
        write_system(&mut protocols, &image).unwrap();
        assert!(old_log.borrow().is_empty());
        assert_eq!(count(&log, |call| matches!(call, Call::Free { .. })), 1);
    }

    #[test]
    fn test_bad_magic_skips_allocation() {
        let (mut protocols, log) = mock_protocols(Script::default());
        let mut image = make_image(32);
        image[0..4].copy_from_slice(&0u32.to_le_bytes());

        let err = write_system(&mut protocols, &image).unwrap_err();
        assert_eq!(
            err,
            Error::BadHeader(HeaderError::BadMagic {
                found: 0,
                expected: MAIN_HEADER_MAGIC
            })
        );
        assert_eq!(err.kind(), ErrorKind::DeviceError);
        assert_eq!(count(&log, |c| matches!(c, Call::Setup { .. })), 0);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_bad_checksum_skips_allocation() {
        let (mut protocols, log) = mock_protocols(Script::default());
        let mut image = make_image(32);
        image[8] ^= 0x01;
        let before = image.clone();

        let err = write_system(&mut protocols, &image).unwrap_err();
        assert!(matches!(
            err,
            Error::BadHeader(HeaderError::BadChecksum { .. })
        ));
        assert!(log.borrow().is_empty());
        assert_eq!(image, before);
    }

    #[test]
    fn test_allocation_failure() {
        let (mut protocols, log) = mock_protocols(Script {
            fail_setup: true,
            ..Default::default()
        });
        let image = make_image(16);

        let err = write_system(&mut protocols, &image).unwrap_err();
        assert_eq!(
            err,
            Error::DeviceAllocationFailed {
                bus: 0,
                chip_select: 0
            }
        );
        // nothing was allocated, so nothing is freed
        assert_eq!(count(&log, |c| matches!(c, Call::Free { .. })), 0);
        assert_eq!(count(&log, |c| matches!(c, Call::ReadId)), 0);
    }

    #[test]
    fn test_read_id_failure_frees_device_once() {
        let (mut protocols, log) = mock_protocols(Script {
            fail_read_id: Some(DriverError::Transfer),
            ..Default::default()
        });
        let image = make_image(16);

        let err = write_system(&mut protocols, &image).unwrap_err();
        assert_eq!(
            err,
            Error::ProbeFailed {
                step: ProbeStep::ReadId,
                cause: DriverError::Transfer
            }
        );
        assert_eq!(count(&log, |c| matches!(c, Call::Free { token: 1 })), 1);
        assert_eq!(count(&log, |c| matches!(c, Call::Init)), 0);
        assert_eq!(count(&log, |c| matches!(c, Call::Update { .. })), 0);
    }

    #[test]
    fn test_init_failure_frees_device_once() {
        let (mut protocols, log) = mock_protocols(Script {
            fail_init: Some(DriverError::Unsupported),
            ..Default::default()
        });
        let image = make_image(16);

        let err = write_system(&mut protocols, &image).unwrap_err();
        assert_eq!(
            err,
            Error::ProbeFailed {
                step: ProbeStep::Init,
                cause: DriverError::Unsupported
            }
        );
        assert_eq!(count(&log, |c| matches!(c, Call::Free { .. })), 1);
        assert_eq!(count(&log, |c| matches!(c, Call::Update { .. })), 0);
        assert_eq!(log.borrow().last(), Some(&Call::Free { token: 1 }));
    }

    #[test]
    fn test_write_failure_frees_device_once() {
        let (mut protocols, log) = mock_protocols(Script {
            fail_update: Some(DriverError::WriteProtected),
            ..Default::default()
        });
        let image = make_image(16);

        let err = write_system(&mut protocols, &image).unwrap_err();
        assert_eq!(err, Error::WriteFailed(DriverError::WriteProtected));
        assert_eq!(err.kind(), ErrorKind::DeviceError);
        assert_eq!(count(&log, |c| matches!(c, Call::Update { .. })), 1);
        assert_eq!(count(&log, |c| matches!(c, Call::Free { .. })), 1);
        assert_eq!(log.borrow().last(), Some(&Call::Free { token: 1 }));
    }

    #[test]
    fn test_nonzero_address_still_writes_offset_zero() {
        let (mut protocols, log) = mock_protocols(Script::default());
        let image = make_image(8);

        let report = perform_flash_write(
            &mut protocols,
            FirmwareType::SystemFirmware,
            0x10_0000,
            FlashAddressType::AbsoluteAddress,
            &image,
        )
        .unwrap();
        assert_eq!(report.offset, 0);
        assert_eq!(
            count(&log, |c| matches!(c, Call::Update { offset: 0, .. })),
            1
        );
    }

    #[derive(Default)]
    struct RecordingProgress {
        events: Vec<&'static str>,
        probed: Option<(JedecId, Option<u32>)>,
        writing: Option<(u32, usize)>,
    }

    impl UpdateProgress for RecordingProgress {
        fn header_validated(&mut self, header: &FirmwareImageHeader) {
            assert!(header.has_valid_magic());
            self.events.push("header");
        }

        fn device_probed(&mut self, id: JedecId, size: Option<u32>) {
            self.events.push("probed");
            self.probed = Some((id, size));
        }

        fn writing(&mut self, offset: u32, bytes_to_write: usize) {
            self.events.push("writing");
            self.writing = Some((offset, bytes_to_write));
        }

        fn complete(&mut self, report: &UpdateReport) {
            assert_eq!(report.offset, 0);
            self.events.push("complete");
        }
    }

    #[test]
    fn test_progress_events() {
        let (mut protocols, _log) = mock_protocols(Script::default());
        let image = make_image(128);
        let mut progress = RecordingProgress::default();

        perform_flash_write_with_progress(
            &mut protocols,
            FirmwareType::SystemFirmware,
            0,
            FlashAddressType::AbsoluteAddress,
            &image,
            &mut progress,
        )
        .unwrap();

        assert_eq!(progress.events, ["header", "probed", "writing", "complete"]);
        assert_eq!(
            progress.probed,
            Some((
                JedecId {
                    manufacturer: 0xC2,
                    device: 0x2018
                },
                Some(16 * 1024 * 1024)
            ))
        );
        assert_eq!(progress.writing, Some((0, image.len())));
    }

    #[test]
    fn test_progress_not_completed_on_write_failure() {
        let (mut protocols, _log) = mock_protocols(Script {
            fail_update: Some(DriverError::Timeout),
            ..Default::default()
        });
        let image = make_image(128);
        let mut progress = RecordingProgress::default();

        let result = perform_flash_write_with_progress(
            &mut protocols,
            FirmwareType::SystemFirmware,
            0,
            FlashAddressType::AbsoluteAddress,
            &image,
            &mut progress,
        );

        assert!(result.is_err());
        assert_eq!(progress.events, ["header", "probed", "writing"]);
    }
}
