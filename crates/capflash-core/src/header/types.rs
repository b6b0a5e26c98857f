//! Main header layout

use core::mem::{offset_of, size_of};

use zerocopy::byteorder::{LittleEndian, U32};
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

/// Main header magic number
pub const MAIN_HEADER_MAGIC: u32 = 0xB105_B002;

/// Size of the fixed main header in bytes
pub const HEADER_SIZE: usize = 64;

/// Byte offset of the prolog checksum field
pub const PROLOG_CHECKSUM_OFFSET: usize = offset_of!(FirmwareImageHeader, prolog_checksum);

/// Firmware image main header
///
/// Sits at offset 0 of every image. The prolog (this header plus any
/// extension headers, `prolog_size` bytes in total) is covered by
/// `prolog_checksum`. Fields past `prolog_checksum` are consumed by the
/// boot ROM and carried here as opaque values.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct FirmwareImageHeader {
    /// Must be [`MAIN_HEADER_MAGIC`]
    pub magic: U32<LittleEndian>,
    /// Length of the prolog covered by the checksum
    pub prolog_size: U32<LittleEndian>,
    /// 32-bit sum of the prolog words, this field counted as zero
    pub prolog_checksum: U32<LittleEndian>,
    /// Size of the boot image following the prolog
    pub boot_image_size: U32<LittleEndian>,
    /// Checksum of the boot image
    pub boot_image_checksum: U32<LittleEndian>,
    /// Reserved
    pub reserved0: U32<LittleEndian>,
    /// Address the boot image is loaded to
    pub load_addr: U32<LittleEndian>,
    /// Entry point of the boot image
    pub exec_addr: U32<LittleEndian>,
    /// UART configuration for the boot ROM
    pub uart_config: u8,
    /// UART baudrate selector
    pub baudrate: u8,
    /// Number of extension headers
    pub ext_count: u8,
    /// Auxiliary flags
    pub aux_flags: u8,
    /// Boot ROM I/O arguments
    pub io_arg: [U32<LittleEndian>; 4],
    /// Reserved
    pub reserved1: [U32<LittleEndian>; 3],
}

const _: () = assert!(size_of::<FirmwareImageHeader>() == HEADER_SIZE);

impl FirmwareImageHeader {
    /// Create a header with the correct magic and the given prolog size
    ///
    /// All other fields are zero, including the checksum.
    pub fn new(prolog_size: u32) -> Self {
        let mut header = Self::new_zeroed();
        header.magic.set(MAIN_HEADER_MAGIC);
        header.prolog_size.set(prolog_size);
        header
    }

    /// Borrow the header at the start of `image`
    ///
    /// Returns `None` if the image is shorter than [`HEADER_SIZE`].
    pub fn from_image(image: &[u8]) -> Option<&Self> {
        Self::ref_from_prefix(image).ok().map(|(header, _)| header)
    }

    /// Mutably borrow the header at the start of `image`
    pub fn from_image_mut(image: &mut [u8]) -> Option<&mut Self> {
        Self::mut_from_prefix(image).ok().map(|(header, _)| header)
    }

    /// Magic number
    pub fn magic(&self) -> u32 {
        self.magic.get()
    }

    /// Prolog size in bytes
    pub fn prolog_size(&self) -> u32 {
        self.prolog_size.get()
    }

    /// Stored prolog checksum
    pub fn prolog_checksum(&self) -> u32 {
        self.prolog_checksum.get()
    }

    /// Boot image size in bytes
    pub fn boot_image_size(&self) -> u32 {
        self.boot_image_size.get()
    }

    /// Stored boot image checksum
    pub fn boot_image_checksum(&self) -> u32 {
        self.boot_image_checksum.get()
    }

    /// Load address of the boot image
    pub fn load_addr(&self) -> u32 {
        self.load_addr.get()
    }

    /// Execution address of the boot image
    pub fn exec_addr(&self) -> u32 {
        self.exec_addr.get()
    }

    /// I/O argument `index` (0..4)
    pub fn io_arg(&self, index: usize) -> Option<u32> {
        self.io_arg.get(index).map(|arg| arg.get())
    }

    /// Whether the magic number is the main header sentinel
    pub fn has_valid_magic(&self) -> bool {
        self.magic() == MAIN_HEADER_MAGIC
    }
}
