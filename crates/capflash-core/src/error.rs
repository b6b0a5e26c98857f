//! Error types for capflash-core
//!
//! This module provides no_std compatible error types. Every failure of an
//! update is reported through [`Error`], which keeps enough detail to tell
//! the failing step apart and can be folded onto the two coarse
//! [`ErrorKind`]s that firmware update callers act on.

use core::fmt;

use crate::driver::Protocol;

/// Reasons a firmware image header is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderError {
    /// Buffer is smaller than the fixed header
    TooShort {
        /// Length of the buffer that was provided
        len: usize,
    },
    /// Magic number does not match the main header sentinel
    BadMagic {
        /// Magic value found in the image
        found: u32,
        /// Magic value that was expected
        expected: u32,
    },
    /// Prolog size is not word aligned, smaller than the header, or
    /// larger than the image
    BadPrologSize {
        /// Prolog size declared by the header
        size: u32,
        /// Bytes actually available in the image
        available: usize,
    },
    /// Prolog checksum does not match the recomputed sum
    BadChecksum {
        /// Sum computed over the prolog
        computed: u32,
        /// Checksum stored in the header
        expected: u32,
    },
}

/// Failure reported by a SPI flash or SPI master driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    /// SPI transfer failed
    Transfer,
    /// Operation timed out
    Timeout,
    /// Access extends beyond the flash device
    AddressOutOfBounds,
    /// Flash device is write protected
    WriteProtected,
    /// Device was not set up or not initialized
    NotReady,
    /// Device or operation is not supported by the driver
    Unsupported,
}

/// Request parameter rejected before any driver interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parameter {
    /// Only absolute flash addresses are supported
    AddressType,
    /// Only system firmware can be written
    FirmwareType,
}

/// Step of the device probe sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStep {
    /// Reading the JEDEC ID
    ReadId,
    /// Initializing the flash device
    Init,
}

/// Coarse error classification
///
/// Callers that only need to decide between "bad request" and "the device
/// or image is broken" match on this instead of the full [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller asked for something this platform does not support
    InvalidParameter,
    /// The image, the drivers or the flash device failed
    DeviceError,
}

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Unsupported firmware or address type
    InvalidParameter(Parameter),
    /// A required driver protocol is not installed
    ProtocolNotFound(Protocol),
    /// Firmware image header failed validation
    BadHeader(HeaderError),
    /// The SPI master could not set up the flash device
    DeviceAllocationFailed {
        /// SPI bus number
        bus: u8,
        /// Chip-select line
        chip_select: u8,
    },
    /// Reading the ID or initializing the flash failed
    ProbeFailed {
        /// Step that failed
        step: ProbeStep,
        /// Driver failure
        cause: DriverError,
    },
    /// Writing the image to flash failed
    WriteFailed(DriverError),
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Self::ProtocolNotFound(_)
            | Self::BadHeader(_)
            | Self::DeviceAllocationFailed { .. }
            | Self::ProbeFailed { .. }
            | Self::WriteFailed(_) => ErrorKind::DeviceError,
        }
    }
}

impl From<HeaderError> for Error {
    fn from(err: HeaderError) -> Self {
        Self::BadHeader(err)
    }
}

impl fmt::Display for HeaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { len } => {
                write!(f, "image too short for header ({} bytes)", len)
            }
            Self::BadMagic { found, expected } => {
                write!(f, "bad image magic 0x{:08x} != 0x{:08x}", found, expected)
            }
            Self::BadPrologSize { size, available } => {
                write!(
                    f,
                    "bad prolog size {} (image holds {} bytes)",
                    size, available
                )
            }
            Self::BadChecksum { computed, expected } => {
                write!(f, "bad image checksum 0x{:x} != 0x{:x}", computed, expected)
            }
        }
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transfer => write!(f, "SPI transfer failed"),
            Self::Timeout => write!(f, "operation timed out"),
            Self::AddressOutOfBounds => write!(f, "address out of bounds"),
            Self::WriteProtected => write!(f, "flash device is write protected"),
            Self::NotReady => write!(f, "flash device not ready"),
            Self::Unsupported => write!(f, "operation not supported by driver"),
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddressType => write!(f, "only absolute flash addresses are supported"),
            Self::FirmwareType => write!(f, "only system firmware is supported"),
        }
    }
}

impl fmt::Display for ProbeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadId => write!(f, "reading flash ID"),
            Self::Init => write!(f, "initializing flash device"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameter(param) => write!(f, "invalid parameter: {}", param),
            Self::ProtocolNotFound(protocol) => {
                write!(f, "cannot locate {} protocol", protocol)
            }
            Self::BadHeader(err) => write!(f, "{}", err),
            Self::DeviceAllocationFailed { bus, chip_select } => {
                write!(
                    f,
                    "cannot allocate SPI device on bus {} chip-select {}",
                    bus, chip_select
                )
            }
            Self::ProbeFailed { step, cause } => {
                write!(f, "SPI flash probe failed while {}: {}", step, cause)
            }
            Self::WriteFailed(cause) => write!(f, "flash update failed: {}", cause),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HeaderError {}

#[cfg(feature = "std")]
impl std::error::Error for DriverError {}

#[cfg(feature = "std")]
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::BadHeader(err) => Some(err),
            Self::ProbeFailed { cause, .. } => Some(cause),
            Self::WriteFailed(cause) => Some(cause),
            _ => None,
        }
    }
}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;

/// Result type alias for driver operations
pub type DriverResult<T> = core::result::Result<T, DriverError>;
