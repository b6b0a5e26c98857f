//! Prolog checksum and header validation
//!
//! The prolog checksum is the wrapping 32-bit sum of all little-endian
//! words in the first `prolog_size` bytes of the image, with the checksum
//! field itself counted as zero. Validation never writes to the image:
//! the stored checksum word is subtracted back out of the running sum,
//! which yields the same value as zeroing the field first.

use crate::error::HeaderError;

use super::types::{FirmwareImageHeader, HEADER_SIZE, MAIN_HEADER_MAGIC};

/// Wrapping sum of the little-endian words in `data`
///
/// Trailing bytes that do not form a full word are ignored.
pub fn sum32(data: &[u8]) -> u32 {
    data.chunks_exact(4)
        .map(|word| u32::from_le_bytes([word[0], word[1], word[2], word[3]]))
        .fold(0u32, u32::wrapping_add)
}

/// Borrow the header and the prolog it declares, checking the prolog size
fn prolog(image: &[u8]) -> Result<(&FirmwareImageHeader, &[u8]), HeaderError> {
    let header =
        FirmwareImageHeader::from_image(image).ok_or(HeaderError::TooShort { len: image.len() })?;

    let size = header.prolog_size();
    let len = size as usize;
    if len < HEADER_SIZE || !len.is_multiple_of(4) || len > image.len() {
        return Err(HeaderError::BadPrologSize {
            size,
            available: image.len(),
        });
    }

    Ok((header, &image[..len]))
}

/// Compute the prolog checksum of `image`
///
/// The magic number is not checked, so this can be used to fill in the
/// checksum of an image under construction.
pub fn compute_prolog_checksum(image: &[u8]) -> Result<u32, HeaderError> {
    let (header, prolog) = prolog(image)?;
    Ok(sum32(prolog).wrapping_sub(header.prolog_checksum()))
}

/// Validate the main header at the start of `image`
///
/// Checks, in order: the image holds a full header, the magic number,
/// the prolog size and the prolog checksum. On success the parsed header
/// is returned borrowed from `image`.
pub fn validate_header(image: &[u8]) -> Result<&FirmwareImageHeader, HeaderError> {
    let header =
        FirmwareImageHeader::from_image(image).ok_or(HeaderError::TooShort { len: image.len() })?;

    if !header.has_valid_magic() {
        return Err(HeaderError::BadMagic {
            found: header.magic(),
            expected: MAIN_HEADER_MAGIC,
        });
    }

    let computed = compute_prolog_checksum(image)?;
    let expected = header.prolog_checksum();
    if computed != expected {
        return Err(HeaderError::BadChecksum { computed, expected });
    }

    log::trace!(
        "Image header OK: prolog {} bytes, checksum 0x{:08x}",
        header.prolog_size(),
        expected
    );

    Ok(header)
}

/// Store the correct prolog checksum into `image`
///
/// Returns the checksum that was written. The magic number and prolog size
/// must already be valid.
pub fn seal_header(image: &mut [u8]) -> Result<u32, HeaderError> {
    let len = image.len();
    let header = FirmwareImageHeader::from_image(image).ok_or(HeaderError::TooShort { len })?;
    if !header.has_valid_magic() {
        return Err(HeaderError::BadMagic {
            found: header.magic(),
            expected: MAIN_HEADER_MAGIC,
        });
    }

    let checksum = compute_prolog_checksum(image)?;
    let header = FirmwareImageHeader::from_image_mut(image).ok_or(HeaderError::TooShort { len })?;
    header.prolog_checksum.set(checksum);

    Ok(checksum)
}
