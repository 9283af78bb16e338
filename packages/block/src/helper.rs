//! Request validation shared by device drivers.

use crate::device::BlockDevice;
use crate::error::BlockError;

/// Fail unless `offset..offset + length` lies within the device.
pub fn check_bounds<D: BlockDevice + ?Sized>(
    device: &D,
    offset: u64,
    length: u64,
) -> Result<(), BlockError> {
    check_range(device.length()?, offset, length)
}

/// Bounds check against a known device length.
pub fn check_range(device_length: u64, offset: u64, length: u64) -> Result<(), BlockError> {
    match offset.checked_add(length) {
        Some(end) if end <= device_length => Ok(()),
        _ => Err(BlockError::OutOfBounds {
            offset,
            length,
            device_length,
        }),
    }
}

/// Fail unless both `offset` and `length` are multiples of `alignment`.
///
/// An alignment of zero or one accepts everything.
pub fn check_alignment(alignment: u32, offset: u64, length: u64) -> Result<(), BlockError> {
    if alignment <= 1 {
        return Ok(());
    }
    let align = u64::from(alignment);
    if offset % align != 0 || length % align != 0 {
        return Err(BlockError::Misaligned {
            offset,
            length,
            alignment,
        });
    }
    Ok(())
}
