//! Block device traits.

use std::sync::Arc;

use crate::error::BlockError;

/// A random-access device addressed in bytes.
///
/// All methods take `&self`: implementations serialize internally, so a
/// device can be shared as `Arc<dyn BlockDevice>` between a filesystem and
/// its callers.
///
/// # Object Safety
///
/// This trait is object-safe.
pub trait BlockDevice: Send + Sync {
    /// Total length of the device in bytes.
    fn length(&self) -> Result<u64, BlockError>;

    /// Size of the smallest addressable unit in bytes.
    fn sector_size(&self) -> Result<u32, BlockError>;

    /// Fill `dst` with the bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// * `BlockError::OutOfBounds` - the range extends past [`length`](Self::length).
    /// * `BlockError::Misaligned` - the device only accepts sector-aligned I/O.
    fn read(&self, offset: u64, dst: &mut [u8]) -> Result<(), BlockError>;

    /// Write `src` at `offset`.
    fn write(&self, offset: u64, src: &[u8]) -> Result<(), BlockError>;

    /// Push any buffered writes to the medium.
    fn flush(&self) -> Result<(), BlockError>;
}

/// A device whose medium can be locked in place and ejected.
pub trait RemovableDevice: BlockDevice {
    fn can_lock(&self) -> bool;

    fn can_eject(&self) -> bool;

    /// Prevent medium removal. Locking a locked device does nothing.
    fn lock(&self) -> Result<(), BlockError>;

    /// Allow medium removal. Unlocking an unlocked device does nothing.
    fn unlock(&self) -> Result<(), BlockError>;

    fn is_locked(&self) -> Result<bool, BlockError>;

    /// Eject the medium.
    ///
    /// Fails with `BlockError::Locked` while removal is prevented.
    fn eject(&self) -> Result<(), BlockError>;
}

impl<T: BlockDevice + ?Sized> BlockDevice for Arc<T> {
    fn length(&self) -> Result<u64, BlockError> {
        (**self).length()
    }

    fn sector_size(&self) -> Result<u32, BlockError> {
        (**self).sector_size()
    }

    fn read(&self, offset: u64, dst: &mut [u8]) -> Result<(), BlockError> {
        (**self).read(offset, dst)
    }

    fn write(&self, offset: u64, src: &[u8]) -> Result<(), BlockError> {
        (**self).write(offset, src)
    }

    fn flush(&self) -> Result<(), BlockError> {
        (**self).flush()
    }
}

impl<T: BlockDevice + ?Sized> BlockDevice for Box<T> {
    fn length(&self) -> Result<u64, BlockError> {
        (**self).length()
    }

    fn sector_size(&self) -> Result<u32, BlockError> {
        (**self).sector_size()
    }

    fn read(&self, offset: u64, dst: &mut [u8]) -> Result<(), BlockError> {
        (**self).read(offset, dst)
    }

    fn write(&self, offset: u64, src: &[u8]) -> Result<(), BlockError> {
        (**self).write(offset, src)
    }

    fn flush(&self) -> Result<(), BlockError> {
        (**self).flush()
    }
}
