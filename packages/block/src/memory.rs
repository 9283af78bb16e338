//! In-memory block device.

use std::sync::RwLock;

use crate::device::BlockDevice;
use crate::error::BlockError;
use crate::helper::{check_alignment, check_range};

/// A block device backed by a byte vector.
///
/// Used for tests and for probing first sectors without real hardware. The
/// sector size only constrains I/O when `aligned` is set, which makes it a
/// convenient stand-in for devices that reject unaligned requests.
#[derive(Debug)]
pub struct ByteArrayDevice {
    data: RwLock<Vec<u8>>,
    sector_size: u32,
    aligned: bool,
    read_only: bool,
}

impl ByteArrayDevice {
    pub fn new(data: Vec<u8>, sector_size: u32) -> Self {
        Self {
            data: RwLock::new(data),
            sector_size,
            aligned: false,
            read_only: false,
        }
    }

    /// A zero-filled device of `length` bytes.
    pub fn zeroed(length: usize, sector_size: u32) -> Self {
        Self::new(vec![0u8; length], sector_size)
    }

    /// Require sector-aligned offsets and lengths.
    pub fn aligned(mut self) -> Self {
        self.aligned = true;
        self
    }

    /// Reject writes with `Unsupported`.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> Result<Vec<u8>, BlockError> {
        Ok(self.data.read().map_err(|_| poisoned())?.clone())
    }

    fn check(&self, device_length: u64, offset: u64, length: u64) -> Result<(), BlockError> {
        check_range(device_length, offset, length)?;
        if self.aligned {
            check_alignment(self.sector_size, offset, length)?;
        }
        Ok(())
    }
}

fn poisoned() -> BlockError {
    BlockError::transport(std::io::Error::new(
        std::io::ErrorKind::Other,
        "device lock poisoned",
    ))
}

impl BlockDevice for ByteArrayDevice {
    fn length(&self) -> Result<u64, BlockError> {
        Ok(self.data.read().map_err(|_| poisoned())?.len() as u64)
    }

    fn sector_size(&self) -> Result<u32, BlockError> {
        Ok(self.sector_size)
    }

    fn read(&self, offset: u64, dst: &mut [u8]) -> Result<(), BlockError> {
        let data = self.data.read().map_err(|_| poisoned())?;
        self.check(data.len() as u64, offset, dst.len() as u64)?;
        let start = offset as usize;
        dst.copy_from_slice(&data[start..start + dst.len()]);
        Ok(())
    }

    fn write(&self, offset: u64, src: &[u8]) -> Result<(), BlockError> {
        if self.read_only {
            return Err(BlockError::Unsupported { operation: "write" });
        }
        let mut data = self.data.write().map_err(|_| poisoned())?;
        self.check(data.len() as u64, offset, src.len() as u64)?;
        let start = offset as usize;
        data[start..start + src.len()].copy_from_slice(src);
        Ok(())
    }

    fn flush(&self) -> Result<(), BlockError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_write() {
        let dev = ByteArrayDevice::zeroed(16, 4);
        dev.write(3, b"abc").unwrap();
        let mut buf = [0u8; 5];
        dev.read(2, &mut buf).unwrap();
        assert_eq!(&buf, b"\0abc\0");
        assert_eq!(dev.length().unwrap(), 16);
    }

    #[test]
    fn out_of_bounds() {
        let dev = ByteArrayDevice::zeroed(8, 4);
        let mut buf = [0u8; 4];
        assert!(matches!(
            dev.read(6, &mut buf),
            Err(BlockError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn aligned_device_rejects_unaligned_io() {
        let dev = ByteArrayDevice::zeroed(16, 4).aligned();
        let mut buf = [0u8; 3];
        assert!(matches!(
            dev.read(4, &mut buf),
            Err(BlockError::Misaligned { alignment: 4, .. })
        ));
        let mut buf = [0u8; 4];
        dev.read(4, &mut buf).unwrap();
    }

    #[test]
    fn read_only_rejects_write() {
        let dev = ByteArrayDevice::zeroed(8, 4).read_only();
        assert!(matches!(
            dev.write(0, b"x"),
            Err(BlockError::Unsupported { operation: "write" })
        ));
    }
}
