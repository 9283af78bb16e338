//! Unaligned reads over sector-aligned devices.

use crate::device::BlockDevice;
use crate::error::BlockError;
use crate::helper::check_bounds;

/// Serves arbitrary byte ranges from a device that only accepts whole
/// sectors.
///
/// Aligned middle sectors go straight into the caller's buffer; a partial
/// head or tail sector is read into a sector-sized bounce buffer and the
/// requested slice copied out.
pub struct AlignedReader<D> {
    device: D,
}

impl<D: BlockDevice> AlignedReader<D> {
    pub fn new(device: D) -> Self {
        Self { device }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn into_inner(self) -> D {
        self.device
    }

    /// Read `dst.len()` bytes at `offset` regardless of alignment.
    pub fn read(&self, offset: u64, dst: &mut [u8]) -> Result<(), BlockError> {
        if dst.is_empty() {
            return Ok(());
        }
        check_bounds(&self.device, offset, dst.len() as u64)?;
        let sector = u64::from(self.device.sector_size()?.max(1));
        let sector_len = sector as usize;

        let mut bounce = vec![0u8; sector_len];
        let mut pos = offset;
        let mut done = 0usize;

        while done < dst.len() {
            let within = (pos % sector) as usize;
            let remaining = dst.len() - done;

            if within == 0 && remaining >= sector_len {
                let whole = remaining - remaining % sector_len;
                self.device.read(pos, &mut dst[done..done + whole])?;
                done += whole;
                pos += whole as u64;
                continue;
            }

            let base = pos - within as u64;
            let take = (sector_len - within).min(remaining);
            let device_length = self.device.length()?;
            // The last sector of a device may be short.
            let avail = ((device_length - base) as usize).min(sector_len);
            self.device.read(base, &mut bounce[..avail])?;
            dst[done..done + take].copy_from_slice(&bounce[within..within + take]);
            done += take;
            pos += take as u64;
        }
        tracing::trace!(offset, length = dst.len(), "aligned read");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::ByteArrayDevice;

    fn device() -> ByteArrayDevice {
        let data: Vec<u8> = (0..64u8).collect();
        ByteArrayDevice::new(data, 8).aligned()
    }

    #[test]
    fn unaligned_head_and_tail() {
        let reader = AlignedReader::new(device());
        let mut buf = [0u8; 21];
        reader.read(5, &mut buf).unwrap();
        let expected: Vec<u8> = (5..26u8).collect();
        assert_eq!(buf.to_vec(), expected);
    }

    #[test]
    fn within_one_sector() {
        let reader = AlignedReader::new(device());
        let mut buf = [0u8; 3];
        reader.read(9, &mut buf).unwrap();
        assert_eq!(buf, [9, 10, 11]);
    }

    #[test]
    fn aligned_passthrough() {
        let reader = AlignedReader::new(device());
        let mut buf = [0u8; 16];
        reader.read(16, &mut buf).unwrap();
        assert_eq!(buf[0], 16);
        assert_eq!(buf[15], 31);
    }

    #[test]
    fn past_end_is_rejected() {
        let reader = AlignedReader::new(device());
        let mut buf = [0u8; 8];
        assert!(matches!(
            reader.read(60, &mut buf),
            Err(BlockError::OutOfBounds { .. })
        ));
    }
}
