//! The CD-ROM driver.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use bytes::Bytes;
use strata_block::{BlockDevice, BlockError, RemovableDevice};
use strata_scsi::mmc::{MediumRemoval, Read10, ReadCapacity, StartStopAction, StartStopUnit};
use strata_scsi::{
    CancelToken, CapacityData, Command, InquiryData, ScsiDevice, SenseKey, TransportError,
};

use crate::error::DriverError;
use crate::state::{DriverState, LockState, MediumState};

/// Additional sense code: medium not present.
const ASC_MEDIUM_NOT_PRESENT: u8 = 0x3A;

/// Driver tuning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DriverConfig {
    /// Deadline handed to the transport for every command.
    pub command_timeout: Duration,
    /// Upper bound on the block count of one READ(10).
    pub max_blocks_per_read: u16,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(10),
            max_blocks_per_read: 32,
        }
    }
}

struct Inner<D> {
    device: D,
    state: DriverState,
}

/// Read-only driver for a removable optical drive.
///
/// Sequences SCSI commands over a [`ScsiDevice`]: capacity discovery with a
/// cache that is refreshed only after a medium change, lock/unlock of the
/// tray, eject, and block reads. All operations serialize on one mutex, so
/// no two commands are ever in flight on the same transport.
///
/// # Example
///
/// ```rust
/// use strata_block::BlockDevice;
/// use strata_cdrom::{CdromDriver, DriverConfig, EmulatedCdrom};
///
/// let image = vec![0u8; 2048 * 8];
/// let driver = CdromDriver::new(EmulatedCdrom::new(image, 2048), DriverConfig::default());
/// driver.start().unwrap();
/// assert_eq!(driver.sector_size().unwrap(), 2048);
/// ```
pub struct CdromDriver<D> {
    inner: Mutex<Inner<D>>,
    config: DriverConfig,
}

impl<D: ScsiDevice> CdromDriver<D> {
    pub fn new(device: D, config: DriverConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                device,
                state: DriverState::Stopped,
            }),
            config,
        }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    fn lock_inner(&self) -> Result<MutexGuard<'_, Inner<D>>, DriverError> {
        self.inner.lock().map_err(|_| DriverError::Poisoned)
    }

    /// Enter `Started` with the medium marked changed and the tray unlocked.
    ///
    /// Starting a started driver does nothing.
    pub fn start(&self) -> Result<(), DriverError> {
        let mut inner = self.lock_inner()?;
        if !inner.state.is_started() {
            inner.state = DriverState::started();
            tracing::debug!("cdrom driver started");
        }
        Ok(())
    }

    /// Return to `Stopped`.
    ///
    /// Always attempts to allow medium removal first, whatever the lock
    /// state, so the tray is never left locked after teardown. Failures of
    /// that attempt are logged and ignored.
    pub fn stop(&self) -> Result<(), DriverError> {
        let mut inner = self.lock_inner()?;
        if !inner.state.is_started() {
            return Ok(());
        }
        if let Err(e) = inner.execute(&MediumRemoval::allow(), &mut [], &self.config, &CancelToken::new())
        {
            tracing::warn!(error = %e, "unlock on stop failed");
        }
        inner.state = DriverState::Stopped;
        tracing::debug!("cdrom driver stopped");
        Ok(())
    }

    pub fn is_started(&self) -> Result<bool, DriverError> {
        Ok(self.lock_inner()?.state.is_started())
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> Result<DriverState, DriverError> {
        Ok(self.lock_inner()?.state.clone())
    }

    /// Mark the medium changed, e.g. after a unit attention was observed
    /// elsewhere. The next capacity consumer refreshes.
    pub fn notify_media_changed(&self) -> Result<(), DriverError> {
        let mut inner = self.lock_inner()?;
        inner.mark_changed();
        Ok(())
    }

    /// Capacity of the current medium, refreshed if the medium changed.
    pub fn capacity(&self) -> Result<CapacityData, DriverError> {
        self.capacity_with(&CancelToken::new())
    }

    /// Like [`capacity`](Self::capacity), with an explicit cancellation token.
    pub fn capacity_with(&self, cancel: &CancelToken) -> Result<CapacityData, DriverError> {
        let mut inner = self.lock_inner()?;
        inner.ensure_capacity(&self.config, cancel)
    }

    /// Issue INQUIRY.
    pub fn inquiry(&self) -> Result<InquiryData, DriverError> {
        let mut inner = self.lock_inner()?;
        inner.require_started()?;
        Ok(inner
            .device
            .inquiry(self.config.command_timeout, &CancelToken::new())?)
    }

    /// Fill `dst` from byte `offset` of the medium.
    pub fn read_with(
        &self,
        offset: u64,
        dst: &mut [u8],
        cancel: &CancelToken,
    ) -> Result<(), DriverError> {
        let mut inner = self.lock_inner()?;
        let capacity = inner.ensure_capacity(&self.config, cancel)?;
        let block_length = capacity.block_length();
        let device_length = capacity.device_length();
        let length = dst.len() as u64;

        match offset.checked_add(length) {
            Some(end) if end <= device_length => {}
            _ => {
                return Err(DriverError::OutOfBounds {
                    offset,
                    length,
                    device_length,
                })
            }
        }
        let block = u64::from(block_length);
        if block == 0 || offset % block != 0 || length % block != 0 {
            return Err(DriverError::Misaligned {
                offset,
                length,
                block_length,
            });
        }

        let mut lba = offset / block;
        let mut remaining = length / block;
        let max_blocks = u64::from(self.config.max_blocks_per_read.max(1));
        let mut done = 0usize;
        while remaining > 0 {
            let count = remaining.min(max_blocks);
            let bytes = (count * block) as usize;
            let lba32 = u32::try_from(lba).map_err(|_| DriverError::OutOfBounds {
                offset,
                length,
                device_length,
            })?;
            let command = Read10::new(lba32, count as u16, block_length);
            let transferred =
                inner.execute(&command, &mut dst[done..done + bytes], &self.config, cancel)?;
            if transferred != bytes {
                return Err(TransportError::protocol(
                    command.opcode(),
                    format!("short transfer: {} of {} bytes", transferred, bytes),
                )
                .into());
            }
            lba += count;
            remaining -= count;
            done += bytes;
        }
        tracing::trace!(offset, length, "cdrom read");
        Ok(())
    }

    /// Prevent medium removal. Issues nothing when already locked.
    pub fn lock(&self) -> Result<(), DriverError> {
        self.set_lock(LockState::Locked)
    }

    /// Allow medium removal. Issues nothing when already unlocked.
    pub fn unlock(&self) -> Result<(), DriverError> {
        self.set_lock(LockState::Unlocked)
    }

    fn set_lock(&self, wanted: LockState) -> Result<(), DriverError> {
        let mut inner = self.lock_inner()?;
        let current = inner.state.lock_state().ok_or(DriverError::NotStarted)?;
        if current == wanted {
            return Ok(());
        }
        let command = match wanted {
            LockState::Locked => MediumRemoval::prevent(),
            LockState::Unlocked => MediumRemoval::allow(),
        };
        inner.execute(&command, &mut [], &self.config, &CancelToken::new())?;
        if let DriverState::Started { lock, .. } = &mut inner.state {
            *lock = wanted;
        }
        tracing::debug!(state = ?wanted, "medium removal");
        Ok(())
    }

    pub fn is_locked(&self) -> Result<bool, DriverError> {
        let inner = self.lock_inner()?;
        let lock = inner.state.lock_state().ok_or(DriverError::NotStarted)?;
        Ok(lock == LockState::Locked)
    }

    /// Eject the medium. Fails with `Locked`, issuing nothing, while locked.
    pub fn eject(&self) -> Result<(), DriverError> {
        let mut inner = self.lock_inner()?;
        match inner.state.lock_state() {
            None => return Err(DriverError::NotStarted),
            Some(LockState::Locked) => return Err(DriverError::Locked),
            Some(LockState::Unlocked) => {}
        }
        inner.execute(
            &StartStopUnit::new(StartStopAction::Eject),
            &mut [],
            &self.config,
            &CancelToken::new(),
        )?;
        inner.mark_changed();
        tracing::debug!("medium ejected");
        Ok(())
    }
}

impl<D: ScsiDevice> Inner<D> {
    fn require_started(&self) -> Result<(), DriverError> {
        if self.state.is_started() {
            Ok(())
        } else {
            Err(DriverError::NotStarted)
        }
    }

    fn mark_changed(&mut self) {
        if let DriverState::Started { medium, .. } = &mut self.state {
            *medium = MediumState::Changed;
        }
    }

    fn ensure_capacity(
        &mut self,
        config: &DriverConfig,
        cancel: &CancelToken,
    ) -> Result<CapacityData, DriverError> {
        self.require_started()?;
        if let Some(capacity) = self.state.capacity() {
            return Ok(capacity.clone());
        }

        let mut data = [0u8; ReadCapacity::RESPONSE_LENGTH];
        let count = self.execute(&ReadCapacity::new(), &mut data, config, cancel)?;
        let capacity = CapacityData::decode(Bytes::copy_from_slice(&data[..count]))?;
        tracing::debug!(
            lba = capacity.logical_block_address(),
            block_length = capacity.block_length(),
            "capacity refreshed"
        );
        if let DriverState::Started { medium, .. } = &mut self.state {
            *medium = MediumState::Ready(capacity.clone());
        }
        Ok(capacity)
    }

    /// Issue one command. Protocol failures without sense data are
    /// diagnosed with REQUEST SENSE before being returned.
    fn execute(
        &mut self,
        command: &dyn Command,
        data: &mut [u8],
        config: &DriverConfig,
        cancel: &CancelToken,
    ) -> Result<usize, DriverError> {
        tracing::trace!(
            command = command.name(),
            transfer = command.data_transfer_count(),
            "issue"
        );
        match self
            .device
            .execute_command(command, data, 0, config.command_timeout, cancel)
        {
            Ok(count) => Ok(count),
            Err(TransportError::Protocol {
                opcode,
                message,
                sense: None,
            }) => {
                let sense = match self.device.request_sense(config.command_timeout, cancel) {
                    Ok(sense) => Some(sense),
                    Err(e) => {
                        tracing::debug!(error = %e, "request sense failed");
                        None
                    }
                };
                Err(self.classify(TransportError::Protocol {
                    opcode,
                    message,
                    sense,
                }))
            }
            Err(e) => Err(self.classify(e)),
        }
    }

    fn classify(&mut self, error: TransportError) -> DriverError {
        tracing::debug!(error = %error, "command failed");
        if let Some(sense) = error.sense() {
            match sense.sense_key() {
                SenseKey::UnitAttention => self.mark_changed(),
                SenseKey::NotReady if sense.asc() == ASC_MEDIUM_NOT_PRESENT => {
                    self.mark_changed();
                    return DriverError::NoMedium;
                }
                _ => {}
            }
        }
        DriverError::Transport(error)
    }
}

impl<D: ScsiDevice> BlockDevice for CdromDriver<D> {
    fn length(&self) -> Result<u64, BlockError> {
        Ok(self.capacity()?.device_length())
    }

    fn sector_size(&self) -> Result<u32, BlockError> {
        Ok(self.capacity()?.block_length())
    }

    fn read(&self, offset: u64, dst: &mut [u8]) -> Result<(), BlockError> {
        Ok(self.read_with(offset, dst, &CancelToken::new())?)
    }

    fn write(&self, _offset: u64, _src: &[u8]) -> Result<(), BlockError> {
        Err(BlockError::Unsupported { operation: "write" })
    }

    fn flush(&self) -> Result<(), BlockError> {
        Ok(())
    }
}

impl<D: ScsiDevice> RemovableDevice for CdromDriver<D> {
    fn can_lock(&self) -> bool {
        true
    }

    fn can_eject(&self) -> bool {
        true
    }

    fn lock(&self) -> Result<(), BlockError> {
        Ok(CdromDriver::lock(self)?)
    }

    fn unlock(&self) -> Result<(), BlockError> {
        Ok(CdromDriver::unlock(self)?)
    }

    fn is_locked(&self) -> Result<bool, BlockError> {
        Ok(CdromDriver::is_locked(self)?)
    }

    fn eject(&self) -> Result<(), BlockError> {
        Ok(CdromDriver::eject(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulated::EmulatedCdrom;

    fn driver(blocks: usize) -> CdromDriver<EmulatedCdrom> {
        let image: Vec<u8> = (0..blocks * 2048).map(|i| (i / 2048) as u8).collect();
        let driver = CdromDriver::new(EmulatedCdrom::new(image, 2048), DriverConfig::default());
        driver.start().unwrap();
        driver
    }

    #[test]
    fn operations_require_start() {
        let driver = CdromDriver::new(
            EmulatedCdrom::new(vec![0u8; 4096], 2048),
            DriverConfig::default(),
        );
        assert!(matches!(driver.capacity(), Err(DriverError::NotStarted)));
        assert!(matches!(driver.lock(), Err(DriverError::NotStarted)));
        assert!(matches!(driver.eject(), Err(DriverError::NotStarted)));
        assert!(matches!(
            BlockDevice::length(&driver),
            Err(BlockError::NotStarted)
        ));
    }

    #[test]
    fn length_is_block_length_times_last_lba() {
        let driver = driver(10);
        let capacity = driver.capacity().unwrap();
        assert_eq!(capacity.block_length(), 2048);
        assert_eq!(capacity.logical_block_address(), 9);
        assert_eq!(BlockDevice::length(&driver).unwrap(), 2048 * 9);
        assert_eq!(BlockDevice::sector_size(&driver).unwrap(), 2048);
    }

    #[test]
    fn read_spans_multiple_commands() {
        let config = DriverConfig {
            max_blocks_per_read: 2,
            ..DriverConfig::default()
        };
        let image: Vec<u8> = (0..8 * 2048).map(|i| (i / 2048) as u8).collect();
        let driver = CdromDriver::new(EmulatedCdrom::new(image, 2048), config);
        driver.start().unwrap();

        let mut buf = vec![0u8; 5 * 2048];
        BlockDevice::read(&driver, 2048, &mut buf).unwrap();
        for (i, chunk) in buf.chunks(2048).enumerate() {
            assert!(chunk.iter().all(|&b| b == (i + 1) as u8));
        }
    }

    #[test]
    fn misaligned_and_out_of_bounds_reads() {
        let driver = driver(4);
        let mut buf = vec![0u8; 100];
        assert!(matches!(
            driver.read_with(0, &mut buf, &CancelToken::new()),
            Err(DriverError::Misaligned { .. })
        ));
        let mut buf = vec![0u8; 4096];
        assert!(matches!(
            driver.read_with(4096, &mut buf, &CancelToken::new()),
            Err(DriverError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn write_is_unsupported() {
        let driver = driver(4);
        assert!(matches!(
            BlockDevice::write(&driver, 0, &[0u8; 2048]),
            Err(BlockError::Unsupported { operation: "write" })
        ));
    }

    #[test]
    fn eject_then_no_medium() {
        let driver = driver(4);
        driver.capacity().unwrap();
        driver.eject().unwrap();
        assert!(driver.state().unwrap().is_changed());
        assert!(matches!(driver.capacity(), Err(DriverError::NoMedium)));
    }

    #[test]
    fn locked_tray_refuses_eject() {
        let driver = driver(4);
        driver.lock().unwrap();
        assert!(driver.is_locked().unwrap());
        assert!(matches!(driver.eject(), Err(DriverError::Locked)));
        driver.unlock().unwrap();
        driver.eject().unwrap();
    }

    #[test]
    fn stop_returns_to_stopped() {
        let driver = driver(4);
        driver.lock().unwrap();
        driver.stop().unwrap();
        assert_eq!(driver.state().unwrap(), DriverState::Stopped);
        driver.start().unwrap();
        assert!(!driver.is_locked().unwrap());
        assert!(driver.state().unwrap().is_changed());
    }

    #[test]
    fn inquiry_passthrough() {
        let driver = driver(1);
        let inquiry = driver.inquiry().unwrap();
        assert!(inquiry.is_removable());
        assert_eq!(inquiry.device_type(), strata_scsi::DeviceType::CdDvd);
    }
}
