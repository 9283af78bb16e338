//! The transport contract between command producers and a SCSI device.

use std::time::Duration;

use bytes::Bytes;

use crate::cancel::CancelToken;
use crate::cdb::Command;
use crate::error::TransportError;
use crate::inquiry::InquiryData;
use crate::sense::SenseData;
use crate::spc::{Inquiry, RequestSense, TestUnitReady};

/// A device that executes command descriptor blocks.
///
/// Implementations move at most `command.data_transfer_count()` bytes into
/// `data[data_offset..]` and return the number actually transferred. Exactly
/// one command is in flight per call and nothing is retried here.
///
/// # Object Safety
///
/// This trait is object-safe: drivers can hold a `Box<dyn ScsiDevice>`.
pub trait ScsiDevice: Send {
    /// Execute one command.
    ///
    /// # Errors
    ///
    /// * `TransportError::Protocol` - the device rejected or failed the command.
    /// * `TransportError::Timeout` - no completion within `timeout`.
    /// * `TransportError::Cancelled` - `cancel` fired while waiting.
    fn execute_command(
        &mut self,
        command: &dyn Command,
        data: &mut [u8],
        data_offset: usize,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<usize, TransportError>;

    /// Fetch sense data describing the previous failure.
    ///
    /// Always issues a 96-byte REQUEST SENSE.
    fn request_sense(
        &mut self,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<SenseData, TransportError> {
        let command = RequestSense::new();
        let mut data = vec![0u8; RequestSense::SENSE_LENGTH];
        self.execute_command(&command, &mut data, 0, timeout, cancel)?;
        let sense = SenseData::decode(Bytes::from(data))?;
        tracing::debug!(%sense, "request sense");
        Ok(sense)
    }

    /// Issue INQUIRY and decode the standard data.
    fn inquiry(
        &mut self,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<InquiryData, TransportError> {
        let command = Inquiry::default();
        let mut data = vec![0u8; Inquiry::DEFAULT_LENGTH as usize];
        let count = self.execute_command(&command, &mut data, 0, timeout, cancel)?;
        data.truncate(count);
        Ok(InquiryData::decode(Bytes::from(data))?)
    }

    /// Issue TEST UNIT READY.
    fn test_unit_ready(
        &mut self,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<(), TransportError> {
        self.execute_command(&TestUnitReady::new(), &mut [], 0, timeout, cancel)?;
        Ok(())
    }
}

impl<T: ScsiDevice + ?Sized> ScsiDevice for Box<T> {
    fn execute_command(
        &mut self,
        command: &dyn Command,
        data: &mut [u8],
        data_offset: usize,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<usize, TransportError> {
        self.as_mut()
            .execute_command(command, data, data_offset, timeout, cancel)
    }
}
