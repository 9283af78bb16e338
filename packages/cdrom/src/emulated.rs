//! A virtual optical drive backed by a disc image.

use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use strata_scsi::mmc::StartStopAction;
use strata_scsi::{
    opcode, CancelToken, Command, CommandBuffer, ScsiDevice, SenseData, SenseKey, TransportError,
};

// Additional sense codes reported by the emulator.
const ASC_INVALID_OPCODE: u8 = 0x20;
const ASC_LBA_OUT_OF_RANGE: u8 = 0x21;
const ASC_INVALID_FIELD: u8 = 0x24;
const ASC_MEDIUM_MAY_HAVE_CHANGED: u8 = 0x28;
const ASC_MEDIUM_NOT_PRESENT: u8 = 0x3A;
const ASC_REMOVAL_PREVENTED: u8 = 0x53;

/// A SCSI device that serves an in-memory disc image.
///
/// Failing commands end in CHECK CONDITION: the call returns a protocol
/// error without sense data and the sense is kept for the next REQUEST
/// SENSE, the way a real target behaves.
#[derive(Debug)]
pub struct EmulatedCdrom {
    image: Bytes,
    block_length: u32,
    medium_present: bool,
    prevent_removal: bool,
    unit_attention: bool,
    sense: Option<Bytes>,
    vendor: String,
    product: String,
}

impl EmulatedCdrom {
    pub fn new(image: impl Into<Bytes>, block_length: u32) -> Self {
        Self {
            image: image.into(),
            block_length: block_length.max(1),
            medium_present: true,
            prevent_removal: false,
            unit_attention: false,
            sense: None,
            vendor: "STRATA".to_string(),
            product: "EMULATED CD-ROM".to_string(),
        }
    }

    /// Load an image file with 2048-byte blocks.
    pub fn from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let image = std::fs::read(path)?;
        Ok(Self::new(image, 2048))
    }

    /// Identification strings returned by INQUIRY.
    pub fn with_identity(mut self, vendor: &str, product: &str) -> Self {
        self.vendor = vendor.to_string();
        self.product = product.to_string();
        self
    }

    /// Swap in a new disc. The next media command reports a unit attention.
    pub fn insert(&mut self, image: impl Into<Bytes>) {
        self.image = image.into();
        self.medium_present = true;
        self.unit_attention = true;
    }

    pub fn has_medium(&self) -> bool {
        self.medium_present
    }

    pub fn is_removal_prevented(&self) -> bool {
        self.prevent_removal
    }

    fn blocks(&self) -> u64 {
        self.image.len() as u64 / u64::from(self.block_length)
    }

    fn check_condition(&mut self, opcode: u8, key: SenseKey, asc: u8, ascq: u8) -> TransportError {
        self.sense = Some(SenseData::encode(key, asc, ascq));
        TransportError::protocol(opcode, "check condition")
    }

    /// Media commands fail while no disc is loaded or a change is pending.
    fn media_ready(&mut self, opcode: u8) -> Result<(), TransportError> {
        if !self.medium_present {
            return Err(self.check_condition(
                opcode,
                SenseKey::NotReady,
                ASC_MEDIUM_NOT_PRESENT,
                0,
            ));
        }
        if self.unit_attention {
            self.unit_attention = false;
            return Err(self.check_condition(
                opcode,
                SenseKey::UnitAttention,
                ASC_MEDIUM_MAY_HAVE_CHANGED,
                0,
            ));
        }
        Ok(())
    }

    fn inquiry_data(&self) -> Bytes {
        let mut buf = CommandBuffer::allocate(96);
        // Connected CD/DVD device, removable medium.
        buf.set_u8(0, 0x05);
        buf.set_u8(1, 0x80);
        buf.set_u8(2, 0x05);
        buf.set_u8(4, 91);
        buf.set_ascii(8, 8, &self.vendor);
        buf.set_ascii(16, 16, &self.product);
        buf.set_ascii(32, 4, "1.0");
        // MMC-5, SPC-3
        buf.set_u16(58, 0x02A0);
        buf.set_u16(60, 0x0300);
        buf.freeze()
    }

    fn respond(
        &mut self,
        command: &dyn Command,
        data: &mut [u8],
    ) -> Result<usize, TransportError> {
        let cdb = command.cdb();
        let code = command.opcode();
        match code {
            opcode::TEST_UNIT_READY => {
                self.media_ready(code)?;
                Ok(0)
            }
            opcode::REQUEST_SENSE => {
                let sense = self
                    .sense
                    .take()
                    .unwrap_or_else(|| SenseData::encode(SenseKey::NoSense, 0, 0));
                Ok(copy_out(&sense, data, usize::from(cdb.get_u8(4))))
            }
            opcode::INQUIRY => {
                let response = self.inquiry_data();
                Ok(copy_out(&response, data, usize::from(cdb.get_u16(3))))
            }
            opcode::READ_CAPACITY_10 => {
                self.media_ready(code)?;
                let last_lba = self.blocks().saturating_sub(1);
                let mut buf = CommandBuffer::allocate(8);
                buf.set_u32(0, u32::try_from(last_lba).unwrap_or(u32::MAX));
                buf.set_u32(4, self.block_length);
                Ok(copy_out(buf.as_bytes(), data, 8))
            }
            opcode::READ_10 => {
                self.media_ready(code)?;
                let lba = u64::from(cdb.get_u32(2));
                let count = u64::from(cdb.get_u16(7));
                if lba + count > self.blocks() {
                    return Err(self.check_condition(
                        code,
                        SenseKey::IllegalRequest,
                        ASC_LBA_OUT_OF_RANGE,
                        0,
                    ));
                }
                let block = u64::from(self.block_length);
                let start = (lba * block) as usize;
                let len = (count * block) as usize;
                if data.len() < len {
                    return Err(TransportError::protocol(code, "data buffer too small"));
                }
                data[..len].copy_from_slice(&self.image[start..start + len]);
                Ok(len)
            }
            opcode::START_STOP_UNIT => match StartStopAction::from_code(cdb.get_u8(4)) {
                Some(StartStopAction::Eject) if self.prevent_removal => Err(self.check_condition(
                    code,
                    SenseKey::IllegalRequest,
                    ASC_REMOVAL_PREVENTED,
                    0x02,
                )),
                Some(StartStopAction::Eject) => {
                    self.medium_present = false;
                    Ok(0)
                }
                Some(StartStopAction::Load) => {
                    if !self.medium_present {
                        self.medium_present = true;
                        self.unit_attention = true;
                    }
                    Ok(0)
                }
                Some(_) => Ok(0),
                None => Err(self.check_condition(
                    code,
                    SenseKey::IllegalRequest,
                    ASC_INVALID_FIELD,
                    0,
                )),
            },
            opcode::PREVENT_ALLOW_MEDIUM_REMOVAL => {
                self.prevent_removal = cdb.get_u8(4) & 0x01 != 0;
                Ok(0)
            }
            other => Err(self.check_condition(
                other,
                SenseKey::IllegalRequest,
                ASC_INVALID_OPCODE,
                0,
            )),
        }
    }
}

/// Copy at most `allocation` bytes of `response` into `data`.
fn copy_out(response: &[u8], data: &mut [u8], allocation: usize) -> usize {
    let count = response.len().min(allocation).min(data.len());
    data[..count].copy_from_slice(&response[..count]);
    count
}

impl ScsiDevice for EmulatedCdrom {
    fn execute_command(
        &mut self,
        command: &dyn Command,
        data: &mut [u8],
        data_offset: usize,
        _timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<usize, TransportError> {
        cancel.check()?;
        let data = data.get_mut(data_offset..).ok_or_else(|| {
            TransportError::protocol(command.opcode(), "data offset past end of buffer")
        })?;
        let result = self.respond(command, data);
        tracing::trace!(
            command = command.name(),
            ok = result.is_ok(),
            "emulated cdrom"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_scsi::mmc::{MediumRemoval, Read10, ReadCapacity, StartStopUnit};
    use strata_scsi::spc::TestUnitReady;
    use strata_scsi::{CapacityData, DeviceType};

    const T: Duration = Duration::from_secs(1);

    fn exec(
        dev: &mut EmulatedCdrom,
        command: &dyn Command,
        data: &mut [u8],
    ) -> Result<usize, TransportError> {
        dev.execute_command(command, data, 0, T, &CancelToken::new())
    }

    #[test]
    fn capacity_reports_last_lba() {
        let mut dev = EmulatedCdrom::new(vec![0u8; 2048 * 5], 2048);
        let mut data = [0u8; 8];
        assert_eq!(exec(&mut dev, &ReadCapacity::new(), &mut data).unwrap(), 8);
        let capacity = CapacityData::decode(Bytes::copy_from_slice(&data)).unwrap();
        assert_eq!(capacity.logical_block_address(), 4);
        assert_eq!(capacity.block_length(), 2048);
    }

    #[test]
    fn read_honours_data_offset() {
        let image: Vec<u8> = (0..4096).map(|i| (i / 2048) as u8 + 1).collect();
        let mut dev = EmulatedCdrom::new(image, 2048);
        let mut data = vec![0u8; 16 + 2048];
        let n = dev
            .execute_command(&Read10::new(1, 1, 2048), &mut data, 16, T, &CancelToken::new())
            .unwrap();
        assert_eq!(n, 2048);
        assert!(data[..16].iter().all(|&b| b == 0));
        assert!(data[16..].iter().all(|&b| b == 2));
    }

    #[test]
    fn read_out_of_range_sets_sense() {
        let mut dev = EmulatedCdrom::new(vec![0u8; 2048], 2048);
        let mut data = vec![0u8; 4096];
        let err = exec(&mut dev, &Read10::new(0, 2, 2048), &mut data).unwrap_err();
        assert!(err.sense().is_none());
        let sense = dev.request_sense(T, &CancelToken::new()).unwrap();
        assert_eq!(sense.sense_key(), SenseKey::IllegalRequest);
        assert_eq!(sense.asc(), ASC_LBA_OUT_OF_RANGE);
        // Sense is consumed by the request.
        let sense = dev.request_sense(T, &CancelToken::new()).unwrap();
        assert_eq!(sense.sense_key(), SenseKey::NoSense);
    }

    #[test]
    fn eject_respects_prevent() {
        let mut dev = EmulatedCdrom::new(vec![0u8; 2048], 2048);
        exec(&mut dev, &MediumRemoval::prevent(), &mut []).unwrap();
        assert!(exec(&mut dev, &StartStopUnit::new(StartStopAction::Eject), &mut []).is_err());
        assert!(dev.has_medium());
        exec(&mut dev, &MediumRemoval::allow(), &mut []).unwrap();
        exec(&mut dev, &StartStopUnit::new(StartStopAction::Eject), &mut []).unwrap();
        assert!(!dev.has_medium());
        assert!(exec(&mut dev, &TestUnitReady::new(), &mut []).is_err());
    }

    #[test]
    fn insert_raises_unit_attention_once() {
        let mut dev = EmulatedCdrom::new(vec![0u8; 2048], 2048);
        dev.insert(vec![1u8; 4096]);
        assert!(exec(&mut dev, &TestUnitReady::new(), &mut []).is_err());
        let sense = dev.request_sense(T, &CancelToken::new()).unwrap();
        assert_eq!(sense.sense_key(), SenseKey::UnitAttention);
        exec(&mut dev, &TestUnitReady::new(), &mut []).unwrap();
    }

    #[test]
    fn inquiry_identifies_removable_cd() {
        let mut dev = EmulatedCdrom::new(vec![], 2048).with_identity("ACME", "DRIVE");
        let inquiry = dev.inquiry(T, &CancelToken::new()).unwrap();
        assert_eq!(inquiry.device_type(), DeviceType::CdDvd);
        assert!(inquiry.is_removable());
        assert_eq!(inquiry.vendor(), "ACME");
        assert_eq!(inquiry.product(), "DRIVE");
    }

    #[test]
    fn cancelled_before_issue() {
        let mut dev = EmulatedCdrom::new(vec![0u8; 2048], 2048);
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = dev.execute_command(&TestUnitReady::new(), &mut [], 0, T, &cancel);
        assert!(matches!(result, Err(TransportError::Cancelled)));
    }
}
