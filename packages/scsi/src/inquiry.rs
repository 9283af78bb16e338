//! Standard INQUIRY data.
//!
//! ```text
//! Byte  | Field
//! ------|------------------------------------------
//! 0     | qualifier (bits 5-7), device type (bits 0-4)
//! 1     | RMB (bit 7): removable medium
//! 2     | version
//! 4     | additional length
//! 8-15  | vendor identification (ASCII)
//! 16-31 | product identification (ASCII)
//! 32-35 | product revision level (ASCII)
//! 58-73 | version descriptors (8 x 16-bit)
//! ```

use bytes::Bytes;

use crate::buffer::{read_ascii, read_u16};
use crate::error::DecodeError;

/// Peripheral device type (byte 0, bits 0-4).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceType {
    DirectAccess,
    SequentialAccess,
    Printer,
    Processor,
    WriteOnce,
    CdDvd,
    OpticalMemory,
    MediumChanger,
    StorageArray,
    Enclosure,
    SimplifiedDirectAccess,
    OpticalCard,
    ObjectStorage,
    Unknown,
    Other(u8),
}

impl DeviceType {
    pub fn from_code(code: u8) -> Self {
        match code & 0x1F {
            0x00 => DeviceType::DirectAccess,
            0x01 => DeviceType::SequentialAccess,
            0x02 => DeviceType::Printer,
            0x03 => DeviceType::Processor,
            0x04 => DeviceType::WriteOnce,
            0x05 => DeviceType::CdDvd,
            0x07 => DeviceType::OpticalMemory,
            0x08 => DeviceType::MediumChanger,
            0x0C => DeviceType::StorageArray,
            0x0D => DeviceType::Enclosure,
            0x0E => DeviceType::SimplifiedDirectAccess,
            0x0F => DeviceType::OpticalCard,
            0x11 => DeviceType::ObjectStorage,
            0x1F => DeviceType::Unknown,
            other => DeviceType::Other(other),
        }
    }
}

/// Peripheral qualifier (byte 0, bits 5-7).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Qualifier {
    /// A device of the indicated type is connected.
    Connected,
    /// The unit is supported but not currently connected.
    NotConnected,
    /// No device can be attached at this logical unit.
    NotSupported,
    Other(u8),
}

impl Qualifier {
    pub fn from_code(code: u8) -> Self {
        match code & 0x07 {
            0 => Qualifier::Connected,
            1 => Qualifier::NotConnected,
            3 => Qualifier::NotSupported,
            other => Qualifier::Other(other),
        }
    }
}

/// Decoded standard INQUIRY response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InquiryData {
    data: Bytes,
}

impl InquiryData {
    /// Length of the mandatory part of the response.
    pub const MIN_LENGTH: usize = 36;
    /// Number of version descriptors.
    pub const VERSION_DESCRIPTORS: usize = 8;
    const DESCRIPTORS_OFFSET: usize = 58;

    pub fn decode(data: Bytes) -> Result<Self, DecodeError> {
        if data.len() < Self::MIN_LENGTH {
            return Err(DecodeError::TooShort {
                what: "inquiry",
                expected: Self::MIN_LENGTH,
                actual: data.len(),
            });
        }
        Ok(Self { data })
    }

    pub fn device_type(&self) -> DeviceType {
        DeviceType::from_code(self.data[0])
    }

    pub fn qualifier(&self) -> Qualifier {
        Qualifier::from_code(self.data[0] >> 5)
    }

    pub fn is_removable(&self) -> bool {
        self.data[1] & 0x80 != 0
    }

    pub fn version(&self) -> u8 {
        self.data[2]
    }

    pub fn additional_length(&self) -> u8 {
        self.data[4]
    }

    pub fn vendor(&self) -> String {
        read_ascii(&self.data, 8, 8)
    }

    pub fn product(&self) -> String {
        read_ascii(&self.data, 16, 16)
    }

    pub fn revision(&self) -> String {
        read_ascii(&self.data, 32, 4)
    }

    /// The standards this device claims to conform to.
    ///
    /// Descriptors missing from a short response read as zero.
    pub fn version_descriptors(&self) -> [u16; Self::VERSION_DESCRIPTORS] {
        let mut descriptors = [0u16; Self::VERSION_DESCRIPTORS];
        for (i, slot) in descriptors.iter_mut().enumerate() {
            let offset = Self::DESCRIPTORS_OFFSET + i * 2;
            if offset + 2 <= self.data.len() {
                *slot = read_u16(&self.data, offset);
            }
        }
        descriptors
    }
}

impl std::fmt::Display for InquiryData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} ({:?}{})",
            self.vendor(),
            self.product(),
            self.revision(),
            self.device_type(),
            if self.is_removable() { ", removable" } else { "" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::CommandBuffer;

    fn sample(len: usize) -> Bytes {
        let mut buf = CommandBuffer::allocate(len);
        buf.set_u8(0, 0x05);
        buf.set_u8(1, 0x80);
        buf.set_u8(2, 0x05);
        buf.set_u8(4, (len - 5) as u8);
        buf.set_ascii(8, 8, "STRATA");
        buf.set_ascii(16, 16, "VIRTUAL CD-ROM");
        buf.set_ascii(32, 4, "1.0");
        if len >= 74 {
            buf.set_u16(58, 0x0060);
            buf.set_u16(60, 0x0460);
        }
        buf.freeze()
    }

    #[test]
    fn decodes_identification_fields() {
        let inquiry = InquiryData::decode(sample(96)).unwrap();
        assert_eq!(inquiry.device_type(), DeviceType::CdDvd);
        assert_eq!(inquiry.qualifier(), Qualifier::Connected);
        assert!(inquiry.is_removable());
        assert_eq!(inquiry.vendor(), "STRATA");
        assert_eq!(inquiry.product(), "VIRTUAL CD-ROM");
        assert_eq!(inquiry.revision(), "1.0");
        assert_eq!(inquiry.version(), 0x05);
    }

    #[test]
    fn version_descriptors_decode() {
        let inquiry = InquiryData::decode(sample(96)).unwrap();
        let descriptors = inquiry.version_descriptors();
        assert_eq!(descriptors[0], 0x0060);
        assert_eq!(descriptors[1], 0x0460);
        assert!(descriptors[2..].iter().all(|&d| d == 0));
    }

    #[test]
    fn short_response_has_zero_descriptors() {
        let inquiry = InquiryData::decode(sample(36)).unwrap();
        assert_eq!(inquiry.version_descriptors(), [0u16; 8]);
    }

    #[test]
    fn qualifier_and_unknown_types() {
        let mut raw = sample(36).to_vec();
        raw[0] = (0x03 << 5) | 0x1F;
        let inquiry = InquiryData::decode(Bytes::from(raw)).unwrap();
        assert_eq!(inquiry.qualifier(), Qualifier::NotSupported);
        assert_eq!(inquiry.device_type(), DeviceType::Unknown);
        assert_eq!(DeviceType::from_code(0x15), DeviceType::Other(0x15));
    }

    #[test]
    fn too_short_is_rejected() {
        assert!(InquiryData::decode(Bytes::from_static(&[0u8; 20])).is_err());
    }
}
