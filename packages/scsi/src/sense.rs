//! Fixed-format sense data.

use bytes::Bytes;

use crate::buffer::read_u32;
use crate::error::DecodeError;

/// The sixteen sense keys, in code order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SenseKey {
    NoSense,
    RecoveredError,
    NotReady,
    MediumError,
    HardwareError,
    IllegalRequest,
    UnitAttention,
    DataProtect,
    BlankCheck,
    VendorSpecific,
    CopyAborted,
    AbortedCommand,
    Obsolete,
    VolumeOverflow,
    Miscompare,
    Reserved,
}

const SENSE_KEYS: [SenseKey; 16] = [
    SenseKey::NoSense,
    SenseKey::RecoveredError,
    SenseKey::NotReady,
    SenseKey::MediumError,
    SenseKey::HardwareError,
    SenseKey::IllegalRequest,
    SenseKey::UnitAttention,
    SenseKey::DataProtect,
    SenseKey::BlankCheck,
    SenseKey::VendorSpecific,
    SenseKey::CopyAborted,
    SenseKey::AbortedCommand,
    SenseKey::Obsolete,
    SenseKey::VolumeOverflow,
    SenseKey::Miscompare,
    SenseKey::Reserved,
];

impl SenseKey {
    /// Look up a sense key; codes above 0x0F are rejected.
    pub fn from_code(code: u8) -> Option<Self> {
        SENSE_KEYS.get(code as usize).copied()
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn description(self) -> &'static str {
        match self {
            SenseKey::NoSense => "no sense",
            SenseKey::RecoveredError => "recovered error",
            SenseKey::NotReady => "not ready",
            SenseKey::MediumError => "medium error",
            SenseKey::HardwareError => "hardware error",
            SenseKey::IllegalRequest => "illegal request",
            SenseKey::UnitAttention => "unit attention",
            SenseKey::DataProtect => "data protect",
            SenseKey::BlankCheck => "blank check",
            SenseKey::VendorSpecific => "vendor specific",
            SenseKey::CopyAborted => "copy aborted",
            SenseKey::AbortedCommand => "aborted command",
            SenseKey::Obsolete => "obsolete",
            SenseKey::VolumeOverflow => "volume overflow",
            SenseKey::Miscompare => "miscompare",
            SenseKey::Reserved => "reserved",
        }
    }
}

impl std::fmt::Display for SenseKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Decoded fixed-format sense data (response codes 0x70/0x71).
#[derive(Clone, PartialEq, Eq)]
pub struct SenseData {
    data: Bytes,
}

impl SenseData {
    /// Bytes needed to reach the additional sense code qualifier.
    pub const MIN_LENGTH: usize = 14;

    pub fn decode(data: Bytes) -> Result<Self, DecodeError> {
        if data.len() < Self::MIN_LENGTH {
            return Err(DecodeError::TooShort {
                what: "sense",
                expected: Self::MIN_LENGTH,
                actual: data.len(),
            });
        }
        Ok(Self { data })
    }

    /// Build fixed-format sense bytes, as a device would report them.
    pub fn encode(key: SenseKey, asc: u8, ascq: u8) -> Bytes {
        let mut data = vec![0u8; 18];
        data[0] = 0x70;
        data[2] = key.code();
        data[7] = 10;
        data[12] = asc;
        data[13] = ascq;
        Bytes::from(data)
    }

    pub fn response_code(&self) -> u8 {
        self.data[0] & 0x7F
    }

    /// The information field is valid.
    pub fn is_valid(&self) -> bool {
        self.data[0] & 0x80 != 0
    }

    /// Sense key, masked to its four bits so the table lookup cannot fail.
    pub fn sense_key(&self) -> SenseKey {
        SENSE_KEYS[(self.data[2] & 0x0F) as usize]
    }

    pub fn information(&self) -> u32 {
        read_u32(&self.data, 3)
    }

    pub fn additional_length(&self) -> u8 {
        self.data[7]
    }

    /// Additional sense code.
    pub fn asc(&self) -> u8 {
        self.data[12]
    }

    /// Additional sense code qualifier.
    pub fn ascq(&self) -> u8 {
        self.data[13]
    }
}

impl std::fmt::Debug for SenseData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SenseData")
            .field("response_code", &format_args!("{:#04x}", self.response_code()))
            .field("sense_key", &self.sense_key())
            .field("asc", &format_args!("{:#04x}", self.asc()))
            .field("ascq", &format_args!("{:#04x}", self.ascq()))
            .finish()
    }
}

impl std::fmt::Display for SenseData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}, asc={:#04x} ascq={:#04x}",
            self.sense_key(),
            self.asc(),
            self.ascq()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sense_key_table_covers_all_codes() {
        assert_eq!(SenseKey::from_code(0x00), Some(SenseKey::NoSense));
        assert_eq!(SenseKey::from_code(0x05), Some(SenseKey::IllegalRequest));
        assert_eq!(SenseKey::from_code(0x0F), Some(SenseKey::Reserved));
        assert_eq!(SenseKey::from_code(0x10), None);
        assert_eq!(SenseKey::from_code(0xFF), None);
        for code in 0..16u8 {
            assert_eq!(SenseKey::from_code(code).unwrap().code(), code);
        }
    }

    #[test]
    fn decodes_fixed_format() {
        let sense = SenseData::decode(SenseData::encode(SenseKey::NotReady, 0x3A, 0x01)).unwrap();
        assert_eq!(sense.response_code(), 0x70);
        assert_eq!(sense.sense_key(), SenseKey::NotReady);
        assert_eq!(sense.asc(), 0x3A);
        assert_eq!(sense.ascq(), 0x01);
        assert_eq!(sense.additional_length(), 10);
        assert!(!sense.is_valid());
    }

    #[test]
    fn high_bits_of_key_byte_are_ignored() {
        let mut raw = SenseData::encode(SenseKey::MediumError, 0, 0).to_vec();
        raw[2] |= 0xE0; // filemark / EOM / ILI flags
        let sense = SenseData::decode(Bytes::from(raw)).unwrap();
        assert_eq!(sense.sense_key(), SenseKey::MediumError);
    }

    #[test]
    fn display_is_readable() {
        let sense = SenseData::decode(SenseData::encode(SenseKey::IllegalRequest, 0x24, 0)).unwrap();
        assert_eq!(format!("{}", sense), "illegal request, asc=0x24 ascq=0x00");
    }

    #[test]
    fn short_buffer_is_rejected() {
        assert!(SenseData::decode(Bytes::from_static(&[0x70, 0, 2])).is_err());
    }
}
