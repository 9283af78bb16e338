//! READ CAPACITY response.

use bytes::Bytes;

use crate::buffer::read_u32;
use crate::error::DecodeError;

/// Decoded READ CAPACITY(10) response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapacityData {
    data: Bytes,
}

impl CapacityData {
    pub const LENGTH: usize = 8;

    pub fn decode(data: Bytes) -> Result<Self, DecodeError> {
        if data.len() < Self::LENGTH {
            return Err(DecodeError::TooShort {
                what: "capacity",
                expected: Self::LENGTH,
                actual: data.len(),
            });
        }
        Ok(Self { data })
    }

    /// Address of the last addressable block.
    pub fn logical_block_address(&self) -> u32 {
        read_u32(&self.data, 0)
    }

    /// Block length in bytes.
    pub fn block_length(&self) -> u32 {
        read_u32(&self.data, 4)
    }

    /// Device length in bytes: block length times the last block address.
    pub fn device_length(&self) -> u64 {
        self.block_length() as u64 * self.logical_block_address() as u64
    }
}
