//! Fixed-size big-endian byte buffers.
//!
//! Every SCSI command and response is a flat byte array with fields at
//! protocol-fixed offsets. `CommandBuffer` gives typed access to those fields.
//! Offsets are not validated beyond slice indexing: the layouts are fixed per
//! command, so an out-of-range offset is a programming error and panics.

use bytes::{Bytes, BytesMut};

/// A fixed-length byte buffer with big-endian accessors.
#[derive(Clone, PartialEq, Eq)]
pub struct CommandBuffer {
    data: BytesMut,
}

impl CommandBuffer {
    /// Allocate a zero-filled buffer of `len` bytes.
    pub fn allocate(len: usize) -> Self {
        Self {
            data: BytesMut::zeroed(len),
        }
    }

    /// Wrap an existing byte sequence.
    pub fn wrap(bytes: impl AsRef<[u8]>) -> Self {
        Self {
            data: BytesMut::from(bytes.as_ref()),
        }
    }

    /// Length of the buffer in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True for a zero-length buffer.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Convert into immutable `Bytes` for read-only decoders.
    pub fn freeze(self) -> Bytes {
        self.data.freeze()
    }

    pub fn get_u8(&self, offset: usize) -> u8 {
        self.data[offset]
    }

    pub fn set_u8(&mut self, offset: usize, value: u8) {
        self.data[offset] = value;
    }

    /// Read a 16-bit big-endian value.
    pub fn get_u16(&self, offset: usize) -> u16 {
        read_u16(&self.data, offset)
    }

    /// Write a 16-bit value, most-significant byte first.
    pub fn set_u16(&mut self, offset: usize, value: u16) {
        self.data[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
    }

    /// Read a 32-bit big-endian value.
    pub fn get_u32(&self, offset: usize) -> u32 {
        read_u32(&self.data, offset)
    }

    /// Write a 32-bit value, most-significant byte first.
    pub fn set_u32(&mut self, offset: usize, value: u32) {
        self.data[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
    }

    /// Read `len` bytes at `offset` as ASCII, trimming trailing spaces only.
    pub fn get_ascii(&self, offset: usize, len: usize) -> String {
        read_ascii(&self.data, offset, len)
    }

    /// Write `text` at `offset`, padding with spaces up to `len` bytes.
    pub fn set_ascii(&mut self, offset: usize, len: usize, text: &str) {
        let field = &mut self.data[offset..offset + len];
        field.fill(b' ');
        let src = text.as_bytes();
        let n = src.len().min(len);
        field[..n].copy_from_slice(&src[..n]);
    }
}

impl std::fmt::Debug for CommandBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CommandBuffer[")?;
        for (i, b) in self.data.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:02x}", b)?;
        }
        write!(f, "]")
    }
}

// Slice readers shared by the response decoders, which hold `Bytes` rather
// than a mutable buffer.

pub(crate) fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([data[offset], data[offset + 1]])
}

pub(crate) fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

pub(crate) fn read_ascii(data: &[u8], offset: usize, len: usize) -> String {
    let field = &data[offset..offset + len];
    let text: String = field.iter().map(|&b| b as char).collect();
    text.trim_end_matches(' ').to_string()
}
