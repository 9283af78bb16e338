//! Command descriptor blocks.
//!
//! A CDB is a fixed-length command buffer whose first byte is the operation
//! code. Concrete commands live in [`crate::spc`] (primary commands shared by
//! all device classes) and [`crate::mmc`] (multimedia/block commands).

use crate::buffer::CommandBuffer;

/// Operation codes used by this crate.
pub mod opcode {
    pub const TEST_UNIT_READY: u8 = 0x00;
    pub const REQUEST_SENSE: u8 = 0x03;
    pub const INQUIRY: u8 = 0x12;
    pub const START_STOP_UNIT: u8 = 0x1B;
    pub const PREVENT_ALLOW_MEDIUM_REMOVAL: u8 = 0x1E;
    pub const READ_CAPACITY_10: u8 = 0x25;
    pub const READ_10: u8 = 0x28;
}

/// A command that can be handed to a [`ScsiDevice`](crate::ScsiDevice).
///
/// # Object Safety
///
/// This trait is object-safe: transports take `&dyn Command`.
pub trait Command: Send + Sync {
    /// The encoded command bytes.
    fn cdb(&self) -> &CommandBuffer;

    /// Number of bytes the command expects to move in its data phase.
    ///
    /// Zero for commands without a data phase.
    fn data_transfer_count(&self) -> usize;

    /// Short name for logging.
    fn name(&self) -> &'static str;

    /// Operation code (byte 0).
    fn opcode(&self) -> u8 {
        self.cdb().get_u8(0)
    }
}

/// A raw CDB: an opcode, a fixed length and a transfer count.
///
/// The typed commands are thin wrappers around this.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cdb {
    buffer: CommandBuffer,
    transfer_count: usize,
}

impl Cdb {
    /// Create a zeroed CDB of `len` bytes with `opcode` at byte 0.
    pub fn new(len: usize, opcode: u8, transfer_count: usize) -> Self {
        let mut buffer = CommandBuffer::allocate(len);
        buffer.set_u8(0, opcode);
        Self {
            buffer,
            transfer_count,
        }
    }

    /// The encoded command bytes.
    pub fn buffer(&self) -> &CommandBuffer {
        &self.buffer
    }

    /// Mutable access to the buffer while a command is being built.
    pub(crate) fn buffer_mut(&mut self) -> &mut CommandBuffer {
        &mut self.buffer
    }

    /// Length of the encoded command.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Command for Cdb {
    fn cdb(&self) -> &CommandBuffer {
        &self.buffer
    }

    fn data_transfer_count(&self) -> usize {
        self.transfer_count
    }

    fn name(&self) -> &'static str {
        "RAW"
    }
}

/// Implements [`Command`] for a newtype around [`Cdb`].
macro_rules! cdb_command {
    ($ty:ty, $name:literal) => {
        impl $crate::cdb::Command for $ty {
            fn cdb(&self) -> &$crate::buffer::CommandBuffer {
                $crate::cdb::Command::cdb(&self.0)
            }

            fn data_transfer_count(&self) -> usize {
                $crate::cdb::Command::data_transfer_count(&self.0)
            }

            fn name(&self) -> &'static str {
                $name
            }
        }
    };
}

pub(crate) use cdb_command;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_cdb_has_opcode_at_byte_zero() {
        let cdb = Cdb::new(10, 0x42, 0);
        assert_eq!(cdb.len(), 10);
        assert_eq!(cdb.opcode(), 0x42);
        assert!(cdb.cdb().as_bytes()[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn raw_cdb_is_object_safe() {
        let cdb = Cdb::new(6, opcode::TEST_UNIT_READY, 0);
        let command: &dyn Command = &cdb;
        assert_eq!(command.data_transfer_count(), 0);
        assert_eq!(command.name(), "RAW");
    }
}
