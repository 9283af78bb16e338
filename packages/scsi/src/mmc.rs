//! Multimedia and block commands (MMC/SBC).

use crate::cdb::{cdb_command, opcode, Cdb};

/// READ CAPACITY(10): returns the last LBA and the block length.
#[derive(Clone, Debug)]
pub struct ReadCapacity(Cdb);

impl ReadCapacity {
    /// Size of the response: two 32-bit fields.
    pub const RESPONSE_LENGTH: usize = 8;

    pub fn new() -> Self {
        Self(Cdb::new(10, opcode::READ_CAPACITY_10, Self::RESPONSE_LENGTH))
    }
}

impl Default for ReadCapacity {
    fn default() -> Self {
        Self::new()
    }
}

cdb_command!(ReadCapacity, "READ CAPACITY(10)");

/// READ(10): reads `block_count` blocks starting at `lba`.
///
/// Layout: LBA at offset 2 (32-bit), transfer length at offset 7 (16-bit).
#[derive(Clone, Debug)]
pub struct Read10(Cdb);

impl Read10 {
    pub fn new(lba: u32, block_count: u16, block_length: u32) -> Self {
        let transfer = block_count as usize * block_length as usize;
        let mut cdb = Cdb::new(10, opcode::READ_10, transfer);
        let buffer = cdb.buffer_mut();
        buffer.set_u32(2, lba);
        buffer.set_u16(7, block_count);
        Self(cdb)
    }

    pub fn lba(&self) -> u32 {
        self.0.buffer().get_u32(2)
    }

    pub fn block_count(&self) -> u16 {
        self.0.buffer().get_u16(7)
    }
}

cdb_command!(Read10, "READ(10)");

/// Power condition / medium action encoded in byte 4 of START STOP UNIT.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum StartStopAction {
    Stop = 0x00,
    Start = 0x01,
    Eject = 0x02,
    Load = 0x03,
    Idle = 0x20,
    Standby = 0x30,
    Sleep = 0x50,
}

impl StartStopAction {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(Self::Stop),
            0x01 => Some(Self::Start),
            0x02 => Some(Self::Eject),
            0x03 => Some(Self::Load),
            0x20 => Some(Self::Idle),
            0x30 => Some(Self::Standby),
            0x50 => Some(Self::Sleep),
            _ => None,
        }
    }
}

/// START STOP UNIT: spins the unit up or down, or loads/ejects the medium.
#[derive(Clone, Debug)]
pub struct StartStopUnit(Cdb);

impl StartStopUnit {
    pub fn new(action: StartStopAction) -> Self {
        let mut cdb = Cdb::new(6, opcode::START_STOP_UNIT, 0);
        cdb.buffer_mut().set_u8(4, action.code());
        Self(cdb)
    }

    pub fn action(&self) -> Option<StartStopAction> {
        StartStopAction::from_code(self.0.buffer().get_u8(4))
    }
}

cdb_command!(StartStopUnit, "START STOP UNIT");

/// PREVENT ALLOW MEDIUM REMOVAL: locks or unlocks the tray.
#[derive(Clone, Debug)]
pub struct MediumRemoval(Cdb);

impl MediumRemoval {
    pub fn prevent() -> Self {
        Self::new(true)
    }

    pub fn allow() -> Self {
        Self::new(false)
    }

    fn new(prevent: bool) -> Self {
        let mut cdb = Cdb::new(6, opcode::PREVENT_ALLOW_MEDIUM_REMOVAL, 0);
        cdb.buffer_mut().set_u8(4, prevent as u8);
        Self(cdb)
    }

    pub fn is_prevent(&self) -> bool {
        self.0.buffer().get_u8(4) & 0x01 != 0
    }
}

cdb_command!(MediumRemoval, "PREVENT ALLOW MEDIUM REMOVAL");
