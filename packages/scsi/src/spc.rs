//! Primary commands shared by every device class (SPC).

use crate::cdb::{cdb_command, opcode, Cdb};

/// TEST UNIT READY: asks whether the logical unit can accept media commands.
#[derive(Clone, Debug)]
pub struct TestUnitReady(Cdb);

impl TestUnitReady {
    pub fn new() -> Self {
        Self(Cdb::new(6, opcode::TEST_UNIT_READY, 0))
    }
}

impl Default for TestUnitReady {
    fn default() -> Self {
        Self::new()
    }
}

cdb_command!(TestUnitReady, "TEST UNIT READY");

/// REQUEST SENSE: fetches the sense data describing the last failure.
#[derive(Clone, Debug)]
pub struct RequestSense(Cdb);

impl RequestSense {
    /// Allocation length always requested by [`crate::ScsiDevice::request_sense`].
    pub const SENSE_LENGTH: usize = 96;

    pub fn new() -> Self {
        Self::with_allocation_length(Self::SENSE_LENGTH as u8)
    }

    pub fn with_allocation_length(len: u8) -> Self {
        let mut cdb = Cdb::new(6, opcode::REQUEST_SENSE, len as usize);
        cdb.buffer_mut().set_u8(4, len);
        Self(cdb)
    }
}

impl Default for RequestSense {
    fn default() -> Self {
        Self::new()
    }
}

cdb_command!(RequestSense, "REQUEST SENSE");

/// INQUIRY: fetches the standard device descriptor.
#[derive(Clone, Debug)]
pub struct Inquiry(Cdb);

impl Inquiry {
    /// Enough for the standard data including the version descriptors.
    pub const DEFAULT_LENGTH: u16 = 96;

    pub fn new(allocation_length: u16) -> Self {
        let mut cdb = Cdb::new(6, opcode::INQUIRY, allocation_length as usize);
        cdb.buffer_mut().set_u16(3, allocation_length);
        Self(cdb)
    }
}

impl Default for Inquiry {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LENGTH)
    }
}

cdb_command!(Inquiry, "INQUIRY");
