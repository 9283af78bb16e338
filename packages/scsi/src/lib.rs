//! strata-scsi: the device-facing command protocol.
//!
//! This is the bottom of the Strata storage stack. Everything here is bytes
//! at fixed offsets:
//!
//! - [`CommandBuffer`]: fixed-size big-endian buffers with typed accessors
//! - [`Command`] and the concrete CDBs in [`spc`] and [`mmc`]
//! - [`InquiryData`], [`CapacityData`], [`SenseData`]: read-only response views
//! - [`ScsiDevice`]: the transport contract a physical or virtual device
//!   implements, with `request_sense` derived from it
//!
//! # Example
//!
//! ```rust
//! use strata_scsi::{mmc::Read10, Command};
//!
//! let read = Read10::new(16, 2, 2048);
//! assert_eq!(read.opcode(), 0x28);
//! assert_eq!(read.data_transfer_count(), 4096);
//! ```

pub mod buffer;
mod cancel;
pub mod capacity;
pub mod cdb;
mod device;
mod error;
pub mod inquiry;
pub mod mmc;
pub mod sense;
pub mod spc;

pub use buffer::CommandBuffer;
pub use cancel::CancelToken;
pub use capacity::CapacityData;
pub use cdb::{opcode, Cdb, Command};
pub use device::ScsiDevice;
pub use error::{DecodeError, TransportError};
pub use inquiry::{DeviceType, InquiryData, Qualifier};
pub use sense::{SenseData, SenseKey};

// Re-export for response construction by device implementations.
pub use bytes::Bytes;
