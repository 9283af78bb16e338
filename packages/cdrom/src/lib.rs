//! strata-cdrom: a removable-media driver over the SCSI transport.
//!
//! [`CdromDriver`] sequences commands from `strata-scsi` against any
//! [`ScsiDevice`](strata_scsi::ScsiDevice) and exposes the result through the
//! `strata-block` traits. The driver's state is an explicit value
//! ([`DriverState`]): capacity is cached until the medium changes, the tray
//! lock is tracked so lock/unlock are idempotent, and eject is refused while
//! locked.
//!
//! [`EmulatedCdrom`] is a virtual drive over a disc image, used by tests and
//! by the command-line tool.

mod driver;
mod emulated;
mod error;
mod state;

pub use driver::{CdromDriver, DriverConfig};
pub use emulated::EmulatedCdrom;
pub use error::DriverError;
pub use state::{DriverState, LockState, MediumState};
