//! strata-block: the block device API filesystems are written against.
//!
//! Drivers (such as the CD-ROM driver in `strata-cdrom`) implement
//! [`BlockDevice`] and, for removable media, [`RemovableDevice`]. Filesystem
//! backends only ever see these traits.
//!
//! # Example
//!
//! ```rust
//! use strata_block::{AlignedReader, ByteArrayDevice};
//!
//! let dev = ByteArrayDevice::new((0..32u8).collect(), 8).aligned();
//! let reader = AlignedReader::new(dev);
//! let mut buf = [0u8; 4];
//! reader.read(6, &mut buf).unwrap();
//! assert_eq!(buf, [6, 7, 8, 9]);
//! ```

mod alignment;
mod device;
mod error;
mod helper;
mod memory;

pub use alignment::AlignedReader;
pub use device::{BlockDevice, RemovableDevice};
pub use error::BlockError;
pub use helper::{check_alignment, check_bounds, check_range};
pub use memory::ByteArrayDevice;
