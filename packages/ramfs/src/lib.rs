//! strata-ramfs: a memory-resident filesystem with byte-budget accounting.
//!
//! Files live in buffers whose capacity doubles on growth and halves on
//! shrink (see [`buffer`]). The filesystem keeps two counters under its
//! mutex, total allocated capacity and total logical length, and refuses
//! growth beyond its budget with `FsError::Full` without changing anything.

pub mod buffer;
mod directory;
mod file;
mod filesystem;

pub use directory::RamDirectory;
pub use file::RamFile;
pub use filesystem::{RamConfig, RamDevice, RamFileSystem, RamFileSystemType, RAMFS_TYPE};
