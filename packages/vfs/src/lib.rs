//! strata-vfs: the virtual filesystem object model.
//!
//! Backends (`strata-ramfs`, `strata-ftpfs`, `strata-jifs`) implement the
//! traits in this crate; callers only ever see them. The contract:
//!
//! - [`FileSystem`] owns one root directory and a [`Device`]
//! - [`FsDirectory`] maps unique names to [`Entry`] values
//! - [`Entry`] is either a [`FileHandle`] or a [`DirHandle`]
//! - every handle is an [`FsObject`] with a validity flag and its owner
//!
//! The mount side is [`FileSystemType`] (probe, create, format) collected in
//! an explicit [`FileSystemRegistry`], and [`Namespace`], a mount table over
//! absolute paths.
//!
//! Backends share [`NodeArena`] for node storage and [`EntryTable`] for
//! per-directory name uniqueness.

mod arena;
mod error;
mod filesystem;
mod names;
pub mod namespace;
mod object;
mod registry;

pub use arena::{NodeArena, NodeId};
pub use error::{FsError, Result};
pub use filesystem::{
    BlockDeviceHandle, Device, FileSystem, FileSystemType, FormatOptions, PartitionTableEntry,
};
pub use names::{CaseSensitivity, EntryTable};
pub use namespace::Namespace;
pub use object::{
    read_to_end, DirHandle, Entry, FileHandle, FsDirectory, FsFile, FsNode, FsObject,
};
pub use registry::FileSystemRegistry;

// Re-exported so backends and callers agree on the timestamp type.
pub use chrono::{DateTime, Utc};
