//! strata-jifs: a synthetic filesystem exposing live system state.
//!
//! Nothing is stored. Every file is rendered from a [`SystemInfo`] when it
//! is reached through a directory or read from the start, so two reads of
//! `uptime` never return stale numbers. The whole tree is read-only.
//!
//! State comes in through [`SystemInfo`]; [`HostSystemInfo`] reports on the
//! running process and takes a shared [`PluginRegistry`].

mod directory;
mod file;
mod filesystem;
mod info;
mod plugins;

pub use directory::JifsDirectory;
pub use file::JifsFile;
pub use filesystem::{
    Generator, JifsBuilder, JifsDevice, JifsFileSystem, JifsFileSystemType, JIFS_TYPE,
};
pub use info::{HostSystemInfo, MemoryInfo, SystemInfo, ThreadInfo};
pub use plugins::{PluginDescriptor, PluginRegistry};
