//! # strata-cli
//!
//! Command-line access to the Strata storage stack: mount filesystems
//! from a mount table and browse them, or poke at a CD image through the
//! CD-ROM driver.
//!
//! ## Usage
//!
//! ```bash
//! # RAM root and /proc from the built-in table
//! strata ls /proc
//! strata cat /proc/uptime
//!
//! # Extra mounts on the command line
//! strata --mount /net=ftp://ftp.example.org/pub tree /net
//!
//! # Mount table from a file
//! strata --config mounts.json df
//!
//! # Driver view of a disc image
//! strata cdrom info disc.iso
//! ```
//!
//! Logging goes through `RUST_LOG`, e.g. `RUST_LOG=strata_ftpfs=debug`.

pub mod commands;
pub mod config;
pub mod error;
pub mod mounts;

pub use config::{parse_mount_arg, MountConfig, MountTable};
pub use error::CliError;
pub use mounts::{mount_all, open, registry};
