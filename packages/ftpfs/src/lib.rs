//! strata-ftpfs: a read-only filesystem over an FTP server.
//!
//! The tree is built lazily: a directory is listed the first time it is
//! looked into, and a file is downloaded the first time it is read. Both
//! results are kept for the life of the filesystem. Nothing is ever
//! written back; mutations fail with `FsError::ReadOnly`, except file
//! writes and resizes which are accepted and ignored.
//!
//! The network side is the [`RemoteClient`] trait. [`FtpClient`] implements
//! it over TCP in passive mode.

mod client;
mod config;
mod directory;
mod error;
mod file;
mod filesystem;
mod ftp;

pub use client::{parse_mlsd_line, RemoteClient, RemoteEntry, RemoteKind};
pub use config::{FtpConfig, DEFAULT_PORT};
pub use directory::FtpDirectory;
pub use error::FtpError;
pub use file::FtpFile;
pub use filesystem::{FtpDevice, FtpFileSystem, FtpFileSystemType, FTPFS_TYPE};
pub use ftp::{parse_pasv, FtpClient, Reply};
