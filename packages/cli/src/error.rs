//! CLI errors.

use std::path::PathBuf;

use strata_cdrom::DriverError;
use strata_ftpfs::FtpError;
use strata_vfs::FsError;

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Fs(#[from] FsError),

    #[error("cd-rom: {0}")]
    Driver(#[from] DriverError),

    #[error("ftp: {0}")]
    Ftp(#[from] FtpError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot read mount config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A `--mount` argument that does not parse.
    #[error("invalid mount `{0}`: expected PATH=SPEC")]
    InvalidMount(String),
}
