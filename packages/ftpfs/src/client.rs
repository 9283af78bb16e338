//! The remote side of the filesystem.

use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::FtpError;

/// Kind of a remote directory entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteKind {
    File,
    Directory,
}

/// One entry of a remote listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub kind: RemoteKind,
    pub size: Option<u64>,
    pub modified: Option<DateTime<Utc>>,
}

impl RemoteEntry {
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            kind: RemoteKind::File,
            size: Some(size),
            modified: None,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: RemoteKind::Directory,
            size: None,
            modified: None,
        }
    }
}

/// Operations the filesystem needs from a server.
///
/// Calls block for the duration of the network exchange. The filesystem
/// serializes them under its own mutex.
pub trait RemoteClient: Send {
    /// List the directory at an absolute remote path.
    fn list(&mut self, path: &str) -> Result<Vec<RemoteEntry>, FtpError>;

    /// Fetch the whole file at an absolute remote path.
    fn retrieve(&mut self, path: &str) -> Result<Bytes, FtpError>;

    /// End the session.
    fn quit(&mut self) -> Result<(), FtpError>;
}

/// Parse one line of an MLSD listing.
///
/// Returns `None` for the `cdir`/`pdir` entries and for entry types that
/// are neither files nor directories.
///
/// ```text
/// type=file;size=1024;modify=20240131120000; notes.txt
/// ```
pub fn parse_mlsd_line(line: &str) -> Result<Option<RemoteEntry>, FtpError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (facts, name) = line
        .split_once(' ')
        .ok_or_else(|| FtpError::malformed("listing line", line))?;
    if name.is_empty() {
        return Err(FtpError::malformed("listing line", line));
    }

    let mut kind = None;
    let mut size = None;
    let mut modified = None;
    for fact in facts.split(';').filter(|f| !f.is_empty()) {
        let (key, value) = fact
            .split_once('=')
            .ok_or_else(|| FtpError::malformed("listing fact", fact))?;
        match key.to_ascii_lowercase().as_str() {
            "type" => {
                kind = match value.to_ascii_lowercase().as_str() {
                    "file" => Some(RemoteKind::File),
                    "dir" => Some(RemoteKind::Directory),
                    _ => return Ok(None),
                }
            }
            "size" => {
                size = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| FtpError::malformed("size fact", value))?,
                )
            }
            "modify" => modified = parse_modify(value),
            _ => {}
        }
    }

    let kind = kind.ok_or_else(|| FtpError::malformed("listing line without type", line))?;
    Ok(Some(RemoteEntry {
        name: name.to_string(),
        kind,
        size,
        modified,
    }))
}

/// `YYYYMMDDHHMMSS[.sss]`, always UTC.
fn parse_modify(value: &str) -> Option<DateTime<Utc>> {
    let stamp = value.get(..14)?;
    NaiveDateTime::parse_from_str(stamp, "%Y%m%d%H%M%S")
        .ok()
        .map(|t| t.and_utc())
}
