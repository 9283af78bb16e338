//! The directory-tree contract every backend implements.
//!
//! A mounted [`FileSystem`] owns one root directory. Directories map unique
//! names to [`Entry`] values, and an entry is either a file or a directory.
//! Every handle is also an [`FsObject`]: it knows whether it is still valid
//! and which filesystem owns it.
//!
//! # Validity
//!
//! A handle becomes invalid exactly when its node is removed from the tree
//! or when the filesystem closes. After that every call except
//! [`FsObject::is_valid`] and [`FsObject::file_system`] fails, with
//! [`FsError::Closed`] once the filesystem is closed and
//! [`FsError::InvalidObject`] otherwise.
//!
//! [`FsError::Closed`]: crate::FsError::Closed
//! [`FsError::InvalidObject`]: crate::FsError::InvalidObject

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::{FsError, Result};
use crate::filesystem::FileSystem;

/// Handle to a file.
pub type FileHandle = Arc<dyn FsFile>;

/// Handle to a directory.
pub type DirHandle = Arc<dyn FsDirectory>;

/// Base contract of every live handle.
pub trait FsObject: Send + Sync {
    fn is_valid(&self) -> bool;

    /// The filesystem this object belongs to, valid or not.
    fn file_system(&self) -> Arc<dyn FileSystem>;
}

/// A named node in a directory tree.
pub trait FsNode: FsObject {
    fn name(&self) -> Result<String>;

    /// Rename within the parent directory.
    ///
    /// Fails with `AlreadyExists` when a sibling already has the new name.
    fn set_name(&self, name: &str) -> Result<()>;

    /// Parent directory; `None` for the root.
    fn parent(&self) -> Result<Option<DirHandle>>;

    fn last_modified(&self) -> Result<DateTime<Utc>>;

    fn set_last_modified(&self, time: DateTime<Utc>) -> Result<()>;
}

/// A resizable byte sequence.
pub trait FsFile: FsNode {
    fn length(&self) -> Result<u64>;

    /// Grow (zero-filled) or truncate.
    fn set_length(&self, length: u64) -> Result<()>;

    /// Copy bytes starting at `offset` into `dst`.
    ///
    /// Returns the number of bytes copied, which is short at end of file.
    /// An `offset` past the end fails with `OutOfRange`.
    fn read(&self, offset: u64, dst: &mut [u8]) -> Result<usize>;

    /// Write `src` at `offset`, growing the file as needed.
    fn write(&self, offset: u64, src: &[u8]) -> Result<()>;

    fn flush(&self) -> Result<()>;
}

/// A mapping from unique names to entries.
///
/// Adding a name that already exists replaces the previous entry: the old
/// entry and everything beneath it become invalid.
pub trait FsDirectory: FsNode {
    /// All entries, in no particular order.
    fn entries(&self) -> Result<Vec<Entry>>;

    fn entry(&self, name: &str) -> Result<Option<Entry>>;

    fn add_file(&self, name: &str) -> Result<FileHandle>;

    fn add_directory(&self, name: &str) -> Result<DirHandle>;

    /// Remove an entry, recursively invalidating a directory's contents.
    ///
    /// Fails with `NotFound` when `name` is absent.
    fn remove(&self, name: &str) -> Result<()>;

    fn flush(&self) -> Result<()>;
}

/// A directory entry: exactly one of file or directory.
#[derive(Clone)]
pub enum Entry {
    File(FileHandle),
    Directory(DirHandle),
}

impl Entry {
    pub fn name(&self) -> Result<String> {
        match self {
            Entry::File(f) => f.name(),
            Entry::Directory(d) => d.name(),
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Entry::File(_))
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Entry::Directory(_))
    }

    pub fn file(&self) -> Option<FileHandle> {
        match self {
            Entry::File(f) => Some(f.clone()),
            Entry::Directory(_) => None,
        }
    }

    pub fn directory(&self) -> Option<DirHandle> {
        match self {
            Entry::Directory(d) => Some(d.clone()),
            Entry::File(_) => None,
        }
    }

    /// The file handle, or `NotAFile`.
    pub fn into_file(self) -> Result<FileHandle> {
        match self {
            Entry::File(f) => Ok(f),
            Entry::Directory(d) => Err(FsError::NotAFile(d.name()?)),
        }
    }

    /// The directory handle, or `NotADirectory`.
    pub fn into_directory(self) -> Result<DirHandle> {
        match self {
            Entry::Directory(d) => Ok(d),
            Entry::File(f) => Err(FsError::NotADirectory(f.name()?)),
        }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            Entry::File(f) => f.is_valid(),
            Entry::Directory(d) => d.is_valid(),
        }
    }

    pub fn file_system(&self) -> Arc<dyn FileSystem> {
        match self {
            Entry::File(f) => f.file_system(),
            Entry::Directory(d) => d.file_system(),
        }
    }

    pub fn parent(&self) -> Result<Option<DirHandle>> {
        match self {
            Entry::File(f) => f.parent(),
            Entry::Directory(d) => d.parent(),
        }
    }

    pub fn last_modified(&self) -> Result<DateTime<Utc>> {
        match self {
            Entry::File(f) => f.last_modified(),
            Entry::Directory(d) => d.last_modified(),
        }
    }
}

impl From<FileHandle> for Entry {
    fn from(f: FileHandle) -> Self {
        Entry::File(f)
    }
}

impl From<DirHandle> for Entry {
    fn from(d: DirHandle) -> Self {
        Entry::Directory(d)
    }
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.is_file() { "File" } else { "Directory" };
        match self.name() {
            Ok(name) => write!(f, "{}({:?})", kind, name),
            Err(_) => write!(f, "{}(<invalid>)", kind),
        }
    }
}

/// Read a whole file into memory.
///
/// `length` is only a sizing hint: reading continues until the file
/// returns no more bytes, so content regenerated by the first read is
/// returned whole.
pub fn read_to_end(file: &dyn FsFile) -> Result<Vec<u8>> {
    const CHUNK: usize = 4096;
    let hint = file.length()?;
    let hint = usize::try_from(hint).map_err(|_| FsError::TooLarge(hint))?;
    let mut data = vec![0u8; hint.max(CHUNK)];
    let mut done = 0;
    loop {
        if done == data.len() {
            data.resize(done + CHUNK, 0);
        }
        let n = file.read(done as u64, &mut data[done..])?;
        if n == 0 {
            break;
        }
        done += n;
    }
    data.truncate(done);
    Ok(data)
}
