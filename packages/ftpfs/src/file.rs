//! FTPFS file handles.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use strata_vfs::{DirHandle, FileSystem, FsFile, FsNode, FsObject, NodeId, Result};

use crate::filesystem::FtpFileSystem;

/// Handle to a remote file.
///
/// Writes and resizes are accepted and dropped; the remote side never
/// changes through this handle.
pub struct FtpFile {
    fs: Arc<FtpFileSystem>,
    id: NodeId,
}

impl FtpFile {
    pub(crate) fn new(fs: Arc<FtpFileSystem>, id: NodeId) -> Self {
        Self { fs, id }
    }
}

impl FsObject for FtpFile {
    fn is_valid(&self) -> bool {
        self.fs.is_live(self.id)
    }

    fn file_system(&self) -> Arc<dyn FileSystem> {
        self.fs.clone()
    }
}

impl FsNode for FtpFile {
    fn name(&self) -> Result<String> {
        self.fs.name(self.id)
    }

    fn set_name(&self, _name: &str) -> Result<()> {
        self.fs.reject(self.id)
    }

    fn parent(&self) -> Result<Option<DirHandle>> {
        self.fs.parent(self.id)
    }

    fn last_modified(&self) -> Result<DateTime<Utc>> {
        self.fs.last_modified(self.id)
    }

    fn set_last_modified(&self, _time: DateTime<Utc>) -> Result<()> {
        self.fs.reject(self.id)
    }
}

impl FsFile for FtpFile {
    fn length(&self) -> Result<u64> {
        self.fs.length(self.id)
    }

    fn set_length(&self, _length: u64) -> Result<()> {
        self.fs.touch(self.id)
    }

    fn read(&self, offset: u64, dst: &mut [u8]) -> Result<usize> {
        self.fs.read(self.id, offset, dst)
    }

    fn write(&self, _offset: u64, _src: &[u8]) -> Result<()> {
        self.fs.touch(self.id)
    }

    fn flush(&self) -> Result<()> {
        self.fs.touch(self.id)
    }
}

impl std::fmt::Debug for FtpFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtpFile").field("id", &self.id).finish()
    }
}
