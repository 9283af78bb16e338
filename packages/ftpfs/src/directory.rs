//! FTPFS directory handles.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use strata_vfs::{
    DirHandle, Entry, FileHandle, FileSystem, FsDirectory, FsNode, FsObject, NodeId, Result,
};

use crate::filesystem::FtpFileSystem;

/// Handle to a remote directory.
pub struct FtpDirectory {
    fs: Arc<FtpFileSystem>,
    id: NodeId,
}

impl FtpDirectory {
    pub(crate) fn new(fs: Arc<FtpFileSystem>, id: NodeId) -> Self {
        Self { fs, id }
    }
}

impl FsObject for FtpDirectory {
    fn is_valid(&self) -> bool {
        self.fs.is_live(self.id)
    }

    fn file_system(&self) -> Arc<dyn FileSystem> {
        self.fs.clone()
    }
}

impl FsNode for FtpDirectory {
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

impl FsDirectory for FtpDirectory {
    fn entries(&self) -> Result<Vec<Entry>> {
        self.fs.entries(self.id)
    }

    fn entry(&self, name: &str) -> Result<Option<Entry>> {
        self.fs.entry(self.id, name)
    }

    fn add_file(&self, _name: &str) -> Result<FileHandle> {
        self.fs.reject(self.id)
    }

    fn add_directory(&self, _name: &str) -> Result<DirHandle> {
        self.fs.reject(self.id)
    }

    fn remove(&self, _name: &str) -> Result<()> {
        self.fs.reject(self.id)
    }

    fn flush(&self) -> Result<()> {
        self.fs.touch(self.id)
    }
}

impl std::fmt::Debug for FtpDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtpDirectory").field("id", &self.id).finish()
    }
}
