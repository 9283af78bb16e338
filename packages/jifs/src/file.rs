//! JIFS file handles.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use strata_vfs::{DirHandle, FileSystem, FsFile, FsNode, FsObject, NodeId, Result};

use crate::filesystem::JifsFileSystem;

/// Handle to a generated file.
pub struct JifsFile {
    fs: Arc<JifsFileSystem>,
    id: NodeId,
}

impl JifsFile {
    pub(crate) fn new(fs: Arc<JifsFileSystem>, id: NodeId) -> Self {
        Self { fs, id }
    }
}

impl FsObject for JifsFile {
    fn is_valid(&self) -> bool {
        self.fs.is_live(self.id)
    }

    fn file_system(&self) -> Arc<dyn FileSystem> {
        self.fs.clone()
    }
}

impl FsNode for JifsFile {
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

impl FsFile for JifsFile {
    fn length(&self) -> Result<u64> {
        self.fs.length(self.id)
    }

    fn set_length(&self, _length: u64) -> Result<()> {
        self.fs.reject(self.id)
    }

    fn read(&self, offset: u64, dst: &mut [u8]) -> Result<usize> {
        self.fs.read(self.id, offset, dst)
    }

    fn write(&self, _offset: u64, _src: &[u8]) -> Result<()> {
        self.fs.reject(self.id)
    }

    fn flush(&self) -> Result<()> {
        self.fs.touch(self.id)
    }
}

impl std::fmt::Debug for JifsFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JifsFile").field("id", &self.id).finish()
    }
}
