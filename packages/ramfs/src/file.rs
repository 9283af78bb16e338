//! RAMFS file handles.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use strata_vfs::{DirHandle, FileSystem, FsFile, FsNode, FsObject, NodeId, Result};

use crate::filesystem::RamFileSystem;

/// Handle to a file in a [`RamFileSystem`].
pub struct RamFile {
    fs: Arc<RamFileSystem>,
    id: NodeId,
}

impl RamFile {
    pub(crate) fn new(fs: Arc<RamFileSystem>, id: NodeId) -> Self {
        Self { fs, id }
    }

    /// Bytes currently reserved for this file.
    pub fn capacity(&self) -> Result<u64> {
        self.fs.capacity(self.id)
    }
}

impl FsObject for RamFile {
    fn is_valid(&self) -> bool {
        self.fs.is_live(self.id)
    }

    fn file_system(&self) -> Arc<dyn FileSystem> {
        self.fs.clone()
    }
}

impl FsNode for RamFile {
    fn name(&self) -> Result<String> {
        self.fs.name(self.id)
    }

    fn set_name(&self, name: &str) -> Result<()> {
        self.fs.set_name(self.id, name)
    }

    fn parent(&self) -> Result<Option<DirHandle>> {
        self.fs.parent(self.id)
    }

    fn last_modified(&self) -> Result<DateTime<Utc>> {
        self.fs.last_modified(self.id)
    }

    fn set_last_modified(&self, time: DateTime<Utc>) -> Result<()> {
        self.fs.set_last_modified(self.id, time)
    }
}

impl FsFile for RamFile {
    fn length(&self) -> Result<u64> {
        self.fs.length(self.id)
    }

    fn set_length(&self, length: u64) -> Result<()> {
        self.fs.set_length(self.id, length)
    }

    fn read(&self, offset: u64, dst: &mut [u8]) -> Result<usize> {
        self.fs.read(self.id, offset, dst)
    }

    fn write(&self, offset: u64, src: &[u8]) -> Result<()> {
        self.fs.write(self.id, offset, src)
    }

    fn flush(&self) -> Result<()> {
        // Validity check only; there is nothing to push.
        self.fs.length(self.id).map(|_| ())
    }
}

impl std::fmt::Debug for RamFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RamFile").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::{RamConfig, RamDevice, RamFileSystem};
    use std::sync::Arc;
    use strata_vfs::{FileSystem, FsDirectory, FsError, FsFile, FsNode};

    fn file() -> (Arc<RamFileSystem>, strata_vfs::FileHandle) {
        let fs = RamFileSystem::new(Arc::new(RamDevice::new("ram0", 4096)), RamConfig {
            budget: 4096,
            ..RamConfig::default()
        });
        let file = fs.root().unwrap().add_file("f").unwrap();
        (fs, file)
    }

    #[test]
    fn write_then_read_back() {
        let (_fs, file) = file();
        file.write(0, b"hello world").unwrap();
        let mut buf = [0u8; 5];
        assert_eq!(file.read(6, &mut buf).unwrap(), 5);
        assert_eq!(&buf, b"world");
    }

    #[test]
    fn read_past_end_is_out_of_range() {
        let (_fs, file) = file();
        file.write(0, b"abc").unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(file.read(3, &mut buf).unwrap(), 0);
        assert!(matches!(
            file.read(4, &mut buf),
            Err(FsError::OutOfRange {
                offset: 4,
                length: 3
            })
        ));
    }

    #[test]
    fn write_with_gap_zero_fills() {
        let (_fs, file) = file();
        file.write(4, b"x").unwrap();
        assert_eq!(file.length().unwrap(), 5);
        let mut buf = [9u8; 5];
        file.read(0, &mut buf).unwrap();
        assert_eq!(buf, [0, 0, 0, 0, b'x']);
    }

    #[test]
    fn rename_updates_parent_table() {
        let (fs, file) = file();
        let root = fs.root().unwrap();
        root.add_file("taken").unwrap();
        assert!(matches!(
            file.set_name("taken"),
            Err(FsError::AlreadyExists(_))
        ));
        file.set_name("renamed").unwrap();
        assert_eq!(file.name().unwrap(), "renamed");
        assert!(root.entry("f").unwrap().is_none());
        assert!(root.entry("renamed").unwrap().unwrap().is_file());
    }

    #[test]
    fn parent_is_root() {
        let (_fs, file) = file();
        let parent = file.parent().unwrap().unwrap();
        assert!(parent.parent().unwrap().is_none());
        assert_eq!(parent.entries().unwrap().len(), 1);
    }
}
