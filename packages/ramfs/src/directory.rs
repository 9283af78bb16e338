//! RAMFS directory handles.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use strata_vfs::{
    DirHandle, Entry, FileHandle, FileSystem, FsDirectory, FsNode, FsObject, NodeId, Result,
};

use crate::file::RamFile;
use crate::filesystem::RamFileSystem;

/// Handle to a directory in a [`RamFileSystem`].
pub struct RamDirectory {
    fs: Arc<RamFileSystem>,
    id: NodeId,
}

impl RamDirectory {
    pub(crate) fn new(fs: Arc<RamFileSystem>, id: NodeId) -> Self {
        Self { fs, id }
    }
}

impl FsObject for RamDirectory {
    fn is_valid(&self) -> bool {
        self.fs.is_live(self.id)
    }

    fn file_system(&self) -> Arc<dyn FileSystem> {
        self.fs.clone()
    }
}

impl FsNode for RamDirectory {
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

impl FsDirectory for RamDirectory {
    fn entries(&self) -> Result<Vec<Entry>> {
        self.fs.entries(self.id)
    }

    fn entry(&self, name: &str) -> Result<Option<Entry>> {
        self.fs.entry(self.id, name)
    }

    fn add_file(&self, name: &str) -> Result<FileHandle> {
        let id = self.fs.add(self.id, name, false)?;
        Ok(Arc::new(RamFile::new(self.fs.clone(), id)))
    }

    fn add_directory(&self, name: &str) -> Result<DirHandle> {
        let id = self.fs.add(self.id, name, true)?;
        Ok(Arc::new(RamDirectory::new(self.fs.clone(), id)))
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.fs.remove(self.id, name)
    }

    fn flush(&self) -> Result<()> {
        self.fs.name(self.id).map(|_| ())
    }
}

impl std::fmt::Debug for RamDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RamDirectory").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::{RamConfig, RamDevice, RamFileSystem};
    use std::sync::Arc;
    use strata_vfs::{FileSystem, FsDirectory, FsError, FsFile, FsObject};

    fn fs() -> Arc<RamFileSystem> {
        RamFileSystem::new(Arc::new(RamDevice::new("ram0", 4096)), RamConfig {
            budget: 4096,
            ..RamConfig::default()
        })
    }

    #[test]
    fn add_file_twice_leaves_one_entry() {
        let fs = fs();
        let root = fs.root().unwrap();
        let first = root.add_file("n").unwrap();
        first.set_length(100).unwrap();
        let second = root.add_file("n").unwrap();

        let names: Vec<String> = root
            .entries()
            .unwrap()
            .iter()
            .map(|e| e.name().unwrap())
            .collect();
        assert_eq!(names, vec!["n"]);
        assert!(!first.is_valid());
        assert!(second.is_valid());
        assert_eq!(fs.allocated_capacity().unwrap(), 0);
    }

    #[test]
    fn replacing_directory_invalidates_descendants() {
        let fs = fs();
        let root = fs.root().unwrap();
        let d = root.add_directory("d").unwrap();
        let f = d.add_file("f").unwrap();
        root.add_file("d").unwrap();
        assert!(!d.is_valid());
        assert!(!f.is_valid());
        assert!(matches!(d.entries(), Err(FsError::InvalidObject)));
        assert!(root.entry("d").unwrap().unwrap().is_file());
    }

    #[test]
    fn remove_absent_is_not_found() {
        let fs = fs();
        let root = fs.root().unwrap();
        assert!(matches!(root.remove("nope"), Err(FsError::NotFound(_))));
    }

    #[test]
    fn close_invalidates_everything() {
        let fs = fs();
        let root = fs.root().unwrap();
        let d = root.add_directory("d").unwrap();
        let e = d.add_file("e").unwrap();

        fs.close().unwrap();
        fs.close().unwrap();
        assert!(fs.is_closed());
        assert!(!d.is_valid());
        assert!(!e.is_valid());
        assert!(matches!(d.entries(), Err(FsError::Closed)));
        assert!(matches!(e.length(), Err(FsError::Closed)));
        assert!(matches!(root.add_file("x"), Err(FsError::Closed)));
        assert!(matches!(fs.free_space(), Err(FsError::Closed)));
        assert_eq!(d.file_system().fs_type(), "RAMFS");
    }
}
