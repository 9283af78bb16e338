//! JIFS directory handles.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use strata_vfs::{
    DirHandle, Entry, FileHandle, FileSystem, FsDirectory, FsNode, FsObject, NodeId, Result,
};

use crate::filesystem::JifsFileSystem;

/// Handle to a JIFS directory.
pub struct JifsDirectory {
    fs: Arc<JifsFileSystem>,
    id: NodeId,
}

impl JifsDirectory {
    pub(crate) fn new(fs: Arc<JifsFileSystem>, id: NodeId) -> Self {
        Self { fs, id }
    }
}

impl FsObject for JifsDirectory {
    fn is_valid(&self) -> bool {
        self.fs.is_live(self.id)
    }

    fn file_system(&self) -> Arc<dyn FileSystem> {
        self.fs.clone()
    }
}

impl FsNode for JifsDirectory {
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

impl FsDirectory for JifsDirectory {
    /// Refreshes this directory and every entry it yields.
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

impl std::fmt::Debug for JifsDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JifsDirectory").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::filesystem::tests::mounted;
    use crate::PluginDescriptor;
    use strata_vfs::{FileSystem, FsDirectory};

    #[test]
    fn plugin_directory_follows_registry() {
        let (fs, info) = mounted();
        let plugins = fs.root().unwrap().entry("plugins").unwrap().unwrap().into_directory().unwrap();
        assert!(plugins.entries().unwrap().is_empty());

        info.plugins
            .lock()
            .unwrap()
            .push(PluginDescriptor::new("fs.ftp", "FTPFS", "0.1"));
        let entry = plugins.entry("fs.ftp").unwrap().unwrap();
        let plugin: PluginDescriptor = serde_json::from_slice(
            &strata_vfs::read_to_end(entry.file().unwrap().as_ref()).unwrap(),
        )
        .unwrap();
        assert_eq!(plugin.name, "FTPFS");

        info.plugins.lock().unwrap().clear();
        assert!(plugins.entries().unwrap().is_empty());
        assert!(!entry.is_valid());
    }
}
