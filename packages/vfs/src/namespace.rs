//! A mount table over absolute paths.
//!
//! Paths are `/`-separated and absolute. A path resolves against the mount
//! with the longest matching prefix, then walks the remaining components
//! through directory lookups.
//!
//! ```text
//! /            -> ram root
//! /net         -> ftp root
//! /net/pub/a   -> ftp: root.entry("pub").entry("a")
//! /proc/uptime -> jifs: root.entry("uptime")
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::error::{FsError, Result};
use crate::filesystem::FileSystem;
use crate::object::{read_to_end, DirHandle, Entry, FileHandle};

/// Parse an absolute path into its components.
///
/// Empty components and `.` are skipped; `..` steps up but never above the
/// root.
pub fn components(path: &str) -> Result<Vec<String>> {
    if !path.starts_with('/') {
        return Err(FsError::InvalidPath(path.to_string()));
    }
    let mut out: Vec<String> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            name => out.push(name.to_string()),
        }
    }
    Ok(out)
}

/// Canonical string form of a component list.
pub fn join(components: &[String]) -> String {
    if components.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", components.join("/"))
    }
}

/// The mount table.
#[derive(Default)]
pub struct Namespace {
    mounts: RwLock<BTreeMap<String, Arc<dyn FileSystem>>>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount `fs` at `path`.
    ///
    /// Fails with `AlreadyExists` if something is mounted there already.
    pub fn mount(&self, path: &str, fs: Arc<dyn FileSystem>) -> Result<()> {
        let key = join(&components(path)?);
        let mut mounts = self.mounts.write().map_err(|_| FsError::Poisoned)?;
        if mounts.contains_key(&key) {
            return Err(FsError::AlreadyExists(key));
        }
        tracing::debug!(path = %key, fs_type = fs.fs_type(), "mounted");
        mounts.insert(key, fs);
        Ok(())
    }

    /// Remove the mount at `path` and close its filesystem.
    pub fn unmount(&self, path: &str) -> Result<Arc<dyn FileSystem>> {
        let key = join(&components(path)?);
        let fs = {
            let mut mounts = self.mounts.write().map_err(|_| FsError::Poisoned)?;
            mounts.remove(&key).ok_or(FsError::NoMount(key.clone()))?
        };
        fs.close()?;
        tracing::debug!(path = %key, "unmounted");
        Ok(fs)
    }

    /// Mount points and their filesystems, sorted by path.
    pub fn mounts(&self) -> Result<Vec<(String, Arc<dyn FileSystem>)>> {
        let mounts = self.mounts.read().map_err(|_| FsError::Poisoned)?;
        Ok(mounts
            .iter()
            .map(|(path, fs)| (path.clone(), fs.clone()))
            .collect())
    }

    /// The filesystem owning `path` and the components below its mount.
    fn locate(&self, path: &str) -> Result<(Arc<dyn FileSystem>, Vec<String>)> {
        let parts = components(path)?;
        let mounts = self.mounts.read().map_err(|_| FsError::Poisoned)?;
        for split in (0..=parts.len()).rev() {
            if let Some(fs) = mounts.get(&join(&parts[..split])) {
                return Ok((fs.clone(), parts[split..].to_vec()));
            }
        }
        Err(FsError::NoMount(join(&parts)))
    }

    /// The filesystem `path` lives on.
    pub fn file_system(&self, path: &str) -> Result<Arc<dyn FileSystem>> {
        Ok(self.locate(path)?.0)
    }

    /// Walk to the entry at `path`.
    pub fn resolve(&self, path: &str) -> Result<Entry> {
        let (fs, rest) = self.locate(path)?;
        let mut entry = fs.root_entry()?;
        for name in &rest {
            let dir = match entry {
                Entry::Directory(dir) => dir,
                Entry::File(_) => return Err(FsError::NotADirectory(path.to_string())),
            };
            entry = dir
                .entry(name)?
                .ok_or_else(|| FsError::NotFound(path.to_string()))?;
        }
        Ok(entry)
    }

    fn lookup(&self, path: &str) -> Result<Option<Entry>> {
        match self.resolve(path) {
            Ok(entry) => Ok(Some(entry)),
            Err(FsError::NotFound(_)) | Err(FsError::NoMount(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.lookup(path)?.is_some())
    }

    pub fn is_file(&self, path: &str) -> Result<bool> {
        Ok(self.lookup(path)?.map_or(false, |e| e.is_file()))
    }

    pub fn is_directory(&self, path: &str) -> Result<bool> {
        Ok(self.lookup(path)?.map_or(false, |e| e.is_directory()))
    }

    /// Length of the file at `path`.
    pub fn length(&self, path: &str) -> Result<u64> {
        match self.resolve(path)? {
            Entry::File(file) => file.length(),
            Entry::Directory(_) => Err(FsError::NotAFile(path.to_string())),
        }
    }

    /// Entries of the directory at `path`.
    pub fn list(&self, path: &str) -> Result<Vec<Entry>> {
        match self.resolve(path)? {
            Entry::Directory(dir) => dir.entries(),
            Entry::File(_) => Err(FsError::NotADirectory(path.to_string())),
        }
    }

    /// Whole content of the file at `path`.
    pub fn read(&self, path: &str) -> Result<Vec<u8>> {
        match self.resolve(path)? {
            Entry::File(file) => read_to_end(file.as_ref()),
            Entry::Directory(_) => Err(FsError::NotAFile(path.to_string())),
        }
    }

    /// Parent directory of `path` and the final component.
    fn parent_of(&self, path: &str) -> Result<(DirHandle, String)> {
        let mut parts = components(path)?;
        let name = parts
            .pop()
            .ok_or_else(|| FsError::InvalidPath(path.to_string()))?;
        let parent = self.resolve(&join(&parts))?.into_directory()?;
        if parent.entry(&name)?.is_some() {
            return Err(FsError::AlreadyExists(path.to_string()));
        }
        Ok((parent, name))
    }

    /// Create a directory. Unlike `add_directory`, refuses to replace an
    /// existing entry.
    pub fn mkdir(&self, path: &str) -> Result<DirHandle> {
        let (parent, name) = self.parent_of(path)?;
        parent.add_directory(&name)
    }

    /// Create an empty file. Refuses to replace an existing entry.
    pub fn mkfile(&self, path: &str) -> Result<FileHandle> {
        let (parent, name) = self.parent_of(path)?;
        parent.add_file(&name)
    }

    /// Remove the entry at `path`. Mount points cannot be deleted.
    pub fn delete(&self, path: &str) -> Result<()> {
        let (_, rest) = self.locate(path)?;
        if rest.is_empty() {
            return Err(FsError::InvalidPath(format!("{} is a mount point", path)));
        }
        let mut parts = components(path)?;
        let name = parts
            .pop()
            .ok_or_else(|| FsError::InvalidPath(path.to_string()))?;
        let parent = self.resolve(&join(&parts))?.into_directory()?;
        parent.remove(&name)
    }

    pub fn free_space(&self, path: &str) -> Result<u64> {
        self.file_system(path)?.free_space()
    }

    pub fn total_space(&self, path: &str) -> Result<u64> {
        self.file_system(path)?.total_space()
    }

    /// Unmount and close everything.
    pub fn close_all(&self) -> Result<()> {
        let drained: Vec<(String, Arc<dyn FileSystem>)> = {
            let mut mounts = self.mounts.write().map_err(|_| FsError::Poisoned)?;
            std::mem::take(&mut *mounts).into_iter().collect()
        };
        for (path, fs) in drained {
            if let Err(e) = fs.close() {
                tracing::warn!(path = %path, error = %e, "close failed");
            }
        }
        Ok(())
    }
}
