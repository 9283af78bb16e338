//! Explicit registry of filesystem types.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{FsError, Result};
use crate::filesystem::{Device, FileSystem, FileSystemType, PartitionTableEntry};

/// The set of filesystem types known to a caller.
///
/// Passed explicitly to whatever mounts devices; there is no process-wide
/// instance.
///
/// # Example
///
/// ```rust,ignore
/// let mut registry = FileSystemRegistry::new();
/// registry.register(Arc::new(RamFileSystemType));
/// let fs = registry.mount_device(device, false)?;
/// ```
#[derive(Default)]
pub struct FileSystemRegistry {
    types: BTreeMap<String, Arc<dyn FileSystemType>>,
}

impl FileSystemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a type, returning any type previously registered under its name.
    pub fn register(&mut self, fs_type: Arc<dyn FileSystemType>) -> Option<Arc<dyn FileSystemType>> {
        let name = fs_type.name().to_string();
        tracing::debug!(name = %name, "registered filesystem type");
        self.types.insert(name, fs_type)
    }

    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn FileSystemType>> {
        self.types.remove(name)
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn FileSystemType>> {
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| FsError::UnknownType(name.to_string()))
    }

    /// Registered type names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.types.keys().cloned().collect()
    }

    /// The first registered type (by name) that supports `device`.
    ///
    /// Block devices have their first sector read and handed to each probe.
    pub fn probe(
        &self,
        device: &dyn Device,
        partition: Option<&dyn PartitionTableEntry>,
    ) -> Result<Option<Arc<dyn FileSystemType>>> {
        let first_sector = read_first_sector(device)?;
        Ok(self
            .types
            .values()
            .find(|t| t.supports(device, partition, &first_sector))
            .cloned())
    }

    /// Probe `device` and open the filesystem of the first matching type.
    pub fn mount_device(
        &self,
        device: Arc<dyn Device>,
        read_only: bool,
    ) -> Result<Arc<dyn FileSystem>> {
        let fs_type = self
            .probe(device.as_ref(), None)?
            .ok_or_else(|| FsError::UnknownType(format!("no type recognises {}", device.id())))?;
        tracing::debug!(device = device.id(), fs_type = fs_type.name(), "mounting");
        fs_type.create(device, read_only)
    }
}

fn read_first_sector(device: &dyn Device) -> Result<Vec<u8>> {
    let Some(block) = device.as_block() else {
        return Ok(Vec::new());
    };
    let length = block.length()?;
    let sector = u64::from(block.sector_size()?).min(length);
    let mut buf = vec![0u8; sector as usize];
    block.read(0, &mut buf)?;
    Ok(buf)
}
