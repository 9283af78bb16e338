//! The RAMFS filesystem, its device and its type.

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strata_vfs::{
    CaseSensitivity, Device, DirHandle, Entry, EntryTable, FileSystem, FileSystemType,
    FormatOptions, FsError, NodeArena, NodeId, PartitionTableEntry, Result,
};

use crate::buffer::{target_capacity, RamBuffer};
use crate::directory::RamDirectory;
use crate::file::RamFile;

/// Name under which RAMFS registers.
pub const RAMFS_TYPE: &str = "RAMFS";

/// Settings for a new RAM filesystem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RamConfig {
    /// Bytes of file capacity the filesystem may allocate.
    pub budget: u64,
    pub volume_name: String,
    pub case_sensitivity: CaseSensitivity,
    pub read_only: bool,
}

impl Default for RamConfig {
    fn default() -> Self {
        Self {
            budget: 1 << 20,
            volume_name: "ramfs".to_string(),
            case_sensitivity: CaseSensitivity::Sensitive,
            read_only: false,
        }
    }
}

/// The pseudo-device a RAM filesystem lives on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RamDevice {
    id: String,
    budget: u64,
}

impl RamDevice {
    pub fn new(id: impl Into<String>, budget: u64) -> Self {
        Self {
            id: id.into(),
            budget,
        }
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }
}

impl Device for RamDevice {
    fn id(&self) -> &str {
        &self.id
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(crate) enum NodeKind {
    File(RamBuffer),
    Directory(EntryTable<NodeId>),
}

pub(crate) struct RamNode {
    name: String,
    parent: Option<NodeId>,
    modified: DateTime<Utc>,
    kind: NodeKind,
}

/// Everything guarded by the filesystem mutex: the tree and both counters.
pub(crate) struct RamState {
    nodes: NodeArena<RamNode>,
    root: NodeId,
    allocated: u64,
    total_length: u64,
    closed: bool,
}

impl RamState {
    fn node(&self, id: NodeId) -> Result<&RamNode> {
        self.nodes.get(id).ok_or(FsError::InvalidObject)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut RamNode> {
        self.nodes.get_mut(id).ok_or(FsError::InvalidObject)
    }

    fn buffer(&self, id: NodeId) -> Result<&RamBuffer> {
        match &self.node(id)?.kind {
            NodeKind::File(buffer) => Ok(buffer),
            NodeKind::Directory(_) => Err(FsError::NotAFile(self.node(id)?.name.clone())),
        }
    }

    fn table(&self, id: NodeId) -> Result<&EntryTable<NodeId>> {
        match &self.node(id)?.kind {
            NodeKind::Directory(table) => Ok(table),
            NodeKind::File(_) => Err(FsError::NotADirectory(self.node(id)?.name.clone())),
        }
    }

    fn table_mut(&mut self, id: NodeId) -> Result<&mut EntryTable<NodeId>> {
        let node = self.node_mut(id)?;
        match &mut node.kind {
            NodeKind::Directory(table) => Ok(table),
            NodeKind::File(_) => Err(FsError::NotADirectory(node.name.clone())),
        }
    }

    /// Detach `id` and everything below it, children first, releasing
    /// their space.
    fn release_subtree(&mut self, id: NodeId) {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            order.push(next);
            if let Some(RamNode {
                kind: NodeKind::Directory(table),
                ..
            }) = self.nodes.get(next)
            {
                stack.extend(table.values().copied());
            }
        }
        for id in order.into_iter().rev() {
            if let Some(node) = self.nodes.remove(id) {
                if let NodeKind::File(buffer) = node.kind {
                    self.allocated -= buffer.capacity();
                    self.total_length -= buffer.length();
                }
            }
        }
    }
}

/// A memory-resident filesystem with a byte budget.
///
/// Files grow by doubling their buffer; the filesystem tracks the total
/// allocated capacity and total logical length of all files, and
/// `free_space() == budget - allocated` at all times. Growth that would
/// exceed the budget fails with `FsError::Full` and changes nothing.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use strata_ramfs::{RamConfig, RamDevice, RamFileSystem};
/// use strata_vfs::{FileSystem, FsDirectory, FsFile};
///
/// let fs = RamFileSystem::new(Arc::new(RamDevice::new("ram0", 1000)), RamConfig {
///     budget: 1000,
///     ..RamConfig::default()
/// });
/// let root = fs.root().unwrap();
/// let file = root.add_file("hello").unwrap();
/// file.write(0, b"hi").unwrap();
/// assert_eq!(fs.free_space().unwrap(), 1000 - 128);
/// ```
pub struct RamFileSystem {
    me: Weak<RamFileSystem>,
    device: Arc<dyn Device>,
    budget: u64,
    volume_name: String,
    read_only: bool,
    policy: CaseSensitivity,
    state: Mutex<RamState>,
}

impl RamFileSystem {
    pub fn new(device: Arc<dyn Device>, config: RamConfig) -> Arc<Self> {
        let mut nodes = NodeArena::new();
        let root = nodes.insert(RamNode {
            name: String::new(),
            parent: None,
            modified: Utc::now(),
            kind: NodeKind::Directory(EntryTable::new(config.case_sensitivity)),
        });
        tracing::debug!(
            device = device.id(),
            budget = config.budget,
            "ramfs created"
        );
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            device,
            budget: config.budget,
            volume_name: config.volume_name,
            read_only: config.read_only,
            policy: config.case_sensitivity,
            state: Mutex::new(RamState {
                nodes,
                root,
                allocated: 0,
                total_length: 0,
                closed: false,
            }),
        })
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }

    pub fn case_sensitivity(&self) -> CaseSensitivity {
        self.policy
    }

    /// Sum of all file buffer capacities.
    pub fn allocated_capacity(&self) -> Result<u64> {
        Ok(self.open_state()?.allocated)
    }

    /// Sum of all file lengths.
    pub fn total_length(&self) -> Result<u64> {
        Ok(self.open_state()?.total_length)
    }

    fn arc(&self) -> Result<Arc<Self>> {
        self.me.upgrade().ok_or(FsError::Closed)
    }

    /// Lock the state, failing once closed.
    pub(crate) fn open_state(&self) -> Result<MutexGuard<'_, RamState>> {
        let state = self.state.lock().map_err(|_| FsError::Poisoned)?;
        if state.closed {
            return Err(FsError::Closed);
        }
        Ok(state)
    }

    /// Like `open_state`, also rejecting read-only filesystems.
    fn writable_state(&self) -> Result<MutexGuard<'_, RamState>> {
        let state = self.open_state()?;
        if self.read_only {
            return Err(FsError::ReadOnly);
        }
        Ok(state)
    }

    pub(crate) fn is_live(&self, id: NodeId) -> bool {
        match self.state.lock() {
            Ok(state) => !state.closed && state.nodes.contains(id),
            Err(_) => false,
        }
    }

    fn entry_for(self: &Arc<Self>, state: &RamState, id: NodeId) -> Result<Entry> {
        Ok(match state.node(id)?.kind {
            NodeKind::File(_) => Entry::File(Arc::new(RamFile::new(self.clone(), id))),
            NodeKind::Directory(_) => {
                Entry::Directory(Arc::new(RamDirectory::new(self.clone(), id)))
            }
        })
    }

    // ==================== Node operations ====================

    pub(crate) fn name(&self, id: NodeId) -> Result<String> {
        Ok(self.open_state()?.node(id)?.name.clone())
    }

    pub(crate) fn set_name(&self, id: NodeId, name: &str) -> Result<()> {
        validate_name(name)?;
        let mut state = self.writable_state()?;
        let node = state.node(id)?;
        let old = node.name.clone();
        if let Some(parent) = node.parent {
            state.table_mut(parent)?.rename(&old, name)?;
        }
        let node = state.node_mut(id)?;
        node.name = name.to_string();
        node.modified = Utc::now();
        Ok(())
    }

    pub(crate) fn parent(self: &Arc<Self>, id: NodeId) -> Result<Option<DirHandle>> {
        let state = self.open_state()?;
        Ok(state.node(id)?.parent.map(|parent| {
            Arc::new(RamDirectory::new(self.clone(), parent)) as DirHandle
        }))
    }

    pub(crate) fn last_modified(&self, id: NodeId) -> Result<DateTime<Utc>> {
        Ok(self.open_state()?.node(id)?.modified)
    }

    pub(crate) fn set_last_modified(&self, id: NodeId, time: DateTime<Utc>) -> Result<()> {
        self.writable_state()?.node_mut(id)?.modified = time;
        Ok(())
    }

    // ==================== File operations ====================

    pub(crate) fn length(&self, id: NodeId) -> Result<u64> {
        Ok(self.open_state()?.buffer(id)?.length())
    }

    pub(crate) fn capacity(&self, id: NodeId) -> Result<u64> {
        Ok(self.open_state()?.buffer(id)?.capacity())
    }

    pub(crate) fn set_length(&self, id: NodeId, length: u64) -> Result<()> {
        let mut state = self.writable_state()?;
        self.resize(&mut state, id, length)
    }

    /// Resize a file under the held lock. Nothing changes on failure.
    fn resize(&self, state: &mut RamState, id: NodeId, length: u64) -> Result<()> {
        let buffer = state.buffer(id)?;
        let old_capacity = buffer.capacity();
        let old_length = buffer.length();
        let new_capacity =
            target_capacity(old_capacity, length).ok_or(FsError::TooLarge(length))?;

        if new_capacity > old_capacity {
            let requested = new_capacity - old_capacity;
            let available = self.budget.saturating_sub(state.allocated);
            if requested > available {
                tracing::warn!(requested, available, "ramfs budget exhausted");
                return Err(FsError::Full {
                    requested,
                    available,
                });
            }
        }
        let length_usize = usize::try_from(length).map_err(|_| FsError::TooLarge(length))?;
        let capacity_usize =
            usize::try_from(new_capacity).map_err(|_| FsError::TooLarge(new_capacity))?;

        let node = state.node_mut(id)?;
        if let NodeKind::File(buffer) = &mut node.kind {
            buffer.resize(length_usize, capacity_usize);
        }
        node.modified = Utc::now();
        state.allocated = state.allocated - old_capacity + new_capacity;
        state.total_length = state.total_length - old_length + length;
        tracing::trace!(node = %id, length, capacity = new_capacity, "resized");
        Ok(())
    }

    pub(crate) fn read(&self, id: NodeId, offset: u64, dst: &mut [u8]) -> Result<usize> {
        let state = self.open_state()?;
        let buffer = state.buffer(id)?;
        let length = buffer.length();
        if offset > length {
            return Err(FsError::OutOfRange { offset, length });
        }
        Ok(buffer.read(offset as usize, dst))
    }

    pub(crate) fn write(&self, id: NodeId, offset: u64, src: &[u8]) -> Result<()> {
        let mut state = self.writable_state()?;
        let end = offset
            .checked_add(src.len() as u64)
            .ok_or(FsError::TooLarge(offset))?;
        if end > state.buffer(id)?.length() {
            self.resize(&mut state, id, end)?;
        }
        let node = state.node_mut(id)?;
        if let NodeKind::File(buffer) = &mut node.kind {
            buffer.write(offset as usize, src);
        }
        node.modified = Utc::now();
        Ok(())
    }

    // ==================== Directory operations ====================

    pub(crate) fn entries(self: &Arc<Self>, id: NodeId) -> Result<Vec<Entry>> {
        let state = self.open_state()?;
        let children: Vec<NodeId> = state.table(id)?.values().copied().collect();
        children
            .into_iter()
            .map(|child| self.entry_for(&state, child))
            .collect()
    }

    pub(crate) fn entry(self: &Arc<Self>, id: NodeId, name: &str) -> Result<Option<Entry>> {
        let state = self.open_state()?;
        match state.table(id)?.get(name).copied() {
            Some(child) => Ok(Some(self.entry_for(&state, child)?)),
            None => Ok(None),
        }
    }

    /// Add a child, replacing (and invalidating) any entry with that name.
    pub(crate) fn add(&self, parent: NodeId, name: &str, directory: bool) -> Result<NodeId> {
        validate_name(name)?;
        let mut state = self.writable_state()?;
        state.table(parent)?;

        let kind = if directory {
            NodeKind::Directory(EntryTable::new(self.policy))
        } else {
            NodeKind::File(RamBuffer::new())
        };
        let child = state.nodes.insert(RamNode {
            name: name.to_string(),
            parent: Some(parent),
            modified: Utc::now(),
            kind,
        });
        if let Some(replaced) = state.table_mut(parent)?.insert(name, child) {
            tracing::debug!(name, "replacing existing entry");
            state.release_subtree(replaced);
        }
        state.node_mut(parent)?.modified = Utc::now();
        tracing::debug!(name, directory, "ramfs add");
        Ok(child)
    }

    pub(crate) fn remove(&self, parent: NodeId, name: &str) -> Result<()> {
        let mut state = self.writable_state()?;
        let child = state
            .table_mut(parent)?
            .remove(name)
            .ok_or_else(|| FsError::NotFound(name.to_string()))?;
        state.release_subtree(child);
        state.node_mut(parent)?.modified = Utc::now();
        tracing::debug!(name, "ramfs remove");
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return Err(FsError::InvalidPath(name.to_string()));
    }
    Ok(())
}

impl FileSystem for RamFileSystem {
    fn fs_type(&self) -> &str {
        RAMFS_TYPE
    }

    fn root_entry(&self) -> Result<Entry> {
        let fs = self.arc()?;
        let state = self.open_state()?;
        fs.entry_for(&state, state.root)
    }

    fn device(&self) -> Arc<dyn Device> {
        self.device.clone()
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn close(&self) -> Result<()> {
        let mut state = self.state.lock().map_err(|_| FsError::Poisoned)?;
        if state.closed {
            return Ok(());
        }
        state.closed = true;
        state.nodes.clear();
        state.allocated = 0;
        state.total_length = 0;
        tracing::debug!(device = self.device.id(), "ramfs closed");
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.state.lock().map(|s| s.closed).unwrap_or(true)
    }

    fn total_space(&self) -> Result<u64> {
        self.open_state()?;
        Ok(self.budget)
    }

    fn free_space(&self) -> Result<u64> {
        let state = self.open_state()?;
        Ok(self.budget.saturating_sub(state.allocated))
    }

    fn volume_name(&self) -> Result<String> {
        self.open_state()?;
        Ok(self.volume_name.clone())
    }
}

/// The RAMFS filesystem type. Mounts only [`RamDevice`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct RamFileSystemType;

impl RamFileSystemType {
    fn ram_device(device: &dyn Device) -> Result<&RamDevice> {
        device
            .as_any()
            .downcast_ref::<RamDevice>()
            .ok_or_else(|| FsError::unsupported(format!("RAMFS on device {}", device.id())))
    }
}

impl FileSystemType for RamFileSystemType {
    fn name(&self) -> &str {
        RAMFS_TYPE
    }

    fn supports(
        &self,
        device: &dyn Device,
        _partition: Option<&dyn PartitionTableEntry>,
        _first_sector: &[u8],
    ) -> bool {
        device.as_any().is::<RamDevice>()
    }

    fn create(&self, device: Arc<dyn Device>, read_only: bool) -> Result<Arc<dyn FileSystem>> {
        let budget = Self::ram_device(device.as_ref())?.budget();
        let config = RamConfig {
            budget,
            volume_name: device.id().to_string(),
            read_only,
            ..RamConfig::default()
        };
        Ok(RamFileSystem::new(device, config))
    }

    fn format(
        &self,
        device: Arc<dyn Device>,
        options: &FormatOptions,
    ) -> Result<Arc<dyn FileSystem>> {
        let ram = Self::ram_device(device.as_ref())?;
        let config = RamConfig {
            budget: options.budget.unwrap_or(ram.budget()),
            volume_name: options
                .volume_name
                .clone()
                .unwrap_or_else(|| device.id().to_string()),
            case_sensitivity: options.case_sensitivity,
            read_only: false,
        };
        Ok(RamFileSystem::new(device, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_vfs::{FsDirectory, FsFile, FsNode, FsObject};

    fn fs(budget: u64) -> Arc<RamFileSystem> {
        RamFileSystem::new(
            Arc::new(RamDevice::new("ram0", budget)),
            RamConfig {
                budget,
                ..RamConfig::default()
            },
        )
    }

    #[test]
    fn counters_follow_growth_and_shrink() {
        let fs = fs(4096);
        let root = fs.root().unwrap();
        let file = root.add_file("f").unwrap();
        file.set_length(300).unwrap();
        assert_eq!(fs.allocated_capacity().unwrap(), 512);
        assert_eq!(fs.total_length().unwrap(), 300);
        file.set_length(10).unwrap();
        assert_eq!(fs.allocated_capacity().unwrap(), 128);
        assert_eq!(fs.total_length().unwrap(), 10);
        assert_eq!(fs.free_space().unwrap(), 4096 - 128);
    }

    #[test]
    fn over_budget_growth_changes_nothing() {
        let fs = fs(1000);
        let file = fs.root().unwrap().add_file("f").unwrap();
        file.set_length(200).unwrap();
        let err = file.set_length(600).unwrap_err();
        assert!(matches!(
            err,
            FsError::Full {
                requested: 768,
                available: 744
            }
        ));
        assert_eq!(file.length().unwrap(), 200);
        assert_eq!(fs.allocated_capacity().unwrap(), 256);
        assert_eq!(fs.free_space().unwrap(), 1000 - 256);
    }

    #[test]
    fn write_past_end_fails_cleanly_when_full() {
        let fs = fs(128);
        let file = fs.root().unwrap().add_file("f").unwrap();
        file.write(0, &[1u8; 100]).unwrap();
        assert!(matches!(
            file.write(100, &[2u8; 100]),
            Err(FsError::Full { .. })
        ));
        assert_eq!(file.length().unwrap(), 100);
    }

    #[test]
    fn remove_releases_subtree() {
        let fs = fs(4096);
        let root = fs.root().unwrap();
        let d = root.add_directory("d").unwrap();
        let inner = d.add_directory("inner").unwrap();
        let f1 = d.add_file("a").unwrap();
        let f2 = inner.add_file("b").unwrap();
        f1.set_length(100).unwrap();
        f2.set_length(300).unwrap();
        assert_eq!(fs.allocated_capacity().unwrap(), 128 + 512);

        root.remove("d").unwrap();
        assert_eq!(fs.allocated_capacity().unwrap(), 0);
        assert_eq!(fs.total_length().unwrap(), 0);
        assert!(!d.is_valid());
        assert!(!inner.is_valid());
        assert!(!f2.is_valid());
        assert!(matches!(f2.length(), Err(FsError::InvalidObject)));
    }

    #[test]
    fn read_only_rejects_mutation() {
        let fs = RamFileSystem::new(
            Arc::new(RamDevice::new("ram0", 1024)),
            RamConfig {
                read_only: true,
                ..RamConfig::default()
            },
        );
        let root = fs.root().unwrap();
        assert!(matches!(root.add_file("x"), Err(FsError::ReadOnly)));
        assert!(root.entries().unwrap().is_empty());
    }

    #[test]
    fn invalid_names_are_rejected() {
        let fs = fs(1024);
        let root = fs.root().unwrap();
        assert!(matches!(root.add_file(""), Err(FsError::InvalidPath(_))));
        assert!(matches!(root.add_file("a/b"), Err(FsError::InvalidPath(_))));
        assert!(matches!(
            root.add_directory(".."),
            Err(FsError::InvalidPath(_))
        ));
    }

    #[test]
    fn type_supports_only_ram_devices() {
        let ty = RamFileSystemType;
        let ram = RamDevice::new("ram0", 10);
        assert!(ty.supports(&ram, None, &[]));

        struct Other;
        impl Device for Other {
            fn id(&self) -> &str {
                "other"
            }
            fn as_any(&self) -> &dyn Any {
                self
            }
        }
        assert!(!ty.supports(&Other, None, &[]));
        assert!(ty.create(Arc::new(Other), false).is_err());
    }

    #[test]
    fn format_applies_options() {
        let fs = RamFileSystemType
            .format(
                Arc::new(RamDevice::new("ram0", 10)),
                &FormatOptions {
                    budget: Some(2048),
                    volume_name: Some("scratch".into()),
                    case_sensitivity: CaseSensitivity::Insensitive,
                },
            )
            .unwrap();
        assert_eq!(fs.total_space().unwrap(), 2048);
        assert_eq!(fs.volume_name().unwrap(), "scratch");
        let root = fs.root().unwrap();
        root.add_file("Notes.TXT").unwrap();
        assert!(root.entry("notes.txt").unwrap().is_some());
        assert_eq!(
            root.entry("NOTES.txt").unwrap().unwrap().name().unwrap(),
            "Notes.TXT"
        );
    }

    #[test]
    fn config_from_json() {
        let config: RamConfig = serde_json::from_str(r#"{"budget": 64}"#).unwrap();
        assert_eq!(config.budget, 64);
        assert_eq!(config.volume_name, "ramfs");
        assert!(!config.read_only);
    }
}
