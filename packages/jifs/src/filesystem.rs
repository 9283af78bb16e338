//! The JIFS filesystem, its builder, device and type.

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use chrono::{DateTime, Utc};
use serde::Serialize;
use strata_vfs::{
    CaseSensitivity, Device, DirHandle, Entry, EntryTable, FileSystem, FileSystemType, FsError,
    NodeArena, NodeId, PartitionTableEntry, Result,
};

use crate::directory::JifsDirectory;
use crate::file::JifsFile;
use crate::info::{HostSystemInfo, SystemInfo};

/// Name under which JIFS registers.
pub const JIFS_TYPE: &str = "JIFS";

/// Renders the content of a root file from current state.
pub type Generator = Arc<dyn Fn(&dyn SystemInfo) -> String + Send + Sync>;

/// Where a file's content comes from.
#[derive(Clone)]
pub(crate) enum Source {
    Generated(Generator),
    Thread(u64),
    Plugin(String),
}

/// How a directory's children are rebuilt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Listing {
    Fixed,
    Threads,
    Plugins,
}

pub(crate) enum JifsKind {
    File { source: Source, content: Vec<u8> },
    Directory { listing: Listing, children: EntryTable<NodeId> },
}

pub(crate) struct JifsNode {
    name: String,
    parent: Option<NodeId>,
    modified: DateTime<Utc>,
    kind: JifsKind,
}

pub(crate) struct JifsState {
    nodes: NodeArena<JifsNode>,
    root: NodeId,
    closed: bool,
}

impl JifsState {
    fn node(&self, id: NodeId) -> Result<&JifsNode> {
        self.nodes.get(id).ok_or(FsError::InvalidObject)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut JifsNode> {
        self.nodes.get_mut(id).ok_or(FsError::InvalidObject)
    }

    fn table(&self, id: NodeId) -> Result<&EntryTable<NodeId>> {
        match &self.node(id)?.kind {
            JifsKind::Directory { children, .. } => Ok(children),
            JifsKind::File { .. } => Err(FsError::NotADirectory(self.node(id)?.name.clone())),
        }
    }

    fn insert(&mut self, parent: NodeId, name: &str, kind: JifsKind) -> Result<NodeId> {
        let child = self.nodes.insert(JifsNode {
            name: name.to_string(),
            parent: Some(parent),
            modified: Utc::now(),
            kind,
        });
        let replaced = match &mut self.node_mut(parent)?.kind {
            JifsKind::Directory { children, .. } => children.insert(name, child),
            JifsKind::File { .. } => None,
        };
        if let Some(replaced) = replaced {
            self.drop_subtree(replaced);
        }
        Ok(child)
    }

    /// Unlink `id` from its parent and drop it with its descendants.
    fn detach(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        let name = node.name.clone();
        if let Some(parent) = node.parent {
            if let Some(JifsNode {
                kind: JifsKind::Directory { children, .. },
                ..
            }) = self.nodes.get_mut(parent)
            {
                children.remove(&name);
            }
        }
        self.drop_subtree(id);
    }

    fn drop_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(next) {
                if let JifsKind::Directory { children, .. } = node.kind {
                    stack.extend(children.values().copied());
                }
            }
        }
    }
}

/// A read-only filesystem whose files show live system state.
///
/// Content is regenerated whenever it is reached: listing or looking up
/// an entry refreshes it, and so does reading a file from offset 0. The
/// `threads` and `plugins` directories rebuild their children on refresh;
/// handles to children that vanished become invalid.
///
/// ```text
/// /uptime     seconds since start, "12.345"
/// /memory     MemoryInfo as JSON
/// /version    one line
/// /threads/   one JSON file per thread, named by id
/// /plugins/   one JSON file per plugin, named by id
/// ```
pub struct JifsFileSystem {
    me: Weak<JifsFileSystem>,
    device: Arc<dyn Device>,
    info: Arc<dyn SystemInfo>,
    volume_name: String,
    state: Mutex<JifsState>,
}

impl JifsFileSystem {
    /// The standard tree over `info`.
    pub fn new(device: Arc<dyn Device>, info: Arc<dyn SystemInfo>) -> Result<Arc<Self>> {
        JifsBuilder::new(info).build(device)
    }

    fn arc(&self) -> Result<Arc<Self>> {
        self.me.upgrade().ok_or(FsError::Closed)
    }

    fn open_state(&self) -> Result<MutexGuard<'_, JifsState>> {
        let state = self.state.lock().map_err(|_| FsError::Poisoned)?;
        if state.closed {
            return Err(FsError::Closed);
        }
        Ok(state)
    }

    /// Fail with `ReadOnly` once the object is known to be live.
    pub(crate) fn reject<T>(&self, id: NodeId) -> Result<T> {
        self.open_state()?.node(id)?;
        Err(FsError::ReadOnly)
    }

    pub(crate) fn is_live(&self, id: NodeId) -> bool {
        match self.state.lock() {
            Ok(state) => !state.closed && state.nodes.contains(id),
            Err(_) => false,
        }
    }

    fn entry_for(self: &Arc<Self>, state: &JifsState, id: NodeId) -> Result<Entry> {
        Ok(match state.node(id)?.kind {
            JifsKind::File { .. } => Entry::File(Arc::new(JifsFile::new(self.clone(), id))),
            JifsKind::Directory { .. } => {
                Entry::Directory(Arc::new(JifsDirectory::new(self.clone(), id)))
            }
        })
    }

    fn render(&self, source: &Source) -> Option<String> {
        match source {
            Source::Generated(generate) => Some(generate(self.info.as_ref())),
            Source::Thread(id) => self
                .info
                .threads()
                .into_iter()
                .find(|t| t.id == *id)
                .map(|t| to_json(&t)),
            Source::Plugin(id) => self
                .info
                .plugins()
                .into_iter()
                .find(|p| p.id == *id)
                .map(|p| to_json(&p)),
        }
    }

    /// Bring `id` up to date with current state.
    ///
    /// A file whose subject has gone is detached and reported as
    /// `InvalidObject`.
    fn refresh(&self, state: &mut JifsState, id: NodeId) -> Result<()> {
        let source = match &state.node(id)?.kind {
            JifsKind::File { source, .. } => source.clone(),
            JifsKind::Directory { listing, .. } => {
                let listing = *listing;
                return self.rebuild(state, id, listing);
            }
        };
        match self.render(&source) {
            Some(text) => {
                let node = state.node_mut(id)?;
                if let JifsKind::File { content, .. } = &mut node.kind {
                    *content = text.into_bytes();
                }
                node.modified = Utc::now();
                Ok(())
            }
            None => {
                tracing::trace!(node = %id, "jifs subject vanished");
                state.detach(id);
                Err(FsError::InvalidObject)
            }
        }
    }

    /// Reconcile a listing directory's children with current state.
    fn rebuild(&self, state: &mut JifsState, id: NodeId, listing: Listing) -> Result<()> {
        let wanted: Vec<(String, Source)> = match listing {
            Listing::Fixed => return Ok(()),
            Listing::Threads => self
                .info
                .threads()
                .into_iter()
                .map(|t| (t.id.to_string(), Source::Thread(t.id)))
                .collect(),
            Listing::Plugins => self
                .info
                .plugins()
                .into_iter()
                .map(|p| (p.id.clone(), Source::Plugin(p.id)))
                .collect(),
        };

        let stale: Vec<NodeId> = state
            .table(id)?
            .iter()
            .filter(|(name, _)| !wanted.iter().any(|(w, _)| w == name))
            .map(|(_, child)| *child)
            .collect();
        for child in stale {
            state.detach(child);
        }
        for (name, source) in wanted {
            if !state.table(id)?.contains(&name) {
                state.insert(
                    id,
                    &name,
                    JifsKind::File {
                        source,
                        content: Vec::new(),
                    },
                )?;
            }
        }
        state.node_mut(id)?.modified = Utc::now();
        Ok(())
    }

    // ==================== Node operations ====================

    pub(crate) fn name(&self, id: NodeId) -> Result<String> {
        Ok(self.open_state()?.node(id)?.name.clone())
    }

    pub(crate) fn parent(self: &Arc<Self>, id: NodeId) -> Result<Option<DirHandle>> {
        let state = self.open_state()?;
        Ok(state.node(id)?.parent.map(|parent| {
            Arc::new(JifsDirectory::new(self.clone(), parent)) as DirHandle
        }))
    }

    pub(crate) fn last_modified(&self, id: NodeId) -> Result<DateTime<Utc>> {
        Ok(self.open_state()?.node(id)?.modified)
    }

    // ==================== File operations ====================

    /// Length of the content as last generated.
    pub(crate) fn length(&self, id: NodeId) -> Result<u64> {
        let state = self.open_state()?;
        match &state.node(id)?.kind {
            JifsKind::File { content, .. } => Ok(content.len() as u64),
            JifsKind::Directory { .. } => Err(FsError::NotAFile(state.node(id)?.name.clone())),
        }
    }

    /// Reading from offset 0 regenerates the content first.
    pub(crate) fn read(&self, id: NodeId, offset: u64, dst: &mut [u8]) -> Result<usize> {
        let mut state = self.open_state()?;
        if offset == 0 {
            self.refresh(&mut state, id)?;
        }
        let node = state.node(id)?;
        let content = match &node.kind {
            JifsKind::File { content, .. } => content,
            JifsKind::Directory { .. } => return Err(FsError::NotAFile(node.name.clone())),
        };
        let length = content.len() as u64;
        if offset > length {
            return Err(FsError::OutOfRange { offset, length });
        }
        let start = offset as usize;
        let n = dst.len().min(content.len() - start);
        dst[..n].copy_from_slice(&content[start..start + n]);
        Ok(n)
    }

    // ==================== Directory operations ====================

    pub(crate) fn entries(self: &Arc<Self>, id: NodeId) -> Result<Vec<Entry>> {
        let mut state = self.open_state()?;
        self.refresh(&mut state, id)?;
        let children: Vec<NodeId> = state.table(id)?.values().copied().collect();
        let mut entries = Vec::with_capacity(children.len());
        for child in children {
            match self.refresh(&mut state, child) {
                Ok(()) => entries.push(self.entry_for(&state, child)?),
                Err(FsError::InvalidObject) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(entries)
    }

    pub(crate) fn entry(self: &Arc<Self>, id: NodeId, name: &str) -> Result<Option<Entry>> {
        let mut state = self.open_state()?;
        self.refresh(&mut state, id)?;
        let Some(child) = state.table(id)?.get(name).copied() else {
            return Ok(None);
        };
        match self.refresh(&mut state, child) {
            Ok(()) => Ok(Some(self.entry_for(&state, child)?)),
            Err(FsError::InvalidObject) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub(crate) fn touch(&self, id: NodeId) -> Result<()> {
        self.open_state()?.node(id).map(|_| ())
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    match serde_json::to_string_pretty(value) {
        Ok(mut text) => {
            text.push('\n');
            text
        }
        Err(e) => {
            tracing::warn!(error = %e, "jifs could not render json");
            String::new()
        }
    }
}

impl FileSystem for JifsFileSystem {
    fn fs_type(&self) -> &str {
        JIFS_TYPE
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
        true
    }

    fn close(&self) -> Result<()> {
        let mut state = self.state.lock().map_err(|_| FsError::Poisoned)?;
        if state.closed {
            return Ok(());
        }
        state.closed = true;
        state.nodes.clear();
        tracing::debug!(device = self.device.id(), "jifs closed");
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.state.lock().map(|s| s.closed).unwrap_or(true)
    }

    fn total_space(&self) -> Result<u64> {
        self.open_state()?;
        Ok(0)
    }

    fn free_space(&self) -> Result<u64> {
        self.open_state()?;
        Ok(0)
    }

    fn volume_name(&self) -> Result<String> {
        self.open_state()?;
        Ok(self.volume_name.clone())
    }
}

// ==================== Builder ====================

/// Assembles a JIFS tree.
///
/// Starts with the standard root entries; [`file`](JifsBuilder::file) adds
/// more, replacing any standard entry of the same name.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use strata_jifs::{HostSystemInfo, JifsBuilder, JifsDevice};
/// use strata_vfs::{read_to_end, FileSystem, FsDirectory};
///
/// let fs = JifsBuilder::new(Arc::new(HostSystemInfo::default()))
///     .file("hello", |_| "hi\n".to_string())
///     .build(Arc::new(JifsDevice::host("jifs0")))
///     .unwrap();
/// let hello = fs.root().unwrap().entry("hello").unwrap().unwrap().into_file().unwrap();
/// assert_eq!(read_to_end(hello.as_ref()).unwrap(), b"hi\n");
/// ```
pub struct JifsBuilder {
    info: Arc<dyn SystemInfo>,
    volume_name: String,
    files: Vec<(String, Generator)>,
    directories: Vec<(String, Listing)>,
}

impl JifsBuilder {
    pub fn new(info: Arc<dyn SystemInfo>) -> Self {
        let uptime: Generator = Arc::new(render_uptime);
        let memory: Generator = Arc::new(|info: &dyn SystemInfo| to_json(&info.memory()));
        let version: Generator =
            Arc::new(|info: &dyn SystemInfo| format!("{}\n", info.version()));
        Self {
            info,
            volume_name: "jifs".to_string(),
            files: vec![
                ("uptime".to_string(), uptime),
                ("memory".to_string(), memory),
                ("version".to_string(), version),
            ],
            directories: vec![
                ("threads".to_string(), Listing::Threads),
                ("plugins".to_string(), Listing::Plugins),
            ],
        }
    }

    pub fn volume_name(mut self, name: impl Into<String>) -> Self {
        self.volume_name = name.into();
        self
    }

    /// Add a root file rendered by `generate` on every refresh.
    pub fn file(
        mut self,
        name: impl Into<String>,
        generate: impl Fn(&dyn SystemInfo) -> String + Send + Sync + 'static,
    ) -> Self {
        let name = name.into();
        self.directories.retain(|(n, _)| *n != name);
        self.files.retain(|(n, _)| *n != name);
        let generate: Generator = Arc::new(generate);
        self.files.push((name, generate));
        self
    }

    pub fn build(self, device: Arc<dyn Device>) -> Result<Arc<JifsFileSystem>> {
        let mut nodes = NodeArena::new();
        let root = nodes.insert(JifsNode {
            name: String::new(),
            parent: None,
            modified: Utc::now(),
            kind: JifsKind::Directory {
                listing: Listing::Fixed,
                children: EntryTable::new(CaseSensitivity::Sensitive),
            },
        });
        let mut state = JifsState {
            nodes,
            root,
            closed: false,
        };
        for (name, generate) in self.files {
            let content = generate(self.info.as_ref()).into_bytes();
            state.insert(
                root,
                &name,
                JifsKind::File {
                    source: Source::Generated(generate),
                    content,
                },
            )?;
        }
        for (name, listing) in self.directories {
            state.insert(
                root,
                &name,
                JifsKind::Directory {
                    listing,
                    children: EntryTable::new(CaseSensitivity::Sensitive),
                },
            )?;
        }
        tracing::debug!(device = device.id(), "jifs created");
        Ok(Arc::new_cyclic(|me| JifsFileSystem {
            me: me.clone(),
            device,
            info: self.info,
            volume_name: self.volume_name,
            state: Mutex::new(state),
        }))
    }
}

fn render_uptime(info: &dyn SystemInfo) -> String {
    let uptime = info.uptime();
    format!("{}.{:03}\n", uptime.as_secs(), uptime.subsec_millis())
}

// ==================== Device and type ====================

/// The pseudo-device JIFS is created on. Carries the state source.
#[derive(Clone)]
pub struct JifsDevice {
    id: String,
    info: Arc<dyn SystemInfo>,
}

impl JifsDevice {
    pub fn new(id: impl Into<String>, info: Arc<dyn SystemInfo>) -> Self {
        Self {
            id: id.into(),
            info,
        }
    }

    /// A device reporting on this process, with no plugins.
    pub fn host(id: impl Into<String>) -> Self {
        Self::new(id, Arc::new(HostSystemInfo::default()))
    }

    pub fn info(&self) -> &Arc<dyn SystemInfo> {
        &self.info
    }
}

impl Device for JifsDevice {
    fn id(&self) -> &str {
        &self.id
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl std::fmt::Debug for JifsDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JifsDevice")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// The JIFS filesystem type. Mounts only [`JifsDevice`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct JifsFileSystemType;

impl FileSystemType for JifsFileSystemType {
    fn name(&self) -> &str {
        JIFS_TYPE
    }

    fn supports(
        &self,
        device: &dyn Device,
        _partition: Option<&dyn PartitionTableEntry>,
        _first_sector: &[u8],
    ) -> bool {
        device.as_any().is::<JifsDevice>()
    }

    fn create(&self, device: Arc<dyn Device>, _read_only: bool) -> Result<Arc<dyn FileSystem>> {
        let info = device
            .as_any()
            .downcast_ref::<JifsDevice>()
            .map(|jifs| jifs.info().clone())
            .ok_or_else(|| FsError::unsupported(format!("JIFS on device {}", device.id())))?;
        Ok(JifsFileSystem::new(device, info)?)
    }
}
