//! The FTPFS filesystem, its device and its type.

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use strata_vfs::{
    CaseSensitivity, Device, DirHandle, Entry, EntryTable, FileSystem, FileSystemType,
    FsError, NodeArena, NodeId, PartitionTableEntry, Result,
};

use crate::client::{RemoteClient, RemoteKind};
use crate::config::FtpConfig;
use crate::directory::FtpDirectory;
use crate::file::FtpFile;
use crate::ftp::FtpClient;

/// Name under which FTPFS registers.
pub const FTPFS_TYPE: &str = "FTPFS";

/// A remote server, as something to mount.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FtpDevice {
    id: String,
    config: FtpConfig,
}

impl FtpDevice {
    pub fn new(config: FtpConfig) -> Self {
        Self {
            id: format!("ftp://{}{}", config.address(), config.base_path()),
            config,
        }
    }

    pub fn config(&self) -> &FtpConfig {
        &self.config
    }
}

impl Device for FtpDevice {
    fn id(&self) -> &str {
        &self.id
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(crate) enum FtpKind {
    /// `size` comes from the listing; `content` is filled on first read.
    File {
        size: Option<u64>,
        content: Option<Bytes>,
    },
    /// `None` until the first listing.
    Directory {
        children: Option<EntryTable<NodeId>>,
    },
}

pub(crate) struct FtpNode {
    name: String,
    /// The root is its own parent.
    parent: NodeId,
    modified: DateTime<Utc>,
    kind: FtpKind,
}

pub(crate) struct FtpState {
    client: Box<dyn RemoteClient>,
    nodes: NodeArena<FtpNode>,
    root: NodeId,
    closed: bool,
}

impl FtpState {
    fn node(&self, id: NodeId) -> Result<&FtpNode> {
        self.nodes.get(id).ok_or(FsError::InvalidObject)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut FtpNode> {
        self.nodes.get_mut(id).ok_or(FsError::InvalidObject)
    }

    /// Remote path of `id` relative to the mounted directory.
    fn relative_path(&self, id: NodeId) -> Result<String> {
        let mut names = Vec::new();
        let mut current = id;
        // A well-formed tree reaches the root in fewer steps than it has nodes.
        for _ in 0..=self.nodes.len() {
            let node = self.node(current)?;
            if node.parent == current {
                names.reverse();
                return Ok(names.join("/"));
            }
            names.push(node.name.as_str());
            current = node.parent;
        }
        Err(FsError::InvalidObject)
    }
}

/// A read-only view of a remote directory tree.
///
/// Directories are listed on first access and never again; files are
/// downloaded whole on first read and served from memory afterwards. The
/// remote client and the tree share one mutex, so a directory is listed at
/// most once even under concurrent lookups.
pub struct FtpFileSystem {
    me: Weak<FtpFileSystem>,
    device: Arc<dyn Device>,
    base: String,
    volume_name: String,
    state: Mutex<FtpState>,
}

impl FtpFileSystem {
    /// Connect to the server described by `config`.
    pub fn connect(device: Arc<dyn Device>, config: &FtpConfig) -> Result<Arc<Self>> {
        let client = FtpClient::connect(config)?;
        Ok(Self::with_client(device, config, Box::new(client)))
    }

    /// Build on an already connected client.
    pub fn with_client(
        device: Arc<dyn Device>,
        config: &FtpConfig,
        client: Box<dyn RemoteClient>,
    ) -> Arc<Self> {
        let mut nodes = NodeArena::new();
        let root = nodes.insert_with(|id| FtpNode {
            name: String::new(),
            parent: id,
            modified: Utc::now(),
            kind: FtpKind::Directory { children: None },
        });
        let base = config.base_path();
        tracing::debug!(device = device.id(), base = %base, "ftpfs created");
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            device,
            base,
            volume_name: config.host.clone(),
            state: Mutex::new(FtpState {
                client,
                nodes,
                root,
                closed: false,
            }),
        })
    }

    fn arc(&self) -> Result<Arc<Self>> {
        self.me.upgrade().ok_or(FsError::Closed)
    }

    fn open_state(&self) -> Result<MutexGuard<'_, FtpState>> {
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

    /// Absolute remote path of a node.
    pub(crate) fn remote_path(&self, state: &FtpState, id: NodeId) -> Result<String> {
        let relative = state.relative_path(id)?;
        Ok(match (self.base.as_str(), relative.is_empty()) {
            (base, true) => base.to_string(),
            ("/", false) => format!("/{}", relative),
            (base, false) => format!("{}/{}", base, relative),
        })
    }

    fn entry_for(self: &Arc<Self>, state: &FtpState, id: NodeId) -> Result<Entry> {
        Ok(match state.node(id)?.kind {
            FtpKind::File { .. } => Entry::File(Arc::new(FtpFile::new(self.clone(), id))),
            FtpKind::Directory { .. } => {
                Entry::Directory(Arc::new(FtpDirectory::new(self.clone(), id)))
            }
        })
    }

    /// List `id` on the server unless that already happened.
    fn populate(&self, state: &mut FtpState, id: NodeId) -> Result<()> {
        match &state.node(id)?.kind {
            FtpKind::Directory { children: Some(_) } => return Ok(()),
            FtpKind::Directory { children: None } => {}
            FtpKind::File { .. } => return Err(FsError::NotADirectory(state.node(id)?.name.clone())),
        }
        let path = self.remote_path(state, id)?;
        let listing = state.client.list(&path)?;
        tracing::debug!(path = %path, entries = listing.len(), "ftp directory listed");

        let mut table = EntryTable::new(CaseSensitivity::Sensitive);
        for remote in listing {
            let kind = match remote.kind {
                RemoteKind::File => FtpKind::File {
                    size: remote.size,
                    content: None,
                },
                RemoteKind::Directory => FtpKind::Directory { children: None },
            };
            let child = state.nodes.insert(FtpNode {
                name: remote.name.clone(),
                parent: id,
                modified: remote.modified.unwrap_or_else(Utc::now),
                kind,
            });
            if let Some(duplicate) = table.insert(&remote.name, child) {
                state.nodes.remove(duplicate);
            }
        }
        if let FtpKind::Directory { children } = &mut state.node_mut(id)?.kind {
            *children = Some(table);
        }
        Ok(())
    }

    /// Download a file unless it is cached already.
    fn fetch(&self, state: &mut FtpState, id: NodeId) -> Result<Bytes> {
        match &state.node(id)?.kind {
            FtpKind::File {
                content: Some(content),
                ..
            } => return Ok(content.clone()),
            FtpKind::File { content: None, .. } => {}
            FtpKind::Directory { .. } => return Err(FsError::NotAFile(state.node(id)?.name.clone())),
        }
        let path = self.remote_path(state, id)?;
        let data = state.client.retrieve(&path)?;
        tracing::debug!(path = %path, bytes = data.len(), "ftp file fetched");
        if let FtpKind::File { size, content } = &mut state.node_mut(id)?.kind {
            *size = Some(data.len() as u64);
            *content = Some(data.clone());
        }
        Ok(data)
    }

    // ==================== Node operations ====================

    pub(crate) fn name(&self, id: NodeId) -> Result<String> {
        Ok(self.open_state()?.node(id)?.name.clone())
    }

    pub(crate) fn parent(self: &Arc<Self>, id: NodeId) -> Result<Option<DirHandle>> {
        let state = self.open_state()?;
        let parent = state.node(id)?.parent;
        if parent == id {
            return Ok(None);
        }
        Ok(Some(Arc::new(FtpDirectory::new(self.clone(), parent))))
    }

    pub(crate) fn last_modified(&self, id: NodeId) -> Result<DateTime<Utc>> {
        Ok(self.open_state()?.node(id)?.modified)
    }

    // ==================== File operations ====================

    /// The listed size, or the downloaded size when the listing had none.
    pub(crate) fn length(&self, id: NodeId) -> Result<u64> {
        let mut state = self.open_state()?;
        if let FtpKind::File {
            size: Some(size), ..
        } = state.node(id)?.kind
        {
            return Ok(size);
        }
        Ok(self.fetch(&mut state, id)?.len() as u64)
    }

    pub(crate) fn read(&self, id: NodeId, offset: u64, dst: &mut [u8]) -> Result<usize> {
        let mut state = self.open_state()?;
        let content = self.fetch(&mut state, id)?;
        let length = content.len() as u64;
        if offset > length {
            return Err(FsError::OutOfRange { offset, length });
        }
        let start = offset as usize;
        let n = dst.len().min(content.len() - start);
        dst[..n].copy_from_slice(&content[start..start + n]);
        Ok(n)
    }

    /// Validity check for the operations that are accepted and ignored.
    pub(crate) fn touch(&self, id: NodeId) -> Result<()> {
        self.open_state()?.node(id).map(|_| ())
    }

    // ==================== Directory operations ====================

    pub(crate) fn entries(self: &Arc<Self>, id: NodeId) -> Result<Vec<Entry>> {
        let mut state = self.open_state()?;
        self.populate(&mut state, id)?;
        let children: Vec<NodeId> = match &state.node(id)?.kind {
            FtpKind::Directory {
                children: Some(table),
            } => table.values().copied().collect(),
            _ => Vec::new(),
        };
        children
            .into_iter()
            .map(|child| self.entry_for(&state, child))
            .collect()
    }

    pub(crate) fn entry(self: &Arc<Self>, id: NodeId, name: &str) -> Result<Option<Entry>> {
        let mut state = self.open_state()?;
        self.populate(&mut state, id)?;
        let child = match &state.node(id)?.kind {
            FtpKind::Directory {
                children: Some(table),
            } => table.get(name).copied(),
            _ => None,
        };
        child.map(|child| self.entry_for(&state, child)).transpose()
    }
}

impl FileSystem for FtpFileSystem {
    fn fs_type(&self) -> &str {
        FTPFS_TYPE
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
        if let Err(e) = state.client.quit() {
            tracing::warn!(device = self.device.id(), error = %e, "ftp quit failed");
        }
        tracing::debug!(device = self.device.id(), "ftpfs closed");
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

/// The FTPFS filesystem type. Mounts only [`FtpDevice`]s, always
/// read-only.
#[derive(Clone, Copy, Debug, Default)]
pub struct FtpFileSystemType;

impl FileSystemType for FtpFileSystemType {
    fn name(&self) -> &str {
        FTPFS_TYPE
    }

    fn supports(
        &self,
        device: &dyn Device,
        _partition: Option<&dyn PartitionTableEntry>,
        _first_sector: &[u8],
    ) -> bool {
        device.as_any().is::<FtpDevice>()
    }

    fn create(&self, device: Arc<dyn Device>, _read_only: bool) -> Result<Arc<dyn FileSystem>> {
        let config = device
            .as_any()
            .downcast_ref::<FtpDevice>()
            .map(|ftp| ftp.config().clone())
            .ok_or_else(|| FsError::unsupported(format!("FTPFS on device {}", device.id())))?;
        Ok(FtpFileSystem::connect(device, &config)?)
    }
}
