//! Filesystems, devices and the mount boundary.

use std::any::Any;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strata_block::BlockDevice;

use crate::error::{FsError, Result};
use crate::names::CaseSensitivity;
use crate::object::{DirHandle, Entry};

/// A mounted filesystem.
///
/// Owns exactly one root directory and one backing device. After
/// [`close`](FileSystem::close) every object it owns is invalid and fails
/// with `FsError::Closed`.
///
/// # Object Safety
///
/// This trait is object-safe: filesystems are shared as
/// `Arc<dyn FileSystem>`.
pub trait FileSystem: Send + Sync {
    /// Name of the filesystem type that created this filesystem.
    fn fs_type(&self) -> &str;

    /// The root entry. Always a directory for the backends in this
    /// workspace.
    fn root_entry(&self) -> Result<Entry>;

    fn device(&self) -> Arc<dyn Device>;

    fn is_read_only(&self) -> bool;

    /// Close the filesystem and invalidate its whole tree.
    ///
    /// Closing twice is not an error.
    fn close(&self) -> Result<()>;

    fn is_closed(&self) -> bool;

    fn total_space(&self) -> Result<u64>;

    fn free_space(&self) -> Result<u64>;

    /// Space a caller could actually use. Defaults to `free_space`.
    fn usable_space(&self) -> Result<u64> {
        self.free_space()
    }

    fn volume_name(&self) -> Result<String>;

    /// The root entry as a directory.
    fn root(&self) -> Result<DirHandle> {
        self.root_entry()?.into_directory()
    }
}

/// Something a filesystem can be created on.
pub trait Device: Send + Sync {
    fn id(&self) -> &str;

    /// The block interface, for devices that have one.
    fn as_block(&self) -> Option<&dyn BlockDevice> {
        None
    }

    /// For filesystem types that recognise their own device kind.
    fn as_any(&self) -> &dyn Any;
}

/// An entry of a partition table, as seen by a filesystem probe.
pub trait PartitionTableEntry {
    fn is_valid(&self) -> bool;

    /// The partition type byte.
    fn system_indicator(&self) -> u8;

    fn start_lba(&self) -> u64;

    fn sector_count(&self) -> u64;
}

/// Options for [`FileSystemType::format`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatOptions {
    /// Space budget in bytes, for filesystems that keep one.
    pub budget: Option<u64>,
    pub volume_name: Option<String>,
    pub case_sensitivity: CaseSensitivity,
}

/// A kind of filesystem: recognises devices and builds filesystems on them.
pub trait FileSystemType: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this type can mount `device`.
    ///
    /// `first_sector` is the device's first sector, empty for devices
    /// without a block interface.
    fn supports(
        &self,
        device: &dyn Device,
        partition: Option<&dyn PartitionTableEntry>,
        first_sector: &[u8],
    ) -> bool;

    /// Open the filesystem already present on `device`.
    fn create(&self, device: Arc<dyn Device>, read_only: bool) -> Result<Arc<dyn FileSystem>>;

    /// Create an empty filesystem on `device`.
    fn format(
        &self,
        _device: Arc<dyn Device>,
        _options: &FormatOptions,
    ) -> Result<Arc<dyn FileSystem>> {
        Err(FsError::unsupported(format!("format {}", self.name())))
    }
}

/// A [`Device`] wrapping a block device.
pub struct BlockDeviceHandle {
    id: String,
    device: Arc<dyn BlockDevice>,
}

impl BlockDeviceHandle {
    pub fn new(id: impl Into<String>, device: Arc<dyn BlockDevice>) -> Self {
        Self {
            id: id.into(),
            device,
        }
    }

    pub fn block(&self) -> &Arc<dyn BlockDevice> {
        &self.device
    }
}

impl Device for BlockDeviceHandle {
    fn id(&self) -> &str {
        &self.id
    }

    fn as_block(&self) -> Option<&dyn BlockDevice> {
        Some(self.device.as_ref())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl std::fmt::Debug for BlockDeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockDeviceHandle")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
