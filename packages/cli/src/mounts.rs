//! Turning a mount table into a namespace.

use std::sync::Arc;

use strata_block::BlockDevice;
use strata_cdrom::{CdromDriver, DriverConfig, EmulatedCdrom};
use strata_ftpfs::{FtpConfig, FtpDevice, FtpFileSystemType};
use strata_jifs::{JifsDevice, JifsFileSystemType};
use strata_ramfs::{RamDevice, RamFileSystemType, RAMFS_TYPE};
use strata_vfs::{
    BlockDeviceHandle, Device, FileSystem, FileSystemRegistry, FormatOptions, Namespace,
};

use crate::config::{MountConfig, MountTable};
use crate::error::CliError;

const DEFAULT_RAM_BUDGET: u64 = 1 << 20;

/// Every filesystem type this binary knows.
pub fn registry() -> FileSystemRegistry {
    let mut registry = FileSystemRegistry::new();
    registry.register(Arc::new(RamFileSystemType));
    registry.register(Arc::new(FtpFileSystemType));
    registry.register(Arc::new(JifsFileSystemType));
    registry
}

/// Open the filesystem `config` describes. `path` names its device.
pub fn open(
    registry: &FileSystemRegistry,
    path: &str,
    config: &MountConfig,
) -> Result<Arc<dyn FileSystem>, CliError> {
    let fs = match config {
        MountConfig::Ram {
            budget,
            volume_name,
        } => {
            let budget = budget.unwrap_or(DEFAULT_RAM_BUDGET);
            let device = Arc::new(RamDevice::new(format!("ram:{}", path), budget));
            let options = FormatOptions {
                budget: Some(budget),
                volume_name: volume_name.clone(),
                ..FormatOptions::default()
            };
            registry.get(RAMFS_TYPE)?.format(device, &options)?
        }
        MountConfig::Ftp { url } => {
            let device: Arc<dyn Device> = Arc::new(FtpDevice::new(FtpConfig::from_url(url)?));
            registry.mount_device(device, true)?
        }
        MountConfig::Jifs => {
            registry.mount_device(Arc::new(JifsDevice::host(format!("jifs:{}", path))), true)?
        }
        MountConfig::Cdrom { image } => {
            let driver = CdromDriver::new(EmulatedCdrom::from_file(image)?, DriverConfig::default());
            driver.start()?;
            let block: Arc<dyn BlockDevice> = Arc::new(driver);
            let device = BlockDeviceHandle::new(image.display().to_string(), block);
            // Only disc formats registered with `registry` can claim it.
            registry.mount_device(Arc::new(device), true)?
        }
    };
    tracing::debug!(path, fs_type = fs.fs_type(), "opened");
    Ok(fs)
}

/// Mount everything in `table`. Stops at the first failure, closing what
/// was already mounted.
pub fn mount_all(registry: &FileSystemRegistry, table: &MountTable) -> Result<Namespace, CliError> {
    let namespace = Namespace::new();
    for (path, config) in &table.mounts {
        let mounted = open(registry, path, config)
            .and_then(|fs| namespace.mount(path, fs).map_err(CliError::from));
        if let Err(e) = mounted {
            namespace.close_all()?;
            return Err(e);
        }
    }
    Ok(namespace)
}
