//! Mount configuration.
//!
//! Mount tables are JSON files mapping absolute paths to a mount config
//! tagged by `type`:
//!
//! ```json
//! {
//!   "mounts": {
//!     "/": {"type": "ram", "budget": 65536},
//!     "/proc": {"type": "jifs"},
//!     "/net": {"type": "ftp", "url": "ftp://ftp.example.org/pub"},
//!     "/cd": {"type": "cdrom", "image": "/tmp/disc.iso"}
//!   }
//! }
//! ```
//!
//! The same configs can be given on the command line as `PATH=SPEC`, where
//! SPEC is `ram`, `ram:BUDGET`, `jifs`, an `ftp://` URL, `cdrom:IMAGE` or
//! a JSON object.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CliError;

/// What to mount at one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MountConfig {
    /// A fresh RAM filesystem.
    Ram {
        #[serde(default)]
        budget: Option<u64>,
        #[serde(default)]
        volume_name: Option<String>,
    },
    /// A remote FTP directory, read-only.
    Ftp { url: String },
    /// Live state of this process.
    Jifs,
    /// A CD image behind the emulated drive.
    Cdrom { image: PathBuf },
}

impl MountConfig {
    /// Parse the SPEC half of a `--mount PATH=SPEC` argument.
    pub fn parse_spec(spec: &str) -> Result<Self, CliError> {
        let invalid = || CliError::InvalidMount(spec.to_string());
        if spec.starts_with('{') {
            return serde_json::from_str(spec).map_err(|_| invalid());
        }
        if spec.starts_with("ftp://") {
            return Ok(MountConfig::Ftp {
                url: spec.to_string(),
            });
        }
        match spec.split_once(':') {
            None if spec == "ram" => Ok(MountConfig::Ram {
                budget: None,
                volume_name: None,
            }),
            None if spec == "jifs" => Ok(MountConfig::Jifs),
            Some(("ram", budget)) => Ok(MountConfig::Ram {
                budget: Some(budget.parse().map_err(|_| invalid())?),
                volume_name: None,
            }),
            Some(("cdrom", image)) if !image.is_empty() => Ok(MountConfig::Cdrom {
                image: PathBuf::from(image),
            }),
            _ => Err(invalid()),
        }
    }
}

/// Path to mount config, sorted by path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountTable {
    #[serde(default)]
    pub mounts: BTreeMap<String, MountConfig>,
}

impl MountTable {
    /// `<config dir>/strata/mounts.json`, where the platform has a config
    /// directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("strata").join("mounts.json"))
    }

    /// A RAM root and JIFS at `/proc`, used when nothing is configured.
    pub fn builtin() -> Self {
        let mut mounts = BTreeMap::new();
        mounts.insert(
            "/".to_string(),
            MountConfig::Ram {
                budget: None,
                volume_name: None,
            },
        );
        mounts.insert("/proc".to_string(), MountConfig::Jifs);
        Self { mounts }
    }

    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|source| CliError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve the table for a run.
    ///
    /// An explicit `config` must exist. Otherwise the default file is used
    /// if present, then the built-in table. `--mount` arguments are applied
    /// on top and win over file entries at the same path.
    pub fn resolve(config: Option<&Path>, specs: &[String]) -> Result<Self, CliError> {
        let mut table = match config {
            Some(path) => Self::load(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::load(&path)?,
                None if specs.is_empty() => Self::builtin(),
                None => Self::default(),
            },
        };
        for spec in specs {
            let (path, config) = parse_mount_arg(spec)?;
            table.mounts.insert(path, config);
        }
        tracing::debug!(mounts = table.mounts.len(), "mount table resolved");
        Ok(table)
    }
}

/// Split a `PATH=SPEC` argument.
pub fn parse_mount_arg(arg: &str) -> Result<(String, MountConfig), CliError> {
    let (path, spec) = arg
        .split_once('=')
        .ok_or_else(|| CliError::InvalidMount(arg.to_string()))?;
    if !path.starts_with('/') {
        return Err(CliError::InvalidMount(arg.to_string()));
    }
    Ok((path.to_string(), MountConfig::parse_spec(spec)?))
}
