//! Sources of live system state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::plugins::{PluginDescriptor, PluginRegistry};

lazy_static::lazy_static! {
    static ref PROCESS_START: Instant = Instant::now();
}

/// Memory figures in bytes. Figures the host cannot provide are `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryInfo {
    pub total: Option<u64>,
    pub available: Option<u64>,
    pub resident: Option<u64>,
    pub virtual_size: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadInfo {
    pub id: u64,
    pub name: String,
    pub state: String,
}

/// What JIFS reports.
///
/// Every call reads current state; implementations must not cache.
pub trait SystemInfo: Send + Sync {
    /// Time since the system (or process) started.
    fn uptime(&self) -> Duration;

    fn memory(&self) -> MemoryInfo;

    fn version(&self) -> String;

    fn threads(&self) -> Vec<ThreadInfo>;

    fn plugins(&self) -> Vec<PluginDescriptor>;
}

/// [`SystemInfo`] for the running process.
///
/// Uptime counts from the first time any `HostSystemInfo` was created.
/// Memory and threads come from `/proc` on Linux; elsewhere memory is
/// unknown and the only thread reported is the calling one.
#[derive(Debug, Clone, Default)]
pub struct HostSystemInfo {
    plugins: Arc<PluginRegistry>,
}

impl HostSystemInfo {
    pub fn new(plugins: Arc<PluginRegistry>) -> Self {
        let _ = *PROCESS_START;
        Self { plugins }
    }

    pub fn plugin_registry(&self) -> &Arc<PluginRegistry> {
        &self.plugins
    }
}

impl SystemInfo for HostSystemInfo {
    fn uptime(&self) -> Duration {
        PROCESS_START.elapsed()
    }

    fn memory(&self) -> MemoryInfo {
        let status = std::fs::read_to_string("/proc/self/status").unwrap_or_default();
        let meminfo = std::fs::read_to_string("/proc/meminfo").unwrap_or_default();
        MemoryInfo {
            total: kilobytes(&meminfo, "MemTotal:"),
            available: kilobytes(&meminfo, "MemAvailable:"),
            resident: kilobytes(&status, "VmRSS:"),
            virtual_size: kilobytes(&status, "VmSize:"),
        }
    }

    fn version(&self) -> String {
        format!(
            "strata {} ({} {})",
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            std::env::consts::ARCH
        )
    }

    fn threads(&self) -> Vec<ThreadInfo> {
        match proc_threads() {
            Ok(threads) if !threads.is_empty() => threads,
            _ => {
                let current = std::thread::current();
                vec![ThreadInfo {
                    id: u64::from(std::process::id()),
                    name: current.name().unwrap_or("main").to_string(),
                    state: "running".to_string(),
                }]
            }
        }
    }

    fn plugins(&self) -> Vec<PluginDescriptor> {
        self.plugins.list()
    }
}

/// A `Key:   1234 kB` line from a `/proc` file, in bytes.
fn kilobytes(text: &str, key: &str) -> Option<u64> {
    text.lines()
        .find_map(|line| line.strip_prefix(key))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|n| n.parse::<u64>().ok())
        .map(|kb| kb * 1024)
}

fn proc_threads() -> std::io::Result<Vec<ThreadInfo>> {
    let mut threads = Vec::new();
    for task in std::fs::read_dir("/proc/self/task")? {
        let task = task?;
        let Some(id) = task.file_name().to_str().and_then(|s| s.parse::<u64>().ok()) else {
            continue;
        };
        let name = std::fs::read_to_string(task.path().join("comm"))
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default();
        let stat = std::fs::read_to_string(task.path().join("stat")).unwrap_or_default();
        threads.push(ThreadInfo {
            id,
            name,
            state: thread_state(&stat).to_string(),
        });
    }
    threads.sort_by_key(|t| t.id);
    Ok(threads)
}

/// The state letter of a `/proc/<pid>/task/<tid>/stat` line, spelled out.
fn thread_state(stat: &str) -> &'static str {
    // The command name is parenthesised and may itself contain spaces.
    let state = stat
        .rfind(')')
        .and_then(|i| stat[i + 1..].split_whitespace().next());
    match state {
        Some("R") => "running",
        Some("S") => "sleeping",
        Some("D") => "waiting",
        Some("T") | Some("t") => "stopped",
        Some("Z") => "zombie",
        Some(_) => "other",
        None => "unknown",
    }
}
