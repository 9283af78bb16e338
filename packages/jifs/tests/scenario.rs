//! JIFS mounted the way a system would mount it.

use std::sync::Arc;
use std::time::Duration;

use strata_jifs::{
    HostSystemInfo, JifsDevice, JifsFileSystemType, PluginDescriptor, PluginRegistry,
};
use strata_vfs::{FileSystemRegistry, FsError, Namespace};

fn parse_uptime(text: &[u8]) -> f64 {
    std::str::from_utf8(text).unwrap().trim().parse().unwrap()
}

fn proc_namespace(plugins: Arc<PluginRegistry>) -> Namespace {
    let mut types = FileSystemRegistry::new();
    types.register(Arc::new(JifsFileSystemType));
    let device = Arc::new(JifsDevice::new(
        "jifs0",
        Arc::new(HostSystemInfo::new(plugins)),
    ));
    let fs = types.mount_device(device, true).unwrap();
    let ns = Namespace::new();
    ns.mount("/proc", fs).unwrap();
    ns
}

#[test]
fn uptime_never_goes_backwards() {
    let ns = proc_namespace(Arc::new(PluginRegistry::new()));
    let first = parse_uptime(&ns.read("/proc/uptime").unwrap());
    std::thread::sleep(Duration::from_millis(20));
    let second = parse_uptime(&ns.read("/proc/uptime").unwrap());
    assert!(second >= first, "{} then {}", first, second);
    assert!(second > 0.0);
}

#[test]
fn plugins_appear_and_disappear() {
    let plugins = Arc::new(PluginRegistry::new());
    let ns = proc_namespace(plugins.clone());
    assert!(ns.list("/proc/plugins").unwrap().is_empty());

    plugins.register(PluginDescriptor::new("fs.ram", "RAMFS", "0.1"));
    assert!(ns.is_file("/proc/plugins/fs.ram").unwrap());
    let json: serde_json::Value =
        serde_json::from_slice(&ns.read("/proc/plugins/fs.ram").unwrap()).unwrap();
    assert_eq!(json["name"], "RAMFS");

    plugins.unregister("fs.ram");
    assert!(!ns.exists("/proc/plugins/fs.ram").unwrap());
}

#[test]
fn host_threads_are_listed() {
    let ns = proc_namespace(Arc::new(PluginRegistry::new()));
    let threads = ns.list("/proc/threads").unwrap();
    assert!(!threads.is_empty());
    // Other tests' threads may exit between listing and reading.
    let readable: Vec<serde_json::Value> = threads
        .iter()
        .filter_map(|entry| strata_vfs::read_to_end(entry.file()?.as_ref()).ok())
        .map(|bytes| serde_json::from_slice(&bytes).unwrap())
        .collect();
    assert!(!readable.is_empty());
    assert!(readable.iter().all(|json| json["id"].is_u64()));
}

#[test]
fn writes_are_refused() {
    let ns = proc_namespace(Arc::new(PluginRegistry::new()));
    assert!(matches!(ns.mkfile("/proc/new"), Err(FsError::ReadOnly)));
    assert!(matches!(ns.delete("/proc/uptime"), Err(FsError::ReadOnly)));
    assert_eq!(ns.total_space("/proc").unwrap(), 0);
}
