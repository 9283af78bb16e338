//! End-to-end RAMFS behaviour through the filesystem-type and namespace
//! boundaries.

use std::sync::Arc;

use strata_ramfs::{RamDevice, RamFileSystem, RamFileSystemType};
use strata_vfs::{
    Device, Entry, FileSystem, FileSystemRegistry, FileSystemType, FormatOptions, FsDirectory,
    FsError, FsFile, FsObject, Namespace,
};

fn mount(budget: u64) -> Arc<dyn FileSystem> {
    let device: Arc<dyn Device> = Arc::new(RamDevice::new("ram0", budget));
    RamFileSystemType
        .format(device, &FormatOptions::default())
        .unwrap()
}

#[test]
fn thousand_byte_budget_scenario() {
    let fs = mount(1000);
    let root = fs.root().unwrap();
    let d = root.add_directory("d").unwrap();
    let f = d.add_file("f").unwrap();

    let free_before = fs.free_space().unwrap();
    f.set_length(100).unwrap();
    let free_after = fs.free_space().unwrap();
    assert!(free_before - free_after >= 100);
    assert_eq!(free_before - free_after, 128);

    f.write(0, &[65u8; 50]).unwrap();
    let mut buf = [0u8; 50];
    assert_eq!(f.read(0, &mut buf).unwrap(), 50);
    assert!(buf.iter().all(|&b| b == 65));
    assert_eq!(f.length().unwrap(), 100);
}

#[test]
fn free_space_tracks_allocation() {
    let device = Arc::new(RamDevice::new("ram0", 2000));
    let fs = RamFileSystemType
        .format(device, &FormatOptions::default())
        .unwrap();
    let ram = RamFileSystem::new(
        Arc::new(RamDevice::new("ram1", 2000)),
        strata_ramfs::RamConfig {
            budget: 2000,
            ..Default::default()
        },
    );
    for fs in [fs.clone(), ram.clone() as Arc<dyn FileSystem>] {
        let root = fs.root().unwrap();
        let a = root.add_file("a").unwrap();
        let b = root.add_file("b").unwrap();
        for (file, length) in [(&a, 10u64), (&b, 300), (&a, 700), (&b, 0), (&a, 1)] {
            file.set_length(length).unwrap();
        }
        assert!(matches!(a.set_length(5000), Err(FsError::Full { .. })));
    }
    assert_eq!(
        ram.free_space().unwrap(),
        2000 - ram.allocated_capacity().unwrap()
    );
    assert_eq!(ram.total_length().unwrap(), 1);
}

#[test]
fn registry_probes_ram_devices() {
    let mut registry = FileSystemRegistry::new();
    registry.register(Arc::new(RamFileSystemType));
    let fs = registry
        .mount_device(Arc::new(RamDevice::new("ram0", 512)), false)
        .unwrap();
    assert_eq!(fs.fs_type(), "RAMFS");
    assert_eq!(fs.total_space().unwrap(), 512);
    assert_eq!(fs.device().id(), "ram0");
}

#[test]
fn namespace_over_ramfs() {
    let ns = Namespace::new();
    ns.mount("/", mount(4096)).unwrap();
    ns.mount("/scratch", mount(1024)).unwrap();

    ns.mkdir("/etc").unwrap();
    let motd = ns.mkfile("/etc/motd").unwrap();
    motd.write(0, b"welcome").unwrap();

    assert!(ns.is_directory("/etc").unwrap());
    assert!(ns.is_file("/etc/motd").unwrap());
    assert!(!ns.exists("/etc/missing").unwrap());
    assert_eq!(ns.length("/etc/motd").unwrap(), 7);
    assert_eq!(ns.read("/etc/motd").unwrap(), b"welcome");
    assert!(matches!(ns.mkfile("/etc/motd"), Err(FsError::AlreadyExists(_))));
    assert!(matches!(
        ns.resolve("/etc/motd/x"),
        Err(FsError::NotADirectory(_))
    ));

    ns.mkfile("/scratch/tmp").unwrap().set_length(200).unwrap();
    assert_eq!(ns.free_space("/scratch").unwrap(), 1024 - 256);
    assert_eq!(ns.free_space("/etc").unwrap(), 4096 - 128);
    assert_eq!(ns.total_space("/scratch/tmp").unwrap(), 1024);

    let names: Vec<String> = ns
        .list("/")
        .unwrap()
        .iter()
        .map(|e| e.name().unwrap())
        .collect();
    assert_eq!(names, vec!["etc"]);

    assert!(matches!(ns.delete("/scratch"), Err(FsError::InvalidPath(_))));
    ns.delete("/etc/motd").unwrap();
    assert!(!motd.is_valid());
    assert!(!ns.exists("/etc/motd").unwrap());

    let scratch = ns.unmount("/scratch").unwrap();
    assert!(scratch.is_closed());
    assert!(matches!(ns.resolve("/scratch/tmp"), Err(FsError::NotFound(_))));
}

#[test]
fn close_gives_closed_not_invalid() {
    let fs = mount(1000);
    let root = fs.root().unwrap();
    let d = root.add_directory("d").unwrap();
    let e = d.add_file("e").unwrap();
    let removed = root.add_file("gone").unwrap();
    root.remove("gone").unwrap();
    assert!(matches!(removed.length(), Err(FsError::InvalidObject)));

    fs.close().unwrap();
    for entry in [Entry::Directory(d.clone()), Entry::File(e.clone())] {
        assert!(!entry.is_valid());
        assert!(matches!(entry.name(), Err(FsError::Closed)));
        assert!(matches!(entry.last_modified(), Err(FsError::Closed)));
        assert_eq!(entry.file_system().fs_type(), "RAMFS");
    }
    assert!(matches!(removed.length(), Err(FsError::Closed)));
    assert!(matches!(fs.root_entry(), Err(FsError::Closed)));
}

#[test]
fn handles_are_shared_across_threads() {
    let fs = mount(1 << 16);
    let root = fs.root().unwrap();
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let root = root.clone();
            std::thread::spawn(move || {
                let f = root.add_file(&format!("f{}", i)).unwrap();
                for chunk in 0..10u64 {
                    f.write(chunk * 10, &[i as u8; 10]).unwrap();
                }
                f.length().unwrap()
            })
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), 100);
    }
    assert_eq!(root.entries().unwrap().len(), 4);
}
