//! Mount tables from files, end to end through the namespace.

use strata_cli::{commands, mount_all, registry, CliError, MountTable};
use strata_vfs::FsError;

fn output(f: impl FnOnce(&mut Vec<u8>) -> Result<(), CliError>) -> String {
    let mut out = Vec::new();
    f(&mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn table_from_file_mounts_every_entry() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("mounts.json");
    std::fs::write(
        &config,
        r#"{"mounts": {
            "/": {"type": "ram", "budget": 4096, "volume_name": "root"},
            "/scratch": {"type": "ram", "budget": 1024},
            "/sys": {"type": "jifs"}
        }}"#,
    )
    .unwrap();

    let table = MountTable::resolve(Some(&config), &[]).unwrap();
    let ns = mount_all(&registry(), &table).unwrap();
    let mounts: Vec<String> = ns.mounts().unwrap().into_iter().map(|(p, _)| p).collect();
    assert_eq!(mounts, vec!["/", "/scratch", "/sys"]);

    ns.mkfile("/scratch/log").unwrap().write(0, b"x").unwrap();
    assert_eq!(ns.free_space("/scratch").unwrap(), 1024 - 128);
    assert_eq!(ns.file_system("/").unwrap().volume_name().unwrap(), "root");

    let uptime = output(|out| commands::cat(&ns, "/sys/uptime", out));
    assert!(uptime.trim().parse::<f64>().is_ok(), "{}", uptime);

    let df = output(|out| commands::df(&ns, out));
    assert_eq!(df.lines().count(), 4);
    ns.close_all().unwrap();
}

#[test]
fn command_line_mounts_extend_the_table() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("mounts.json");
    std::fs::write(&config, r#"{"mounts": {"/": {"type": "ram"}}}"#).unwrap();

    let table = MountTable::resolve(Some(&config), &["/proc=jifs".to_string()]).unwrap();
    let ns = mount_all(&registry(), &table).unwrap();
    let listing = output(|out| commands::ls(&ns, "/proc", false, out));
    assert!(listing.contains("threads/\n"));
    assert!(listing.contains("version\n"));
    assert!(matches!(ns.mkdir("/proc/x"), Err(FsError::ReadOnly)));
}

#[test]
fn bad_mount_argument_is_reported() {
    let err = MountTable::resolve(None, &["nowhere".to_string()]).unwrap_err();
    assert!(matches!(err, CliError::InvalidMount(_)));
    assert_eq!(
        err.to_string(),
        "invalid mount `nowhere`: expected PATH=SPEC"
    );
}

#[test]
fn cdrom_info_on_an_image() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("disc.iso");
    std::fs::write(&image, vec![0u8; 2048 * 4]).unwrap();
    let info = output(|out| commands::cdrom_info(&image, out));
    assert!(info.contains("vendor:       STRATA\n"));
    assert!(info.contains("length:       6144\n"));

    let missing = dir.path().join("missing.iso");
    let mut out = Vec::new();
    assert!(matches!(
        commands::cdrom_info(&missing, &mut out),
        Err(CliError::Io(_))
    ));
}
