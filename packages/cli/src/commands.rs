//! Subcommand implementations.
//!
//! Each command writes to the given output so it can be run against a
//! buffer in tests.

use std::io::Write;
use std::path::Path;

use strata_cdrom::{CdromDriver, DriverConfig, EmulatedCdrom};
use strata_vfs::{namespace, Entry, FsError, Namespace};

use crate::error::CliError;

/// Entries sorted by name; entries that vanish while listing are skipped.
fn sorted(entries: Vec<Entry>) -> Vec<(String, Entry)> {
    let mut named: Vec<(String, Entry)> = entries
        .into_iter()
        .filter_map(|e| e.name().ok().map(|n| (n, e)))
        .collect();
    named.sort_by(|a, b| a.0.cmp(&b.0));
    named
}

fn describe(name: &str, entry: &Entry, long: bool) -> Result<String, FsError> {
    let suffix = if entry.is_directory() { "/" } else { "" };
    if !long {
        return Ok(format!("{}{}", name, suffix));
    }
    let kind = if entry.is_directory() { 'd' } else { '-' };
    let length = match entry.file() {
        Some(file) => file.length()?.to_string(),
        None => "-".to_string(),
    };
    let modified = entry.last_modified()?.format("%Y-%m-%d %H:%M");
    Ok(format!("{} {:>10} {} {}{}", kind, length, modified, name, suffix))
}

/// `ls PATH`
pub fn ls(ns: &Namespace, path: &str, long: bool, out: &mut dyn Write) -> Result<(), CliError> {
    match ns.resolve(path)? {
        Entry::Directory(dir) => {
            for (name, entry) in sorted(dir.entries()?) {
                writeln!(out, "{}", describe(&name, &entry, long)?)?;
            }
        }
        file @ Entry::File(_) => {
            let name = file.name()?;
            writeln!(out, "{}", describe(&name, &file, long)?)?;
        }
    }
    Ok(())
}

/// `cat PATH`
pub fn cat(ns: &Namespace, path: &str, out: &mut dyn Write) -> Result<(), CliError> {
    out.write_all(&ns.read(path)?)?;
    Ok(())
}

/// `tree PATH`
pub fn tree(ns: &Namespace, path: &str, out: &mut dyn Write) -> Result<(), CliError> {
    let root = ns.resolve(path)?;
    writeln!(out, "{}", namespace::join(&namespace::components(path)?))?;
    if let Entry::Directory(dir) = root {
        walk(&dir.entries()?, 1, out)?;
    }
    Ok(())
}

fn walk(entries: &[Entry], depth: usize, out: &mut dyn Write) -> Result<(), CliError> {
    for (name, entry) in sorted(entries.to_vec()) {
        let suffix = if entry.is_directory() { "/" } else { "" };
        writeln!(out, "{}{}{}", "  ".repeat(depth), name, suffix)?;
        if let Entry::Directory(dir) = &entry {
            match dir.entries() {
                Ok(children) => walk(&children, depth + 1, out)?,
                Err(e) if e.is_gone() => {}
                Err(e) => return Err(e.into()),
            }
        }
    }
    Ok(())
}

/// `df`
pub fn df(ns: &Namespace, out: &mut dyn Write) -> Result<(), CliError> {
    writeln!(
        out,
        "{:<16} {:<6} {:>12} {:>12} {}",
        "MOUNT", "TYPE", "TOTAL", "FREE", "VOLUME"
    )?;
    for (path, fs) in ns.mounts()? {
        let total = fs.total_space()?;
        let free = fs.free_space()?;
        let volume = fs.volume_name()?;
        let mode = if fs.is_read_only() { " (ro)" } else { "" };
        writeln!(
            out,
            "{:<16} {:<6} {:>12} {:>12} {}{}",
            path,
            fs.fs_type(),
            total,
            free,
            volume,
            mode
        )?;
    }
    Ok(())
}

/// `cdrom info IMAGE`: start the emulated drive on an image and report
/// what the driver sees.
pub fn cdrom_info(image: &Path, out: &mut dyn Write) -> Result<(), CliError> {
    let driver = CdromDriver::new(EmulatedCdrom::from_file(image)?, DriverConfig::default());
    driver.start()?;
    let inquiry = driver.inquiry()?;
    let capacity = driver.capacity()?;
    writeln!(out, "vendor:       {}", inquiry.vendor())?;
    writeln!(out, "product:      {}", inquiry.product())?;
    writeln!(out, "revision:     {}", inquiry.revision())?;
    writeln!(out, "device type:  {:?}", inquiry.device_type())?;
    writeln!(out, "removable:    {}", inquiry.is_removable())?;
    writeln!(out, "block length: {}", capacity.block_length())?;
    writeln!(out, "last lba:     {}", capacity.logical_block_address())?;
    writeln!(out, "length:       {}", capacity.device_length())?;
    driver.stop()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MountTable;
    use crate::mounts::{mount_all, registry};

    fn namespace() -> Namespace {
        let ns = mount_all(&registry(), &MountTable::builtin()).unwrap();
        ns.mkdir("/docs").unwrap();
        ns.mkfile("/docs/b.txt").unwrap().write(0, b"bee").unwrap();
        ns.mkfile("/docs/a.txt").unwrap().write(0, b"a").unwrap();
        ns
    }

    fn run(f: impl FnOnce(&mut dyn Write) -> Result<(), CliError>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn ls_sorts_and_marks_directories() {
        let ns = namespace();
        assert_eq!(run(|out| ls(&ns, "/", false, out)), "docs/\n");
        assert_eq!(run(|out| ls(&ns, "/docs", false, out)), "a.txt\nb.txt\n");
        let long = run(|out| ls(&ns, "/docs/b.txt", true, out));
        assert!(long.starts_with("-          3 "), "{}", long);
        assert!(long.ends_with(" b.txt\n"));
    }

    #[test]
    fn cat_prints_content() {
        let ns = namespace();
        assert_eq!(run(|out| cat(&ns, "/docs/b.txt", out)), "bee");
        let mut out = Vec::new();
        assert!(matches!(
            cat(&ns, "/docs", &mut out),
            Err(CliError::Fs(FsError::NotAFile(_)))
        ));
    }

    #[test]
    fn tree_indents_by_depth() {
        let ns = namespace();
        assert_eq!(
            run(|out| tree(&ns, "/", out)),
            "/\n  docs/\n    a.txt\n    b.txt\n"
        );
    }

    #[test]
    fn df_lists_every_mount() {
        let ns = namespace();
        let text = run(|out| df(&ns, out));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("/ "));
        assert!(lines[1].contains("RAMFS"));
        assert!(lines[2].starts_with("/proc "));
        assert!(lines[2].ends_with("(ro)"));
    }

    #[test]
    fn cdrom_info_reports_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("disc.iso");
        std::fs::write(&image, vec![0u8; 2048 * 10]).unwrap();
        let text = run(|out| cdrom_info(&image, out));
        assert!(text.contains("block length: 2048\n"));
        assert!(text.contains("last lba:     9\n"));
        assert!(text.contains("length:       18432\n"));
        assert!(text.contains("removable:    true\n"));
    }
}
