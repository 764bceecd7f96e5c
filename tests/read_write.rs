//! Read/write/remove coverage for the scenarios and properties in
//! spec.md §8 (P4 read-after-write, P5 remove frees exactly what it
//! reached, P6 max file size).

use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use simplefs::fs::{self, FileSystem};
use simplefs::{Disk, BLOCK_SIZE, MAX_FILE_SIZE};
use tempfile::NamedTempFile;

fn mounted_disk(blocks: u32) -> (NamedTempFile, Disk) {
    let file = NamedTempFile::new().expect("create temp file");
    let mut disk = Disk::open(file.path(), blocks).unwrap();
    assert!(fs::format(&mut disk));
    (file, disk)
}

#[test]
fn read_after_write_matches_for_random_content() {
    let (_file, mut disk) = mounted_disk(300);
    let mut fs = FileSystem::mount(&mut disk).unwrap();

    let inode = fs.create();
    assert!(inode >= 0);
    let inode = inode as u32;

    let mut rng = StdRng::seed_from_u64(42);
    let mut payload = vec![0u8; 3 * BLOCK_SIZE + 17];
    rng.fill(payload.as_mut_slice());

    let written = fs.write(inode, &payload, payload.len(), 0);
    assert_eq!(written, payload.len() as i64);
    assert_eq!(fs.stat(inode), payload.len() as i64);

    let mut read_back = vec![0u8; payload.len()];
    let n = fs.read(inode, &mut read_back, payload.len(), 0);
    assert_eq!(n, payload.len() as i64);
    assert_eq!(read_back, payload);

    // A sub-range read matches the corresponding slice of what was written.
    let mut partial = vec![0u8; 100];
    let n = fs.read(inode, &mut partial, 100, BLOCK_SIZE);
    assert_eq!(n, 100);
    assert_eq!(partial, payload[BLOCK_SIZE..BLOCK_SIZE + 100]);
}

#[test]
fn remove_reclaims_exactly_the_blocks_it_reached() {
    // Small enough that a deliberately oversized probe write always
    // exhausts free space, so its short count tracks free-block count.
    let (_file, mut disk) = mounted_disk(20);
    let mut fs = FileSystem::mount(&mut disk).unwrap();

    let before = fs.create();
    assert!(before >= 0);
    let n = before as u32;

    let baseline_free = free_blocks(&mut fs);

    // Enough data to force both direct blocks and an indirect block.
    let payload = vec![7u8; 6 * BLOCK_SIZE];
    let written = fs.write(n, &payload, payload.len(), 0);
    assert_eq!(written, payload.len() as i64);
    assert!(free_blocks(&mut fs) < baseline_free);

    assert!(fs.remove(n));
    assert_eq!(free_blocks(&mut fs), baseline_free);
    assert_eq!(fs.stat(n), -1);

    // Lowest-free policy: removing n=0 means the next create reuses it.
    assert_eq!(fs.create(), n as i64);
}

fn free_blocks(fs: &mut FileSystem) -> i64 {
    // Indirect way to observe free-block count from outside the crate:
    // write far more than could possibly fit into a scratch inode so the
    // short count it returns tracks exactly how much space was free,
    // then remove it again so it doesn't perturb later assertions.
    let scratch = fs.create();
    assert!(scratch >= 0);
    let scratch = scratch as u32;
    let probe = vec![0u8; 200 * BLOCK_SIZE];
    let written = fs.write(scratch, &probe, probe.len(), 0);
    assert!((written as usize) < probe.len());
    assert!(fs.remove(scratch));
    written
}

#[test]
fn file_can_grow_to_exactly_max_size_and_no_further() {
    let (_file, mut disk) = mounted_disk(5000);
    let mut fs = FileSystem::mount(&mut disk).unwrap();

    let inode = fs.create() as u32;
    let payload = vec![9u8; MAX_FILE_SIZE as usize];
    let written = fs.write(inode, &payload, payload.len(), 0);
    assert_eq!(written, MAX_FILE_SIZE as i64);
    assert_eq!(fs.stat(inode), MAX_FILE_SIZE as i64);

    // A further write entirely beyond the limit writes nothing.
    let more = vec![1u8; BLOCK_SIZE];
    assert_eq!(fs.write(inode, &more, more.len(), MAX_FILE_SIZE as usize), 0);
    assert_eq!(fs.stat(inode), MAX_FILE_SIZE as i64);
}

#[test]
fn write_short_of_free_space_reports_partial_count_and_stops() {
    let (_file, mut disk) = mounted_disk(12);
    let mut fs = FileSystem::mount(&mut disk).unwrap();
    let inode = fs.create() as u32;

    let payload = vec![3u8; 32 * BLOCK_SIZE];
    let written = fs.write(inode, &payload, payload.len(), 0);
    assert!(written > 0);
    assert!((written as usize) < payload.len());

    // Every byte that was reported written reads back correctly.
    let mut read_back = vec![0u8; written as usize];
    assert_eq!(
        fs.read(inode, &mut read_back, written as usize, 0),
        written
    );
    assert_eq!(&read_back[..], &payload[..written as usize]);

    // Writing again at the same offset, now that the disk is full, writes 0.
    assert_eq!(fs.write(inode, &payload, payload.len(), written as usize), 0);
}
