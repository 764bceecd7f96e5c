//! Fixed-size, random-access block I/O over a backing file.
//!
//! `Disk` is the only component in this crate that touches the host
//! filesystem. Every other module reads and writes whole `BLOCK_SIZE`
//! blocks through it.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::{Result, SimpleFsError};
use crate::layout::BLOCK_SIZE;

/// A fixed-size backing file, addressed by block number.
///
/// Single-threaded, synchronous: every read or write is a blocking
/// whole-block transfer. There is no retry inside this type — a failed
/// transfer is reported to the caller, who decides whether to abandon
/// the operation.
#[derive(Debug)]
pub struct Disk {
    file: File,
    path: PathBuf,
    blocks: u32,
    mounted: bool,
    reads: u64,
    writes: u64,
}

impl Disk {
    /// Opens (creating if necessary) the backing file at `path` and
    /// truncates it to `blocks * BLOCK_SIZE` bytes.
    ///
    /// The returned disk is not mounted; read/write counters start at
    /// zero.
    pub fn open(path: impl AsRef<Path>, blocks: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .map_err(|e| SimpleFsError::DiskIo { block: 0, source: e })?;

        file.set_len(blocks as u64 * BLOCK_SIZE as u64)
            .map_err(|e| SimpleFsError::DiskIo { block: 0, source: e })?;

        debug!("disk: opened {} ({} blocks)", path.display(), blocks);

        Ok(Self {
            file,
            path,
            blocks,
            mounted: false,
            reads: 0,
            writes: 0,
        })
    }

    /// Total number of blocks on this disk.
    pub fn blocks(&self) -> u32 {
        self.blocks
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a filesystem currently has this disk mounted.
    pub fn mounted(&self) -> bool {
        self.mounted
    }

    /// Cumulative number of blocks read since this `Disk` was opened.
    /// Observational only — never consulted by the sanity gate.
    pub fn reads(&self) -> u64 {
        self.reads
    }

    /// Cumulative number of blocks written since this `Disk` was opened.
    /// Observational only — never consulted by the sanity gate.
    pub fn writes(&self) -> u64 {
        self.writes
    }

    /// Marks the disk as mounted. Fails if already mounted.
    pub(crate) fn set_mounted(&mut self) -> Result<()> {
        if self.mounted {
            return Err(SimpleFsError::Sanity("disk already mounted".into()));
        }
        self.mounted = true;
        Ok(())
    }

    /// Clears the mounted flag. Idempotent.
    pub(crate) fn clear_mounted(&mut self) {
        self.mounted = false;
    }

    fn sanity_check(&self, block: u32, buf_len: usize) -> Result<()> {
        if block >= self.blocks {
            return Err(SimpleFsError::Sanity(format!(
                "block {} out of range (disk has {} blocks)",
                block, self.blocks
            )));
        }
        if buf_len != BLOCK_SIZE {
            return Err(SimpleFsError::Sanity(format!(
                "buffer length {} does not match block size {}",
                buf_len, BLOCK_SIZE
            )));
        }
        Ok(())
    }

    /// Reads block `block` into `buf`.
    ///
    /// `buf` must be exactly `BLOCK_SIZE` bytes; `block` must be less
    /// than [`Disk::blocks`]. A short read is reported as an error.
    pub fn read(&mut self, block: u32, buf: &mut [u8]) -> Result<()> {
        self.sanity_check(block, buf.len())?;

        self.file
            .seek(SeekFrom::Start(block as u64 * BLOCK_SIZE as u64))
            .map_err(|e| SimpleFsError::DiskIo { block, source: e })?;
        self.file
            .read_exact(buf)
            .map_err(|e| SimpleFsError::DiskIo { block, source: e })?;

        self.reads += 1;
        Ok(())
    }

    /// Writes `buf` into block `block`.
    ///
    /// `buf` must be exactly `BLOCK_SIZE` bytes; `block` must be less
    /// than [`Disk::blocks`]. A short write is reported as an error.
    pub fn write(&mut self, block: u32, buf: &[u8]) -> Result<()> {
        self.sanity_check(block, buf.len())?;

        self.file
            .seek(SeekFrom::Start(block as u64 * BLOCK_SIZE as u64))
            .map_err(|e| SimpleFsError::DiskIo { block, source: e })?;
        self.file
            .write_all(buf)
            .map_err(|e| SimpleFsError::DiskIo { block, source: e })?;

        self.writes += 1;
        Ok(())
    }

    /// Closes the disk. The caller-observed read/write counts are left
    /// in place for the logger to report; they are not reset.
    pub fn close(mut self) {
        if let Err(e) = self.file.flush() {
            warn!("disk: error flushing {} on close: {}", self.path.display(), e);
        }
        debug!(
            "disk: closed {} ({} reads, {} writes)",
            self.path.display(),
            self.reads,
            self.writes
        );
    }
}
