//! Error taxonomy for the SimpleFS core.
//!
//! The public filesystem API (see [`crate::fs`]) never returns these
//! directly — per the format's contract it returns sentinel values
//! (`-1`, `false`, `None`) — but every internal helper uses this type so
//! the cause can be logged at the point of failure before it is
//! discarded at the API boundary.

use thiserror::Error;

/// Errors produced while operating on a [`crate::disk::Disk`] or
/// [`crate::fs::FileSystem`].
#[derive(Error, Debug)]
pub enum SimpleFsError {
    /// A block read or write did not transfer exactly `BLOCK_SIZE` bytes.
    #[error("disk I/O error on block {block}: {source}")]
    DiskIo {
        /// The block number involved.
        block: u32,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Null disk, closed device, out-of-range block, or undersized buffer.
    #[error("sanity check failed: {0}")]
    Sanity(String),

    /// The superblock's magic number did not match [`crate::layout::MAGIC_NUMBER`].
    #[error("format error: bad magic number {0:#x}")]
    Format(u32),

    /// No free inode (create) or no free data block (write past allocation).
    #[error("no space available: {0}")]
    NoSpace(String),

    /// Operation on an inode slot whose `valid == 0`, or out of range.
    #[error("invalid inode {0}")]
    InvalidInode(u32),

    /// A file byte within `size` maps to a zero (unallocated) pointer.
    #[error("corruption: inode {inode} byte {offset} maps to an unallocated block")]
    Corruption {
        /// Inode number being read.
        inode: u32,
        /// Byte offset inside the file.
        offset: u32,
    },
}

/// Convenience result alias used throughout the internal implementation.
pub type Result<T> = std::result::Result<T, SimpleFsError>;
