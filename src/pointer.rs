//! Translates a file-block index into a location inside the inode's
//! direct/indirect pointer tree.
//!
//! This module is pure arithmetic — it knows nothing about disks,
//! bitmaps, or inodes beyond their pointer-count constants. Allocating
//! the block a location resolves to (including the indirect block
//! itself, on first use) is the job of [`crate::fs::FileSystem`].

use crate::layout::{BLOCK_SIZE, POINTERS_PER_BLOCK, POINTERS_PER_INODE};

/// Where a given file-block index lives inside the pointer tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerLocation {
    /// `inode.direct[i]` holds the block number directly.
    Direct(usize),
    /// Slot `i` inside the inode's indirect block holds the block number.
    Indirect(usize),
    /// Beyond [`crate::layout::MAX_FILE_SIZE`]; no such block exists.
    OutOfRange,
}

/// Resolves a 0-based file-block index `k` to its location in the
/// pointer tree, per the direct-then-indirect layout in spec §4.4.
pub fn locate(k: u64) -> PointerLocation {
    let k_usize = match usize::try_from(k) {
        Ok(v) => v,
        Err(_) => return PointerLocation::OutOfRange,
    };

    if k_usize < POINTERS_PER_INODE {
        PointerLocation::Direct(k_usize)
    } else if k_usize - POINTERS_PER_INODE < POINTERS_PER_BLOCK {
        PointerLocation::Indirect(k_usize - POINTERS_PER_INODE)
    } else {
        PointerLocation::OutOfRange
    }
}

/// The 0-based file-block index that byte offset `offset` falls into.
pub fn block_index_for_offset(offset: u64) -> u64 {
    offset / BLOCK_SIZE as u64
}

/// The byte offset within a block that file offset `offset` falls at.
pub fn offset_within_block(offset: u64) -> usize {
    (offset % BLOCK_SIZE as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_indices_are_direct() {
        for k in 0..POINTERS_PER_INODE as u64 {
            assert_eq!(locate(k), PointerLocation::Direct(k as usize));
        }
    }

    #[test]
    fn indices_past_direct_are_indirect() {
        assert_eq!(
            locate(POINTERS_PER_INODE as u64),
            PointerLocation::Indirect(0)
        );
        assert_eq!(
            locate((POINTERS_PER_INODE + POINTERS_PER_BLOCK - 1) as u64),
            PointerLocation::Indirect(POINTERS_PER_BLOCK - 1)
        );
    }

    #[test]
    fn beyond_indirect_capacity_is_out_of_range() {
        assert_eq!(
            locate((POINTERS_PER_INODE + POINTERS_PER_BLOCK) as u64),
            PointerLocation::OutOfRange
        );
    }

    #[test]
    fn offset_math_matches_block_size() {
        assert_eq!(block_index_for_offset(0), 0);
        assert_eq!(block_index_for_offset(BLOCK_SIZE as u64 - 1), 0);
        assert_eq!(block_index_for_offset(BLOCK_SIZE as u64), 1);
        assert_eq!(offset_within_block(BLOCK_SIZE as u64 + 10), 10);
    }
}
