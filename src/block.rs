//! A single `BLOCK_SIZE`-byte buffer, interpreted in one of four ways.
//!
//! This module is pure layout: it owns no disk handle and performs no
//! I/O. [`crate::disk::Disk::read`] and [`crate::disk::Disk::write`]
//! move raw `[u8; BLOCK_SIZE]` buffers; callers reinterpret those
//! buffers through the views below.

use crate::error::Result;
use crate::layout::{
    self, Inode, SuperBlock, BLOCK_SIZE, INODES_PER_BLOCK, INODE_SIZE, POINTERS_PER_BLOCK,
};

/// A block-sized buffer, viewable as a superblock, an inode array, a
/// pointer array, or raw bytes.
#[derive(Debug, Clone, Copy)]
pub struct Block {
    bytes: [u8; BLOCK_SIZE],
}

impl Block {
    /// A freshly zeroed block.
    pub fn zeroed() -> Self {
        Self {
            bytes: [0u8; BLOCK_SIZE],
        }
    }

    /// Wraps a raw buffer as a block (e.g. one just read from disk).
    pub fn from_bytes(bytes: [u8; BLOCK_SIZE]) -> Self {
        Self { bytes }
    }

    /// Raw bytes, for use as a plain data block.
    pub fn as_bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.bytes
    }

    /// Raw bytes, mutable.
    pub fn as_bytes_mut(&mut self) -> &mut [u8; BLOCK_SIZE] {
        &mut self.bytes
    }

    /// Interprets this block as a superblock.
    pub fn as_superblock(&self) -> Result<SuperBlock> {
        SuperBlock::unpack(&self.bytes)
    }

    /// Writes a superblock into this block, zero-padding the remainder.
    pub fn set_superblock(&mut self, sb: &SuperBlock) {
        self.bytes = sb.pack();
    }

    /// Interprets this block as an array of [`INODES_PER_BLOCK`] inode records.
    pub fn as_inodes(&self) -> Result<[Inode; INODES_PER_BLOCK]> {
        let mut inodes = [Inode::default(); INODES_PER_BLOCK];
        for (slot, inode) in inodes.iter_mut().enumerate() {
            let start = slot * INODE_SIZE;
            let mut record = [0u8; INODE_SIZE];
            record.copy_from_slice(&self.bytes[start..start + INODE_SIZE]);
            *inode = Inode::unpack(&record)?;
        }
        Ok(inodes)
    }

    /// Overwrites a single inode slot in place, leaving the rest of the
    /// block untouched.
    pub fn set_inode(&mut self, slot: usize, inode: &Inode) {
        debug_assert!(slot < INODES_PER_BLOCK);
        let start = slot * INODE_SIZE;
        self.bytes[start..start + INODE_SIZE].copy_from_slice(&inode.pack());
    }

    /// Reads a single inode slot out of this block.
    pub fn inode(&self, slot: usize) -> Result<Inode> {
        debug_assert!(slot < INODES_PER_BLOCK);
        let start = slot * INODE_SIZE;
        let mut record = [0u8; INODE_SIZE];
        record.copy_from_slice(&self.bytes[start..start + INODE_SIZE]);
        Inode::unpack(&record)
    }

    /// Interprets this block as a [`POINTERS_PER_BLOCK`]-entry pointer array.
    pub fn as_pointers(&self) -> Result<[u32; POINTERS_PER_BLOCK]> {
        layout::unpack_pointers(&self.bytes)
    }

    /// Writes a pointer array into this block.
    pub fn set_pointers(&mut self, pointers: &[u32; POINTERS_PER_BLOCK]) {
        self.bytes = layout::pack_pointers(pointers);
    }
}

impl Default for Block {
    fn default() -> Self {
        Self::zeroed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inode_slot_round_trips_without_disturbing_neighbors() {
        let mut block = Block::zeroed();
        let inode = Inode {
            valid: 1,
            size: 42,
            direct: [1, 2, 3, 4, 5],
            indirect: 6,
        };
        block.set_inode(3, &inode);
        assert_eq!(block.inode(3).unwrap(), inode);
        assert_eq!(block.inode(0).unwrap(), Inode::default());
        assert_eq!(block.inode(4).unwrap(), Inode::default());
    }

    #[test]
    fn superblock_view_round_trips() {
        let mut block = Block::zeroed();
        let sb = SuperBlock::for_format(64);
        block.set_superblock(&sb);
        assert_eq!(block.as_superblock().unwrap(), sb);
    }

    #[test]
    fn pointer_view_round_trips() {
        let mut block = Block::zeroed();
        let mut pointers = [0u32; POINTERS_PER_BLOCK];
        pointers[5] = 77;
        block.set_pointers(&pointers);
        assert_eq!(block.as_pointers().unwrap(), pointers);
    }

    #[test]
    fn as_inodes_reads_whole_block() {
        let mut block = Block::zeroed();
        block.set_inode(0, &Inode { valid: 1, size: 1, direct: [0; 5], indirect: 0 });
        block.set_inode(127, &Inode { valid: 1, size: 2, direct: [0; 5], indirect: 0 });
        let inodes = block.as_inodes().unwrap();
        assert!(inodes[0].is_valid());
        assert!(inodes[127].is_valid());
        assert!(!inodes[1].is_valid());
    }
}
