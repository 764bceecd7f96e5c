//! On-disk format constants and record layouts.
//!
//! The format is fixed and bit-exact: little-endian, packed, no padding
//! between fields within a record. Changing any constant in this module
//! breaks on-disk compatibility with existing images.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Result, SimpleFsError};

/// Size in bytes of every block on disk, including block 0 (the superblock).
pub const BLOCK_SIZE: usize = 4096;

/// Magic number stamped into block 0 by `fs_format`.
pub const MAGIC_NUMBER: u32 = 0xF0F0_3410;

/// Number of packed inode records per inode block.
pub const INODES_PER_BLOCK: usize = 128;

/// Number of direct block pointers stored inside an inode.
pub const POINTERS_PER_INODE: usize = 5;

/// Number of pointers stored inside a single indirect block.
pub const POINTERS_PER_BLOCK: usize = 1024;

/// Size in bytes of one packed inode record (`valid, size, direct[5], indirect`).
pub const INODE_SIZE: usize = 32;

/// Maximum byte size a file can grow to: five direct blocks plus one
/// indirect block's worth of pointers.
pub const MAX_FILE_SIZE: u64 =
    ((POINTERS_PER_INODE + POINTERS_PER_BLOCK) * BLOCK_SIZE) as u64;

/// Superblock, occupying block 0.
///
/// On disk: `u32 magic | u32 blocks | u32 inode_blocks | u32 inodes`,
/// zero-padded out to `BLOCK_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SuperBlock {
    /// Must equal [`MAGIC_NUMBER`] for the image to be considered formatted.
    pub magic_number: u32,
    /// Total number of blocks in the backing image.
    pub blocks: u32,
    /// Number of blocks reserved for the inode table (blocks 1..=inode_blocks).
    pub inode_blocks: u32,
    /// Total inode capacity: `inode_blocks * INODES_PER_BLOCK`.
    pub inodes: u32,
}

impl SuperBlock {
    /// Computes `inode_blocks` for a disk of the given block count:
    /// 10% of the blocks, rounded up.
    pub fn compute_inode_blocks(blocks: u32) -> u32 {
        (blocks + 9) / 10
    }

    /// Builds the superblock written by `fs_format` for a disk of `blocks` blocks.
    pub fn for_format(blocks: u32) -> Self {
        let inode_blocks = Self::compute_inode_blocks(blocks);
        Self {
            magic_number: MAGIC_NUMBER,
            blocks,
            inode_blocks,
            inodes: inode_blocks * INODES_PER_BLOCK as u32,
        }
    }

    /// Serializes the superblock into a full `BLOCK_SIZE` buffer, zero-padded.
    pub fn pack(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        let mut cursor = Cursor::new(&mut buf[..]);
        cursor.write_u32::<LittleEndian>(self.magic_number).unwrap();
        cursor.write_u32::<LittleEndian>(self.blocks).unwrap();
        cursor.write_u32::<LittleEndian>(self.inode_blocks).unwrap();
        cursor.write_u32::<LittleEndian>(self.inodes).unwrap();
        buf
    }

    /// Parses a superblock out of a `BLOCK_SIZE` buffer (block 0's contents).
    pub fn unpack(buf: &[u8; BLOCK_SIZE]) -> Result<Self> {
        let mut cursor = Cursor::new(&buf[..]);
        let magic_number = read_u32(&mut cursor)?;
        let blocks = read_u32(&mut cursor)?;
        let inode_blocks = read_u32(&mut cursor)?;
        let inodes = read_u32(&mut cursor)?;
        Ok(Self {
            magic_number,
            blocks,
            inode_blocks,
            inodes,
        })
    }
}

/// A single inode record: 32 bytes, packed contiguously into inode blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Inode {
    /// `1` if this slot holds a live file, `0` if free.
    pub valid: u32,
    /// Size of the file in bytes.
    pub size: u32,
    /// Direct data-block pointers. `0` means unallocated.
    pub direct: [u32; POINTERS_PER_INODE],
    /// Indirect block pointer. `0` means unallocated.
    pub indirect: u32,
}

impl Inode {
    /// Whether this inode slot currently holds a live file.
    pub fn is_valid(&self) -> bool {
        self.valid == 1
    }

    /// Resets the inode to the all-free state written by `fs_create` on
    /// allocation and by `fs_remove` on release.
    pub fn clear(&mut self) {
        *self = Inode::default();
    }

    /// Serializes this inode into its 32-byte on-disk record.
    pub fn pack(&self) -> [u8; INODE_SIZE] {
        let mut buf = [0u8; INODE_SIZE];
        let mut cursor = Cursor::new(&mut buf[..]);
        cursor.write_u32::<LittleEndian>(self.valid).unwrap();
        cursor.write_u32::<LittleEndian>(self.size).unwrap();
        for ptr in &self.direct {
            cursor.write_u32::<LittleEndian>(*ptr).unwrap();
        }
        cursor.write_u32::<LittleEndian>(self.indirect).unwrap();
        buf
    }

    /// Parses an inode out of its 32-byte on-disk record.
    pub fn unpack(buf: &[u8; INODE_SIZE]) -> Result<Self> {
        let mut cursor = Cursor::new(&buf[..]);
        let valid = read_u32(&mut cursor)?;
        let size = read_u32(&mut cursor)?;
        let mut direct = [0u32; POINTERS_PER_INODE];
        for ptr in direct.iter_mut() {
            *ptr = read_u32(&mut cursor)?;
        }
        let indirect = read_u32(&mut cursor)?;
        Ok(Self {
            valid,
            size,
            direct,
            indirect,
        })
    }
}

/// Reads a pointer array block (1024 `u32`s) out of a raw block buffer.
pub fn unpack_pointers(buf: &[u8; BLOCK_SIZE]) -> Result<[u32; POINTERS_PER_BLOCK]> {
    let mut cursor = Cursor::new(&buf[..]);
    let mut pointers = [0u32; POINTERS_PER_BLOCK];
    for p in pointers.iter_mut() {
        *p = read_u32(&mut cursor)?;
    }
    Ok(pointers)
}

/// Packs a pointer array block (1024 `u32`s) into a raw block buffer.
pub fn pack_pointers(pointers: &[u32; POINTERS_PER_BLOCK]) -> [u8; BLOCK_SIZE] {
    let mut buf = [0u8; BLOCK_SIZE];
    let mut cursor = Cursor::new(&mut buf[..]);
    for p in pointers {
        cursor.write_u32::<LittleEndian>(*p).unwrap();
    }
    buf
}

fn read_u32(cursor: &mut Cursor<&[u8]>) -> Result<u32> {
    cursor
        .read_u32::<LittleEndian>()
        .map_err(|e| SimpleFsError::DiskIo { block: 0, source: e })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn superblock_round_trips() {
        let sb = SuperBlock::for_format(200);
        let packed = sb.pack();
        let parsed = SuperBlock::unpack(&packed).unwrap();
        assert_eq!(sb, parsed);
    }

    #[test]
    fn inode_blocks_rounds_up() {
        assert_eq!(SuperBlock::compute_inode_blocks(10), 1);
        assert_eq!(SuperBlock::compute_inode_blocks(11), 2);
        assert_eq!(SuperBlock::compute_inode_blocks(200), 20);
        assert_eq!(SuperBlock::compute_inode_blocks(1), 1);
    }

    #[test]
    fn inode_round_trips() {
        let inode = Inode {
            valid: 1,
            size: 12345,
            direct: [1, 2, 3, 0, 0],
            indirect: 7,
        };
        let packed = inode.pack();
        assert_eq!(packed.len(), INODE_SIZE);
        let parsed = Inode::unpack(&packed).unwrap();
        assert_eq!(inode, parsed);
    }

    #[test]
    fn inode_clear_resets_to_default() {
        let mut inode = Inode {
            valid: 1,
            size: 99,
            direct: [1, 2, 3, 4, 5],
            indirect: 9,
        };
        inode.clear();
        assert_eq!(inode, Inode::default());
        assert!(!inode.is_valid());
    }

    #[test]
    fn inodes_per_block_matches_block_size() {
        assert_eq!(INODES_PER_BLOCK * INODE_SIZE, BLOCK_SIZE);
    }

    #[test]
    fn pointer_block_round_trips() {
        let mut pointers = [0u32; POINTERS_PER_BLOCK];
        pointers[0] = 42;
        pointers[1023] = 99;
        let packed = pack_pointers(&pointers);
        let parsed = unpack_pointers(&packed).unwrap();
        assert_eq!(pointers, parsed);
    }

    #[test]
    fn max_file_size_matches_spec() {
        assert_eq!(MAX_FILE_SIZE, 4_214_784);
    }
}
