//! The public filesystem API: format, mount, unmount, create, remove,
//! stat, read, write, debug.
//!
//! This module orchestrates every other component: it reads and writes
//! inodes and data blocks through [`crate::disk::Disk`], consulting the
//! in-memory bitmaps built at mount time for allocation decisions.
//!
//! Per spec, every entry point here returns a sentinel (`-1`, `bool`,
//! or a constructed value) rather than propagating [`SimpleFsError`] —
//! the error type stays internal, surfaced only through the logger.

use log::{debug, info, warn};

use crate::bitmap::{FreeBlockBitmap, FreeInodeBitmap};
use crate::block::Block;
use crate::disk::Disk;
use crate::error::{Result, SimpleFsError};
use crate::layout::{
    Inode, SuperBlock, BLOCK_SIZE, INODES_PER_BLOCK, MAX_FILE_SIZE,
};
use crate::pointer::{self, PointerLocation};

/// Formats `disk` as a fresh, empty SimpleFS image.
///
/// Fails (returns `false`) if the disk is already mounted. On success,
/// block 0 holds the superblock and every other block is zero-filled;
/// every inode is invalid and every data block is free.
pub fn format(disk: &mut Disk) -> bool {
    if disk.mounted() {
        warn!("fs: format refused, disk already mounted");
        return false;
    }

    let sb = SuperBlock::for_format(disk.blocks());
    info!(
        "fs: formatting {} blocks ({} inode blocks, {} inodes)",
        sb.blocks, sb.inode_blocks, sb.inodes
    );

    let mut block = Block::zeroed();
    block.set_superblock(&sb);
    if disk.write(0, block.as_bytes()).is_err() {
        return false;
    }

    let zero = Block::zeroed();
    for b in 1..sb.blocks {
        if disk.write(b, zero.as_bytes()).is_err() {
            return false;
        }
    }

    true
}

/// Reads and prints the superblock and every valid inode's metadata.
/// Purely observational: never mutates the disk.
pub fn debug(disk: &mut Disk) -> Result<()> {
    let mut buf = [0u8; BLOCK_SIZE];
    disk.read(0, &mut buf)?;
    let sb = SuperBlock::unpack(&buf)?;

    println!("SuperBlock:");
    println!("    {} blocks", sb.blocks);
    println!("    {} inode blocks", sb.inode_blocks);
    println!("    {} inodes", sb.inodes);

    for inode_block in 1..=sb.inode_blocks {
        let mut ibuf = [0u8; BLOCK_SIZE];
        disk.read(inode_block, &mut ibuf)?;
        let block = Block::from_bytes(ibuf);

        for slot in 0..INODES_PER_BLOCK {
            let inode_number = (inode_block - 1) * INODES_PER_BLOCK as u32 + slot as u32;
            if inode_number >= sb.inodes {
                break;
            }
            let inode = block.inode(slot)?;
            if !inode.is_valid() {
                continue;
            }

            println!("Inode {}:", inode_number);
            println!("    size: {} bytes", inode.size);
            let direct: Vec<u32> = inode.direct.iter().copied().filter(|&p| p != 0).collect();
            println!("    direct blocks: {:?}", direct);

            if inode.indirect != 0 {
                println!("    indirect block: {}", inode.indirect);
                let mut pbuf = [0u8; BLOCK_SIZE];
                disk.read(inode.indirect, &mut pbuf)?;
                let pblock = Block::from_bytes(pbuf);
                let pointers = pblock.as_pointers()?;
                let used: Vec<u32> = pointers.iter().copied().filter(|&p| p != 0).collect();
                println!("    indirect data blocks: {:?}", used);
            }
        }
    }

    Ok(())
}

/// A mounted SimpleFS filesystem.
///
/// Borrows its disk for the duration of the mount; the disk is never
/// owned by the filesystem, matching the source's back-pointer
/// relationship (see `DESIGN.md`). Dropping (or explicitly
/// [`unmount`](FileSystem::unmount)ing) a `FileSystem` releases the
/// in-memory bitmaps and clears the disk's mounted flag.
pub struct FileSystem<'a> {
    disk: &'a mut Disk,
    meta_data: SuperBlock,
    free_blocks: FreeBlockBitmap,
    free_inodes: FreeInodeBitmap,
}

impl<'a> FileSystem<'a> {
    /// Mounts `disk`: validates the magic number, trusts the on-disk
    /// superblock verbatim (no field is recomputed — see `DESIGN.md`),
    /// and rebuilds both bitmaps with a single scan over the inode
    /// table.
    pub fn mount(disk: &'a mut Disk) -> Result<Self> {
        if disk.mounted() {
            return Err(SimpleFsError::Sanity("disk already mounted".into()));
        }

        let mut buf = [0u8; BLOCK_SIZE];
        disk.read(0, &mut buf)?;
        let meta_data = SuperBlock::unpack(&buf)?;

        if meta_data.magic_number != crate::layout::MAGIC_NUMBER {
            warn!(
                "fs: mount refused, bad magic number {:#x}",
                meta_data.magic_number
            );
            return Err(SimpleFsError::Format(meta_data.magic_number));
        }

        let (free_blocks, free_inodes) = Self::scan(disk, &meta_data)?;

        disk.set_mounted()?;
        info!(
            "fs: mounted {} blocks, {} inodes ({} free blocks, {} free inodes)",
            meta_data.blocks,
            meta_data.inodes,
            free_blocks.free_count(),
            free_inodes.free_count()
        );

        Ok(Self {
            disk,
            meta_data,
            free_blocks,
            free_inodes,
        })
    }

    /// Single pass over the inode table (spec §4.3): marks the
    /// superblock and inode-table blocks reserved, then walks every
    /// valid inode's direct and indirect pointers, marking each
    /// reachable data block in-use.
    fn scan(disk: &mut Disk, meta: &SuperBlock) -> Result<(FreeBlockBitmap, FreeInodeBitmap)> {
        let mut free_blocks = FreeBlockBitmap::all_free(meta.blocks as usize);
        let reserved = 1 + meta.inode_blocks;
        for b in 0..reserved {
            free_blocks.set(b as usize, false);
        }

        let mut free_inodes = FreeInodeBitmap::all_free(meta.inodes as usize);

        for inode_block in 1..=meta.inode_blocks {
            let mut buf = [0u8; BLOCK_SIZE];
            disk.read(inode_block, &mut buf)?;
            let block = Block::from_bytes(buf);

            for slot in 0..INODES_PER_BLOCK {
                let inode_number = (inode_block - 1) * INODES_PER_BLOCK as u32 + slot as u32;
                if inode_number >= meta.inodes {
                    break;
                }
                let inode = block.inode(slot)?;
                if !inode.is_valid() {
                    continue;
                }

                free_inodes.set(inode_number as usize, false);

                for &ptr in &inode.direct {
                    if ptr != 0 {
                        Self::claim(&mut free_blocks, ptr, inode_number);
                    }
                }

                if inode.indirect != 0 {
                    Self::claim(&mut free_blocks, inode.indirect, inode_number);

                    let mut ibuf = [0u8; BLOCK_SIZE];
                    disk.read(inode.indirect, &mut ibuf)?;
                    let iblock = Block::from_bytes(ibuf);
                    let pointers = iblock.as_pointers()?;
                    for &ptr in pointers.iter() {
                        if ptr != 0 {
                            Self::claim(&mut free_blocks, ptr, inode_number);
                        }
                    }
                }
            }
        }

        Ok((free_blocks, free_inodes))
    }

    /// Marks block `ptr` in-use, logging a corruption warning if it was
    /// already claimed by an earlier inode during this same scan.
    fn claim(free_blocks: &mut FreeBlockBitmap, ptr: u32, inode_number: u32) {
        if !free_blocks.get(ptr as usize) {
            warn!(
                "fs: corruption during mount scan — block {} reachable from more than one inode (last seen: inode {})",
                ptr, inode_number
            );
        }
        free_blocks.set(ptr as usize, false);
    }

    /// Unmounts the filesystem: releases the bitmaps and clears the
    /// disk's mounted flag. Equivalent to letting the `FileSystem`
    /// value drop.
    pub fn unmount(self) {
        debug!("fs: unmounting");
        // Drop performs the actual bookkeeping; see below.
    }

    fn inode_location(&self, inode_number: u32) -> (u32, usize) {
        let block = 1 + inode_number / INODES_PER_BLOCK as u32;
        let slot = (inode_number % INODES_PER_BLOCK as u32) as usize;
        (block, slot)
    }

    fn load_inode(&mut self, inode_number: u32) -> Result<Inode> {
        let (block_num, slot) = self.inode_location(inode_number);
        let mut buf = [0u8; BLOCK_SIZE];
        self.disk.read(block_num, &mut buf)?;
        Block::from_bytes(buf).inode(slot)
    }

    fn store_inode(&mut self, inode_number: u32, inode: &Inode) -> Result<()> {
        let (block_num, slot) = self.inode_location(inode_number);
        let mut buf = [0u8; BLOCK_SIZE];
        self.disk.read(block_num, &mut buf)?;
        let mut block = Block::from_bytes(buf);
        block.set_inode(slot, inode);
        self.disk.write(block_num, block.as_bytes())
    }

    /// Creates a new file, returning its inode number, or `-1` if there
    /// is no free inode.
    pub fn create(&mut self) -> i64 {
        let inode_number = match self.free_inodes.lowest_free() {
            Some(n) => n as u32,
            None => {
                warn!("fs: create failed, no free inode");
                return -1;
            }
        };

        let inode = Inode {
            valid: 1,
            size: 0,
            direct: [0; 5],
            indirect: 0,
        };

        if self.store_inode(inode_number, &inode).is_err() {
            return -1;
        }

        self.free_inodes.set(inode_number as usize, false);
        info!("fs: created inode {}", inode_number);
        inode_number as i64
    }

    /// Removes `inode_number`, releasing every data block (and its
    /// indirect block, if any) it reaches. Returns `false` if the slot
    /// is out of range, already invalid, or a disk operation fails.
    pub fn remove(&mut self, inode_number: u32) -> bool {
        if inode_number >= self.meta_data.inodes {
            return false;
        }

        let mut inode = match self.load_inode(inode_number) {
            Ok(inode) => inode,
            Err(_) => return false,
        };
        if !inode.is_valid() {
            return false;
        }

        for &ptr in &inode.direct {
            if ptr != 0 {
                self.free_blocks.set(ptr as usize, true);
            }
        }

        if inode.indirect != 0 {
            let mut ibuf = [0u8; BLOCK_SIZE];
            if self.disk.read(inode.indirect, &mut ibuf).is_err() {
                return false;
            }
            let iblock = Block::from_bytes(ibuf);
            let pointers = match iblock.as_pointers() {
                Ok(p) => p,
                Err(_) => return false,
            };
            for &ptr in pointers.iter() {
                if ptr != 0 {
                    self.free_blocks.set(ptr as usize, true);
                }
            }
            self.free_blocks.set(inode.indirect as usize, true);
        }

        inode.clear();
        if self.store_inode(inode_number, &inode).is_err() {
            return false;
        }

        self.free_inodes.set(inode_number as usize, true);
        info!("fs: removed inode {}", inode_number);
        true
    }

    /// Returns the size in bytes of `inode_number`, or `-1` if it is
    /// invalid or out of range.
    pub fn stat(&mut self, inode_number: u32) -> i64 {
        if inode_number >= self.meta_data.inodes {
            return -1;
        }
        match self.load_inode(inode_number) {
            Ok(inode) if inode.is_valid() => inode.size as i64,
            _ => -1,
        }
    }

    /// Resolves a file-block location for reading. Returns the
    /// backing data-block number, or `0` if unallocated (the caller is
    /// responsible for treating that as corruption within the live
    /// size range).
    fn resolve_for_read(&mut self, inode: &Inode, location: PointerLocation) -> Result<u32> {
        match location {
            PointerLocation::Direct(i) => Ok(inode.direct[i]),
            PointerLocation::Indirect(slot) => {
                if inode.indirect == 0 {
                    return Ok(0);
                }
                let mut buf = [0u8; BLOCK_SIZE];
                self.disk.read(inode.indirect, &mut buf)?;
                let pointers = Block::from_bytes(buf).as_pointers()?;
                Ok(pointers[slot])
            }
            PointerLocation::OutOfRange => Ok(0),
        }
    }

    /// Reads up to `length` bytes of `inode_number` starting at
    /// `offset` into `buf`, clamped to the file's live size. Returns
    /// the number of bytes copied, `0` on an empty range, or `-1` if
    /// the inode is invalid, `offset` is past the end of the file, or
    /// a live byte maps to an unallocated block (corruption).
    pub fn read(&mut self, inode_number: u32, buf: &mut [u8], length: usize, offset: usize) -> i64 {
        if inode_number >= self.meta_data.inodes {
            return -1;
        }
        let inode = match self.load_inode(inode_number) {
            Ok(inode) if inode.is_valid() => inode,
            _ => return -1,
        };

        let size = inode.size as usize;
        if offset > size {
            return -1;
        }

        let end = std::cmp::min(offset + length, size);
        if end <= offset {
            return 0;
        }

        let mut copied = 0usize;
        let mut cursor = offset;
        while cursor < end {
            let k = pointer::block_index_for_offset(cursor as u64);
            let location = pointer::locate(k);
            let data_block = match self.resolve_for_read(&inode, location) {
                Ok(b) => b,
                Err(_) => return -1,
            };
            if data_block == 0 {
                warn!(
                    "fs: corruption on inode {} — byte {} maps to an unallocated block",
                    inode_number, cursor
                );
                return -1;
            }

            let mut block_buf = [0u8; BLOCK_SIZE];
            if self.disk.read(data_block, &mut block_buf).is_err() {
                return -1;
            }

            let local_start = pointer::offset_within_block(cursor as u64);
            let local_end = std::cmp::min(BLOCK_SIZE, local_start + (end - cursor));
            let chunk_len = local_end - local_start;

            buf[copied..copied + chunk_len]
                .copy_from_slice(&block_buf[local_start..local_end]);

            copied += chunk_len;
            cursor += chunk_len;
        }

        copied as i64
    }

    /// Resolves (and if necessary allocates) a file-block location for
    /// writing. Returns `Ok(None)` when no free data block is available
    /// — a `NoSpace` condition that stops the write with a short count,
    /// not an error.
    fn resolve_for_write(&mut self, inode: &mut Inode, location: PointerLocation) -> Result<Option<u32>> {
        match location {
            PointerLocation::Direct(i) => {
                if inode.direct[i] != 0 {
                    return Ok(Some(inode.direct[i]));
                }
                match self.allocate_data_block()? {
                    Some(b) => {
                        inode.direct[i] = b;
                        Ok(Some(b))
                    }
                    None => Ok(None),
                }
            }
            PointerLocation::Indirect(slot) => {
                if inode.indirect == 0 {
                    match self.allocate_data_block()? {
                        Some(b) => {
                            inode.indirect = b;
                            let zero = Block::zeroed();
                            self.disk.write(b, zero.as_bytes())?;
                        }
                        None => return Ok(None),
                    }
                }

                let mut buf = [0u8; BLOCK_SIZE];
                self.disk.read(inode.indirect, &mut buf)?;
                let mut block = Block::from_bytes(buf);
                let mut pointers = block.as_pointers()?;

                if pointers[slot] != 0 {
                    return Ok(Some(pointers[slot]));
                }

                match self.allocate_data_block()? {
                    Some(b) => {
                        pointers[slot] = b;
                        block.set_pointers(&pointers);
                        self.disk.write(inode.indirect, block.as_bytes())?;
                        Ok(Some(b))
                    }
                    None => Ok(None),
                }
            }
            PointerLocation::OutOfRange => Ok(None),
        }
    }

    /// Allocates the lowest-indexed free data block, if any.
    fn allocate_data_block(&mut self) -> Result<Option<u32>> {
        match self.free_blocks.lowest_free() {
            Some(idx) => {
                self.free_blocks.set(idx, false);
                Ok(Some(idx as u32))
            }
            None => Ok(None),
        }
    }

    /// Writes `length` bytes from `buf` into `inode_number` starting at
    /// `offset`, allocating data (and indirect) blocks on demand.
    /// Returns the number of bytes actually written, or `-1` if the
    /// inode is invalid or a disk operation fails outright. Running out
    /// of free blocks, or reaching [`MAX_FILE_SIZE`], stops the write
    /// early and returns the (non-negative) short count.
    pub fn write(&mut self, inode_number: u32, buf: &[u8], length: usize, offset: usize) -> i64 {
        if inode_number >= self.meta_data.inodes {
            return -1;
        }
        let mut inode = match self.load_inode(inode_number) {
            Ok(inode) if inode.is_valid() => inode,
            _ => return -1,
        };

        if offset as u64 >= MAX_FILE_SIZE {
            return 0;
        }

        let mut written = 0usize;
        let mut cursor = offset;
        let end = offset + length;

        while cursor < end {
            let k = pointer::block_index_for_offset(cursor as u64);
            let location = pointer::locate(k);
            if location == PointerLocation::OutOfRange {
                break;
            }

            let data_block = match self.resolve_for_write(&mut inode, location) {
                Ok(Some(b)) => b,
                Ok(None) => break,
                Err(_) => return -1,
            };

            let mut block_buf = [0u8; BLOCK_SIZE];
            if self.disk.read(data_block, &mut block_buf).is_err() {
                return -1;
            }

            let local_start = pointer::offset_within_block(cursor as u64);
            let local_end = std::cmp::min(BLOCK_SIZE, local_start + (end - cursor));
            let chunk_len = local_end - local_start;

            block_buf[local_start..local_end]
                .copy_from_slice(&buf[written..written + chunk_len]);

            if self.disk.write(data_block, &block_buf).is_err() {
                return -1;
            }

            written += chunk_len;
            cursor += chunk_len;
        }

        if written > 0 {
            let new_size = std::cmp::max(inode.size as u64, (offset + written) as u64);
            inode.size = new_size as u32;
            if self.store_inode(inode_number, &inode).is_err() {
                return -1;
            }
        }

        debug!(
            "fs: wrote {} bytes to inode {} at offset {}",
            written, inode_number, offset
        );
        written as i64
    }
}

impl Drop for FileSystem<'_> {
    fn drop(&mut self) {
        self.disk.clear_mounted();
    }
}
