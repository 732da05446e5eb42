//! Superblock management: layout computation, formatting, persisting and loading block 0.
//! Both bitmaps live inside the superblock, so persisting it is also how allocations become durable.

use log::{debug, info, warn};

use crate::codec::{decode_superblock, encode_superblock};
use crate::config::*;
use crate::directory::build_root_block;
use crate::inode::{now, write_inode};
use crate::structs::*;
use crate::{BlockDevice, Error, Result};

/// Format-time parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    pub block_size: u32,
    pub total_blocks: u32,
    pub total_inodes: u32,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            total_blocks: DEFAULT_TOTAL_BLOCKS,
            total_inodes: DEFAULT_TOTAL_INODES,
        }
    }
}

impl FormatOptions {
    pub fn validate(&self) -> Result<()> {
        let cap = BITMAP_CAPACITY as u32;
        if self.total_blocks > cap || self.total_inodes > cap {
            return Err(Error::Config(format!(
                "at most {cap} blocks and {cap} inodes are supported (got {} blocks, {} inodes)",
                self.total_blocks, self.total_inodes
            )));
        }
        if self.total_inodes == 0 {
            return Err(Error::Config("at least one inode is needed for the root".into()));
        }
        if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&self.block_size) {
            return Err(Error::Config(format!(
                "block size {} outside {MIN_BLOCK_SIZE}..={MAX_BLOCK_SIZE}",
                self.block_size
            )));
        }
        if self.block_size % INODE_SIZE as u32 != 0 {
            return Err(Error::Config(format!(
                "block size {} is not a multiple of the {INODE_SIZE}-byte inode record",
                self.block_size
            )));
        }
        Ok(())
    }

    /// Deterministic region layout: SB, inode bitmap, data bitmap, inode table, data.
    pub fn layout(&self) -> Result<Layout> {
        self.validate()?;
        let inode_bitmap_start = SUPERBLOCK_ID + 1;
        let inode_bitmap_blocks = 1;
        let data_bitmap_start = inode_bitmap_start + inode_bitmap_blocks;
        let data_bitmap_blocks = 1;
        let inode_table_start = data_bitmap_start + data_bitmap_blocks;
        let inode_table_blocks =
            (self.total_inodes * INODE_SIZE as u32).div_ceil(self.block_size);
        let data_start = inode_table_start + inode_table_blocks;
        if data_start >= self.total_blocks {
            return Err(Error::Layout {
                data_start,
                total_blocks: self.total_blocks,
            });
        }
        Ok(Layout {
            inode_bitmap_start,
            inode_bitmap_blocks,
            data_bitmap_start,
            data_bitmap_blocks,
            inode_table_start,
            inode_table_blocks,
            data_start,
        })
    }
}

/// Lays out a fresh filesystem on `device`: zeroes every block, reserves the
/// metadata blocks, writes the root inode and its directory block, then block 0.
pub fn format_fs(device: &impl BlockDevice, opts: &FormatOptions) -> Result<SuperBlock> {
    let layout = opts.layout()?;
    if device.block_size() != opts.block_size as usize {
        return Err(Error::Config(format!(
            "device block size {} differs from requested {}",
            device.block_size(),
            opts.block_size
        )));
    }
    if device.num_blocks() < opts.total_blocks as usize {
        return Err(Error::Config(format!(
            "device has {} blocks, {} requested",
            device.num_blocks(),
            opts.total_blocks
        )));
    }

    for block_id in 0..opts.total_blocks {
        device.zero_block(block_id)?;
    }

    let mut inode_bitmap = Bitmap::new(opts.total_inodes);
    let mut data_bitmap = Bitmap::new(opts.total_blocks);

    inode_bitmap.set_used(ROOT_INODE_ID);
    // Superblock and every metadata block are never handed out.
    for block_id in SUPERBLOCK_ID..layout.data_start {
        data_bitmap.set_used(block_id);
    }
    let root_dir_block = layout.data_start;
    data_bitmap.set_used(root_dir_block);

    let sb = SuperBlock {
        version: VERSION,
        block_size: opts.block_size,
        total_blocks: opts.total_blocks,
        total_inodes: opts.total_inodes,
        inode_bitmap,
        data_bitmap,
        root_inode: ROOT_INODE_ID,
        layout,
    };

    let ts = now();
    let mut root = Inode {
        id: ROOT_INODE_ID,
        mode: S_IFDIR | ROOT_DIR_PERM,
        uid: 0,
        gid: 0,
        links_cnt: 2, // '.' and '..'
        size: 2 * DIR_ENTRY_SIZE as u32,
        atime: ts,
        mtime: ts,
        ctime: ts,
        ..Default::default()
    };
    root.direct_ptrs[0] = root_dir_block;
    write_inode(device, &sb, &root)?;

    let dir_block = build_root_block(opts.block_size as usize, ROOT_INODE_ID);
    device.write_block(root_dir_block, &dir_block)?;

    write_superblock(device, &sb)?;
    info!(
        "formatted: block_size={} blocks={} inodes={} layout={:?}",
        sb.block_size, sb.total_blocks, sb.total_inodes, sb.layout
    );
    Ok(sb)
}

/// Rewrites block 0 in full from the in-memory superblock.
pub fn write_superblock(device: &impl BlockDevice, superblock: &SuperBlock) -> Result<()> {
    let buf = encode_superblock(superblock, device.block_size());
    device.write_block(SUPERBLOCK_ID, &buf)?;
    debug!(
        "superblock persisted: inodes {:?} blocks {:?}",
        superblock.inode_bitmap, superblock.data_bitmap
    );
    Ok(())
}

/// Reads and decodes block 0. Fails with `Format` when the magic does not match.
pub fn read_superblock(device: &impl BlockDevice) -> Result<SuperBlock> {
    let buf = device.read_block_vec(SUPERBLOCK_ID)?;
    let superblock = decode_superblock(&buf)?;
    if superblock.block_size as usize != device.block_size() {
        warn!(
            "superblock block size {} differs from device block size {}",
            superblock.block_size,
            device.block_size()
        );
    }
    Ok(superblock)
}
