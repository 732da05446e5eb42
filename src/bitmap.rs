//! Allocation of inode IDs and data blocks.
//! Both bitmaps are held in the superblock; callers persist it once their operation is complete.
//! Policy is first fit: the lowest free index always wins.

use log::{debug, warn};

use crate::error::Exhausted;
use crate::{BlockDevice, Error, Result, SuperBlock};

/// Allocates a new inode ID, setting its bit in the inode bitmap.
pub fn alloc_inode_id(superblock: &mut SuperBlock) -> Result<u32> {
    let inode_id = superblock
        .inode_bitmap
        .first_free()
        .ok_or(Error::NoSpace(Exhausted::Inodes))?;
    superblock.inode_bitmap.set_used(inode_id);
    debug!("alloc inode {inode_id}");
    Ok(inode_id)
}

/// Clears the inode's bit. Out-of-range IDs are ignored.
pub fn free_inode_id(superblock: &mut SuperBlock, inode_id: u32) {
    if superblock.inode_bitmap.set_free(inode_id) {
        debug!("free inode {inode_id}");
    }
}

/// Allocates a data block and zero-fills it on the device.
/// Returns the absolute block ID; the search starts at the data region so
/// metadata blocks are never handed out even if their bits were cleared.
pub fn alloc_data_block(device: &impl BlockDevice, superblock: &mut SuperBlock) -> Result<u32> {
    let data_start = superblock.layout.data_start;
    let block_id = (data_start..superblock.data_bitmap.capacity())
        .find(|&b| !superblock.data_bitmap.is_used(b))
        .ok_or(Error::NoSpace(Exhausted::Blocks))?;
    device.zero_block(block_id)?;
    superblock.data_bitmap.set_used(block_id);
    debug!("alloc block {block_id}");
    Ok(block_id)
}

/// Clears the block's bit. Out-of-range IDs are ignored; metadata blocks are kept.
pub fn free_data_block(superblock: &mut SuperBlock, block_id: u32) {
    if block_id < superblock.layout.data_start {
        warn!("refusing to free metadata block {block_id}");
        return;
    }
    if superblock.data_bitmap.set_free(block_id) {
        debug!("free block {block_id}");
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{FormatOptions, RamDisk, format_fs};

    fn fresh() -> (RamDisk, SuperBlock) {
        let rd = RamDisk::new(1024, 16);
        let sb = format_fs(
            &rd,
            &FormatOptions {
                block_size: 1024,
                total_blocks: 8,
                total_inodes: 4,
            },
        )
        .unwrap();
        (rd, sb)
    }

    #[test]
    fn test_inode_exhaustion_and_reuse() {
        let (_rd, mut sb) = fresh();
        assert_eq!(alloc_inode_id(&mut sb).unwrap(), 1);
        assert_eq!(alloc_inode_id(&mut sb).unwrap(), 2);
        assert_eq!(alloc_inode_id(&mut sb).unwrap(), 3);
        assert!(matches!(
            alloc_inode_id(&mut sb),
            Err(Error::NoSpace(Exhausted::Inodes))
        ));
        free_inode_id(&mut sb, 2);
        free_inode_id(&mut sb, 99); // ignored
        assert_eq!(alloc_inode_id(&mut sb).unwrap(), 2);
    }

    #[test]
    fn test_block_alloc_skips_metadata() {
        let (rd, mut sb) = fresh();
        // Layout: SB 0, bitmaps 1-2, inode table 3, data from 4; root dir holds 4.
        assert_eq!(sb.layout.data_start, 4);
        rd.write_block(5, &[0xAB; 1024]).unwrap();
        assert_eq!(alloc_data_block(&rd, &mut sb).unwrap(), 5);
        assert_eq!(rd.read_block_vec(5).unwrap(), vec![0u8; 1024]);
        assert_eq!(alloc_data_block(&rd, &mut sb).unwrap(), 6);
        assert_eq!(alloc_data_block(&rd, &mut sb).unwrap(), 7);
        assert!(matches!(
            alloc_data_block(&rd, &mut sb),
            Err(Error::NoSpace(Exhausted::Blocks))
        ));
        free_data_block(&mut sb, 2);
        assert!(sb.data_bitmap.is_used(2));
        free_data_block(&mut sb, 6);
        assert_eq!(alloc_data_block(&rd, &mut sb).unwrap(), 6);
    }
}
