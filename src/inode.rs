//! Management of reading and writing to inodes.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::bitmap::alloc_data_block;
use crate::codec::{decode_inode, encode_inode};
use crate::config::*;
use crate::{BlockDevice, Credentials, Error, Inode, Result, SuperBlock};

/// Seconds since the Unix epoch, saturating into the 32-bit on-disk field.
pub fn now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().min(u32::MAX as u64) as u32)
        .unwrap_or(0)
}

/// Block holding the record and the record's offset within it.
fn inode_pos(superblock: &SuperBlock, inode_id: u32) -> Result<(u32, usize)> {
    if inode_id >= superblock.total_inodes {
        return Err(Error::Range {
            index: inode_id,
            limit: superblock.total_inodes,
        });
    }
    let per_block = superblock.inodes_per_block();
    let block_id = superblock.layout.inode_table_start + inode_id / per_block;
    let block_inner_offset = (inode_id % per_block) as usize * INODE_SIZE;
    Ok((block_id, block_inner_offset))
}

pub fn get_inode(
    device: &impl BlockDevice,
    superblock: &SuperBlock,
    inode_id: u32,
) -> Result<Inode> {
    let (block_id, offset) = inode_pos(superblock, inode_id)?;
    let buf = device.read_block_vec(block_id)?;
    Ok(decode_inode(&buf[offset..offset + INODE_SIZE]))
}

/// Writes the record at `inode.id` through a read-modify-write of its table block.
pub fn write_inode(device: &impl BlockDevice, superblock: &SuperBlock, inode: &Inode) -> Result<()> {
    let (block_id, offset) = inode_pos(superblock, inode.id)?;
    let mut buf = device.read_block_vec(block_id)?;
    buf[offset..offset + INODE_SIZE].copy_from_slice(&encode_inode(inode));
    device.write_block(block_id, &buf)?;
    Ok(())
}

/// Fresh record for a newly created regular file.
/// Mode without type bits becomes a regular file with 0644.
pub fn new_file_inode(inode_id: u32, mode: u32, cred: Credentials) -> Inode {
    let mode = if mode & S_IFMT == 0 {
        S_IFREG | DEFAULT_FILE_PERM
    } else {
        mode
    };
    let ts = now();
    Inode {
        id: inode_id,
        mode,
        uid: cred.uid,
        gid: cred.gid,
        links_cnt: 1,
        size: 0,
        atime: ts,
        mtime: ts,
        ctime: ts,
        ..Default::default()
    }
}

/// Maps a file-relative block index to its data block.
/// With `create`, an empty slot gets a freshly zeroed block.
/// Returns `None` past the direct pointers or for a hole when not creating.
pub fn bmap(
    device: &impl BlockDevice,
    superblock: &mut SuperBlock,
    inode: &mut Inode,
    block_index: usize,
    create: bool,
) -> Result<Option<u32>> {
    if block_index >= NUM_DIRECT_PTRS {
        return Ok(None);
    }
    let block_id = inode.direct_ptrs[block_index];
    if block_id != 0 {
        return Ok(Some(block_id));
    }
    if !create {
        return Ok(None);
    }
    let block_id = alloc_data_block(device, superblock)?;
    inode.direct_ptrs[block_index] = block_id;
    Ok(Some(block_id))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{FormatOptions, RamDisk, format_fs};

    #[test]
    fn test_inode_addressing() {
        let rd = RamDisk::new(512, 64);
        let opts = FormatOptions {
            block_size: 512,
            total_blocks: 64,
            total_inodes: 10,
        };
        let sb = format_fs(&rd, &opts).unwrap();
        // Four records per 512-byte block: inode 5 is the second record of the second table block.
        assert_eq!(inode_pos(&sb, 5).unwrap(), (sb.layout.inode_table_start + 1, 128));

        let inode = new_file_inode(5, 0, Credentials::new(1000, 1000));
        write_inode(&rd, &sb, &inode).unwrap();
        let read = get_inode(&rd, &sb, 5).unwrap();
        assert_eq!(read, inode);
        assert_eq!(read.mode, S_IFREG | 0o644);
        // Neighbours untouched.
        assert_eq!(get_inode(&rd, &sb, 4).unwrap(), Inode::default());
        assert!(matches!(get_inode(&rd, &sb, 10), Err(Error::Range { index: 10, limit: 10 })));
    }
}
