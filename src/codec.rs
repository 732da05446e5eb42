//! Little-endian transcoding of the on-disk records.
//! Pure byte shuffling: range and consistency checks belong to the callers.

use crate::config::*;
use crate::structs::*;
use crate::{Error, Result};

#[inline]
pub fn put_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

#[inline]
pub fn get_u32(buf: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[offset..offset + 4]);
    u32::from_le_bytes(bytes)
}

pub fn encode_inode(inode: &Inode) -> [u8; INODE_SIZE] {
    let mut out = [0u8; INODE_SIZE];
    put_u32(&mut out, INO_NUMBER, inode.id);
    put_u32(&mut out, INO_MODE, inode.mode);
    put_u32(&mut out, INO_UID, inode.uid);
    put_u32(&mut out, INO_GID, inode.gid);
    put_u32(&mut out, INO_LINKS, inode.links_cnt);
    put_u32(&mut out, INO_SIZE, inode.size);
    for (i, &ptr) in inode.direct_ptrs.iter().enumerate() {
        put_u32(&mut out, INO_DIRECT + i * 4, ptr);
    }
    put_u32(&mut out, INO_INDIRECT, inode.indirect_ptr);
    put_u32(&mut out, INO_ATIME, inode.atime);
    put_u32(&mut out, INO_MTIME, inode.mtime);
    put_u32(&mut out, INO_CTIME, inode.ctime);
    out
}

/// `rec` must hold at least INODE_SIZE bytes.
pub fn decode_inode(rec: &[u8]) -> Inode {
    let mut direct_ptrs = [0u32; NUM_DIRECT_PTRS];
    for (i, ptr) in direct_ptrs.iter_mut().enumerate() {
        *ptr = get_u32(rec, INO_DIRECT + i * 4);
    }
    Inode {
        id: get_u32(rec, INO_NUMBER),
        mode: get_u32(rec, INO_MODE),
        uid: get_u32(rec, INO_UID),
        gid: get_u32(rec, INO_GID),
        links_cnt: get_u32(rec, INO_LINKS),
        size: get_u32(rec, INO_SIZE),
        atime: get_u32(rec, INO_ATIME),
        mtime: get_u32(rec, INO_MTIME),
        ctime: get_u32(rec, INO_CTIME),
        direct_ptrs,
        indirect_ptr: get_u32(rec, INO_INDIRECT),
    }
}

/// Serializes the superblock into a zero-padded buffer of `block_size` bytes.
pub fn encode_superblock(sb: &SuperBlock, block_size: usize) -> Vec<u8> {
    let mut buf = vec![0u8; block_size];
    buf[SB_MAGIC..SB_MAGIC + 4].copy_from_slice(MAGIC);
    put_u32(&mut buf, SB_VERSION, sb.version);
    put_u32(&mut buf, SB_BLOCK_SIZE, sb.block_size);
    put_u32(&mut buf, SB_TOTAL_BLOCKS, sb.total_blocks);
    put_u32(&mut buf, SB_TOTAL_INODES, sb.total_inodes);
    buf[SB_INODE_BITMAP..SB_INODE_BITMAP + BITMAP_CAPACITY]
        .copy_from_slice(sb.inode_bitmap.as_bytes());
    buf[SB_DATA_BITMAP..SB_DATA_BITMAP + BITMAP_CAPACITY]
        .copy_from_slice(sb.data_bitmap.as_bytes());
    put_u32(&mut buf, SB_ROOT_INODE, sb.root_inode);

    let layout = &sb.layout;
    put_u32(&mut buf, SB_INODE_BITMAP_START, layout.inode_bitmap_start);
    put_u32(&mut buf, SB_INODE_BITMAP_BLOCKS, layout.inode_bitmap_blocks);
    put_u32(&mut buf, SB_DATA_BITMAP_START, layout.data_bitmap_start);
    put_u32(&mut buf, SB_DATA_BITMAP_BLOCKS, layout.data_bitmap_blocks);
    put_u32(&mut buf, SB_INODE_TABLE_START, layout.inode_table_start);
    put_u32(&mut buf, SB_INODE_TABLE_BLOCKS, layout.inode_table_blocks);
    put_u32(&mut buf, SB_DATA_START, layout.data_start);
    buf
}

/// Decodes block 0. Only the magic and the buffer length are checked here.
pub fn decode_superblock(buf: &[u8]) -> Result<SuperBlock> {
    if buf.len() < SB_ENCODED_LEN {
        return Err(Error::Format(format!(
            "block 0 holds {} bytes, need {}",
            buf.len(),
            SB_ENCODED_LEN
        )));
    }
    if &buf[SB_MAGIC..SB_MAGIC + 4] != MAGIC {
        return Err(Error::Format(format!(
            "magic {:02x?} is not QRFS",
            &buf[SB_MAGIC..SB_MAGIC + 4]
        )));
    }

    let total_blocks = get_u32(buf, SB_TOTAL_BLOCKS);
    let total_inodes = get_u32(buf, SB_TOTAL_INODES);
    let mut inode_bits = [0u8; BITMAP_CAPACITY];
    inode_bits.copy_from_slice(&buf[SB_INODE_BITMAP..SB_INODE_BITMAP + BITMAP_CAPACITY]);
    let mut data_bits = [0u8; BITMAP_CAPACITY];
    data_bits.copy_from_slice(&buf[SB_DATA_BITMAP..SB_DATA_BITMAP + BITMAP_CAPACITY]);

    Ok(SuperBlock {
        version: get_u32(buf, SB_VERSION),
        block_size: get_u32(buf, SB_BLOCK_SIZE),
        total_blocks,
        total_inodes,
        inode_bitmap: Bitmap::from_bytes(inode_bits, total_inodes),
        data_bitmap: Bitmap::from_bytes(data_bits, total_blocks),
        root_inode: get_u32(buf, SB_ROOT_INODE),
        layout: Layout {
            inode_bitmap_start: get_u32(buf, SB_INODE_BITMAP_START),
            inode_bitmap_blocks: get_u32(buf, SB_INODE_BITMAP_BLOCKS),
            data_bitmap_start: get_u32(buf, SB_DATA_BITMAP_START),
            data_bitmap_blocks: get_u32(buf, SB_DATA_BITMAP_BLOCKS),
            inode_table_start: get_u32(buf, SB_INODE_TABLE_START),
            inode_table_blocks: get_u32(buf, SB_INODE_TABLE_BLOCKS),
            data_start: get_u32(buf, SB_DATA_START),
        },
    })
}
