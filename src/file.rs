//! File content access through an inode's direct pointers.

use log::warn;

use crate::bitmap::free_data_block;
use crate::config::NUM_DIRECT_PTRS;
use crate::error::Exhausted;
use crate::inode::bmap;
use crate::{BlockDevice, Error, Inode, Result, SuperBlock};

/// Largest file the direct pointers can address.
pub fn max_file_size(superblock: &SuperBlock) -> u64 {
    NUM_DIRECT_PTRS as u64 * superblock.block_size as u64
}

/// Reads file data at `offset` into `buffer`.
/// The span is clamped to the file size, and reading stops at the first
/// unallocated pointer. Returns the number of bytes copied.
pub fn fread(
    device: &impl BlockDevice,
    superblock: &SuperBlock,
    inode: &Inode,
    offset: u64,
    buffer: &mut [u8],
) -> Result<usize> {
    if !inode.is_regular() {
        return Err(Error::IsADirectory);
    }
    let size = inode.size as u64;
    if offset >= size || buffer.is_empty() {
        return Ok(0);
    }
    let block_size = superblock.block_size as u64;
    let end = size.min(offset + buffer.len() as u64);

    let mut bytes_read = 0;
    let mut current_offset = offset;
    while current_offset < end {
        let block_index = (current_offset / block_size) as usize;
        if block_index >= NUM_DIRECT_PTRS {
            break;
        }
        let block_id = inode.direct_ptrs[block_index];
        if block_id == 0 {
            break; // hole: treated as end of file
        }
        let block = device.read_block_vec(block_id)?;
        let start = (current_offset % block_size) as usize;
        let n = (block.len() - start).min((end - current_offset) as usize);
        buffer[bytes_read..bytes_read + n].copy_from_slice(&block[start..start + n]);
        bytes_read += n;
        current_offset += n as u64;
    }

    Ok(bytes_read)
}

/// Writes `buffer` at `offset`, allocating blocks for empty slots.
/// Best effort: stops early without error when the block pool or the direct
/// pointers run out. Grows the in-memory size; the caller persists the inode.
pub fn fwrite(
    device: &impl BlockDevice,
    superblock: &mut SuperBlock,
    inode: &mut Inode,
    offset: u64,
    buffer: &[u8],
) -> Result<usize> {
    if !inode.is_regular() {
        return Err(Error::IsADirectory);
    }
    if buffer.is_empty() {
        return Ok(0);
    }
    let block_size = superblock.block_size as u64;

    let mut bytes_written = 0;
    let mut current_offset = offset;
    while bytes_written < buffer.len() {
        let block_index = (current_offset / block_size) as usize;
        let block_id = match bmap(device, superblock, inode, block_index, true) {
            Ok(Some(block_id)) => block_id,
            Ok(None) => {
                warn!("inode {}: write stops at the direct pointer limit", inode.id);
                break;
            }
            Err(Error::NoSpace(Exhausted::Blocks)) => {
                warn!("inode {}: write truncated, no free blocks", inode.id);
                break;
            }
            Err(e) => return Err(e),
        };
        let mut block = device.read_block_vec(block_id)?;
        let start = (current_offset % block_size) as usize;
        let n = (block.len() - start).min(buffer.len() - bytes_written);
        block[start..start + n].copy_from_slice(&buffer[bytes_written..bytes_written + n]);
        device.write_block(block_id, &block)?;
        bytes_written += n;
        current_offset += n as u64;
    }

    if bytes_written > 0 && current_offset > inode.size as u64 {
        inode.size = current_offset as u32;
    }
    Ok(bytes_written)
}

/// Sets the file size. Shrinking releases the blocks past the new end and
/// zeroes the tail of the last kept block; growing only moves the size.
pub fn ftruncate(
    device: &impl BlockDevice,
    superblock: &mut SuperBlock,
    inode: &mut Inode,
    new_size: u64,
) -> Result<()> {
    if !inode.is_regular() {
        return Err(Error::IsADirectory);
    }
    if new_size > max_file_size(superblock) {
        return Err(Error::InvalidArgument("size beyond the direct block capacity"));
    }
    let block_size = superblock.block_size as u64;
    if new_size < inode.size as u64 {
        let keep = new_size.div_ceil(block_size) as usize;
        for ptr in inode.direct_ptrs.iter_mut().skip(keep) {
            if *ptr != 0 {
                free_data_block(superblock, *ptr);
                *ptr = 0;
            }
        }
        let tail = (new_size % block_size) as usize;
        if keep > 0 && tail != 0 && inode.direct_ptrs[keep - 1] != 0 {
            let block_id = inode.direct_ptrs[keep - 1];
            let mut block = device.read_block_vec(block_id)?;
            block[tail..].fill(0);
            device.write_block(block_id, &block)?;
        }
    }
    inode.size = new_size as u32;
    Ok(())
}

/// Releases every data block of the inode and empties its pointers.
pub fn release_blocks(superblock: &mut SuperBlock, inode: &mut Inode) {
    for ptr in inode.direct_ptrs.iter_mut() {
        if *ptr != 0 {
            free_data_block(superblock, *ptr);
            *ptr = 0;
        }
    }
    inode.size = 0;
}
