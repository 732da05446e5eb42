//! Fixed-slot directory blocks.
//! A directory owns exactly one data block, cut into DIR_ENTRY_SIZE slots:
//! 4-byte inode ID followed by a NUL-padded name field.
//! Everything here works on an in-memory block; callers read and write it back.

use log::debug;

use crate::codec::{get_u32, put_u32};
use crate::config::*;
use crate::error::Exhausted;
use crate::{BlockDevice, DirEntry, Error, Inode, Result};

fn name_field(block: &[u8], slot: usize) -> &[u8] {
    let start = slot * DIR_ENTRY_SIZE + 4;
    let field = &block[start..start + DIR_NAME_FIELD];
    let end = field.iter().position(|&c| c == 0).unwrap_or(MAX_FILE_NAME_LEN);
    &field[..end]
}

fn slot_count(block: &[u8]) -> usize {
    block.len() / DIR_ENTRY_SIZE
}

fn slot_is_free(block: &[u8], slot: usize) -> bool {
    get_u32(block, slot * DIR_ENTRY_SIZE) == 0 && name_field(block, slot).is_empty()
}

fn find_slot(block: &[u8], name: &str) -> Option<usize> {
    (0..slot_count(block))
        .find(|&slot| !slot_is_free(block, slot) && name_field(block, slot) == name.as_bytes())
}

pub fn write_entry(block: &mut [u8], slot: usize, inode_id: u32, name: &str) {
    let offset = slot * DIR_ENTRY_SIZE;
    put_u32(block, offset, inode_id);
    let field = &mut block[offset + 4..offset + DIR_ENTRY_SIZE];
    field.fill(0);
    let len = name.len().min(MAX_FILE_NAME_LEN);
    field[..len].copy_from_slice(&name.as_bytes()[..len]);
}

pub fn read_entry(block: &[u8], slot: usize) -> DirEntry {
    DirEntry {
        inode_id: get_u32(block, slot * DIR_ENTRY_SIZE),
        name: String::from_utf8_lossy(name_field(block, slot)).into_owned(),
    }
}

fn clear_entry(block: &mut [u8], slot: usize) {
    let offset = slot * DIR_ENTRY_SIZE;
    block[offset..offset + DIR_ENTRY_SIZE].fill(0);
}

/// Rejects names that cannot be stored in a slot.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidArgument("empty file name"));
    }
    if name.len() > MAX_FILE_NAME_LEN {
        return Err(Error::InvalidArgument("file name longer than 255 bytes"));
    }
    if name.bytes().any(|c| c == b'/' || c == 0) {
        return Err(Error::InvalidArgument("file name contains '/' or NUL"));
    }
    Ok(())
}

pub fn is_dot_name(name: &str) -> bool {
    name == DOT_NAME || name == DOTDOT_NAME
}

/// A zeroed block with "." and ".." in slots 0 and 1.
pub fn build_root_block(block_size: usize, root_inode: u32) -> Vec<u8> {
    let mut block = vec![0u8; block_size];
    write_entry(&mut block, 0, root_inode, DOT_NAME);
    write_entry(&mut block, 1, root_inode, DOTDOT_NAME);
    block
}

/// First occupied slot named `name`.
pub fn dir_lookup(block: &[u8], name: &str) -> Result<u32> {
    find_slot(block, name)
        .map(|slot| get_u32(block, slot * DIR_ENTRY_SIZE))
        .ok_or(Error::NotFound)
}

/// Puts `name` into the first free slot. On failure the block is left untouched.
pub fn dir_insert(block: &mut [u8], inode_id: u32, name: &str) -> Result<()> {
    validate_name(name)?;
    if find_slot(block, name).is_some() {
        return Err(Error::Exists);
    }
    let slot = (0..slot_count(block))
        .find(|&slot| slot_is_free(block, slot))
        .ok_or(Error::NoSpace(Exhausted::DirSlots))?;
    write_entry(block, slot, inode_id, name);
    debug!("dir insert '{name}' -> inode {inode_id} at slot {slot}");
    Ok(())
}

/// Clears the slot holding `name` for `inode_id`.
pub fn dir_remove(block: &mut [u8], inode_id: u32, name: &str) -> Result<()> {
    let slot = (0..slot_count(block))
        .find(|&slot| {
            !slot_is_free(block, slot)
                && get_u32(block, slot * DIR_ENTRY_SIZE) == inode_id
                && name_field(block, slot) == name.as_bytes()
        })
        .ok_or(Error::NotFound)?;
    clear_entry(block, slot);
    debug!("dir remove '{name}' (inode {inode_id}) from slot {slot}");
    Ok(())
}

/// Rewrites the slot of `from` in place with `to`, keeping its inode ID.
/// Returns that inode ID.
pub fn dir_rename(block: &mut [u8], from: &str, to: &str) -> Result<u32> {
    validate_name(to)?;
    let slot = find_slot(block, from).ok_or(Error::NotFound)?;
    if from == to {
        return Ok(get_u32(block, slot * DIR_ENTRY_SIZE));
    }
    if find_slot(block, to).is_some() {
        return Err(Error::Exists);
    }
    let inode_id = get_u32(block, slot * DIR_ENTRY_SIZE);
    write_entry(block, slot, inode_id, to);
    debug!("dir rename '{from}' -> '{to}' (inode {inode_id})");
    Ok(inode_id)
}

/// Every occupied slot, in slot order.
pub fn dir_entries(block: &[u8]) -> Vec<DirEntry> {
    (0..slot_count(block))
        .filter(|&slot| !slot_is_free(block, slot))
        .map(|slot| read_entry(block, slot))
        .collect()
}

/// The single data block backing a directory inode.
pub fn dir_block_id(dir_inode: &Inode) -> Result<u32> {
    if !dir_inode.is_dir() {
        return Err(Error::NotADirectory);
    }
    match dir_inode.direct_ptrs[0] {
        0 => Err(Error::Format(format!(
            "directory inode {} has no data block",
            dir_inode.id
        ))),
        block_id => Ok(block_id),
    }
}

pub fn read_dir_block(device: &impl BlockDevice, dir_inode: &Inode) -> Result<(u32, Vec<u8>)> {
    let block_id = dir_block_id(dir_inode)?;
    Ok((block_id, device.read_block_vec(block_id)?))
}
