//! Path resolution and manipulation utilities.
//! Every operation goes through `resolve`, which walks absolute paths one
//! component at a time starting at the root inode.

use crate::config::MAX_FILE_NAME_LEN;
use crate::directory::{dir_lookup, read_dir_block};
use crate::inode::get_inode;
use crate::{BlockDevice, Error, Inode, Result, SuperBlock};

fn components(path: &str) -> Result<impl Iterator<Item = &str>> {
    if !path.starts_with('/') {
        return Err(Error::InvalidArgument("path must be absolute"));
    }
    Ok(path.split('/').filter(|s| !s.is_empty()))
}

/// Resolves an absolute path to its inode ID and record.
pub fn resolve(
    device: &impl BlockDevice,
    superblock: &SuperBlock,
    path: &str,
) -> Result<(u32, Inode)> {
    let mut current_id = superblock.root_inode;
    let mut current = get_inode(device, superblock, current_id)?;

    for component in components(path)? {
        if component.len() > MAX_FILE_NAME_LEN {
            return Err(Error::InvalidArgument("path component longer than 255 bytes"));
        }
        if !current.is_dir() {
            return Err(Error::NotADirectory);
        }
        let (_, block) = read_dir_block(device, &current)?;
        current_id = dir_lookup(&block, component)?;
        current = get_inode(device, superblock, current_id)?;
    }

    Ok((current_id, current))
}

/// Splits an absolute path into (parent path, final component).
/// e.g. "/a/b.txt" -> ("/a", "b.txt"), "/b.txt" -> ("/", "b.txt").
pub fn split(path: &str) -> Result<(String, String)> {
    let parts: Vec<&str> = components(path)?.collect();
    let Some((name, parents)) = parts.split_last() else {
        return Err(Error::InvalidArgument("the root has no parent"));
    };
    let parent = format!("/{}", parents.join("/"));
    Ok((parent, name.to_string()))
}

/// Final component of a path, "/" for the root.
pub fn basename(path: &str) -> &str {
    path.rsplit('/').find(|s| !s.is_empty()).unwrap_or("/")
}
