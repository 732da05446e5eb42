use std::sync::Arc;

use log::{debug, info};

use crate::bitmap::{alloc_data_block, alloc_inode_id, free_inode_id};
use crate::config::*;
use crate::directory::{
    dir_entries, dir_insert, dir_lookup, dir_remove, dir_rename, is_dot_name, read_dir_block,
    validate_name,
};
use crate::file::{fread, ftruncate, fwrite, release_blocks};
use crate::inode::{get_inode, new_file_inode, now, write_inode};
use crate::path::{resolve, split};
use crate::stat::{AccessMask, FileAttr, FsStat, permits};
use crate::structs::*;
use crate::superblock::{FormatOptions, format_fs, read_superblock, write_superblock};
use crate::{BlockDevice, Error, Result};

/// A mounted filesystem: the per-mount context every operation runs against.
/// Holds the superblock (with both bitmaps) and a cached copy of the root inode.
#[derive(Debug)]
pub struct FileSystem<D: BlockDevice> {
    device: Arc<D>,
    superblock: SuperBlock,
    root: Inode,
}

fn is_root_path(path: &str) -> bool {
    path.split('/').all(|s| s.is_empty())
}

impl<D: BlockDevice> FileSystem<D> {
    pub fn format(device: Arc<D>, opts: &FormatOptions) -> Result<Self> {
        format_fs(&*device, opts)?;
        Self::mount(device)
    }

    pub fn mount(device: Arc<D>) -> Result<Self> {
        let superblock = read_superblock(&*device)?;
        if superblock.block_size as usize != device.block_size() {
            return Err(Error::Format(format!(
                "superblock block size {} does not match the device's {}",
                superblock.block_size,
                device.block_size()
            )));
        }
        if superblock.block_size == 0 || superblock.block_size % INODE_SIZE as u32 != 0 {
            return Err(Error::Format(format!(
                "block size {} is not a multiple of the inode record size",
                superblock.block_size
            )));
        }
        if superblock.total_blocks as usize > BITMAP_CAPACITY
            || superblock.total_inodes as usize > BITMAP_CAPACITY
        {
            return Err(Error::Format(format!(
                "{} blocks / {} inodes exceed the bitmap capacity",
                superblock.total_blocks, superblock.total_inodes
            )));
        }
        if superblock.root_inode >= superblock.total_inodes {
            return Err(Error::Format(format!(
                "root inode {} out of range ({} inodes)",
                superblock.root_inode, superblock.total_inodes
            )));
        }
        let layout = &superblock.layout;
        let table_end = layout
            .inode_table_start
            .checked_add(layout.inode_table_blocks);
        if table_end.is_none_or(|end| end > superblock.total_blocks)
            || layout.data_start >= superblock.total_blocks
        {
            return Err(Error::Format("regions exceed the total block count".into()));
        }
        if superblock.total_blocks as usize > device.num_blocks() {
            return Err(Error::Format(format!(
                "superblock claims {} blocks, device has {}",
                superblock.total_blocks,
                device.num_blocks()
            )));
        }

        let root = get_inode(&*device, &superblock, superblock.root_inode)?;
        if !root.is_dir() {
            return Err(Error::Format(format!(
                "root inode mode {:o} is not a directory",
                root.mode
            )));
        }
        info!(
            "mounted: version={} blocks={} inodes={} data_start={} root size={} links={}",
            superblock.version,
            superblock.total_blocks,
            superblock.total_inodes,
            superblock.layout.data_start,
            root.size,
            root.links_cnt
        );
        Ok(Self {
            device,
            superblock,
            root,
        })
    }

    fn store_inode(&mut self, inode: &Inode) -> Result<()> {
        write_inode(&*self.device, &self.superblock, inode)?;
        if inode.id == self.superblock.root_inode {
            self.root = *inode;
        }
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        write_superblock(&*self.device, &self.superblock)
    }

    /// Resolves the parent of `path` to its directory inode and block.
    fn parent_dir(&self, path: &str) -> Result<(String, Inode, u32, Vec<u8>)> {
        let (parent_path, name) = split(path)?;
        let (_, parent) = resolve(&*self.device, &self.superblock, &parent_path)?;
        let (block_id, block) = read_dir_block(&*self.device, &parent)?;
        Ok((name, parent, block_id, block))
    }

    /// Live regular-file inode behind an open handle.
    fn file_inode(&self, handle: u32) -> Result<Inode> {
        let inode = get_inode(&*self.device, &self.superblock, handle)?;
        if !self.superblock.inode_bitmap.is_used(handle) {
            return Err(Error::NotFound);
        }
        if !inode.is_regular() {
            return Err(Error::IsADirectory);
        }
        Ok(inode)
    }

    pub fn getattr(&self, path: &str) -> Result<FileAttr> {
        let block_size = self.superblock.block_size;
        if path == "/" {
            return Ok(FileAttr::from_inode(&self.root, FileType::Directory, block_size));
        }
        let (_, inode) = resolve(&*self.device, &self.superblock, path)?;
        let kind = inode.file_type().ok_or(Error::NotFound)?;
        Ok(FileAttr::from_inode(&inode, kind, block_size))
    }

    pub fn lookup(&self, path: &str) -> Result<(u32, FileType)> {
        let (inode_id, inode) = resolve(&*self.device, &self.superblock, path)?;
        let kind = inode.file_type().ok_or(Error::NotFound)?;
        Ok((inode_id, kind))
    }

    /// Creates an empty regular file with its first data block already allocated.
    pub fn create(&mut self, path: &str, mode: u32, cred: Credentials) -> Result<u32> {
        let kind = mode & S_IFMT;
        if kind != 0 && kind != S_IFREG {
            return Err(Error::NotSupported);
        }
        let (name, parent, parent_block_id, mut parent_block) = self.parent_dir(path)?;
        validate_name(&name)?;
        if dir_lookup(&parent_block, &name).is_ok() {
            return Err(Error::Exists);
        }

        // Allocate against a copy so a failure leaves the mounted bitmaps untouched.
        let mut sb = self.superblock.clone();
        let inode_id = alloc_inode_id(&mut sb)?;
        let block_id = alloc_data_block(&*self.device, &mut sb)?;
        let mut inode = new_file_inode(inode_id, mode, cred);
        inode.direct_ptrs[0] = block_id;
        dir_insert(&mut parent_block, inode_id, &name)?;

        write_inode(&*self.device, &sb, &inode)?;
        self.device.write_block(parent_block_id, &parent_block)?;
        self.superblock = sb;
        self.persist()?;
        debug!(
            "create '{}' in dir inode {} -> inode {} block {}",
            name, parent.id, inode_id, block_id
        );
        Ok(inode_id)
    }

    /// Returns the handle (the inode ID) of a regular file.
    pub fn open(&self, path: &str) -> Result<u32> {
        let (inode_id, inode) = resolve(&*self.device, &self.superblock, path)?;
        if !inode.is_regular() {
            return Err(Error::IsADirectory);
        }
        Ok(inode_id)
    }

    /// There is no open-file table; this only checks the handle.
    pub fn release(&self, handle: u32) -> Result<()> {
        self.file_inode(handle).map(|_| ())
    }

    pub fn read(&mut self, handle: u32, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let mut inode = self.file_inode(handle)?;
        let bytes_read = fread(&*self.device, &self.superblock, &inode, offset, buf)?;
        inode.touch_access(now());
        self.store_inode(&inode)?;
        Ok(bytes_read)
    }

    pub fn write(&mut self, handle: u32, offset: u64, buf: &[u8]) -> Result<usize> {
        let mut inode = self.file_inode(handle)?;
        let bytes_written = fwrite(&*self.device, &mut self.superblock, &mut inode, offset, buf)?;
        inode.touch_modify(now());
        self.store_inode(&inode)?;
        self.persist()?;
        Ok(bytes_written)
    }

    pub fn truncate(&mut self, path: &str, size: u64) -> Result<()> {
        let (_, mut inode) = resolve(&*self.device, &self.superblock, path)?;
        ftruncate(&*self.device, &mut self.superblock, &mut inode, size)?;
        inode.touch_modify(now());
        self.store_inode(&inode)?;
        self.persist()
    }

    /// Renames within one directory by rewriting the entry in place.
    /// An existing destination is never overwritten.
    pub fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let (from_parent, from_name) = split(from)?;
        let (to_parent, to_name) = split(to)?;
        if is_dot_name(&from_name) || is_dot_name(&to_name) {
            return Err(Error::InvalidArgument("cannot rename '.' or '..'"));
        }
        let (from_dir_id, from_dir) = resolve(&*self.device, &self.superblock, &from_parent)?;
        let (to_dir_id, to_dir) = resolve(&*self.device, &self.superblock, &to_parent)?;
        if !from_dir.is_dir() || !to_dir.is_dir() {
            return Err(Error::NotADirectory);
        }
        if from_dir_id != to_dir_id {
            return Err(Error::NotSupported);
        }
        let (block_id, mut block) = read_dir_block(&*self.device, &from_dir)?;
        let inode_id = dir_rename(&mut block, &from_name, &to_name)?;
        self.device.write_block(block_id, &block)?;

        let mut inode = get_inode(&*self.device, &self.superblock, inode_id)?;
        inode.touch_change(now());
        self.store_inode(&inode)?;
        debug!("rename '{from}' -> '{to}' (inode {inode_id})");
        Ok(())
    }

    /// Removes a regular file; its blocks and inode are released once no link remains.
    pub fn unlink(&mut self, path: &str) -> Result<()> {
        if is_root_path(path) {
            return Err(Error::Busy);
        }
        let (name, _, block_id, mut block) = self.parent_dir(path)?;
        if is_dot_name(&name) {
            return Err(Error::InvalidArgument("cannot unlink '.' or '..'"));
        }
        let inode_id = dir_lookup(&block, &name)?;
        let mut inode = get_inode(&*self.device, &self.superblock, inode_id)?;
        if inode.is_dir() {
            return Err(Error::IsADirectory);
        }
        dir_remove(&mut block, inode_id, &name)?;
        self.device.write_block(block_id, &block)?;

        inode.links_cnt = inode.links_cnt.saturating_sub(1);
        if inode.links_cnt == 0 {
            release_blocks(&mut self.superblock, &mut inode);
            free_inode_id(&mut self.superblock, inode_id);
            self.store_inode(&Inode {
                id: inode_id,
                ..Default::default()
            })?;
        } else {
            inode.touch_change(now());
            self.store_inode(&inode)?;
        }
        self.persist()?;
        debug!("unlink '{path}' (inode {inode_id})");
        Ok(())
    }

    /// The root is busy; there are no other directories to remove.
    pub fn remove_directory(&mut self, path: &str) -> Result<()> {
        if !path.starts_with('/') {
            return Err(Error::InvalidArgument("path must be absolute"));
        }
        if is_root_path(path) {
            return Err(Error::Busy);
        }
        Err(Error::NotSupported)
    }

    /// Directory listing as served to the host: the root yields "." and ".." only.
    pub fn list_directory(&self, path: &str) -> Result<Vec<String>> {
        let (inode_id, inode) = resolve(&*self.device, &self.superblock, path)?;
        if !inode.is_dir() {
            return Err(Error::NotADirectory);
        }
        if inode_id != self.superblock.root_inode {
            return Err(Error::NotFound);
        }
        Ok(vec![DOT_NAME.to_string(), DOTDOT_NAME.to_string()])
    }

    /// Every live entry of a directory, in slot order.
    pub fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let (_, inode) = resolve(&*self.device, &self.superblock, path)?;
        let (_, block) = read_dir_block(&*self.device, &inode)?;
        Ok(dir_entries(&block))
    }

    pub fn statfs(&self) -> FsStat {
        let sb = &self.superblock;
        FsStat {
            block_size: sb.block_size,
            total_blocks: sb.data_blocks(),
            free_blocks: sb.data_bitmap.count_free_from(sb.layout.data_start),
            total_inodes: sb.total_inodes,
            free_inodes: sb.inode_bitmap.count_free_from(0),
            name_max: STATFS_NAME_MAX,
        }
    }

    /// Persists the superblock and flushes the device.
    pub fn sync(&self) -> Result<()> {
        self.persist()?;
        self.device.flush()
    }

    pub fn access(&self, path: &str, mask: AccessMask, cred: Credentials) -> Result<()> {
        let (_, inode) = resolve(&*self.device, &self.superblock, path)?;
        if permits(inode.mode, (inode.uid, inode.gid), (cred.uid, cred.gid), mask) {
            Ok(())
        } else {
            Err(Error::PermissionDenied)
        }
    }

    pub fn get_inode(&self, inode_id: u32) -> Result<Inode> {
        get_inode(&*self.device, &self.superblock, inode_id)
    }

    pub fn root_inode_id(&self) -> u32 {
        self.superblock.root_inode
    }

    pub fn root_inode(&self) -> &Inode {
        &self.root
    }

    pub fn superblock(&self) -> &SuperBlock {
        &self.superblock
    }

    pub fn device(&self) -> Arc<D> {
        Arc::clone(&self.device)
    }
}
