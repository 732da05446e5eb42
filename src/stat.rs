use enumflags2::{BitFlags, bitflags};

use crate::{FileType, Inode};

/// Attributes handed to the host bridge for one inode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileAttr {
    pub ino: u32,
    pub kind: FileType,
    pub mode: u32, // Type bits | permission bits
    pub uid: u32,
    pub gid: u32,
    pub nlink: u32,
    pub size: u64,
    /// Occupying blocks
    pub blocks: u32,
    /// Optimal I/O block size
    pub block_size: u32,
    pub atime: u32,
    pub mtime: u32,
    pub ctime: u32,
}

impl FileAttr {
    pub(crate) fn from_inode(inode: &Inode, kind: FileType, block_size: u32) -> Self {
        // A zero link count on disk is reported the way a fresh object would be.
        let nlink = match (inode.links_cnt, kind) {
            (0, FileType::Directory) => 2,
            (0, FileType::Regular) => 1,
            (n, _) => n,
        };
        Self {
            ino: inode.id,
            kind,
            mode: inode.mode,
            uid: inode.uid,
            gid: inode.gid,
            nlink,
            size: inode.size as u64,
            blocks: inode.blocks(),
            block_size,
            atime: inode.atime,
            mtime: inode.mtime,
            ctime: inode.ctime,
        }
    }
}

/// Filesystem-wide counters. Block counts cover the data region only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsStat {
    pub block_size: u32,
    pub total_blocks: u32,
    pub free_blocks: u32,
    pub total_inodes: u32,
    pub free_inodes: u32,
    pub name_max: u32,
}

/// Requested permission bits, POSIX R_OK / W_OK / X_OK values.
#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Execute = 0b001,
    Write = 0b010,
    Read = 0b100,
}

pub type AccessMask = BitFlags<Access>;

/// Picks the owner, group or other triad of `mode` for the caller and checks `mask` against it.
pub fn permits(mode: u32, owner: (u32, u32), caller: (u32, u32), mask: AccessMask) -> bool {
    let triad = if caller.0 == owner.0 {
        (mode >> 6) & 0o7
    } else if caller.1 == owner.1 {
        (mode >> 3) & 0o7
    } else {
        mode & 0o7
    };
    let wanted = mask.bits() as u32;
    triad & wanted == wanted
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_permits_triads() {
        let mode = 0o640;
        let owner = (1000, 100);
        assert!(permits(mode, owner, (1000, 5), Access::Read | Access::Write));
        assert!(!permits(mode, owner, (1000, 5), Access::Execute.into()));
        assert!(permits(mode, owner, (2000, 100), Access::Read.into()));
        assert!(!permits(mode, owner, (2000, 100), Access::Write.into()));
        assert!(!permits(mode, owner, (2000, 200), Access::Read.into()));
        // An empty mask only checks existence.
        assert!(permits(mode, owner, (2000, 200), AccessMask::empty()));
    }
}
