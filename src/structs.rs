use crate::config::*;

/// Region offsets of a formatted filesystem, all in blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub inode_bitmap_start: u32,
    pub inode_bitmap_blocks: u32,
    pub data_bitmap_start: u32,
    pub data_bitmap_blocks: u32,
    pub inode_table_start: u32,
    pub inode_table_blocks: u32,
    pub data_start: u32, // First block of the data region
}

/// One byte per entry, ASCII '0' for free and '1' for used.
/// Only the first `capacity` entries are meaningful; the rest stay '0'.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Bitmap {
    bytes: [u8; BITMAP_CAPACITY],
    capacity: u32,
}

impl Bitmap {
    /// All entries free. `capacity` is clamped to BITMAP_CAPACITY.
    pub fn new(capacity: u32) -> Self {
        Self {
            bytes: [BIT_FREE; BITMAP_CAPACITY],
            capacity: capacity.min(BITMAP_CAPACITY as u32),
        }
    }

    pub fn from_bytes(bytes: [u8; BITMAP_CAPACITY], capacity: u32) -> Self {
        Self {
            bytes,
            capacity: capacity.min(BITMAP_CAPACITY as u32),
        }
    }

    pub fn as_bytes(&self) -> &[u8; BITMAP_CAPACITY] {
        &self.bytes
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Anything other than '0' counts as used.
    pub fn is_used(&self, index: u32) -> bool {
        index < self.capacity && self.bytes[index as usize] != BIT_FREE
    }

    /// Returns false when `index` is out of range.
    pub fn set_used(&mut self, index: u32) -> bool {
        if index >= self.capacity {
            return false;
        }
        self.bytes[index as usize] = BIT_USED;
        true
    }

    /// Returns false when `index` is out of range.
    pub fn set_free(&mut self, index: u32) -> bool {
        if index >= self.capacity {
            return false;
        }
        self.bytes[index as usize] = BIT_FREE;
        true
    }

    /// Lowest free index, if any.
    pub fn first_free(&self) -> Option<u32> {
        (0..self.capacity).find(|&i| !self.is_used(i))
    }

    /// Free entries in `start..capacity`.
    pub fn count_free_from(&self, start: u32) -> u32 {
        (start..self.capacity).filter(|&i| !self.is_used(i)).count() as u32
    }

    /// Indices holding a byte that is neither '0' nor '1'.
    pub fn malformed(&self) -> Vec<u32> {
        (0..self.capacity)
            .filter(|&i| !matches!(self.bytes[i as usize], BIT_FREE | BIT_USED))
            .collect()
    }
}

impl core::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let used = &self.bytes[..self.capacity as usize];
        write!(f, "Bitmap({})", String::from_utf8_lossy(used))
    }
}

/// In-memory form of block 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperBlock {
    pub version: u32,
    pub block_size: u32,
    pub total_blocks: u32,
    pub total_inodes: u32,
    pub inode_bitmap: Bitmap,
    pub data_bitmap: Bitmap, // Covers every block, metadata included
    pub root_inode: u32,
    pub layout: Layout,
}

impl SuperBlock {
    pub fn inodes_per_block(&self) -> u32 {
        self.block_size / INODE_SIZE as u32
    }

    pub fn entries_per_dir_block(&self) -> usize {
        self.block_size as usize / DIR_ENTRY_SIZE
    }

    /// Blocks in the data region.
    pub fn data_blocks(&self) -> u32 {
        self.total_blocks.saturating_sub(self.layout.data_start)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Regular,
    Directory,
}

impl FileType {
    pub fn from_mode(mode: u32) -> Option<Self> {
        match mode & S_IFMT {
            S_IFREG => Some(FileType::Regular),
            S_IFDIR => Some(FileType::Directory),
            _ => None,
        }
    }

    pub fn mode_bits(self) -> u32 {
        match self {
            FileType::Regular => S_IFREG,
            FileType::Directory => S_IFDIR,
        }
    }
}

/// Inode record. Timestamps are seconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Inode {
    pub id: u32,
    pub mode: u32, // Type bits | permission bits
    pub uid: u32,
    pub gid: u32,
    pub links_cnt: u32,
    pub size: u32,
    pub atime: u32,
    pub mtime: u32,
    pub ctime: u32,
    pub direct_ptrs: [u32; NUM_DIRECT_PTRS], // 0 means unallocated
    pub indirect_ptr: u32,                   // Carried for format compatibility, never followed
}

impl Inode {
    pub fn file_type(&self) -> Option<FileType> {
        FileType::from_mode(self.mode)
    }

    pub fn is_dir(&self) -> bool {
        self.file_type() == Some(FileType::Directory)
    }

    pub fn is_regular(&self) -> bool {
        self.file_type() == Some(FileType::Regular)
    }

    pub fn perm(&self) -> u32 {
        self.mode & PERM_MASK
    }

    /// Number of populated direct pointers.
    pub fn blocks(&self) -> u32 {
        self.direct_ptrs.iter().filter(|&&p| p != 0).count() as u32
    }

    pub fn touch_access(&mut self, now: u32) {
        self.atime = now;
    }

    pub fn touch_modify(&mut self, now: u32) {
        self.mtime = now;
        self.ctime = now;
    }

    pub fn touch_change(&mut self, now: u32) {
        self.ctime = now;
    }
}

/// Decoded directory slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub inode_id: u32,
    pub name: String,
}

impl DirEntry {
    pub fn new(inode_id: u32, name: &str) -> Self {
        Self {
            inode_id,
            name: name.to_string(),
        }
    }

    /// A slot is free only when both the inode ID and the name are empty;
    /// "." and ".." of the root legitimately point at inode 0.
    pub fn is_empty(&self) -> bool {
        self.inode_id == 0 && self.name.is_empty()
    }
}

/// Identity of the caller an operation runs on behalf of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credentials {
    pub uid: u32,
    pub gid: u32,
}

impl Credentials {
    pub fn new(uid: u32, gid: u32) -> Self {
        Self { uid, gid }
    }

    pub fn root() -> Self {
        Self { uid: 0, gid: 0 }
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::root()
    }
}
