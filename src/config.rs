pub const MAGIC: &[u8; 4] = b"QRFS";
pub const VERSION: u32 = 1;

pub const SUPERBLOCK_ID: u32 = 0; // Block ID for the superblock
pub const ROOT_INODE_ID: u32 = 0; // Inode ID for the root directory

pub const MIN_BLOCK_SIZE: u32 = 512;
pub const MAX_BLOCK_SIZE: u32 = 65536;

/// Bitmaps are stored inline in the superblock, one byte per entry.
/// This caps both the inode count and the block count.
pub const BITMAP_CAPACITY: usize = 128;
pub const BIT_FREE: u8 = b'0';
pub const BIT_USED: u8 = b'1';

pub const DEFAULT_BLOCK_SIZE: u32 = 1024;
pub const DEFAULT_TOTAL_BLOCKS: u32 = 100;
pub const DEFAULT_TOTAL_INODES: u32 = 10;

// Superblock field offsets (block 0).
pub const SB_MAGIC: usize = 0;
pub const SB_VERSION: usize = 4;
pub const SB_BLOCK_SIZE: usize = 8;
pub const SB_TOTAL_BLOCKS: usize = 12;
pub const SB_TOTAL_INODES: usize = 16;
pub const SB_INODE_BITMAP: usize = 20;
pub const SB_DATA_BITMAP: usize = 148;
pub const SB_ROOT_INODE: usize = 276;
pub const SB_INODE_BITMAP_START: usize = 280;
pub const SB_INODE_BITMAP_BLOCKS: usize = 284;
pub const SB_DATA_BITMAP_START: usize = 288;
pub const SB_DATA_BITMAP_BLOCKS: usize = 292;
pub const SB_INODE_TABLE_START: usize = 296;
pub const SB_INODE_TABLE_BLOCKS: usize = 300;
pub const SB_DATA_START: usize = 304;
pub const SB_ENCODED_LEN: usize = 308;

// Inode record layout.
pub const INODE_SIZE: usize = 128;
pub const NUM_DIRECT_PTRS: usize = 12;
pub const INO_NUMBER: usize = 0;
pub const INO_MODE: usize = 4;
pub const INO_UID: usize = 8;
pub const INO_GID: usize = 12;
pub const INO_LINKS: usize = 16;
pub const INO_SIZE: usize = 20;
pub const INO_DIRECT: usize = 24;
pub const INO_INDIRECT: usize = 72;
pub const INO_ATIME: usize = 76;
pub const INO_MTIME: usize = 80;
pub const INO_CTIME: usize = 84;

// Directory entries: inode ID + NUL-terminated name field.
pub const DIR_NAME_FIELD: usize = 256;
pub const MAX_FILE_NAME_LEN: usize = DIR_NAME_FIELD - 1;
pub const DIR_ENTRY_SIZE: usize = 4 + DIR_NAME_FIELD;
pub const DOT_NAME: &str = ".";
pub const DOTDOT_NAME: &str = "..";
/// Name length reported through statfs.
pub const STATFS_NAME_MAX: u32 = DIR_ENTRY_SIZE as u32 - 1;

// Mode bits, POSIX values.
pub const S_IFMT: u32 = 0o170000;
pub const S_IFDIR: u32 = 0o040000;
pub const S_IFREG: u32 = 0o100000;
pub const PERM_MASK: u32 = 0o7777;
pub const ROOT_DIR_PERM: u32 = 0o755;
pub const DEFAULT_FILE_PERM: u32 = 0o644;
