//! QRFS is a small block filesystem whose blocks can live in memory or as
//! one file per block inside a host folder.
//! Files have up to 12 direct data blocks; the root is the only directory
//! and holds its entries in a single block.
//!
//! QRFS's linear layout:
//! - Superblock (magic, geometry, both bitmaps as ASCII '0'/'1' bytes)
//! - Inode bitmap block
//! - Data bitmap block
//! - Inode Table
//! - Data Blocks
//!
//! QRFS's layers (from bottom to top):
//! 1. Block Device: whole-block storage, RAM or a folder of block files.    | No caching
//! 2. Codec/Superblock: binary records and format/load of block 0.          | Fs implemented
//! 3. Bitmap/Inode: allocation and the fixed-size inode table.              | Fs implemented
//! 4. Directory/Path: single-block directories and absolute path walking.   | Fs implemented
//! 5. File: byte-granular reads, writes and truncation over direct blocks.  | Fs implemented
//! 6. FileSystem/Mount: the operation facade a host bridge calls into.      | Mount serializes callers

mod config;
mod error;
mod block_dev;
mod block_dir;
mod codec;
mod structs;
mod bitmap;
mod superblock;
mod inode;
mod directory;
mod path;
mod file;
mod stat;
mod fs;
mod mount;
mod fsck;

pub use block_dev::{BlockDevice, RamDisk};
pub use block_dir::BlockDir;
pub use config::*;
pub use codec::*;
pub use superblock::*;
pub use structs::*;
pub use bitmap::*;
pub use inode::*;
pub use path::*;
pub use directory::*;
pub use file::*;
pub use stat::*;
pub use fs::*;
pub use mount::Mount;
pub use fsck::{FsckReport, Problem, fsck};
pub use error::{Exhausted, FsError as Error, Result};
