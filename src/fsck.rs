//! Offline consistency check.
//! Loads block 0 without mounting, then audits the region layout, both
//! bitmaps, the root inode and the root directory. Findings are collected
//! rather than returned as errors; only an unreadable superblock fails.

use std::collections::BTreeMap;
use std::fmt;

use log::{info, warn};
use thiserror::Error;

use crate::config::*;
use crate::directory::{dir_entries, read_dir_block};
use crate::inode::get_inode;
use crate::superblock::read_superblock;
use crate::{BlockDevice, DirEntry, Inode, Result, SuperBlock};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Problem {
    #[error("block size {superblock} recorded, device uses {device}")]
    BlockSizeMismatch { superblock: u32, device: u32 },
    #[error("block size {0} is not a multiple of 128 in 512..=65536")]
    InvalidBlockSize(u32),
    #[error("{what} count {count} exceeds the bitmap capacity of 128")]
    CapacityExceeded { what: &'static str, count: u32 },
    #[error("{region} spans blocks {start}..{end}, past the {total} total blocks")]
    RegionOutOfBounds {
        region: &'static str,
        start: u32,
        end: u32,
        total: u32,
    },
    #[error("{first} overlaps {second}")]
    RegionOverlap {
        first: &'static str,
        second: &'static str,
    },
    #[error("{bitmap} bitmap holds a byte other than '0' or '1' at index {index}")]
    MalformedBitmap { bitmap: &'static str, index: u32 },
    #[error("reserved block {0} is not marked used")]
    ReservedBlockFree(u32),
    #[error("root inode is unreadable: {0}")]
    RootUnreadable(String),
    #[error("root inode {0} is not marked used")]
    RootNotAllocated(u32),
    #[error("root inode mode {0:o} is not a directory")]
    RootNotDirectory(u32),
    #[error("root inode has {0} links, expected 2")]
    RootLinkCount(u32),
    #[error("inode {slot} records inode number {stored}")]
    InodeNumberMismatch { slot: u32, stored: u32 },
    #[error("entry '{name}' points at inode {inode}, beyond the inode table")]
    EntryOutOfRange { name: String, inode: u32 },
    #[error("entry '{name}' points at unallocated inode {inode}")]
    EntryNotAllocated { name: String, inode: u32 },
    #[error("inode {inode} points at block {block} outside the data region")]
    BlockOutOfRange { inode: u32, block: u32 },
    #[error("inode {inode} points at block {block}, which is not marked used")]
    BlockNotAllocated { inode: u32, block: u32 },
    #[error("block {block} is claimed by inodes {first} and {second}")]
    BlockShared { block: u32, first: u32, second: u32 },
}

#[derive(Debug)]
pub struct FsckReport {
    pub superblock: SuperBlock,
    pub root: Option<Inode>,
    pub entries: Vec<DirEntry>,
    pub problems: Vec<Problem>,
}

impl FsckReport {
    pub fn is_consistent(&self) -> bool {
        self.problems.is_empty()
    }
}

impl fmt::Display for FsckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sb = &self.superblock;
        let layout = &sb.layout;
        writeln!(f, "version:       {}", sb.version)?;
        writeln!(f, "block size:    {}", sb.block_size)?;
        writeln!(f, "total blocks:  {}", sb.total_blocks)?;
        writeln!(f, "total inodes:  {}", sb.total_inodes)?;
        writeln!(
            f,
            "inode bitmap:  {} (+{})",
            layout.inode_bitmap_start, layout.inode_bitmap_blocks
        )?;
        writeln!(
            f,
            "data bitmap:   {} (+{})",
            layout.data_bitmap_start, layout.data_bitmap_blocks
        )?;
        writeln!(
            f,
            "inode table:   {} (+{})",
            layout.inode_table_start, layout.inode_table_blocks
        )?;
        writeln!(f, "data start:    {}", layout.data_start)?;
        if let Some(root) = &self.root {
            writeln!(
                f,
                "root inode:    {} mode {:o} links {} size {}",
                root.id, root.mode, root.links_cnt, root.size
            )?;
        }
        for entry in &self.entries {
            writeln!(f, "  {:>4}  {}", entry.inode_id, entry.name)?;
        }
        if self.problems.is_empty() {
            write!(f, "clean")
        } else {
            writeln!(f, "{} problem(s):", self.problems.len())?;
            for problem in &self.problems {
                writeln!(f, "  - {problem}")?;
            }
            Ok(())
        }
    }
}

fn check_layout(sb: &SuperBlock, problems: &mut Vec<Problem>) {
    let l = &sb.layout;
    // Ends come straight from disk; an overflowing one is out of bounds too.
    let regions = [
        ("superblock", SUPERBLOCK_ID, SUPERBLOCK_ID.checked_add(1)),
        (
            "inode bitmap",
            l.inode_bitmap_start,
            l.inode_bitmap_start.checked_add(l.inode_bitmap_blocks),
        ),
        (
            "data bitmap",
            l.data_bitmap_start,
            l.data_bitmap_start.checked_add(l.data_bitmap_blocks),
        ),
        (
            "inode table",
            l.inode_table_start,
            l.inode_table_start.checked_add(l.inode_table_blocks),
        ),
        ("data region", l.data_start, Some(sb.total_blocks)),
    ];
    for &(region, start, end) in &regions {
        match end {
            Some(end) if end <= sb.total_blocks && start < sb.total_blocks => {}
            _ => problems.push(Problem::RegionOutOfBounds {
                region,
                start,
                end: end.unwrap_or(u32::MAX),
                total: sb.total_blocks,
            }),
        }
    }
    for pair in regions.windows(2) {
        let (first, _, first_end) = pair[0];
        let (second, second_start, _) = pair[1];
        if first_end.is_some_and(|end| end > second_start) {
            problems.push(Problem::RegionOverlap { first, second });
        }
    }
}

fn check_bitmaps(sb: &SuperBlock, problems: &mut Vec<Problem>) {
    for (bitmap, map) in [("inode", &sb.inode_bitmap), ("data", &sb.data_bitmap)] {
        for index in map.malformed() {
            problems.push(Problem::MalformedBitmap { bitmap, index });
        }
    }
    let reserved_end = sb.layout.data_start.min(sb.data_bitmap.capacity());
    for block in SUPERBLOCK_ID..reserved_end {
        if !sb.data_bitmap.is_used(block) {
            problems.push(Problem::ReservedBlockFree(block));
        }
    }
}

/// Every allocated inode must carry its own number and reference only
/// allocated data blocks that no other inode claims.
fn check_inodes(device: &impl BlockDevice, sb: &SuperBlock, problems: &mut Vec<Problem>) {
    let mut owners: BTreeMap<u32, u32> = BTreeMap::new();
    for slot in (0..sb.inode_bitmap.capacity()).filter(|&i| sb.inode_bitmap.is_used(i)) {
        let inode = match get_inode(device, sb, slot) {
            Ok(inode) => inode,
            Err(e) => {
                warn!("fsck: inode {slot} unreadable: {e}");
                continue;
            }
        };
        if inode.id != slot {
            problems.push(Problem::InodeNumberMismatch {
                slot,
                stored: inode.id,
            });
        }
        for &block in inode.direct_ptrs.iter().filter(|&&p| p != 0) {
            if block < sb.layout.data_start || block >= sb.total_blocks {
                problems.push(Problem::BlockOutOfRange { inode: slot, block });
                continue;
            }
            if !sb.data_bitmap.is_used(block) {
                problems.push(Problem::BlockNotAllocated { inode: slot, block });
            }
            if let Some(&first) = owners.get(&block) {
                problems.push(Problem::BlockShared {
                    block,
                    first,
                    second: slot,
                });
            } else {
                owners.insert(block, slot);
            }
        }
    }
}

fn check_root(
    device: &impl BlockDevice,
    sb: &SuperBlock,
    problems: &mut Vec<Problem>,
) -> (Option<Inode>, Vec<DirEntry>) {
    let root = match get_inode(device, sb, sb.root_inode) {
        Ok(root) => root,
        Err(e) => {
            problems.push(Problem::RootUnreadable(e.to_string()));
            return (None, Vec::new());
        }
    };
    if !sb.inode_bitmap.is_used(sb.root_inode) {
        problems.push(Problem::RootNotAllocated(sb.root_inode));
    }
    if !root.is_dir() {
        problems.push(Problem::RootNotDirectory(root.mode));
        return (Some(root), Vec::new());
    }
    if root.links_cnt != 2 {
        problems.push(Problem::RootLinkCount(root.links_cnt));
    }

    let entries = match read_dir_block(device, &root) {
        Ok((_, block)) => dir_entries(&block),
        Err(e) => {
            problems.push(Problem::RootUnreadable(e.to_string()));
            return (Some(root), Vec::new());
        }
    };
    for entry in &entries {
        if entry.inode_id >= sb.total_inodes {
            problems.push(Problem::EntryOutOfRange {
                name: entry.name.clone(),
                inode: entry.inode_id,
            });
        } else if !sb.inode_bitmap.is_used(entry.inode_id) {
            problems.push(Problem::EntryNotAllocated {
                name: entry.name.clone(),
                inode: entry.inode_id,
            });
        }
    }
    (Some(root), entries)
}

/// Runs every check against an unmounted device.
pub fn fsck(device: &impl BlockDevice) -> Result<FsckReport> {
    let superblock = read_superblock(device)?;
    let mut problems = Vec::new();

    if superblock.block_size as usize != device.block_size() {
        problems.push(Problem::BlockSizeMismatch {
            superblock: superblock.block_size,
            device: device.block_size() as u32,
        });
    }
    let bs = superblock.block_size;
    if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&bs) || bs % INODE_SIZE as u32 != 0 {
        problems.push(Problem::InvalidBlockSize(bs));
    }
    for (what, count) in [
        ("block", superblock.total_blocks),
        ("inode", superblock.total_inodes),
    ] {
        if count as usize > BITMAP_CAPACITY {
            problems.push(Problem::CapacityExceeded { what, count });
        }
    }
    check_layout(&superblock, &mut problems);
    check_bitmaps(&superblock, &mut problems);

    // Reading inodes needs sane sizes and an in-bounds table.
    let readable = problems.iter().all(|p| {
        !matches!(
            p,
            Problem::BlockSizeMismatch { .. }
                | Problem::InvalidBlockSize(_)
                | Problem::CapacityExceeded { .. }
                | Problem::RegionOutOfBounds { .. }
        )
    });
    let (root, entries) = if readable {
        check_inodes(device, &superblock, &mut problems);
        check_root(device, &superblock, &mut problems)
    } else {
        (None, Vec::new())
    };

    if problems.is_empty() {
        info!("fsck: clean");
    } else {
        for problem in &problems {
            warn!("fsck: {problem}");
        }
    }
    Ok(FsckReport {
        superblock,
        root,
        entries,
        problems,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::codec::encode_superblock;
    use crate::inode::write_inode;
    use crate::superblock::write_superblock;
    use crate::{FormatOptions, RamDisk, format_fs};

    fn formatted() -> (RamDisk, SuperBlock) {
        let rd = RamDisk::new(1024, 100);
        let sb = format_fs(&rd, &FormatOptions::default()).unwrap();
        (rd, sb)
    }

    #[test]
    fn test_fresh_fs_is_clean() {
        let (rd, _) = formatted();
        let report = fsck(&rd).unwrap();
        assert!(report.is_consistent(), "{report}");
        let names: Vec<_> = report.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, [".", ".."]);
    }

    #[test]
    fn test_root_link_count() {
        let (rd, sb) = formatted();
        let mut root = get_inode(&rd, &sb, 0).unwrap();
        root.links_cnt = 3;
        write_inode(&rd, &sb, &root).unwrap();
        let report = fsck(&rd).unwrap();
        assert_eq!(report.problems, vec![Problem::RootLinkCount(3)]);
    }

    #[test]
    fn test_malformed_and_reserved() {
        let (rd, mut sb) = formatted();
        let mut bytes = *sb.data_bitmap.as_bytes();
        bytes[2] = b'0';
        bytes[50] = b'x';
        sb.data_bitmap = crate::Bitmap::from_bytes(bytes, sb.total_blocks);
        write_superblock(&rd, &sb).unwrap();
        let report = fsck(&rd).unwrap();
        assert!(report.problems.contains(&Problem::MalformedBitmap {
            bitmap: "data",
            index: 50
        }));
        assert!(report.problems.contains(&Problem::ReservedBlockFree(2)));
    }

    #[test]
    fn test_overflowing_region_is_reported() {
        let (rd, mut sb) = formatted();
        sb.layout.inode_table_start = u32::MAX;
        write_superblock(&rd, &sb).unwrap();
        let report = fsck(&rd).unwrap();
        assert!(report.problems.contains(&Problem::RegionOutOfBounds {
            region: "inode table",
            start: u32::MAX,
            end: u32::MAX,
            total: 100,
        }));
        assert!(report.root.is_none());
        assert!(!report.is_consistent());
    }

    #[test]
    fn test_huge_inode_count() {
        let (rd, mut sb) = formatted();
        sb.total_inodes = u32::MAX;
        write_superblock(&rd, &sb).unwrap();
        let report = fsck(&rd).unwrap();
        assert!(report.problems.contains(&Problem::CapacityExceeded {
            what: "inode",
            count: u32::MAX,
        }));
        assert!(report.root.is_none());
    }

    #[test]
    fn test_invalid_block_size() {
        let (_, mut sb) = formatted();
        sb.block_size = 384;
        let rd = RamDisk::new(384, 100);
        rd.write_block(0, &encode_superblock(&sb, 384)).unwrap();
        let report = fsck(&rd).unwrap();
        assert!(report.problems.contains(&Problem::InvalidBlockSize(384)));
        assert!(report.root.is_none());
    }
}
