mod common;

use std::sync::Arc;

use common::{default_fs, init_logger, ram_disk, wide_opts};
use qrfs::{
    BlockDevice, Credentials, Error, Exhausted, FileSystem, FileType, FormatOptions, RamDisk,
    alloc_data_block, alloc_inode_id, format_fs, free_data_block, free_inode_id, read_superblock,
    write_superblock, DIR_ENTRY_SIZE, MAGIC, ROOT_DIR_PERM, S_IFDIR,
};

#[test]
fn test_format_layout() {
    let fs = default_fs();
    let sb = fs.superblock();
    assert_eq!(sb.version, 1);
    assert_eq!(sb.block_size, 1024);
    assert_eq!(sb.total_blocks, 100);
    assert_eq!(sb.total_inodes, 10);
    assert_eq!(sb.layout.inode_bitmap_start, 1);
    assert_eq!(sb.layout.data_bitmap_start, 2);
    assert_eq!(sb.layout.inode_table_start, 3);
    assert_eq!(sb.layout.data_start, 5);
    for block in 0..=5 {
        assert!(sb.data_bitmap.is_used(block), "block {block} should be reserved");
    }
    assert!(!sb.data_bitmap.is_used(6));
    assert!(sb.inode_bitmap.is_used(0));
    assert!(!sb.inode_bitmap.is_used(1));

    let block0 = fs.device().read_block_vec(0).unwrap();
    assert_eq!(&block0[..4], MAGIC);
    log!("{:?}", sb);
}

#[test]
fn test_root_inode() {
    let fs = default_fs();
    let root = fs.get_inode(fs.root_inode_id()).unwrap();
    assert_eq!(root.id, 0);
    assert_eq!(root.mode, S_IFDIR | ROOT_DIR_PERM);
    assert_eq!((root.uid, root.gid), (0, 0));
    assert_eq!(root.links_cnt, 2);
    assert_eq!(root.size, 2 * DIR_ENTRY_SIZE as u32);
    assert_eq!(root.size, 520);
    assert_eq!(root.direct_ptrs[0], 5);
    assert_eq!(fs.root_inode(), &root);

    let entries = fs.read_dir("/").unwrap();
    let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, [".", ".."]);
    assert!(entries.iter().all(|e| e.inode_id == 0));
}

#[test]
fn test_format_then_load() {
    init_logger();
    let cases = [
        (1024, 100, 10),
        (512, 128, 128),
        (65536, 128, 128),
        (512, 128, 1),
        (65536, 8, 1),
        (512, 36, 128), // data region is a single block
    ];
    for (block_size, total_blocks, total_inodes) in cases {
        let opts = FormatOptions {
            block_size,
            total_blocks,
            total_inodes,
        };
        let rd = ram_disk(&opts);
        let formatted = format_fs(&*rd, &opts).unwrap();
        assert_eq!(read_superblock(&*rd).unwrap(), formatted);

        let fs = FileSystem::mount(Arc::clone(&rd)).unwrap();
        assert_eq!(fs.superblock().layout, formatted.layout, "{opts:?}");
        assert_eq!(fs.superblock(), &formatted, "{opts:?}");

        let root = fs.root_inode();
        assert_eq!(root.id, 0);
        assert_eq!(root.mode, S_IFDIR | ROOT_DIR_PERM);
        assert_eq!(root.links_cnt, 2);
        assert_eq!(root.size, 520);
        assert_eq!(root.direct_ptrs[0], formatted.layout.data_start);
        assert_eq!(root, &fs.get_inode(0).unwrap());
        log!("{:?} -> {:?}", opts, formatted.layout);
    }
}

#[test]
fn test_mount_rejects_overflowing_layout() {
    let fs = default_fs();
    let mut sb = fs.superblock().clone();
    sb.layout.inode_table_start = u32::MAX;
    write_superblock(&*fs.device(), &sb).unwrap();
    assert!(matches!(FileSystem::mount(fs.device()), Err(Error::Format(_))));

    sb.layout.inode_table_start = 3;
    sb.total_inodes = u32::MAX;
    write_superblock(&*fs.device(), &sb).unwrap();
    assert!(matches!(FileSystem::mount(fs.device()), Err(Error::Format(_))));
}

#[test]
fn test_mount_rejects_bad_magic() {
    let fs = default_fs();
    let rd = fs.device();
    let mut block0 = rd.read_block_vec(0).unwrap();
    block0[..4].copy_from_slice(b"XXXX");
    rd.write_block(0, &block0).unwrap();
    assert!(matches!(FileSystem::mount(rd), Err(Error::Format(_))));
}

#[test]
fn test_mount_rejects_block_size_mismatch() {
    let fs = default_fs();
    let mut sb = fs.superblock().clone();
    sb.block_size = 2048;
    write_superblock(&*fs.device(), &sb).unwrap();
    assert!(matches!(FileSystem::mount(fs.device()), Err(Error::Format(_))));
}

#[test]
fn test_format_limits() {
    init_logger();
    let too_many = FormatOptions {
        total_blocks: 129,
        ..Default::default()
    };
    let rd = RamDisk::new(1024, 129);
    assert!(matches!(format_fs(&rd, &too_many), Err(Error::Config(_))));

    let no_data = FormatOptions {
        block_size: 1024,
        total_blocks: 5,
        total_inodes: 10,
    };
    let rd = RamDisk::new(1024, 5);
    assert!(matches!(
        format_fs(&rd, &no_data),
        Err(Error::Layout { data_start: 5, total_blocks: 5 })
    ));

    // Device geometry must match the request.
    let rd = RamDisk::new(512, 100);
    assert!(matches!(
        format_fs(&rd, &FormatOptions::default()),
        Err(Error::Config(_))
    ));
}

#[test]
fn test_alloc_lowest_free() {
    let fs = default_fs();
    let rd = fs.device();
    let mut sb = fs.superblock().clone();

    assert_eq!(alloc_inode_id(&mut sb).unwrap(), 1);
    assert_eq!(alloc_inode_id(&mut sb).unwrap(), 2);
    free_inode_id(&mut sb, 1);
    assert_eq!(alloc_inode_id(&mut sb).unwrap(), 1);

    assert_eq!(alloc_data_block(&*rd, &mut sb).unwrap(), 6);
    assert_eq!(alloc_data_block(&*rd, &mut sb).unwrap(), 7);
    free_data_block(&mut sb, 6);
    assert_eq!(alloc_data_block(&*rd, &mut sb).unwrap(), 6);

    // Metadata blocks are never released.
    free_data_block(&mut sb, 3);
    assert!(sb.data_bitmap.is_used(3));
}

#[test]
fn test_alloc_exhaustion() {
    let fs = default_fs();
    let rd = fs.device();
    let mut sb = fs.superblock().clone();

    let mut inodes = Vec::new();
    while let Ok(id) = alloc_inode_id(&mut sb) {
        inodes.push(id);
    }
    assert_eq!(inodes, (1..10).collect::<Vec<_>>());
    assert!(matches!(
        alloc_inode_id(&mut sb),
        Err(Error::NoSpace(Exhausted::Inodes))
    ));

    let mut blocks = Vec::new();
    while let Ok(id) = alloc_data_block(&*rd, &mut sb) {
        blocks.push(id);
    }
    assert_eq!(blocks.len(), 94);
    blocks.sort_unstable();
    blocks.dedup();
    assert_eq!(blocks.len(), 94, "a block was handed out twice");
    assert!(blocks.iter().all(|&b| (6..100).contains(&b)));
    assert!(matches!(
        alloc_data_block(&*rd, &mut sb),
        Err(Error::NoSpace(Exhausted::Blocks))
    ));
}

#[test]
fn test_create_scenario() {
    let mut fs = default_fs();
    let before = fs.statfs();
    assert_eq!(before.block_size, 1024);
    assert_eq!(before.total_blocks, 95);
    assert_eq!(before.free_blocks, 94);
    assert_eq!(before.total_inodes, 10);
    assert_eq!(before.free_inodes, 9);
    assert_eq!(before.name_max, 259);

    let ino = fs.create("/a.txt", 0o644, Credentials::new(1000, 1000)).unwrap();
    assert_eq!(ino, 1);
    let inode = fs.get_inode(ino).unwrap();
    assert_eq!(inode.direct_ptrs[0], 6);
    assert_eq!(inode.size, 0);
    assert_eq!(inode.links_cnt, 1);
    assert_eq!((inode.uid, inode.gid), (1000, 1000));

    let after = fs.statfs();
    assert_eq!(after.free_inodes, after.total_inodes - 2);
    assert_eq!(after.free_blocks, before.free_blocks - 1);
    assert_eq!(fs.lookup("/a.txt").unwrap(), (1, FileType::Regular));

    // Everything survives a remount.
    let remounted = FileSystem::mount(fs.device()).unwrap();
    assert_eq!(remounted.superblock(), fs.superblock());
    assert_eq!(remounted.lookup("/a.txt").unwrap(), (1, FileType::Regular));
}

#[test]
fn test_wide_layout() {
    init_logger();
    let opts = wide_opts();
    let rd = ram_disk(&opts);
    let sb = format_fs(&*rd, &opts).unwrap();
    assert_eq!(sb.layout.inode_table_blocks, 1);
    assert_eq!(sb.layout.data_start, 4);
    assert_eq!(sb.entries_per_dir_block(), 15);
}
