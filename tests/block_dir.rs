mod common;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use qrfs::{BlockDevice, BlockDir, Credentials, Error, FileSystem, FormatOptions, fsck};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("qrfs-{}-{name}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    dir
}

#[test]
fn test_block_files() {
    common::init_logger();
    let dir = scratch_dir("files");
    let bd = BlockDir::create(&dir, 1024, 8).unwrap();
    assert_eq!(bd.block_path(3), dir.join("block_0003.png"));
    assert_eq!(fs::metadata(bd.block_path(7)).unwrap().len(), 1024);

    bd.write_block(3, &[0xAB; 1024]).unwrap();
    assert_eq!(bd.read_block_vec(3).unwrap(), vec![0xAB; 1024]);
    assert!(matches!(bd.read_block_vec(8), Err(Error::Io(_))));

    let reopened = BlockDir::open(&dir).unwrap();
    assert_eq!(reopened.block_size(), 1024);
    assert_eq!(reopened.num_blocks(), 8);

    // A deleted block file surfaces as an I/O error, never a silent zero block.
    fs::remove_file(bd.block_path(5)).unwrap();
    assert!(matches!(bd.read_block_vec(5), Err(Error::Io(_))));
    assert!(matches!(bd.write_block(5, &[0; 1024]), Err(Error::Io(_))));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_folder_filesystem() {
    common::init_logger();
    let dir = scratch_dir("fs");
    let opts = FormatOptions::default();
    let bd = BlockDir::create(&dir, 1024, 100).unwrap();
    let mut qrfs = FileSystem::format(Arc::new(bd), &opts).unwrap();
    let fd = qrfs.create("/a.txt", 0, Credentials::root()).unwrap();
    qrfs.write(fd, 0, b"stored in block files").unwrap();
    qrfs.sync().unwrap();
    drop(qrfs);

    let bd = BlockDir::open(&dir).unwrap();
    let report = fsck(&bd).unwrap();
    assert!(report.is_consistent(), "{report}");

    let mut qrfs = FileSystem::mount(Arc::new(bd)).unwrap();
    let fd = qrfs.open("/a.txt").unwrap();
    let mut buf = [0u8; 21];
    assert_eq!(qrfs.read(fd, 0, &mut buf).unwrap(), 21);
    assert_eq!(&buf, b"stored in block files");

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_open_missing_folder() {
    let dir = scratch_dir("missing");
    assert!(matches!(BlockDir::open(&dir), Err(Error::NotADirectory)));
}
