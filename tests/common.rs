//! Common utilities for tests

#![allow(dead_code)]

use std::sync::Arc;

use qrfs::{FileSystem, FormatOptions, RamDisk};

pub const ORANGE: &str = "\x1b[38;5;214m";
pub const RESET: &str = "\x1b[0m";

/// Provides a macro for logging messages during tests.
/// e.g. log!("placeholder") -> println!("[test] placeholder");
#[macro_export]
macro_rules! log {
    ($msg:expr) => {
        println!("{}[test] {}{}", crate::common::ORANGE, $msg, crate::common::RESET)
    };
    ($msg:expr, $($arg:tt)*) => {
        println!("{}[test] {}{}", crate::common::ORANGE, format!($msg, $($arg)*), crate::common::RESET)
    };
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn ram_disk(opts: &FormatOptions) -> Arc<RamDisk> {
    Arc::new(RamDisk::new(opts.block_size as usize, opts.total_blocks as usize))
}

/// 1024-byte blocks, 100 blocks, 10 inodes: data starts at block 5 and the
/// root directory block holds three slots.
pub fn default_fs() -> FileSystem<RamDisk> {
    init_logger();
    let opts = FormatOptions::default();
    FileSystem::format(ram_disk(&opts), &opts).unwrap()
}

/// 4096-byte blocks so the root directory has room for 15 entries.
pub fn wide_opts() -> FormatOptions {
    FormatOptions {
        block_size: 4096,
        total_blocks: 100,
        total_inodes: 10,
    }
}

pub fn wide_fs() -> FileSystem<RamDisk> {
    init_logger();
    let opts = wide_opts();
    FileSystem::format(ram_disk(&opts), &opts).unwrap()
}

pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
