use std::path::PathBuf;

use clap::{Parser, Subcommand};
use qrfs::{DEFAULT_BLOCK_SIZE, DEFAULT_TOTAL_BLOCKS, DEFAULT_TOTAL_INODES};

#[derive(Parser)]
#[command(name = "qrfs", version, about = "QRFS image tool")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Format a folder as a fresh filesystem
    Mkfs {
        /// Backing folder, created if missing
        #[arg(default_value = "./qrfolder")]
        folder: PathBuf,

        #[arg(long, default_value_t = DEFAULT_TOTAL_BLOCKS)]
        blocks: u32,

        #[arg(long, default_value_t = DEFAULT_TOTAL_INODES)]
        inodes: u32,

        #[arg(long = "blocksize", default_value_t = DEFAULT_BLOCK_SIZE)]
        block_size: u32,
    },

    /// Check a backing folder for consistency
    Fsck { folder: PathBuf },

    /// List the entries of the root directory
    Ls { folder: PathBuf },

    /// Copy a host file into the root directory
    Put {
        folder: PathBuf,

        /// Host file to copy
        source: PathBuf,

        /// Name inside the filesystem, defaults to the host file name
        #[arg(long, short)]
        name: Option<String>,
    },

    /// Print a file's contents to stdout
    Cat { folder: PathBuf, name: String },
}
