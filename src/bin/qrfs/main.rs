mod cli;

use std::fs;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use cli::{Cli, Command};
use log::{error, info, warn};
use qrfs::{BlockDir, Credentials, FileSystem, FormatOptions, Result, fsck, is_dot_name};

const COPY_CHUNK: usize = 4096;

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            eprintln!("qrfs: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<ExitCode> {
    match command {
        Command::Mkfs {
            folder,
            blocks,
            inodes,
            block_size,
        } => {
            let opts = FormatOptions {
                block_size,
                total_blocks: blocks,
                total_inodes: inodes,
            };
            opts.validate()?;
            let dir = BlockDir::create(&folder, block_size as usize, blocks as usize)?;
            let fs = FileSystem::format(Arc::new(dir), &opts)?;
            fs.sync()?;
            println!(
                "formatted {:?}: {} blocks of {} bytes, {} inodes, data starts at block {}",
                folder,
                blocks,
                block_size,
                inodes,
                fs.superblock().layout.data_start
            );
        }
        Command::Fsck { folder } => {
            let dir = BlockDir::open(&folder)?;
            let report = fsck(&dir)?;
            println!("{report}");
            if !report.is_consistent() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Ls { folder } => {
            let fs = FileSystem::mount(Arc::new(BlockDir::open(&folder)?))?;
            for entry in fs.read_dir("/")? {
                let path = format!("/{}", entry.name);
                let attr = if is_dot_name(&entry.name) {
                    fs.getattr("/")?
                } else {
                    fs.getattr(&path)?
                };
                println!(
                    "{:>4} {:>7o} {:>3} {:>8} {}",
                    attr.ino, attr.mode, attr.nlink, attr.size, entry.name
                );
            }
        }
        Command::Put {
            folder,
            source,
            name,
        } => {
            let data = fs::read(&source)?;
            let name = match name {
                Some(name) => name,
                None => source
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .ok_or(qrfs::Error::InvalidArgument("source has no file name"))?,
            };
            let mut fs = FileSystem::mount(Arc::new(BlockDir::open(&folder)?))?;
            let handle = fs.create(&format!("/{name}"), 0, Credentials::root())?;
            let mut written = 0;
            for chunk in data.chunks(COPY_CHUNK) {
                let n = fs.write(handle, written as u64, chunk)?;
                written += n;
                if n < chunk.len() {
                    break;
                }
            }
            fs.release(handle)?;
            fs.sync()?;
            if written < data.len() {
                warn!("'{name}': only {written} of {} bytes fit", data.len());
            }
            info!("put '{name}' as inode {handle}, {written} bytes");
            println!("{name}: {written} bytes");
        }
        Command::Cat { folder, name } => {
            let mut fs = FileSystem::mount(Arc::new(BlockDir::open(&folder)?))?;
            let handle = fs.open(&format!("/{name}"))?;
            let mut stdout = io::stdout().lock();
            let mut buf = vec![0u8; COPY_CHUNK];
            let mut offset = 0u64;
            loop {
                let n = fs.read(handle, offset, &mut buf)?;
                if n == 0 {
                    break;
                }
                stdout.write_all(&buf[..n])?;
                offset += n as u64;
            }
            stdout.flush()?;
            fs.release(handle)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}
