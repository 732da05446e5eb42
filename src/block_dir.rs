//! Block storage where every block is its own host file.
//! Block `i` lives at `<dir>/block_{i:04}.png` and is exactly one block long.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use log::{info, trace};

use crate::block_dev::{check_buf_len, missing_block};
use crate::{BlockDevice, Error, Result};

#[derive(Debug)]
pub struct BlockDir {
    dir: PathBuf,
    block_size: usize,
    num_blocks: usize,
}

impl BlockDir {
    /// Creates the folder (if needed) and `num_blocks` zero-filled block files.
    /// Existing block files are truncated.
    pub fn create(dir: impl AsRef<Path>, block_size: usize, num_blocks: usize) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if dir.exists() && !dir.is_dir() {
            return Err(Error::NotADirectory);
        }
        fs::create_dir_all(&dir)?;
        let block_dir = BlockDir {
            dir,
            block_size,
            num_blocks,
        };
        let zeroes = vec![0u8; block_size];
        for block_id in 0..num_blocks as u32 {
            let mut file = File::create(block_dir.block_path(block_id))?;
            file.write_all(&zeroes)?;
        }
        info!(
            "created {} block files of {} bytes in {}",
            num_blocks,
            block_size,
            block_dir.dir.display()
        );
        Ok(block_dir)
    }

    /// Opens an existing block folder.
    /// The block size is taken from block 0's length and the block count from
    /// the contiguous run of block files starting at 0.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(Error::NotADirectory);
        }
        let mut block_dir = BlockDir {
            dir,
            block_size: 0,
            num_blocks: 0,
        };
        let first = block_dir.block_path(0);
        let block_size = match fs::metadata(&first) {
            Ok(meta) => meta.len() as usize,
            Err(_) => return Err(missing_block(0).into()),
        };
        if block_size == 0 {
            return Err(Error::Format(format!("{} is empty", first.display())));
        }
        let mut num_blocks = 0;
        while block_dir.block_path(num_blocks).is_file() {
            num_blocks += 1;
        }
        block_dir.block_size = block_size;
        block_dir.num_blocks = num_blocks as usize;
        Ok(block_dir)
    }

    pub fn block_path(&self, block_id: u32) -> PathBuf {
        self.dir.join(format!("block_{block_id:04}.png"))
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn check_id(&self, block_id: u32) -> Result<()> {
        if block_id as usize >= self.num_blocks {
            return Err(missing_block(block_id).into());
        }
        Ok(())
    }
}

impl BlockDevice for BlockDir {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    fn read_block(&self, block_id: u32, buf: &mut [u8]) -> Result<()> {
        check_buf_len(buf.len(), self.block_size)?;
        self.check_id(block_id)?;
        trace!("blockdir: read block {block_id}");
        let mut file = File::open(self.block_path(block_id))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write_block(&self, block_id: u32, buf: &[u8]) -> Result<()> {
        check_buf_len(buf.len(), self.block_size)?;
        self.check_id(block_id)?;
        trace!("blockdir: write block {block_id}");
        // Opening without `create` keeps a missing block an error.
        let mut file = OpenOptions::new().write(true).open(self.block_path(block_id))?;
        file.write_all(buf)?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        // Each write opens and closes its own file; sync the folder entries.
        File::open(&self.dir)?.sync_all()?;
        Ok(())
    }
}
