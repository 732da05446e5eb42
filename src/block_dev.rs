use std::io::{Error as IoError, ErrorKind};

use log::trace;
use spin::Mutex;

use crate::error::Result;

/// Whole-block storage addressed by a zero-based index.
/// Implementations do no caching: every call reaches the backing store.
pub trait BlockDevice: Send + Sync {
    /// Returns the size of each block in bytes.
    fn block_size(&self) -> usize;

    /// Returns the number of blocks in the block device.
    fn num_blocks(&self) -> usize;

    /// Reads a block of data from the block device.
    /// buf.len() must be equal to block_size().
    fn read_block(&self, block_id: u32, buf: &mut [u8]) -> Result<()>;

    /// Writes a block of data to the block device.
    /// buf.len() must be equal to block_size().
    fn write_block(&self, block_id: u32, buf: &[u8]) -> Result<()>;

    /// Overwrites a block with zeroes.
    fn zero_block(&self, block_id: u32) -> Result<()> {
        self.write_block(block_id, &vec![0u8; self.block_size()])
    }

    /// Flushes anything the device still holds to persistent storage.
    fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Reads a block into a freshly allocated buffer.
    fn read_block_vec(&self, block_id: u32) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.block_size()];
        self.read_block(block_id, &mut buf)?;
        Ok(buf)
    }
}

pub(crate) fn check_buf_len(len: usize, block_size: usize) -> Result<()> {
    if len != block_size {
        return Err(IoError::new(
            ErrorKind::InvalidInput,
            format!("buffer of {len} bytes for a {block_size}-byte block"),
        )
        .into());
    }
    Ok(())
}

pub(crate) fn missing_block(block_id: u32) -> IoError {
    IoError::new(ErrorKind::NotFound, format!("block {block_id} does not exist"))
}

/// A block device kept entirely in memory.
pub struct RamDisk {
    inner: Mutex<Vec<u8>>,
    block_size: usize,
    num_blocks: usize,
}

impl RamDisk {
    /// Creates a zero-filled RamDisk with the specified number of blocks.
    pub fn new(block_size: usize, num_blocks: usize) -> Self {
        RamDisk {
            inner: Mutex::new(vec![0u8; block_size * num_blocks]),
            block_size,
            num_blocks,
        }
    }

    fn range(&self, block_id: u32) -> Result<core::ops::Range<usize>> {
        let block_id = block_id as usize;
        if block_id >= self.num_blocks {
            return Err(missing_block(block_id as u32).into());
        }
        let start = block_id * self.block_size;
        Ok(start..start + self.block_size)
    }
}

impl BlockDevice for RamDisk {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    fn read_block(&self, block_id: u32, buf: &mut [u8]) -> Result<()> {
        check_buf_len(buf.len(), self.block_size)?;
        let range = self.range(block_id)?;
        trace!("ramdisk: read block {block_id}");
        buf.copy_from_slice(&self.inner.lock()[range]);
        Ok(())
    }

    fn write_block(&self, block_id: u32, buf: &[u8]) -> Result<()> {
        check_buf_len(buf.len(), self.block_size)?;
        let range = self.range(block_id)?;
        trace!("ramdisk: write block {block_id}");
        self.inner.lock()[range].copy_from_slice(buf);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Error;

    #[test]
    fn test_ram_disk_bounds() {
        let rd = RamDisk::new(512, 4);
        let mut buf = vec![0u8; 512];
        assert!(rd.read_block(3, &mut buf).is_ok());
        assert!(matches!(rd.read_block(4, &mut buf), Err(Error::Io(_))));
        assert!(matches!(rd.write_block(0, &[0u8; 100]), Err(Error::Io(_))));
    }

    #[test]
    fn test_zero_block() {
        let rd = RamDisk::new(512, 2);
        rd.write_block(1, &[7u8; 512]).unwrap();
        assert_eq!(rd.read_block_vec(1).unwrap(), vec![7u8; 512]);
        rd.zero_block(1).unwrap();
        assert_eq!(rd.read_block_vec(1).unwrap(), vec![0u8; 512]);
    }
}
