//! Shared handle over a mounted filesystem.
//! Host callbacks may arrive on several threads; every operation takes the
//! mount lock for its whole duration, so bitmap updates and directory block
//! rewrites never interleave.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::stat::{AccessMask, FileAttr, FsStat};
use crate::{BlockDevice, Credentials, DirEntry, FileSystem, FileType, FormatOptions, Result};

pub struct Mount<D: BlockDevice> {
    fs: Mutex<FileSystem<D>>,
}

impl<D: BlockDevice> Mount<D> {
    pub fn new(fs: FileSystem<D>) -> Self {
        Self { fs: Mutex::new(fs) }
    }

    pub fn open_device(device: Arc<D>) -> Result<Self> {
        FileSystem::mount(device).map(Self::new)
    }

    pub fn format(device: Arc<D>, opts: &FormatOptions) -> Result<Self> {
        FileSystem::format(device, opts).map(Self::new)
    }

    /// Direct access for sequences that must run under one lock.
    /// A poisoned lock is taken over as is.
    pub fn lock(&self) -> MutexGuard<'_, FileSystem<D>> {
        self.fs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn into_inner(self) -> FileSystem<D> {
        self.fs.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn getattr(&self, path: &str) -> Result<FileAttr> {
        self.lock().getattr(path)
    }

    pub fn lookup(&self, path: &str) -> Result<(u32, FileType)> {
        self.lock().lookup(path)
    }

    pub fn create(&self, path: &str, mode: u32, cred: Credentials) -> Result<u32> {
        self.lock().create(path, mode, cred)
    }

    pub fn open(&self, path: &str) -> Result<u32> {
        self.lock().open(path)
    }

    pub fn release(&self, handle: u32) -> Result<()> {
        self.lock().release(handle)
    }

    pub fn read(&self, handle: u32, offset: u64, buf: &mut [u8]) -> Result<usize> {
        self.lock().read(handle, offset, buf)
    }

    pub fn write(&self, handle: u32, offset: u64, buf: &[u8]) -> Result<usize> {
        self.lock().write(handle, offset, buf)
    }

    pub fn truncate(&self, path: &str, size: u64) -> Result<()> {
        self.lock().truncate(path, size)
    }

    pub fn rename(&self, from: &str, to: &str) -> Result<()> {
        self.lock().rename(from, to)
    }

    pub fn unlink(&self, path: &str) -> Result<()> {
        self.lock().unlink(path)
    }

    pub fn remove_directory(&self, path: &str) -> Result<()> {
        self.lock().remove_directory(path)
    }

    pub fn list_directory(&self, path: &str) -> Result<Vec<String>> {
        self.lock().list_directory(path)
    }

    pub fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        self.lock().read_dir(path)
    }

    pub fn statfs(&self) -> FsStat {
        self.lock().statfs()
    }

    pub fn sync(&self) -> Result<()> {
        self.lock().sync()
    }

    pub fn access(&self, path: &str, mask: AccessMask, cred: Credentials) -> Result<()> {
        self.lock().access(path, mask, cred)
    }
}
