use thiserror::Error;

/// Which pool ran dry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exhausted {
    Inodes,
    Blocks,
    DirSlots,
}

#[derive(Debug, Error)]
pub enum FsError {
    #[error("invalid format parameters: {0}")]
    Config(String),
    #[error("no room for a data region: it would start at block {data_start} of {total_blocks}")]
    Layout { data_start: u32, total_blocks: u32 },
    #[error("bad superblock: {0}")]
    Format(String),
    #[error("block i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("index {index} out of range (limit {limit})")]
    Range { index: u32, limit: u32 },
    #[error("no such file or directory")]
    NotFound,
    #[error("name already exists")]
    Exists,
    #[error("no space left: {0:?} exhausted")]
    NoSpace(Exhausted),
    #[error("is a directory")]
    IsADirectory,
    #[error("not a directory")]
    NotADirectory,
    #[error("resource busy")]
    Busy,
    #[error("operation not supported")]
    NotSupported,
    #[error("permission denied")]
    PermissionDenied,
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

// Linux errno values handed back to a host bridge.
const ENOENT: i32 = 2;
const EIO: i32 = 5;
const EACCES: i32 = 13;
const EBUSY: i32 = 16;
const EEXIST: i32 = 17;
const ENOTDIR: i32 = 20;
const EISDIR: i32 = 21;
const EINVAL: i32 = 22;
const ENOSPC: i32 = 28;
const ERANGE: i32 = 34;
const ENOSYS: i32 = 38;

impl FsError {
    /// Positive errno for this error.
    pub fn errno(&self) -> i32 {
        match self {
            FsError::Config(_) | FsError::Layout { .. } | FsError::InvalidArgument(_) => EINVAL,
            FsError::Format(_) | FsError::Io(_) => EIO,
            FsError::Range { .. } => ERANGE,
            FsError::NotFound => ENOENT,
            FsError::Exists => EEXIST,
            FsError::NoSpace(_) => ENOSPC,
            FsError::IsADirectory => EISDIR,
            FsError::NotADirectory => ENOTDIR,
            FsError::Busy => EBUSY,
            FsError::NotSupported => ENOSYS,
            FsError::PermissionDenied => EACCES,
        }
    }
}

pub type Result<T> = core::result::Result<T, FsError>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_errno() {
        assert_eq!(FsError::NotFound.errno(), ENOENT);
        assert_eq!(FsError::NoSpace(Exhausted::DirSlots).errno(), ENOSPC);
        let io = FsError::from(std::io::Error::from(std::io::ErrorKind::UnexpectedEof));
        assert_eq!(io.errno(), EIO);
    }
}
