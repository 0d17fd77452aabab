//! File attributes reported to the filesystem layer.

use std::time::SystemTime;

/// Alignment unit for block counts and the read-ahead window (128 KiB,
/// i.e. 32 pages of 4 KiB, the largest read a FUSE request carries).
pub const BLOCK_SIZE: u64 = 128 * 1024;

/// Mode of the mounted file: read and execute for everyone.
pub const FILE_MODE: u16 = 0o555;

/// Mode of the root directory.
pub const DIR_MODE: u16 = 0o755;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    File,
}

/// Attributes of a node at the time of the query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttributes {
    pub kind: NodeKind,
    pub size_bytes: u64,
    pub mode: u16,
    pub link_count: u32,
    pub block_size: u32,
    pub block_count: u64,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
}

impl FileAttributes {
    /// Attributes of the remote file. Timestamps are the current wall-clock time.
    pub fn regular(size_bytes: u64) -> Self {
        let now = SystemTime::now();
        Self {
            kind: NodeKind::File,
            size_bytes,
            mode: FILE_MODE,
            link_count: 1,
            block_size: BLOCK_SIZE as u32,
            block_count: size_bytes.div_ceil(BLOCK_SIZE),
            atime: now,
            mtime: now,
            ctime: now,
        }
    }

    /// Attributes of the root directory.
    pub fn directory() -> Self {
        let now = SystemTime::now();
        Self {
            kind: NodeKind::Directory,
            size_bytes: 0,
            mode: DIR_MODE,
            link_count: 2,
            block_size: BLOCK_SIZE as u32,
            block_count: 0,
            atime: now,
            mtime: now,
            ctime: now,
        }
    }
}
