//! Filesystem-facing side: the mount tree, the read worker pool, and the
//! FUSE adapter that connects them to the kernel.
//!
//! ```text
//! kernel ── fuser session ── HttpMountFs ──┬── MountTree ── RemoteFile (attrs)
//!                                          └── ReadDispatcher ── RemoteFile::read_range
//! ```

mod dispatch;
mod fuse;
mod tree;

pub use dispatch::{ReadDispatcher, ReadReply};
pub use fuse::{
    check_mountpoint, mount, mount_options, open_flags, read_offset, readdir_check, to_file_attr,
    HttpMountFs,
};
pub use tree::{DirEntry, FileNode, MountTree, FILE_INO, ROOT_INO};
